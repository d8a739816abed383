use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub played: i32,
    pub won: i32,
    pub played_hard: i32,
    pub won_hard: i32,
    pub current_streak: i32,
    pub max_streak: i32,
    /// JSON array with one counter per guess count.
    #[sea_orm(column_type = "Text")]
    pub distribution: String,
    pub last_date: Option<String>,
    pub hard_mode: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
