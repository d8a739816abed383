use std::cmp::Ordering;
use std::collections::HashMap;

use wordle_types::{GameResult, LeaderboardEntry, User, UserId};

/// Weight of the global mean in the shrinkage estimate, in "virtual games".
pub const CONFIDENCE: f64 = 10.0;
/// Score assigned to a lost game.
pub const LOSS_PENALTY: f64 = 8.0;
/// Hard-mode wins count for 90% of their guesses.
pub const HARD_MODE_FACTOR: f64 = 0.9;
/// Players need at least this many results to be ranked.
pub const MIN_GAMES: u32 = 1;

#[derive(Debug, Default)]
struct PlayerTally<'a> {
    score_sum: f64,
    games: u32,
    wins: u32,
    hard_mode_wins: u32,
    results: Vec<&'a GameResult>,
}

#[derive(Debug)]
struct RankedPlayer<'a> {
    user: &'a User,
    tally: PlayerTally<'a>,
    weighted_avg: f64,
    true_avg: f64,
    win_rate: f64,
}

pub struct RankingEngine;

impl RankingEngine {
    /// Score of a single result; lower is better.
    pub fn result_score(result: &GameResult) -> f64 {
        match (result.won, result.guesses) {
            (true, Some(guesses)) if result.hard_mode => guesses as f64 * HARD_MODE_FACTOR,
            (true, Some(guesses)) => guesses as f64,
            _ => LOSS_PENALTY,
        }
    }

    /// Mean score over every result, or `None` when there are no results.
    pub fn global_mean<'a>(results: impl IntoIterator<Item = &'a GameResult>) -> Option<f64> {
        let (sum, count) = results
            .into_iter()
            .fold((0.0, 0u32), |(sum, count), r| (sum + Self::result_score(r), count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Blend a player's score sum with the global mean:
    /// `(C * global_mean + score_sum) / (C + games)`.
    pub fn shrinkage_average(global_mean: f64, score_sum: f64, games: u32) -> f64 {
        (CONFIDENCE * global_mean + score_sum) / (CONFIDENCE + games as f64)
    }

    /// Consecutive wins counted back from the most recent date.
    pub fn current_streak<'a>(results: impl IntoIterator<Item = &'a GameResult>) -> u32 {
        let mut ordered: Vec<&GameResult> = results.into_iter().collect();
        ordered.sort_by(|a, b| b.date.cmp(&a.date));
        ordered.iter().take_while(|r| r.won).count() as u32
    }

    /// Build the leaderboard from all known results.
    ///
    /// Banned users and results belonging to unknown users are ignored, so the
    /// global mean only reflects players that can appear on the board.
    pub fn rank(users: &[User], results: &[GameResult], limit: usize) -> Vec<LeaderboardEntry> {
        let eligible: HashMap<UserId, &User> = users
            .iter()
            .filter(|u| !u.banned)
            .map(|u| (u.id, u))
            .collect();

        let counted: Vec<&GameResult> = results
            .iter()
            .filter(|r| eligible.contains_key(&r.user_id))
            .collect();

        let Some(global_mean) = Self::global_mean(counted.iter().copied()) else {
            return Vec::new();
        };

        let mut tallies: HashMap<UserId, PlayerTally> = HashMap::new();
        for result in counted {
            let tally = tallies.entry(result.user_id).or_default();
            tally.score_sum += Self::result_score(result);
            tally.games += 1;
            if result.won {
                tally.wins += 1;
                if result.hard_mode {
                    tally.hard_mode_wins += 1;
                }
            }
            tally.results.push(result);
        }

        let mut ranked: Vec<RankedPlayer> = tallies
            .into_iter()
            .filter(|(_, tally)| tally.games >= MIN_GAMES)
            .filter_map(|(user_id, tally)| {
                let user = *eligible.get(&user_id)?;
                let games = tally.games as f64;
                Some(RankedPlayer {
                    user,
                    weighted_avg: Self::shrinkage_average(global_mean, tally.score_sum, tally.games),
                    true_avg: tally.score_sum / games,
                    win_rate: tally.wins as f64 / games,
                    tally,
                })
            })
            .collect();

        ranked.sort_by(Self::compare);

        tracing::debug!(
            players = ranked.len(),
            global_mean,
            "Computed leaderboard ranking"
        );

        ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, player)| LeaderboardEntry {
                rank: (index + 1) as u32,
                user_id: player.user.id,
                display_name: player.user.effective_name().to_string(),
                avatar_url: player.user.avatar_url.clone(),
                weighted_avg: player.weighted_avg,
                true_avg: player.true_avg,
                win_rate: player.win_rate,
                games_played: player.tally.games,
                streak: Self::current_streak(player.tally.results.iter().copied()),
                hard_mode_wins: player.tally.hard_mode_wins,
            })
            .collect()
    }

    // Lower weighted average first, then higher win rate, then more games.
    fn compare(a: &RankedPlayer, b: &RankedPlayer) -> Ordering {
        a.weighted_avg
            .total_cmp(&b.weighted_avg)
            .then_with(|| b.win_rate.total_cmp(&a.win_rate))
            .then_with(|| b.tally.games.cmp(&a.tally.games))
            .then_with(|| a.user.id.cmp(&b.user.id))
    }
}
