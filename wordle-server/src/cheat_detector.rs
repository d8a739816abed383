use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use crate::geo::GeoLocator;
use wordle_core::{CheatDetector, CheatReason, TimezoneEvidence};
use wordle_persistence::repositories::{
    TimezoneEventRecord, TimezoneEventRepository, UserRepository,
};
use wordle_types::{TimezoneClaim, UserId};

/// Which API call produced a timezone event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEndpoint {
    Result,
    SaveProgress,
}

impl GameEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameEndpoint::Result => "result",
            GameEndpoint::SaveProgress => "save-progress",
        }
    }
}

impl fmt::Display for GameEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheatVerdict {
    pub reasons: Vec<CheatReason>,
}

impl CheatVerdict {
    pub fn flagged(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// Records every timezone claim and reports the suspicious ones.
///
/// Detection never blocks a request: storage, lookup, and audit failures are
/// logged and the verdict is computed from whatever evidence is available.
pub struct CheatDetectionService {
    events: Arc<TimezoneEventRepository>,
    users: Arc<UserRepository>,
    geo: Arc<dyn GeoLocator>,
    audit_log: Option<PathBuf>,
}

impl CheatDetectionService {
    pub fn new(
        events: Arc<TimezoneEventRepository>,
        users: Arc<UserRepository>,
        geo: Arc<dyn GeoLocator>,
        audit_log: Option<PathBuf>,
    ) -> Self {
        Self {
            events,
            users,
            geo,
            audit_log,
        }
    }

    pub async fn inspect(
        &self,
        user_id: UserId,
        claim: &TimezoneClaim,
        ip: Option<IpAddr>,
        endpoint: GameEndpoint,
    ) -> CheatVerdict {
        self.inspect_at(user_id, claim, ip, endpoint, Utc::now()).await
    }

    pub async fn inspect_at(
        &self,
        user_id: UserId,
        claim: &TimezoneClaim,
        ip: Option<IpAddr>,
        endpoint: GameEndpoint,
        server_time: DateTime<Utc>,
    ) -> CheatVerdict {
        // Read the previous event before this one lands in the log
        let previous = match self.events.latest_for_user(user_id).await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::error!(user_id, "Failed to load previous timezone event: {}", e);
                None
            }
        };

        let ip_text = ip.map(|ip| ip.to_string()).unwrap_or_default();
        let record = TimezoneEventRecord {
            user_id,
            server_time,
            client_time: claim.client_time.clone(),
            tz_offset: claim.tz_offset,
            ip: ip_text.clone(),
            endpoint: endpoint.as_str().to_string(),
        };
        if let Err(e) = self.events.record(record).await {
            tracing::error!(user_id, "Failed to record timezone event: {}", e);
        }

        let geo = match ip {
            Some(ip) if !CheatDetector::is_geo_exempt(&ip) => self.geo.locate(ip).await,
            _ => None,
        };

        let reasons = CheatDetector::evaluate(&TimezoneEvidence {
            server_time,
            claim,
            ip,
            previous: previous.as_ref(),
            geo: geo.as_ref(),
        });

        let verdict = CheatVerdict { reasons };
        if verdict.flagged() {
            self.report(user_id, claim, &ip_text, endpoint, server_time, &verdict)
                .await;
        }
        verdict
    }

    async fn report(
        &self,
        user_id: UserId,
        claim: &TimezoneClaim,
        ip: &str,
        endpoint: GameEndpoint,
        server_time: DateTime<Utc>,
        verdict: &CheatVerdict,
    ) {
        let name = self.users.display_name_of(user_id).await.unwrap_or_else(|e| {
            tracing::error!(user_id, "Failed to look up flagged user: {}", e);
            String::new()
        });
        let line = audit_line(user_id, &name, claim, ip, endpoint, server_time, verdict);

        tracing::warn!(user_id, endpoint = %endpoint, "Suspicious timezone claim: {}", line);

        if let Some(path) = &self.audit_log {
            if let Err(e) = append_line(path, &line).await {
                tracing::error!("Failed to write cheat log {}: {}", path.display(), e);
            }
        }
    }
}

pub fn audit_line(
    user_id: UserId,
    name: &str,
    claim: &TimezoneClaim,
    ip: &str,
    endpoint: GameEndpoint,
    server_time: DateTime<Utc>,
    verdict: &CheatVerdict,
) -> String {
    let reasons = verdict
        .reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "[{}] user_id={} name={:?} reasons=[{}] client_time={} tz_offset={} ip={} endpoint={}",
        server_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        user_id,
        name,
        reasons,
        claim.client_time,
        claim.tz_offset,
        ip,
        endpoint
    )
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await
}
