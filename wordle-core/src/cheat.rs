use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use wordle_types::TimezoneClaim;

/// No real timezone is more than 14h from UTC, so a client clock further than
/// this from the server clock cannot be honest.
pub const MAX_CLOCK_SKEW_HOURS: f64 = 26.0;
/// Offset changes closer together than this are treated as manipulation.
pub const DRIFT_WINDOW_MINUTES: i64 = 30;
/// Allowed distance between the claimed offset and the IP's timezone.
pub const MAX_GEO_OFFSET_DIFF_MINUTES: i32 = 120;

/// The last timezone event recorded for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousEvent {
    pub server_time: DateTime<Utc>,
    pub tz_offset: i32,
}

/// Timezone resolved from an IP address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTimezone {
    pub timezone: String,
    pub utc_offset_seconds: i32,
}

impl GeoTimezone {
    /// The offset a browser in this zone would report from `getTimezoneOffset`.
    pub fn expected_client_offset(&self) -> i32 {
        -(self.utc_offset_seconds / 60)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheatReason {
    ImpossibleDateDiff {
        hours: f64,
    },
    TimezoneDrift {
        from: i32,
        to: i32,
        elapsed: TimeDelta,
    },
    IpTimezoneMismatch {
        ip: IpAddr,
        geo_tz: String,
        expected_offset: i32,
        got: i32,
    },
}

impl fmt::Display for CheatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheatReason::ImpossibleDateDiff { hours } => {
                write!(f, "impossible_date_diff={:.1}h", hours)
            }
            CheatReason::TimezoneDrift { from, to, elapsed } => {
                write!(f, "tz_drift={}->{}_in_{}", from, to, format_elapsed(*elapsed))
            }
            CheatReason::IpTimezoneMismatch {
                ip,
                geo_tz,
                expected_offset,
                got,
            } => write!(
                f,
                "ip_tz_mismatch: ip={} geo_tz={} expected_offset={} got={}",
                ip, geo_tz, expected_offset, got
            ),
        }
    }
}

/// Render a duration rounded to whole seconds, e.g. `12m5s` or `1h0m30s`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total = elapsed.num_milliseconds();
    let sign = if total < 0 { "-" } else { "" };
    let seconds = (total.abs() + 500) / 1000;
    let (hours, minutes, seconds) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

/// Everything known about one game-affecting request.
#[derive(Debug, Clone)]
pub struct TimezoneEvidence<'a> {
    pub server_time: DateTime<Utc>,
    pub claim: &'a TimezoneClaim,
    pub ip: Option<IpAddr>,
    pub previous: Option<&'a PreviousEvent>,
    pub geo: Option<&'a GeoTimezone>,
}

pub struct CheatDetector;

impl CheatDetector {
    /// Addresses that are never sent to the geolocation service.
    pub fn is_geo_exempt(ip: &IpAddr) -> bool {
        ip.is_loopback() || ip.is_unspecified()
    }

    /// Flags a client clock more than 26 hours away from the server clock.
    /// An unparseable client time yields no signal.
    pub fn check_clock_skew(client_time: &str, server_time: DateTime<Utc>) -> Option<CheatReason> {
        let client_time = DateTime::parse_from_rfc3339(client_time).ok()?;
        let skew = client_time.with_timezone(&Utc) - server_time;
        let hours = (skew.num_milliseconds() as f64 / 3_600_000.0).abs();
        (hours > MAX_CLOCK_SKEW_HOURS).then_some(CheatReason::ImpossibleDateDiff { hours })
    }

    /// Flags an offset change within 30 minutes of the previous event.
    pub fn check_timezone_drift(
        previous: Option<&PreviousEvent>,
        tz_offset: i32,
        server_time: DateTime<Utc>,
    ) -> Option<CheatReason> {
        let previous = previous?;
        let elapsed = server_time - previous.server_time;
        if elapsed < TimeDelta::minutes(DRIFT_WINDOW_MINUTES) && previous.tz_offset != tz_offset {
            Some(CheatReason::TimezoneDrift {
                from: previous.tz_offset,
                to: tz_offset,
                elapsed,
            })
        } else {
            None
        }
    }

    /// Flags a claimed offset more than two hours from the IP's timezone.
    pub fn check_geo_mismatch(ip: IpAddr, geo: &GeoTimezone, tz_offset: i32) -> Option<CheatReason> {
        let expected_offset = geo.expected_client_offset();
        if (tz_offset - expected_offset).abs() > MAX_GEO_OFFSET_DIFF_MINUTES {
            Some(CheatReason::IpTimezoneMismatch {
                ip,
                geo_tz: geo.timezone.clone(),
                expected_offset,
                got: tz_offset,
            })
        } else {
            None
        }
    }

    /// Run every check; an empty result means the event looks legitimate.
    pub fn evaluate(evidence: &TimezoneEvidence) -> Vec<CheatReason> {
        let mut reasons = Vec::new();
        let claim = evidence.claim;

        if let Some(reason) = Self::check_clock_skew(&claim.client_time, evidence.server_time) {
            reasons.push(reason);
        }

        if let Some(reason) =
            Self::check_timezone_drift(evidence.previous, claim.tz_offset, evidence.server_time)
        {
            reasons.push(reason);
        }

        if let (Some(ip), Some(geo)) = (evidence.ip, evidence.geo) {
            if !Self::is_geo_exempt(&ip) {
                if let Some(reason) = Self::check_geo_mismatch(ip, geo, claim.tz_offset) {
                    reasons.push(reason);
                }
            }
        }

        reasons
    }
}
