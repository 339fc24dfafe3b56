//! User record and mute state

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Stored mute value meaning "muted with no expiry"
pub const PERMANENT_MUTE: &str = "permanent";

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub verified: bool,
    pub email: String,
    /// Raw mute value: "", [`PERMANENT_MUTE`], or an RFC 3339 unmute time
    pub mute: String,
    pub post_nudge_shown: bool,
}

impl User {
    /// Decode the raw mute value
    pub fn mute_state(&self) -> Result<MuteState, chrono::ParseError> {
        MuteState::parse(&self.mute)
    }
}

/// Decoded mute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteState {
    Unmuted,
    Permanent,
    Until(DateTime<Utc>),
}

impl MuteState {
    pub fn parse(raw: &str) -> Result<Self, chrono::ParseError> {
        match raw {
            "" => Ok(MuteState::Unmuted),
            PERMANENT_MUTE => Ok(MuteState::Permanent),
            other => Ok(MuteState::Until(
                DateTime::parse_from_rfc3339(other)?.with_timezone(&Utc),
            )),
        }
    }

    /// Storage form of this state
    pub fn to_stored(self) -> String {
        match self {
            MuteState::Unmuted => String::new(),
            MuteState::Permanent => PERMANENT_MUTE.to_string(),
            MuteState::Until(t) => t.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// The active mute at `now`, if any
    pub fn status_at(self, now: DateTime<Utc>) -> Option<MuteStatus> {
        match self {
            MuteState::Unmuted => None,
            MuteState::Permanent => Some(MuteStatus::Permanent),
            MuteState::Until(until) => {
                let remaining = (until - now).to_std().ok()?;
                if remaining.is_zero() {
                    return None;
                }
                Some(MuteStatus::Temporary { until, remaining })
            }
        }
    }
}

/// An active mute, as shown to the muted user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteStatus {
    Permanent,
    Temporary {
        until: DateTime<Utc>,
        remaining: Duration,
    },
}

impl MuteStatus {
    pub fn is_permanent(&self) -> bool {
        matches!(self, MuteStatus::Permanent)
    }

    /// Time left; `None` for permanent mutes
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            MuteStatus::Permanent => None,
            MuteStatus::Temporary { remaining, .. } => Some(*remaining),
        }
    }
}

impl fmt::Display for MuteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuteStatus::Permanent => f.write_str("permanently muted"),
            MuteStatus::Temporary { remaining, .. } => {
                write!(f, "temporarily muted ({})", format_duration(*remaining))
            }
        }
    }
}

/// Human-readable duration such as "4 weeks 2 days" or "1 minute"
///
/// Zero units are omitted; sub-second precision is dropped.
pub fn format_duration(d: Duration) -> String {
    const UNITS: [(&str, u64); 5] = [
        ("week", 7 * 24 * 3600),
        ("day", 24 * 3600),
        ("hour", 3600),
        ("minute", 60),
        ("second", 1),
    ];

    let mut secs = d.as_secs();
    if secs == 0 {
        return "0 seconds".to_string();
    }

    let mut parts = Vec::new();
    for (name, size) in UNITS {
        let n = secs / size;
        secs %= size;
        if n > 0 {
            let plural = if n == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", n, name, plural));
        }
    }
    parts.join(" ")
}
