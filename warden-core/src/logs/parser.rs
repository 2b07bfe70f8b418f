//! Classification of raw admin-log lines into typed events.
//!
//! Every line starts with a bracketed header, `[<elapsed>
//! (<unix_seconds>)]`. The elapsed notation varies (ms, sec, min) and
//! is ignored; the unix-seconds field is authoritative.

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::data::{LogAction, LogEvent, MatchResult, PlayerRef};
use crate::error::RconError;

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\)").expect("timestamp pattern"));

static PRESENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(CONNECTED|DISCONNECTED) (.+) \((\d+)\)").expect("presence pattern")
});

static KILL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^KILL: (.+)\((Axis|Allies)/(\d+)\) -> (.+)\((Axis|Allies)/(\d+)\) with (.+)")
        .expect("kill pattern")
});

static CHAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CHAT\[(Team|Unit)]\[(.*)\((Allies|Axis)/(.*)\)]: (.*)").expect("chat pattern")
});

static MATCH_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MATCH START (.+)").expect("match start pattern"));

static MATCH_ENDED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^MATCH ENDED `(.+)` ALLIED \((\d+) - (\d+)\) AXIS").expect("match ended pattern")
});

/// Parse one raw log line into a typed event.
///
/// Unrecognised bodies yield [`LogAction::Other`] with the raw line
/// retained; a missing or garbled timestamp header is an error.
pub fn parse_log_line(line: &str) -> Result<LogEvent, RconError> {
    let (header, rest) = line
        .split_once("] ")
        .ok_or_else(|| RconError::UnparsableLogLine(line.to_string()))?;

    let seconds: i64 = TIMESTAMP
        .captures(header)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| RconError::UnparsableLogLine(line.to_string()))?;
    let timestamp = Utc
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| RconError::UnparsableLogLine(line.to_string()))?;

    let mut event = LogEvent {
        raw: line.to_string(),
        timestamp,
        ..LogEvent::default()
    };

    if let Some(c) = PRESENCE.captures(rest) {
        event.action = if &c[1] == "CONNECTED" {
            LogAction::Connected
        } else {
            LogAction::Disconnected
        };
        event.actor = PlayerRef {
            name: c[2].to_string(),
            id: c[3].to_string(),
            team: String::new(),
        };
    } else if let Some(c) = KILL.captures(rest) {
        event.action = LogAction::Kill;
        event.actor = PlayerRef {
            name: c[1].to_string(),
            team: c[2].to_lowercase(),
            id: c[3].to_string(),
        };
        event.subject = PlayerRef {
            name: c[4].to_string(),
            team: c[5].to_lowercase(),
            id: c[6].to_string(),
        };
        event.weapon = c[7].to_string();
    } else if let Some(c) = CHAT.captures(rest) {
        event.action = LogAction::Chat;
        event.channel = c[1].to_string();
        event.actor = PlayerRef {
            name: c[2].to_string(),
            team: c[3].to_lowercase(),
            id: c[4].to_string(),
        };
        event.message = c[5].to_string();
    } else if let Some(c) = MATCH_ENDED.captures(rest) {
        event.action = LogAction::MatchEnded;
        event.message = c[1].trim().to_string();
        event.result = Some(MatchResult {
            allied: c[2].parse().unwrap_or(0),
            axis: c[3].parse().unwrap_or(0),
        });
    } else if let Some(c) = MATCH_START.captures(rest) {
        event.action = LogAction::MatchStart;
        event.message = c[1].trim().to_string();
    }

    Ok(event)
}
