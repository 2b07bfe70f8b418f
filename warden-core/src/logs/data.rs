//! Structured admin-log events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of event a log line describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    Connected,
    Disconnected,
    Kill,
    Chat,
    MatchStart,
    MatchEnded,
    /// Unrecognised line; the raw text is all there is.
    #[default]
    Other,
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogAction::Connected => "CONNECTED",
            LogAction::Disconnected => "DISCONNECTED",
            LogAction::Kill => "KILL",
            LogAction::Chat => "CHAT",
            LogAction::MatchStart => "MATCH START",
            LogAction::MatchEnded => "MATCH ENDED",
            LogAction::Other => "",
        };
        f.write_str(s)
    }
}

/// A player as referenced by a log line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub name: String,
    pub id: String,
    /// Lowercased side (`axis`/`allies`); empty when the line does
    /// not carry one.
    pub team: String,
}

/// Final score of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub allied: u32,
    pub axis: u32,
}

/// One classified admin-log line. Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// The line as received, untouched.
    pub raw: String,
    /// Event time from the unix-seconds field of the header.
    pub timestamp: DateTime<Utc>,
    pub action: LogAction,
    pub actor: PlayerRef,
    pub subject: PlayerRef,
    /// KILL only.
    pub weapon: String,
    /// CHAT text, or the map-and-mode of match events.
    pub message: String,
    /// MATCH ENDED only.
    pub result: Option<MatchResult>,
    /// CHAT scope: `Team` or `Unit`.
    pub channel: String,
}
