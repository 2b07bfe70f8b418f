//! Data types returned by legacy-generation queries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A player currently connected to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerId {
    pub name: String,
    #[serde(rename = "steam_id_64")]
    pub id: String,
}

/// An entry on the server's admin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminId {
    pub name: String,
    #[serde(rename = "steam_id_64")]
    pub id: String,
    pub role: String,
}

/// The squad a player belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u32,
    pub name: String,
}

/// Per-player score breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub combat_effectiveness: u32,
    pub offensive: u32,
    pub defensive: u32,
    pub support: u32,
}

/// Everything `playerinfo <name>` reports about one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    #[serde(rename = "steam_id_64")]
    pub id: String,
    pub team: String,
    pub role: String,
    pub loadout: String,
    pub unit: Unit,
    pub kills: u32,
    pub deaths: u32,
    pub score: Score,
    pub level: u32,
}

/// Connected players per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    pub axis: u32,
    pub allies: u32,
}

/// Current round score per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub axis: u32,
    pub allies: u32,
}

/// State of the round currently played on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub players: PlayerCount,
    pub score: GameScore,
    #[serde(with = "remaining_seconds")]
    pub remaining_time: Duration,
    pub map: String,
    pub next_map: String,
}

mod remaining_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
