//! Typed commands of the versioned protocol and their response
//! payloads.
//!
//! A command body knows its wire name and serializes to the JSON the
//! server expects (PascalCase keys on requests; the server's own
//! mixed-case keys on responses). Bodies that are a bare string go on
//! the wire as the string value itself.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RconError;

/// A request body with a fixed wire command name.
pub trait Command: Serialize {
    const NAME: &'static str;

    /// Client-side validation before any bytes are written.
    fn validate(&self) -> Result<(), RconError> {
        Ok(())
    }
}

// ── Server information ───────────────────────────────────────────

/// Sub-queries of the `ServerInformation` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerInformationName {
    #[serde(rename = "players")]
    Players,
    #[serde(rename = "player")]
    Player,
    #[serde(rename = "maprotation")]
    MapRotation,
    #[serde(rename = "mapsequence")]
    MapSequence,
    #[serde(rename = "session")]
    Session,
    #[serde(rename = "serverconfig")]
    ServerConfig,
}

impl ServerInformationName {
    /// Sub-queries that are meaningless without a value.
    fn requires_value(self) -> bool {
        matches!(self, ServerInformationName::Player)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInformation {
    #[serde(rename = "Name")]
    pub name: ServerInformationName,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Command for ServerInformation {
    const NAME: &'static str = "ServerInformation";

    fn validate(&self) -> Result<(), RconError> {
        if self.name.requires_value() && self.value.is_empty() {
            return Err(RconError::MissingValue("player information query"));
        }
        Ok(())
    }
}

// ── Map management ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeMap {
    pub map_name: String,
}

impl Command for ChangeMap {
    const NAME: &'static str = "ChangeMap";
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetSectorLayout {
    pub sector_one: String,
    pub sector_two: String,
    pub sector_three: String,
    pub sector_four: String,
    pub sector_five: String,
}

impl SetSectorLayout {
    /// Fill the named sector slots from a list, front to back.
    pub fn from_sectors(sectors: &[String]) -> Self {
        let mut layout = Self::default();
        let slots = [
            &mut layout.sector_one,
            &mut layout.sector_two,
            &mut layout.sector_three,
            &mut layout.sector_four,
            &mut layout.sector_five,
        ];
        for (slot, sector) in slots.into_iter().zip(sectors) {
            *slot = sector.clone();
        }
        layout
    }
}

impl Command for SetSectorLayout {
    const NAME: &'static str = "SetSectorLayout";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddMapToRotation {
    pub map_name: String,
    pub index: i32,
}

impl Command for AddMapToRotation {
    const NAME: &'static str = "AddMapToRotation";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveMapFromRotation {
    pub index: i32,
}

impl Command for RemoveMapFromRotation {
    const NAME: &'static str = "RemoveMapFromRotation";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddMapToSequence {
    pub map_name: String,
    pub index: i32,
}

impl Command for AddMapToSequence {
    const NAME: &'static str = "AddMapToSequence";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveMapFromSequence {
    pub index: i32,
}

impl Command for RemoveMapFromSequence {
    const NAME: &'static str = "RemoveMapFromSequence";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MoveMapInSequence {
    pub current_index: i32,
    pub new_index: i32,
}

impl Command for MoveMapInSequence {
    const NAME: &'static str = "MoveMapInSequence";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetShuffleMapSequence {
    pub enable: bool,
}

impl Command for SetShuffleMapSequence {
    const NAME: &'static str = "SetShuffleMapSequence";
}

// ── Moderation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessagePlayer {
    pub message: String,
    pub player_id: String,
}

impl Command for MessagePlayer {
    const NAME: &'static str = "MessagePlayer";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PunishPlayer {
    pub reason: String,
    pub player_id: String,
}

impl Command for PunishPlayer {
    const NAME: &'static str = "PunishPlayer";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KickPlayer {
    pub reason: String,
    pub player_id: String,
}

impl Command for KickPlayer {
    const NAME: &'static str = "KickPlayer";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemporaryBanPlayer {
    pub reason: String,
    pub player_id: String,
    /// Ban duration in hours.
    pub duration: i32,
    pub admin_name: String,
}

impl Command for TemporaryBanPlayer {
    const NAME: &'static str = "TemporaryBanPlayer";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveTemporaryBan {
    pub player_id: String,
}

impl Command for RemoveTemporaryBan {
    const NAME: &'static str = "RemoveTemporaryBan";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermanentBanPlayer {
    pub reason: String,
    pub player_id: String,
    pub admin_name: String,
}

impl Command for PermanentBanPlayer {
    const NAME: &'static str = "PermanentBanPlayer";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemovePermanentBan {
    pub player_id: String,
}

impl Command for RemovePermanentBan {
    const NAME: &'static str = "RemovePermanentBan";
}

/// When a forced team switch takes effect. Goes on the wire as the
/// numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    OnDeath = 0,
    Immediately = 1,
}

impl Serialize for ForceMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForceTeamSwitch {
    pub force_mode: ForceMode,
    pub player_id: String,
}

impl Command for ForceTeamSwitch {
    const NAME: &'static str = "ForceTeamSwitch";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddAdmin {
    pub player_id: String,
    pub admin_group: String,
    pub comment: String,
}

impl Command for AddAdmin {
    const NAME: &'static str = "AddAdmin";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveAdmin {
    pub player_id: String,
}

impl Command for RemoveAdmin {
    const NAME: &'static str = "RemoveAdmin";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddVip {
    pub player_id: String,
    pub description: String,
}

impl Command for AddVip {
    const NAME: &'static str = "AddVip";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveVip {
    pub player_id: String,
}

impl Command for RemoveVip {
    const NAME: &'static str = "RemoveVip";
}

// ── Banned words ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GetBannedWords {}

impl Command for GetBannedWords {
    const NAME: &'static str = "GetBannedWords";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddBannedWords {
    /// Comma-separated list of words.
    pub banned_words: String,
}

impl Command for AddBannedWords {
    const NAME: &'static str = "AddBannedWords";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveBannedWords {
    pub banned_words: String,
}

impl Command for RemoveBannedWords {
    const NAME: &'static str = "RemoveBannedWords";
}

// ── Server tuning ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetAutoBalance {
    pub enable_auto_balance: bool,
}

impl Command for SetAutoBalance {
    const NAME: &'static str = "SetAutoBalance";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetAutoBalanceThreshold {
    pub auto_balance_threshold: i32,
}

impl Command for SetAutoBalanceThreshold {
    const NAME: &'static str = "SetAutoBalanceThreshold";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetVoteKick {
    pub enabled: bool,
}

impl Command for SetVoteKick {
    const NAME: &'static str = "SetVoteKick";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetVoteKickThreshold {
    /// Pairs of `player-count,vote-count`, e.g. `"0,10"`.
    pub threshold_value: String,
}

impl Command for SetVoteKickThreshold {
    const NAME: &'static str = "SetVoteKickThreshold";
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetKickThreshold {}

impl Command for ResetKickThreshold {
    const NAME: &'static str = "ResetKickThreshold";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetTeamSwitchCooldown {
    pub team_switch_timer: i32,
}

impl Command for SetTeamSwitchCooldown {
    const NAME: &'static str = "SetTeamSwitchCooldown";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetMaxQueuedPlayers {
    pub max_queued_players: i32,
}

impl Command for SetMaxQueuedPlayers {
    const NAME: &'static str = "SetMaxQueuedPlayers";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetIdleKickDuration {
    pub idle_timeout_minutes: i32,
}

impl Command for SetIdleKickDuration {
    const NAME: &'static str = "SetIdleKickDuration";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetHighPingThreshold {
    pub high_ping_threshold_ms: i32,
}

impl Command for SetHighPingThreshold {
    const NAME: &'static str = "SetHighPingThreshold";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetWelcomeMessage {
    pub message: String,
}

impl Command for SetWelcomeMessage {
    const NAME: &'static str = "SetWelcomeMessage";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetVipSlotCount {
    pub vip_slot_count: i32,
}

impl Command for SetVipSlotCount {
    const NAME: &'static str = "SetVipSlotCount";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendServerMessage {
    pub message: String,
}

impl Command for SendServerMessage {
    const NAME: &'static str = "SendServerMessage";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerBroadcast {
    pub message: String,
}

impl Command for ServerBroadcast {
    const NAME: &'static str = "ServerBroadcast";
}

// ── Introspection ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GetDisplayableCommands {}

impl Command for GetDisplayableCommands {
    const NAME: &'static str = "GetDisplayableCommands";
}

/// Bare-string body: the command to describe.
#[derive(Debug, Clone, Serialize)]
pub struct GetClientReferenceData(pub String);

impl Command for GetClientReferenceData {
    const NAME: &'static str = "GetClientReferenceData";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAdminLog {
    /// How far back to look, in seconds.
    pub log_back_track_time: i32,
    /// Substring filter; empty means everything.
    pub filters: String,
}

impl Command for GetAdminLog {
    const NAME: &'static str = "GetAdminLog";
}

#[derive(Debug, Clone, Serialize)]
pub struct GetAdminUsers {}

impl Command for GetAdminUsers {
    const NAME: &'static str = "GetAdminUsers";
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTemporaryBans {}

impl Command for GetTemporaryBans {
    const NAME: &'static str = "GetTemporaryBans";
}

#[derive(Debug, Clone, Serialize)]
pub struct GetPermanentBans {}

impl Command for GetPermanentBans {
    const NAME: &'static str = "GetPermanentBans";
}

// ── Response payloads ────────────────────────────────────────────

pub type PlayerPlatform = String;

/// Numeric team codes as the server reports them.
pub mod player_team {
    pub const GER: i32 = 0;
    pub const US: i32 = 1;
    pub const RUS: i32 = 2;
    pub const GB: i32 = 3;
    pub const DAK: i32 = 4;
    pub const B8A: i32 = 5;
}

/// Numeric role codes as the server reports them.
pub mod player_role {
    pub const RIFLEMAN: i32 = 0;
    pub const ASSAULT: i32 = 1;
    pub const AUTOMATIC_RIFLEMAN: i32 = 2;
    pub const MEDIC: i32 = 3;
    pub const SPOTTER: i32 = 4;
    pub const SUPPORT: i32 = 5;
    pub const HEAVY_MACHINE_GUNNER: i32 = 6;
    pub const ANTI_TANK: i32 = 7;
    pub const ENGINEER: i32 = 8;
    pub const OFFICER: i32 = 9;
    pub const SNIPER: i32 = 10;
    pub const CREWMAN: i32 = 11;
    pub const TANK_COMMANDER: i32 = 12;
    pub const ARMY_COMMANDER: i32 = 13;
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayersResponse {
    #[serde(rename = "players")]
    pub players: Vec<PlayerData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerData {
    #[serde(rename = "iD")]
    pub id: String,
    #[serde(rename = "platform", default)]
    pub platform: PlayerPlatform,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "clanTag", default)]
    pub clan_tag: String,
    #[serde(rename = "eOSID", default)]
    pub eos_id: String,
    #[serde(rename = "level", default)]
    pub level: i32,
    #[serde(rename = "team", default)]
    pub team: i32,
    #[serde(rename = "role", default)]
    pub role: i32,
    #[serde(rename = "platoon", default)]
    pub squad: String,
    #[serde(rename = "loadout", default)]
    pub loadout: String,
    #[serde(rename = "kills", default)]
    pub kills: i32,
    #[serde(rename = "deaths", default)]
    pub deaths: i32,
    #[serde(rename = "scoreData", default)]
    pub score: ScoreData,
    #[serde(rename = "worldPosition", default)]
    pub position: WorldPosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ScoreData {
    #[serde(rename = "cOMBAT", default)]
    pub combat: i32,
    #[serde(rename = "offense", default)]
    pub offensive: i32,
    #[serde(rename = "defense", default)]
    pub defensive: i32,
    #[serde(rename = "support", default)]
    pub support: i32,
}

/// A position in the game world, in Unreal centimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct WorldPosition {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Straight-line distance between two world positions.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(pub f64);

impl Distance {
    pub fn meters(self) -> f64 {
        self.0 / 100.0
    }
}

impl std::ops::Add for Distance {
    type Output = Distance;

    fn add(self, other: Distance) -> Distance {
        Distance(self.0 + other.0)
    }
}

impl WorldPosition {
    /// The origin means the player is not on the map (spawn screen,
    /// team selection).
    pub fn is_spawned(&self) -> bool {
        (self.x + self.y + self.z) != 0.0
    }

    /// Distance to another position as travelled in a straight line,
    /// ignoring obstacles.
    pub fn distance(&self, other: &WorldPosition) -> Distance {
        Distance(
            ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
                .sqrt(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    #[serde(rename = "serverName")]
    pub server_name: String,
    #[serde(rename = "mapName", default)]
    pub map_name: String,
    #[serde(rename = "gameMode", default)]
    pub game_mode: String,
    #[serde(rename = "maxPlayerCount", default)]
    pub max_player_count: i32,
    #[serde(rename = "playerCount", default)]
    pub player_count: i32,
    #[serde(rename = "maxQueueCount", default)]
    pub max_queue_count: i32,
    #[serde(rename = "queueCount", default)]
    pub queue_count: i32,
    #[serde(rename = "maxVIPQueueCount", default)]
    pub max_vip_queue_count: i32,
    #[serde(rename = "vIPQueueCount", default)]
    pub vip_queue_count: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfigResponse {
    #[serde(rename = "serverName")]
    pub server_name: String,
    #[serde(rename = "buildNumber", default)]
    pub build: String,
    #[serde(rename = "buildRevision", default)]
    pub build_revision: String,
    #[serde(rename = "supportedPlatforms", default)]
    pub supported_platforms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapRotationResponse {
    #[serde(rename = "mAPS")]
    pub maps: Vec<MapEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSequenceResponse {
    #[serde(rename = "mAPS")]
    pub maps: Vec<MapEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapEntry {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "gameMode", default)]
    pub game_mode: String,
    #[serde(rename = "timeOfDay", default)]
    pub time_of_day: String,
    #[serde(rename = "iD", default)]
    pub id: String,
    #[serde(rename = "position", default)]
    pub position: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BanListResponse {
    #[serde(rename = "banList")]
    pub ban_list: Vec<BanListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BanListEntry {
    #[serde(rename = "userId")]
    pub id: String,
    #[serde(rename = "userName", default)]
    pub name: String,
    #[serde(rename = "timeOfBanning")]
    pub banned: DateTime<Utc>,
    #[serde(rename = "durationHours", default)]
    pub duration_hours: i32,
    #[serde(rename = "banReason", default)]
    pub reason: String,
    #[serde(rename = "adminName", default)]
    pub admin_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminUsersResponse {
    #[serde(rename = "AdminUsers")]
    pub admin_users: Vec<AdminUserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserEntry {
    #[serde(rename = "userId")]
    pub id: String,
    #[serde(rename = "group", default)]
    pub group: String,
    #[serde(rename = "comment", default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayableCommandsResponse {
    #[serde(rename = "entries")]
    pub entries: Vec<DisplayableCommandEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayableCommandEntry {
    #[serde(rename = "iD")]
    pub id: String,
    #[serde(rename = "friendlyName", default)]
    pub friendly_name: String,
    #[serde(rename = "isClientSupported", default)]
    pub is_client_supported: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannedWordsResponse {
    #[serde(rename = "bannedWords", default)]
    pub banned_words: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogResponse {
    #[serde(rename = "entries")]
    pub entries: Vec<AdminLogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogEntry {
    /// When the server recorded the entry, as
    /// `YYYY.MM.DD-HH:MM:SS:mmm`.
    #[serde(rename = "timestamp")]
    pub timestamp: String,
    #[serde(rename = "message", default)]
    pub message: String,
}

impl AdminLogEntry {
    /// The server-side receive time of this entry.
    pub fn received_time(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y.%m.%d-%H:%M:%S:%3f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// The event time embedded in the message's bracketed header,
    /// when the message carries one.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        crate::logs::parse_log_line(&self.message)
            .ok()
            .map(|event| event.timestamp)
    }
}
