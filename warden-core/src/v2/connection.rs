//! A loanable handle over one versioned session, exposing the typed
//! command surface.
//!
//! Not safe for concurrent callers — responses correlate to the
//! socket's most recent request, so interleaving two commands on one
//! connection mixes up replies. The pool enforces exclusivity.

use serde::de::DeserializeOwned;

use super::commands::*;
use super::socket::{decode_body, Socket};
use crate::deadline::Deadline;
use crate::error::RconError;
use crate::pool::{connection_id, Pooled};

/// A persistent, authenticated versioned-generation connection.
pub struct Connection {
    id: u64,
    socket: Socket,
}

impl Connection {
    /// Connect and run the greet → login handshake.
    pub async fn open(
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Result<Self, RconError> {
        Ok(Self {
            id: connection_id(),
            socket: Socket::open(host, port, password).await?,
        })
    }

    /// The auth token issued at login. Mostly useful to tests.
    pub fn auth_token(&self) -> &str {
        self.socket.auth_token()
    }

    /// Issue a command and decode the nested-JSON response body.
    async fn request<T: Command, U: DeserializeOwned>(&mut self, body: T) -> Result<U, RconError> {
        let res = self.checked(body).await?;
        decode_body(&res)
    }

    /// Issue a command and return the response body as plain text.
    async fn request_text<T: Command>(&mut self, body: T) -> Result<String, RconError> {
        Ok(self.checked(body).await?.content_body)
    }

    /// Issue a command whose response carries no body of interest.
    async fn exec<T: Command>(&mut self, body: T) -> Result<(), RconError> {
        self.checked(body).await.map(|_| ())
    }

    async fn checked<T: Command>(
        &mut self,
        body: T,
    ) -> Result<super::framing::RawResponse, RconError> {
        let res = self.socket.request(&body).await?;
        if res.status_code != 200 {
            return Err(RconError::UnexpectedStatus {
                code: res.status_code,
                message: res.status_message,
            });
        }
        Ok(res)
    }

    // ── Server information ───────────────────────────────────────

    pub async fn players(&mut self) -> Result<PlayersResponse, RconError> {
        self.request(ServerInformation {
            name: ServerInformationName::Players,
            value: String::new(),
        })
        .await
    }

    pub async fn player(&mut self, player_id: &str) -> Result<PlayerData, RconError> {
        self.request(ServerInformation {
            name: ServerInformationName::Player,
            value: player_id.to_string(),
        })
        .await
    }

    pub async fn session_info(&mut self) -> Result<SessionResponse, RconError> {
        self.request(ServerInformation {
            name: ServerInformationName::Session,
            value: String::new(),
        })
        .await
    }

    pub async fn server_config(&mut self) -> Result<ServerConfigResponse, RconError> {
        self.request(ServerInformation {
            name: ServerInformationName::ServerConfig,
            value: String::new(),
        })
        .await
    }

    pub async fn map_rotation(&mut self) -> Result<MapRotationResponse, RconError> {
        self.request(ServerInformation {
            name: ServerInformationName::MapRotation,
            value: String::new(),
        })
        .await
    }

    pub async fn map_sequence(&mut self) -> Result<MapSequenceResponse, RconError> {
        self.request(ServerInformation {
            name: ServerInformationName::MapSequence,
            value: String::new(),
        })
        .await
    }

    // ── Maps ─────────────────────────────────────────────────────

    pub async fn change_map(&mut self, map_name: &str) -> Result<(), RconError> {
        self.exec(ChangeMap {
            map_name: map_name.to_string(),
        })
        .await
    }

    pub async fn set_sector_layout(&mut self, sectors: &[String]) -> Result<(), RconError> {
        self.exec(SetSectorLayout::from_sectors(sectors)).await
    }

    pub async fn add_map_to_rotation(
        &mut self,
        map_name: &str,
        index: i32,
    ) -> Result<(), RconError> {
        self.exec(AddMapToRotation {
            map_name: map_name.to_string(),
            index,
        })
        .await
    }

    pub async fn remove_map_from_rotation(&mut self, index: i32) -> Result<(), RconError> {
        self.exec(RemoveMapFromRotation { index }).await
    }

    pub async fn add_map_to_sequence(
        &mut self,
        map_name: &str,
        index: i32,
    ) -> Result<(), RconError> {
        self.exec(AddMapToSequence {
            map_name: map_name.to_string(),
            index,
        })
        .await
    }

    pub async fn remove_map_from_sequence(&mut self, index: i32) -> Result<(), RconError> {
        self.exec(RemoveMapFromSequence { index }).await
    }

    pub async fn move_map_in_sequence(
        &mut self,
        current_index: i32,
        new_index: i32,
    ) -> Result<(), RconError> {
        self.exec(MoveMapInSequence {
            current_index,
            new_index,
        })
        .await
    }

    pub async fn set_shuffle_map_sequence(&mut self, enable: bool) -> Result<(), RconError> {
        self.exec(SetShuffleMapSequence { enable }).await
    }

    // ── Moderation ───────────────────────────────────────────────

    pub async fn message_player(&mut self, player_id: &str, message: &str) -> Result<(), RconError> {
        self.exec(MessagePlayer {
            message: message.to_string(),
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn punish_player(&mut self, player_id: &str, reason: &str) -> Result<(), RconError> {
        self.exec(PunishPlayer {
            reason: reason.to_string(),
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn kick_player(&mut self, player_id: &str, reason: &str) -> Result<(), RconError> {
        self.exec(KickPlayer {
            reason: reason.to_string(),
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn temporary_ban_player(
        &mut self,
        player_id: &str,
        duration_hours: i32,
        reason: &str,
        admin_name: &str,
    ) -> Result<(), RconError> {
        self.exec(TemporaryBanPlayer {
            reason: reason.to_string(),
            player_id: player_id.to_string(),
            duration: duration_hours,
            admin_name: admin_name.to_string(),
        })
        .await
    }

    pub async fn remove_temporary_ban(&mut self, player_id: &str) -> Result<(), RconError> {
        self.exec(RemoveTemporaryBan {
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn permanent_ban_player(
        &mut self,
        player_id: &str,
        reason: &str,
        admin_name: &str,
    ) -> Result<(), RconError> {
        self.exec(PermanentBanPlayer {
            reason: reason.to_string(),
            player_id: player_id.to_string(),
            admin_name: admin_name.to_string(),
        })
        .await
    }

    pub async fn remove_permanent_ban(&mut self, player_id: &str) -> Result<(), RconError> {
        self.exec(RemovePermanentBan {
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn force_team_switch(
        &mut self,
        player_id: &str,
        mode: ForceMode,
    ) -> Result<(), RconError> {
        self.exec(ForceTeamSwitch {
            force_mode: mode,
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn add_admin(
        &mut self,
        player_id: &str,
        admin_group: &str,
        comment: &str,
    ) -> Result<(), RconError> {
        self.exec(AddAdmin {
            player_id: player_id.to_string(),
            admin_group: admin_group.to_string(),
            comment: comment.to_string(),
        })
        .await
    }

    pub async fn remove_admin(&mut self, player_id: &str) -> Result<(), RconError> {
        self.exec(RemoveAdmin {
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn add_vip(&mut self, player_id: &str, description: &str) -> Result<(), RconError> {
        self.exec(AddVip {
            player_id: player_id.to_string(),
            description: description.to_string(),
        })
        .await
    }

    pub async fn remove_vip(&mut self, player_id: &str) -> Result<(), RconError> {
        self.exec(RemoveVip {
            player_id: player_id.to_string(),
        })
        .await
    }

    // ── Banned words ─────────────────────────────────────────────

    pub async fn banned_words(&mut self) -> Result<BannedWordsResponse, RconError> {
        self.request(GetBannedWords {}).await
    }

    pub async fn add_banned_words(&mut self, words: &str) -> Result<(), RconError> {
        self.exec(AddBannedWords {
            banned_words: words.to_string(),
        })
        .await
    }

    pub async fn remove_banned_words(&mut self, words: &str) -> Result<(), RconError> {
        self.exec(RemoveBannedWords {
            banned_words: words.to_string(),
        })
        .await
    }

    // ── Server tuning ────────────────────────────────────────────

    pub async fn set_auto_balance(&mut self, enable: bool) -> Result<(), RconError> {
        self.exec(SetAutoBalance {
            enable_auto_balance: enable,
        })
        .await
    }

    pub async fn set_auto_balance_threshold(&mut self, threshold: i32) -> Result<(), RconError> {
        self.exec(SetAutoBalanceThreshold {
            auto_balance_threshold: threshold,
        })
        .await
    }

    pub async fn set_vote_kick(&mut self, enabled: bool) -> Result<(), RconError> {
        self.exec(SetVoteKick { enabled }).await
    }

    pub async fn set_vote_kick_threshold(&mut self, threshold: &str) -> Result<(), RconError> {
        self.exec(SetVoteKickThreshold {
            threshold_value: threshold.to_string(),
        })
        .await
    }

    pub async fn reset_kick_threshold(&mut self) -> Result<(), RconError> {
        self.exec(ResetKickThreshold {}).await
    }

    pub async fn set_team_switch_cooldown(&mut self, minutes: i32) -> Result<(), RconError> {
        self.exec(SetTeamSwitchCooldown {
            team_switch_timer: minutes,
        })
        .await
    }

    pub async fn set_max_queued_players(&mut self, max: i32) -> Result<(), RconError> {
        self.exec(SetMaxQueuedPlayers {
            max_queued_players: max,
        })
        .await
    }

    pub async fn set_idle_kick_duration(&mut self, minutes: i32) -> Result<(), RconError> {
        self.exec(SetIdleKickDuration {
            idle_timeout_minutes: minutes,
        })
        .await
    }

    pub async fn set_high_ping_threshold(&mut self, ms: i32) -> Result<(), RconError> {
        self.exec(SetHighPingThreshold {
            high_ping_threshold_ms: ms,
        })
        .await
    }

    pub async fn set_welcome_message(&mut self, message: &str) -> Result<(), RconError> {
        self.exec(SetWelcomeMessage {
            message: message.to_string(),
        })
        .await
    }

    pub async fn set_vip_slot_count(&mut self, count: i32) -> Result<(), RconError> {
        self.exec(SetVipSlotCount {
            vip_slot_count: count,
        })
        .await
    }

    pub async fn send_server_message(&mut self, message: &str) -> Result<(), RconError> {
        self.exec(SendServerMessage {
            message: message.to_string(),
        })
        .await
    }

    pub async fn server_broadcast(&mut self, message: &str) -> Result<(), RconError> {
        self.exec(ServerBroadcast {
            message: message.to_string(),
        })
        .await
    }

    // ── Introspection ────────────────────────────────────────────

    pub async fn displayable_commands(&mut self) -> Result<DisplayableCommandsResponse, RconError> {
        self.request(GetDisplayableCommands {}).await
    }

    /// Reference data describing one command; the response is plain
    /// text, not nested JSON.
    pub async fn client_reference_data(&mut self, command: &str) -> Result<String, RconError> {
        self.request_text(GetClientReferenceData(command.to_string()))
            .await
    }

    pub async fn admin_log(
        &mut self,
        seconds_back: i32,
        filter: &str,
    ) -> Result<AdminLogResponse, RconError> {
        self.request(GetAdminLog {
            log_back_track_time: seconds_back,
            filters: filter.to_string(),
        })
        .await
    }

    pub async fn admin_users(&mut self) -> Result<AdminUsersResponse, RconError> {
        self.request(GetAdminUsers {}).await
    }

    pub async fn temporary_bans(&mut self) -> Result<BanListResponse, RconError> {
        self.request(GetTemporaryBans {}).await
    }

    pub async fn permanent_bans(&mut self) -> Result<BanListResponse, RconError> {
        self.request(GetPermanentBans {}).await
    }
}

impl Pooled for Connection {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_deadline(&mut self, deadline: Deadline) {
        self.socket.set_deadline(deadline);
    }
}
