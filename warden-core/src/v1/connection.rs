//! A loanable handle over one legacy session, with typed command
//! methods on top of the raw command/list-command primitives.
//!
//! A `Connection` is not safe for concurrent callers. Running two
//! commands at once mixes up responses; hold one connection per
//! worker and let the pool enforce exclusivity.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::data::{
    AdminId, GameScore, GameState, PlayerCount, PlayerId, PlayerInfo, Score, Unit,
};
use super::maps::MapFilter;
use super::socket::Socket;
use crate::deadline::Deadline;
use crate::error::RconError;
use crate::pool::Pooled;

/// Header that starts every log entry: `[<elapsed> (<unix_seconds>)]`.
/// Used as a delimiter so multi-line entries stay joined.
static LOG_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[.+? \(\d+\)\]").expect("log header pattern"));

/// Deadline for follow-up reads of an open-ended response. The server
/// sends nothing to mark the end; a quiet stream for this long is it.
const CONTINUE_READ_DEADLINE: Duration = Duration::from_millis(50);

/// A persistent, authenticated legacy-generation connection.
pub struct Connection {
    id: u64,
    socket: Socket,
}

impl Connection {
    /// Connect and authenticate a fresh session.
    pub async fn open(
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Result<Self, RconError> {
        Ok(Self {
            id: crate::pool::connection_id(),
            socket: Socket::open(host, port, password).await?,
        })
    }

    /// Execute a raw command and return the reply as plain text.
    pub async fn command(&mut self, cmd: &str) -> Result<String, RconError> {
        self.socket.command(cmd).await
    }

    /// Execute a raw command whose reply is a tab-delimited list.
    pub async fn list_command(&mut self, cmd: &str) -> Result<Vec<String>, RconError> {
        self.socket.list_command(cmd).await
    }

    /// Fetch raw log entries covering the given window.
    ///
    /// `showlog` responses have no length indication and can span
    /// many frames. After the initial reply, further frames are read
    /// with a short dedicated deadline; once the stream stays quiet
    /// the accumulated text is split into entries at the bracketed
    /// timestamp headers, with in-entry newlines normalised to
    /// spaces.
    pub async fn show_log(&mut self, window: Duration) -> Result<Vec<String>, RconError> {
        let minutes = (window.as_secs() / 60).max(1);
        let mut text = self.socket.command(&format!("showlog {minutes}")).await?;
        // The server has no entries for the window.
        if text == "EMPTY" {
            return Ok(Vec::new());
        }
        loop {
            match self.continue_read().await {
                Ok(next) => text.push_str(&String::from_utf8(next)?),
                Err(e) if e.is_io_timeout() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(split_log_entries(&text))
    }

    /// One follow-up read under the short continue deadline, restoring
    /// the caller's deadline afterwards.
    async fn continue_read(&mut self) -> Result<Vec<u8>, RconError> {
        let caller = self.socket.deadline();
        self.socket
            .set_deadline(Deadline::after(CONTINUE_READ_DEADLINE));
        let res = self.socket.read().await;
        self.socket.set_deadline(caller);
        res
    }

    // ── Players ──────────────────────────────────────────────────

    /// Players currently connected, from `get playerids`.
    pub async fn player_ids(&mut self) -> Result<Vec<PlayerId>, RconError> {
        let entries = self.list_command("get playerids").await?;
        entries
            .iter()
            .map(|entry| {
                let (name, id) = entry
                    .rsplit_once(" : ")
                    .ok_or(RconError::ProtocolViolation("malformed playerids entry"))?;
                Ok(PlayerId {
                    name: name.to_string(),
                    id: id.to_string(),
                })
            })
            .collect()
    }

    /// Detailed information about one connected player.
    pub async fn player_info(&mut self, name: &str) -> Result<PlayerInfo, RconError> {
        let reply = self.command(&format!("playerinfo {name}")).await?;
        parse_player_info(&reply)
    }

    /// Send a direct message to a player by id. The message may span
    /// multiple lines.
    pub async fn message_player(&mut self, id: &str, message: &str) -> Result<(), RconError> {
        self.command(&format!("message {id} {message}")).await?;
        Ok(())
    }

    // ── Admins ───────────────────────────────────────────────────

    /// The server's admin list.
    pub async fn admin_ids(&mut self) -> Result<Vec<AdminId>, RconError> {
        let entries = self.list_command("get adminids").await?;
        entries
            .iter()
            .map(|entry| {
                let mut parts = entry.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(id), Some(role), Some(name)) => Ok(AdminId {
                        id: id.to_string(),
                        role: role.to_string(),
                        name: name.replace('"', ""),
                    }),
                    _ => Err(RconError::ProtocolViolation("malformed adminids entry")),
                }
            })
            .collect()
    }

    /// Roles available for [`add_admin`](Self::add_admin).
    pub async fn admin_groups(&mut self) -> Result<Vec<String>, RconError> {
        self.list_command("get admingroups").await
    }

    /// Add a player to the admin list with the given role.
    pub async fn add_admin(&mut self, admin: &AdminId) -> Result<(), RconError> {
        self.command(&format!("adminadd {} {} {}", admin.id, admin.role, admin.name))
            .await?;
        Ok(())
    }

    /// Remove a player from the admin list.
    pub async fn delete_admin(&mut self, id: &str) -> Result<(), RconError> {
        self.command(&format!("admindel {id}")).await?;
        Ok(())
    }

    // ── Server state ─────────────────────────────────────────────

    /// The configured server name.
    pub async fn server_name(&mut self) -> Result<String, RconError> {
        self.command("get name").await
    }

    /// Connected player count and the server's player cap.
    pub async fn slots(&mut self) -> Result<(u32, u32), RconError> {
        let reply = self.command("get slots").await?;
        let (current, max) = reply
            .split_once('/')
            .ok_or(RconError::ProtocolViolation("malformed slots reply"))?;
        Ok((
            current.trim().parse().unwrap_or(0),
            max.trim().parse().unwrap_or(0),
        ))
    }

    /// State of the currently played round.
    pub async fn game_state(&mut self) -> Result<GameState, RconError> {
        let reply = self.command("get gamestate").await?;
        Ok(parse_game_state(&reply))
    }

    // ── Maps ─────────────────────────────────────────────────────

    /// Maps available on the server, optionally filtered.
    pub async fn maps(&mut self, filters: &[MapFilter]) -> Result<Vec<String>, RconError> {
        let maps = self.list_command("get mapsforrotation").await?;
        Ok(super::maps::apply(maps, filters))
    }

    /// The current map rotation. Names can repeat.
    pub async fn map_rotation(&mut self, filters: &[MapFilter]) -> Result<Vec<String>, RconError> {
        let reply = self.command("rotlist").await?;
        let mut maps: Vec<String> = reply.split('\n').map(str::to_string).collect();
        // rotlist terminates with a newline, leaving an empty tail.
        maps.pop();
        Ok(super::maps::apply(maps, filters))
    }

    /// Append a map to the rotation after `after_map`.
    pub async fn add_to_map_rotation(
        &mut self,
        map_name: &str,
        after_map: &str,
    ) -> Result<(), RconError> {
        self.command(&format!("rotadd /Game/Maps/{map_name} /Game/Maps/{after_map}"))
            .await?;
        Ok(())
    }

    /// Change the current map. A map the server rejects because it is
    /// not in the rotation yet is appended to the rotation and the
    /// switch retried once.
    pub async fn switch_map(&mut self, map_name: &str) -> Result<(), RconError> {
        match self.command(&format!("map {map_name}")).await {
            Err(RconError::CommandFailed) => {
                let rotation = self.map_rotation(&[]).await?;
                let tail = rotation
                    .last()
                    .ok_or(RconError::ProtocolViolation("empty map rotation"))?
                    .clone();
                self.add_to_map_rotation(map_name, &tail).await?;
                self.command(&format!("map {map_name}")).await?;
                Ok(())
            }
            Err(e) => Err(e),
            Ok(_) => Ok(()),
        }
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

/// Split accumulated `showlog` text into entries delimited by the
/// bracketed timestamp headers, joining wrapped lines with spaces.
fn split_log_entries(text: &str) -> Vec<String> {
    let starts: Vec<usize> = LOG_HEADER.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        let joined = text.replace('\n', " ");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![trimmed.to_string()];
    }

    let mut entries = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let entry = text[start..end].trim_end_matches('\n').replace('\n', " ");
        if !entry.is_empty() {
            entries.push(entry);
        }
    }
    entries
}

fn parse_game_state(reply: &str) -> GameState {
    let mut state = GameState::default();
    for line in reply.split('\n') {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            "Map" => state.map = value.to_string(),
            "Next Map" => state.next_map = value.to_string(),
            "Remaining Time" => {
                let mut hms = value.split(':').map(|p| p.trim().parse().unwrap_or(0u64));
                let (h, m, s) = (
                    hms.next().unwrap_or(0),
                    hms.next().unwrap_or(0),
                    hms.next().unwrap_or(0),
                );
                state.remaining_time = Duration::from_secs(h * 3600 + m * 60 + s);
            }
            "Players" => {
                let (axis, allies) = parse_sides(value);
                state.players = PlayerCount { axis, allies };
            }
            "Score" => {
                let (axis, allies) = parse_sides(value);
                state.score = GameScore { axis, allies };
            }
            _ => {}
        }
    }
    state
}

/// Parse `"Allied: <n> - Axis: <m>"` (either order) into (axis, allies).
fn parse_sides(value: &str) -> (u32, u32) {
    let mut axis = 0;
    let mut allies = 0;
    for side in value.split(" - ") {
        match side.split_once(": ") {
            Some(("Allied", n)) => allies = n.trim().parse().unwrap_or(0),
            Some(("Axis", n)) => axis = n.trim().parse().unwrap_or(0),
            _ => {}
        }
    }
    (axis, allies)
}

fn parse_player_info(reply: &str) -> Result<PlayerInfo, RconError> {
    let mut info = PlayerInfo::default();
    for line in reply.split('\n') {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            "Name" => info.name = value.to_string(),
            "steamID64" => info.id = value.to_string(),
            "Team" => info.team = value.to_string(),
            "Role" => info.role = value.to_string(),
            "Loadout" => info.loadout = value.to_string(),
            "Unit" => {
                if let Some((id, name)) = value.split_once(" - ") {
                    info.unit = Unit {
                        id: id.trim().parse().unwrap_or(0),
                        name: name.to_string(),
                    };
                }
            }
            "Kills" => {
                if let Some((kills, deaths)) = value.split_once(" - Deaths: ") {
                    info.kills = kills.trim().parse().unwrap_or(0);
                    info.deaths = deaths.trim().parse().unwrap_or(0);
                }
            }
            "Score" => info.score = parse_score(value),
            "Level" => info.level = value.trim().parse().unwrap_or(0),
            _ => {}
        }
    }
    if info.name.is_empty() {
        return Err(RconError::ProtocolViolation("malformed playerinfo reply"));
    }
    Ok(info)
}

/// Parse `"C 0, O 20, D 240, S 0"`.
fn parse_score(value: &str) -> Score {
    let mut score = Score::default();
    for part in value.split(", ") {
        let Some((dim, n)) = part.split_once(' ') else {
            continue;
        };
        let n = n.trim().parse().unwrap_or(0);
        match dim {
            "C" => score.combat_effectiveness = n,
            "O" => score.offensive = n,
            "D" => score.defensive = n,
            "S" => score.support = n,
            _ => {}
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_entries_at_timestamp_headers() {
        let text = "[355 ms (1671484269)] CONNECTED A (1)\n\
                    [9.33 sec (1671484260)] KILL: wrapped\nentry continues\n\
                    [1:49 min (1671484160)] DISCONNECTED B (2)";
        let entries = split_log_entries(text);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], "[355 ms (1671484269)] CONNECTED A (1)");
        assert_eq!(
            entries[1],
            "[9.33 sec (1671484260)] KILL: wrapped entry continues"
        );
        assert_eq!(entries[2], "[1:49 min (1671484160)] DISCONNECTED B (2)");
    }

    #[test]
    fn split_without_headers_returns_joined_text() {
        assert_eq!(split_log_entries("free\ntext"), vec!["free text".to_string()]);
        assert!(split_log_entries("\n\n").is_empty());
    }

    #[test]
    fn parses_game_state_reply() {
        let reply = "Map: SME\nNext Map: Foy\nRemaining Time: 1:23:45\n\
                     Players: Allied: 37 - Axis: 40\nScore: Allied: 2 - Axis: 3";
        let state = parse_game_state(reply);
        assert_eq!(state.map, "SME");
        assert_eq!(state.next_map, "Foy");
        assert_eq!(state.remaining_time, Duration::from_secs(3600 + 23 * 60 + 45));
        assert_eq!(state.players, PlayerCount { axis: 40, allies: 37 });
        assert_eq!(state.score, GameScore { axis: 3, allies: 2 });
    }

    #[test]
    fn parses_player_info_reply() {
        let reply = "Name: ToastyMcToast\nsteamID64: 76561198025480905\nTeam: Allies\n\
                     Role: Assault\nUnit: 5 - FOX\nLoadout: Veteran\nKills: 4 - Deaths: 7\n\
                     Score: C 10, O 20, D 240, S 0\nLevel: 81";
        let info = parse_player_info(reply).unwrap();
        assert_eq!(info.name, "ToastyMcToast");
        assert_eq!(info.id, "76561198025480905");
        assert_eq!(info.unit, Unit { id: 5, name: "FOX".into() });
        assert_eq!(info.kills, 4);
        assert_eq!(info.deaths, 7);
        assert_eq!(
            info.score,
            Score {
                combat_effectiveness: 10,
                offensive: 20,
                defensive: 240,
                support: 0,
            }
        );
        assert_eq!(info.level, 81);
    }

    #[test]
    fn player_info_without_name_is_rejected() {
        assert!(parse_player_info("garbage").is_err());
    }
}
