//! Aggregated views composed from per-player queries.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use warden_core::v1::{Connection, PlayerInfo, Score};
use warden_core::{ConnectionPool, Deadline, RconError};

/// Teams keyed by side name, each split into squads.
pub type TeamView = HashMap<String, Team>;

#[derive(Debug, Default, Serialize)]
pub struct Team {
    pub squads: HashMap<String, Squad>,
    pub no_squad_players: Vec<PlayerInfo>,
    pub commander: Option<Squad>,
    pub score: TeamScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SquadType {
    Commander,
    Recon,
    Armor,
    Infantry,
}

#[derive(Debug, Clone, Serialize)]
pub struct Squad {
    #[serde(rename = "type")]
    pub squad_type: SquadType,
    pub score: TeamScore,
    pub players: Vec<PlayerInfo>,
}

/// Score sums across a squad or team. Each dimension accumulates into
/// its own counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeamScore {
    pub combat_effectiveness: u32,
    pub offensive: u32,
    pub defensive: u32,
    pub support: u32,
}

impl TeamScore {
    pub fn merge(&mut self, other: &Score) {
        self.combat_effectiveness += other.combat_effectiveness;
        self.offensive += other.offensive;
        self.defensive += other.defensive;
        self.support += other.support;
    }
}

/// The composed `/server` answer.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
    pub next_map: String,
    pub player_count: u32,
    pub max_players: u32,
    pub players: warden_core::v1::PlayerCount,
    pub game_score: warden_core::v1::GameScore,
    pub remaining_time_secs: u64,
}

/// Fetch every connected player's details, one pooled connection per
/// fetch, and fold them into the team view.
pub async fn team_view(pool: &ConnectionPool<Connection>) -> Result<TeamView, RconError> {
    let ids = pool
        .with_connection(request_deadline(), |mut conn| async move {
            conn.player_ids().await
        })
        .await?;

    let fetches = ids.into_iter().map(|player| {
        let pool = pool.clone();
        async move {
            pool.with_connection(request_deadline(), |mut conn| async move {
                conn.player_info(&player.name).await
            })
            .await
        }
    });
    let infos: Vec<PlayerInfo> = futures::future::try_join_all(fetches).await?;

    Ok(fold_team_view(infos))
}

fn request_deadline() -> Deadline {
    Deadline::after(Duration::from_secs(10))
}

fn fold_team_view(infos: Vec<PlayerInfo>) -> TeamView {
    let mut view = TeamView::new();
    for info in infos {
        let team = view.entry(info.team.clone()).or_default();
        team.score.merge(&info.score);

        let squad_type = guess_squad_type(&info);
        if info.unit.name.is_empty() && squad_type != SquadType::Commander {
            team.no_squad_players.push(info);
            continue;
        }

        let squad = team
            .squads
            .entry(info.unit.name.clone())
            .or_insert_with(|| Squad {
                squad_type,
                score: TeamScore::default(),
                players: Vec::new(),
            });
        squad.score.merge(&info.score);
        squad.players.push(info);
        if squad_type == SquadType::Commander {
            team.commander = Some(squad.clone());
        }
    }
    view
}

fn guess_squad_type(info: &PlayerInfo) -> SquadType {
    match info.role.to_lowercase().as_str() {
        "tankcommander" | "crewman" => SquadType::Armor,
        "spotter" | "sniper" => SquadType::Recon,
        "armycommander" => SquadType::Commander,
        _ => SquadType::Infantry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::v1::Unit;

    fn player(name: &str, team: &str, role: &str, unit: &str, score: Score) -> PlayerInfo {
        PlayerInfo {
            name: name.into(),
            id: format!("id-{name}"),
            team: team.into(),
            role: role.into(),
            loadout: "Standard".into(),
            unit: Unit {
                id: 1,
                name: unit.into(),
            },
            kills: 0,
            deaths: 0,
            score,
            level: 10,
        }
    }

    fn score(c: u32, o: u32, d: u32, s: u32) -> Score {
        Score {
            combat_effectiveness: c,
            offensive: o,
            defensive: d,
            support: s,
        }
    }

    #[test]
    fn squadmates_fold_into_one_squad_with_summed_score() {
        let view = fold_team_view(vec![
            player("a", "Allies", "Officer", "FOX", score(1, 10, 100, 0)),
            player("b", "Allies", "Rifleman", "FOX", score(2, 20, 200, 5)),
        ]);

        let team = &view["Allies"];
        assert_eq!(team.squads.len(), 1);
        let squad = &team.squads["FOX"];
        assert_eq!(squad.players.len(), 2);
        // Each dimension sums into its own counterpart.
        assert_eq!(squad.score, TeamScore {
            combat_effectiveness: 3,
            offensive: 30,
            defensive: 300,
            support: 5,
        });
        assert_eq!(team.score, squad.score);
    }

    #[test]
    fn squadless_players_are_listed_separately() {
        let view = fold_team_view(vec![player("lone", "Axis", "Rifleman", "", score(0, 0, 0, 0))]);
        let team = &view["Axis"];
        assert!(team.squads.is_empty());
        assert_eq!(team.no_squad_players.len(), 1);
    }

    #[test]
    fn commander_is_promoted() {
        let view = fold_team_view(vec![player(
            "boss",
            "Axis",
            "ArmyCommander",
            "CMD",
            score(0, 5, 0, 0),
        )]);
        let team = &view["Axis"];
        let commander = team.commander.as_ref().unwrap();
        assert_eq!(commander.squad_type, SquadType::Commander);
        assert_eq!(commander.players[0].name, "boss");
    }

    #[test]
    fn roles_map_to_squad_types() {
        let armor = player("t", "Axis", "TankCommander", "ABLE", score(0, 0, 0, 0));
        assert_eq!(guess_squad_type(&armor), SquadType::Armor);
        let recon = player("s", "Axis", "Sniper", "BAKER", score(0, 0, 0, 0));
        assert_eq!(guess_squad_type(&recon), SquadType::Recon);
        let inf = player("r", "Axis", "Medic", "CHARLIE", score(0, 0, 0, 0));
        assert_eq!(guess_squad_type(&inf), SquadType::Infantry);
    }
}
