// Builders for Sleeper wire records used across unit tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::api::types::{
    League, LeagueSettings, Matchup, Roster, RosterSettings, TradedPick, Transaction, User,
    UserMetadata,
};
use crate::config::{load_config_from, Config};
use crate::history::chain::Season;
use crate::history::weeks::WeekData;

pub fn league(id: &str, year: u16, previous: Option<&str>) -> League {
    League {
        league_id: id.into(),
        name: "Test League".into(),
        season: year.to_string(),
        status: "complete".into(),
        previous_league_id: previous.map(str::to_string),
        settings: LeagueSettings {
            playoff_week_start: 15,
        },
    }
}

pub fn user(id: &str, display_name: &str) -> User {
    User {
        user_id: id.into(),
        display_name: display_name.into(),
        avatar: None,
        metadata: UserMetadata::default(),
    }
}

pub fn named_user(id: &str, display_name: &str, team_name: &str) -> User {
    User {
        metadata: UserMetadata {
            team_name: Some(team_name.into()),
        },
        ..user(id, display_name)
    }
}

pub fn roster(roster_id: u32, owner: &str, wins: u32, losses: u32, fpts: u32) -> Roster {
    Roster {
        roster_id,
        owner_id: Some(owner.into()),
        players: vec![],
        settings: RosterSettings {
            wins,
            losses,
            fpts,
            ..RosterSettings::default()
        },
    }
}

pub fn matchup(roster_id: u32, matchup_id: Option<u32>, points: f64) -> Matchup {
    Matchup {
        roster_id,
        matchup_id,
        points,
        players_points: BTreeMap::new(),
        starters: vec![],
    }
}

/// Matchup whose players score `players`; ids listed in `starters` started.
pub fn matchup_with_players(
    roster_id: u32,
    matchup_id: Option<u32>,
    players: &[(&str, f64)],
    starters: &[&str],
) -> Matchup {
    let players_points: BTreeMap<String, f64> =
        players.iter().map(|(id, pts)| (id.to_string(), *pts)).collect();
    let points = starters
        .iter()
        .filter_map(|s| players_points.get(*s))
        .sum();
    Matchup {
        roster_id,
        matchup_id,
        points,
        players_points,
        starters: starters.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn transaction(
    kind: &str,
    leg: u32,
    roster_ids: &[u32],
    adds: &[(&str, u32)],
    drops: &[(&str, u32)],
    picks: Vec<TradedPick>,
) -> Transaction {
    Transaction {
        transaction_id: format!("{kind}-{leg}-{roster_ids:?}"),
        kind: kind.into(),
        status: "complete".into(),
        roster_ids: roster_ids.to_vec(),
        adds: adds.iter().map(|(p, r)| (p.to_string(), *r)).collect(),
        drops: drops.iter().map(|(p, r)| (p.to_string(), *r)).collect(),
        draft_picks: picks,
    }
}

pub fn season(league_id: &str, year: u16, users: Vec<User>, rosters: Vec<Roster>) -> Season {
    Season::from_parts(league(league_id, year, None), users, rosters)
}

pub fn week(season: &Season, week: u32, matchups: Vec<Matchup>) -> WeekData {
    WeekData {
        league_id: season.league_id.clone(),
        year: season.year,
        week,
        matchups,
        transactions: vec![],
        failed: false,
    }
}

/// Standard four-team season: u1..u4 own rosters 1..4.
pub fn four_team_season(league_id: &str, year: u16) -> Season {
    season(
        league_id,
        year,
        vec![
            user("u1", "alice"),
            user("u2", "bob"),
            user("u3", "carol"),
            user("u4", "dave"),
        ],
        vec![
            roster(1, "u1", 0, 0, 0),
            roster(2, "u2", 0, 0, 0),
            roster(3, "u3", 0, 0, 0),
            roster(4, "u4", 0, 0, 0),
        ],
    )
}

/// Default config loaded from a private copy of `defaults/`. `name` keeps
/// concurrently running tests in separate temp dirs.
pub fn default_config(name: &str) -> Config {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
    let tmp = std::env::temp_dir().join(format!("leaguebook-{name}"));
    let config_dir = tmp.join("config");
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(&config_dir).unwrap();
    for file in ["league.toml", "settings.toml"] {
        fs::copy(root.join("defaults").join(file), config_dir.join(file)).unwrap();
    }
    load_config_from(&tmp).unwrap()
}
