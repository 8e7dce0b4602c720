// Wire types for the Sleeper REST API.
//
// Sleeper sends `null` for many list and map fields, so those fields go
// through `null_as_default` rather than plain `#[serde(default)]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sleeper encodes seasons as strings ("2023").
fn parse_year(season: &str) -> u16 {
    season.trim().parse().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// League metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct League {
    pub league_id: String,
    #[serde(default)]
    pub name: String,
    pub season: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub previous_league_id: Option<String>,
    #[serde(default)]
    pub settings: LeagueSettings,
}

impl League {
    pub fn year(&self) -> u16 {
        parse_year(&self.season)
    }

    /// The predecessor league id, with Sleeper's `""` and `"0"` sentinels
    /// mapped to `None`.
    pub fn previous_id(&self) -> Option<&str> {
        match self.previous_league_id.as_deref().map(str::trim) {
            None | Some("") | Some("0") => None,
            Some(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeagueSettings {
    #[serde(default = "default_playoff_week_start")]
    pub playoff_week_start: u32,
}

fn default_playoff_week_start() -> u32 {
    15
}

impl Default for LeagueSettings {
    fn default() -> Self {
        Self {
            playoff_week_start: default_playoff_week_start(),
        }
    }
}

// ---------------------------------------------------------------------------
// Users and rosters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: UserMetadata,
}

impl User {
    /// Team name override when set, else the account display name.
    pub fn team_name(&self) -> &str {
        match self.metadata.team_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.display_name,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserMetadata {
    #[serde(default)]
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Roster {
    pub roster_id: u32,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: RosterSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RosterSettings {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
    #[serde(default)]
    pub fpts: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fpts_decimal: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fpts_against: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fpts_against_decimal: u32,
}

impl RosterSettings {
    /// Points for, combining Sleeper's integer and hundredths fields.
    pub fn points_for(&self) -> f64 {
        self.fpts as f64 + self.fpts_decimal as f64 / 100.0
    }

    pub fn points_against(&self) -> f64 {
        self.fpts_against as f64 + self.fpts_against_decimal as f64 / 100.0
    }
}

// ---------------------------------------------------------------------------
// Weekly data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Matchup {
    pub roster_id: u32,
    #[serde(default)]
    pub matchup_id: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players_points: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub starters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roster_ids: Vec<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub adds: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub drops: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub draft_picks: Vec<TradedPick>,
}

impl Transaction {
    pub fn is_trade(&self) -> bool {
        self.kind == "trade"
    }

    /// Failed waiver claims come back with status "failed"; an empty status
    /// is treated as complete.
    pub fn is_complete(&self) -> bool {
        self.status.is_empty() || self.status == "complete"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradedPick {
    pub season: String,
    pub round: u32,
    /// Roster that originally owned the pick.
    pub roster_id: u32,
    pub previous_owner_id: u32,
    pub owner_id: u32,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub draft_id: String,
    pub season: String,
    #[serde(default)]
    pub status: String,
}

impl Draft {
    pub fn year(&self) -> u16 {
        parse_year(&self.season)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftPick {
    pub round: u32,
    pub pick_no: u32,
    pub player_id: String,
    #[serde(default)]
    pub picked_by: String,
    #[serde(default)]
    pub roster_id: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: DraftPickMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftPickMetadata {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub position: String,
}

// ---------------------------------------------------------------------------
// NFL state, players, trending
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NflState {
    pub week: u32,
    pub season: String,
    #[serde(default)]
    pub season_type: String,
}

impl NflState {
    pub fn year(&self) -> u16 {
        parse_year(&self.season)
    }
}

/// One entry of `/players/nfl`. The full document carries dozens of fields per
/// player; only the slim subset is kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPlayer {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingEntry {
    pub player_id: String,
    pub count: u32,
}
