// Slim player catalog, persisted under a versioned key.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::client::LeagueSource;
use super::normalize::normalize_team_abbr;
use super::types::RawPlayer;
use crate::db::Database;

/// Football positions used for scoring splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
    Other,
}

impl Position {
    pub fn from_str_pos(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "QB" => Position::QB,
            "RB" | "FB" => Position::RB,
            "WR" => Position::WR,
            "TE" => Position::TE,
            "K" | "PK" => Position::K,
            "DEF" | "DST" | "D/ST" => Position::DEF,
            _ => Position::Other,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DEF => "DEF",
            Position::Other => "OTHER",
        }
    }

    /// Kickers and team defenses churn every week and are left out of
    /// transaction-popularity rankings.
    pub fn is_streamer(&self) -> bool {
        matches!(self, Position::K | Position::DEF)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimPlayer {
    pub name: String,
    pub position: Position,
    pub team: Option<String>,
}

impl SlimPlayer {
    fn from_raw(id: &str, raw: &RawPlayer) -> Self {
        let name = raw
            .full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                let joined = format!(
                    "{} {}",
                    raw.first_name.as_deref().unwrap_or(""),
                    raw.last_name.as_deref().unwrap_or("")
                );
                let joined = joined.trim().to_string();
                (!joined.is_empty()).then_some(joined)
            })
            .unwrap_or_else(|| id.to_string());
        SlimPlayer {
            name,
            position: raw
                .position
                .as_deref()
                .map(Position::from_str_pos)
                .unwrap_or(Position::Other),
            team: raw
                .team
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(normalize_team_abbr),
        }
    }
}

/// Player id → slim record. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerCatalog {
    players: BTreeMap<String, SlimPlayer>,
}

impl PlayerCatalog {
    pub fn cache_key(version: &str) -> String {
        format!("players:{version}")
    }

    pub fn from_raw(raw: &HashMap<String, RawPlayer>) -> Self {
        let players = raw
            .iter()
            .map(|(id, player)| (id.clone(), SlimPlayer::from_raw(id, player)))
            .collect();
        Self { players }
    }

    /// Persisted copy first; otherwise fetch the full dictionary, slim it, and
    /// persist it. A cache read or write failure is logged and ignored.
    pub async fn load(
        source: &dyn LeagueSource,
        db: &Database,
        version: &str,
    ) -> crate::api::ApiResult<Self> {
        let key = Self::cache_key(version);
        match db.load_typed::<PlayerCatalog>(&key) {
            Ok(Some(catalog)) => {
                info!("Player catalog loaded from cache ({} players)", catalog.len());
                return Ok(catalog);
            }
            Ok(None) => {}
            Err(e) => warn!("ignoring unreadable player catalog cache: {e:#}"),
        }

        let raw = source.players().await?;
        let catalog = Self::from_raw(&raw);
        info!("Player catalog fetched ({} players)", catalog.len());
        if let Err(e) = db.save_typed(&key, &catalog) {
            warn!("failed to persist player catalog: {e:#}");
        }
        Ok(catalog)
    }

    pub fn get(&self, player_id: &str) -> Option<&SlimPlayer> {
        self.players.get(player_id)
    }

    pub fn position(&self, player_id: &str) -> Position {
        self.get(player_id)
            .map(|p| p.position)
            .unwrap_or(Position::Other)
    }

    /// Display name, falling back to the raw id.
    pub fn name(&self, player_id: &str) -> String {
        self.get(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| player_id.to_string())
    }

    pub fn insert(&mut self, player_id: &str, player: SlimPlayer) {
        self.players.insert(player_id.to_string(), player);
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
