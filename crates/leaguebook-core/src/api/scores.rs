// NFL opponent lookup from the public ESPN scoreboard.
//
// Best-effort enrichment: callers show a placeholder when this fails.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;

use super::client::{get_json, ApiResult};
use super::normalize::normalize_team_abbr;
use crate::config::HttpConfig;

#[derive(Debug, Clone)]
pub struct ScoresClient {
    http: Client,
    base_url: String,
}

impl ScoresClient {
    /// Reuses an existing `reqwest::Client` (connection pool and user agent).
    pub fn new(http: Client, config: &HttpConfig) -> Self {
        Self {
            http,
            base_url: config.scores_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Team abbreviation → opponent abbreviation for one regular-season week.
    /// Teams on bye are absent from the map.
    pub async fn opponents(&self, season: u16, week: u32) -> ApiResult<BTreeMap<String, String>> {
        let path = format!("/scoreboard?seasontype=2&week={week}&dates={season}");
        let url = format!("{}{}", self.base_url, path);
        let board: Scoreboard = get_json(&self.http, &url, &path).await?;
        Ok(opponent_map(&board))
    }
}

// ---------------------------------------------------------------------------
// Wire types (only the fields used)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Scoreboard {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
struct Competition {
    #[serde(default)]
    competitors: Vec<Competitor>,
}

#[derive(Debug, Deserialize)]
struct Competitor {
    team: CompetitorTeam,
}

#[derive(Debug, Deserialize)]
struct CompetitorTeam {
    abbreviation: String,
}

fn opponent_map(board: &Scoreboard) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for competition in board.events.iter().flat_map(|e| &e.competitions) {
        if let [a, b] = competition.competitors.as_slice() {
            let a = normalize_team_abbr(&a.team.abbreviation);
            let b = normalize_team_abbr(&b.team.abbreviation);
            out.insert(a.clone(), b.clone());
            out.insert(b, a);
        }
    }
    out
}
