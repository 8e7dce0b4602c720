// Sleeper REST client and the `LeagueSource` seam the pipeline reads through.
//
// Every request is a plain GET returning JSON. There is no retry or backoff;
// callers decide how to degrade when a request fails.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::normalize::StatLine;
use super::types::{
    Draft, DraftPick, League, Matchup, NflState, RawPlayer, Roster, Transaction, TrendingEntry,
    User,
};
use crate::config::HttpConfig;

pub type ApiResult<T> = Result<T, ApiError>;

/// Positions requested from the projections endpoint, one request each.
pub const PROJECTION_POSITIONS: [&str; 5] = ["QB", "RB", "WR", "TE", "K"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} for {path}")]
    Http { status: u16, path: String },

    #[error("network error for {path}: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response for {path}: {message}")]
    Decode { path: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

// ---------------------------------------------------------------------------
// LeagueSource
// ---------------------------------------------------------------------------

/// Read-only access to league resources. Implemented by the live HTTP client
/// and by `MemorySource` for offline replay and tests.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    async fn league(&self, league_id: &str) -> ApiResult<League>;
    async fn users(&self, league_id: &str) -> ApiResult<Vec<User>>;
    async fn rosters(&self, league_id: &str) -> ApiResult<Vec<Roster>>;
    async fn matchups(&self, league_id: &str, week: u32) -> ApiResult<Vec<Matchup>>;
    async fn transactions(&self, league_id: &str, week: u32) -> ApiResult<Vec<Transaction>>;
    async fn drafts(&self, league_id: &str) -> ApiResult<Vec<Draft>>;
    async fn draft_picks(&self, draft_id: &str) -> ApiResult<Vec<DraftPick>>;
    async fn nfl_state(&self) -> ApiResult<NflState>;
    async fn players(&self) -> ApiResult<HashMap<String, RawPlayer>>;
}

// ---------------------------------------------------------------------------
// SleeperClient
// ---------------------------------------------------------------------------

/// Live Sleeper API client.
#[derive(Debug, Clone)]
pub struct SleeperClient {
    http: Client,
    base_url: String,
    projections_url: String,
}

impl SleeperClient {
    /// Fails when the configured user agent is not a valid header value.
    pub fn from_config(http: &HttpConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http: client,
            base_url: http.base_url.trim_end_matches('/').to_string(),
            projections_url: http.projections_url.trim_end_matches('/').to_string(),
        })
    }

    /// Point both endpoints at `base_url` (mock servers in tests).
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            projections_url: format!("{base}/projections/nfl"),
            base_url: base,
        }
    }

    /// Shared HTTP client, so other collaborators reuse its connection pool.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// GET `{base_url}{path}` and decode the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        get_json(&self.http, &url, path).await
    }

    /// Players trending on adds or drops over the lookback window.
    pub async fn trending(
        &self,
        kind: TrendKind,
        lookback_hours: u32,
        limit: u32,
    ) -> ApiResult<Vec<TrendingEntry>> {
        let path = format!(
            "/players/nfl/trending/{}?lookback_hours={lookback_hours}&limit={limit}",
            kind.as_str()
        );
        self.fetch_json(&path).await
    }

    /// Weekly projections for the fantasy positions, keyed by player id.
    ///
    /// One request per position, all in flight at once. A failed position is
    /// logged and left out; the rest of the map is still returned.
    pub async fn weekly_projections(
        &self,
        season: u16,
        week: u32,
    ) -> BTreeMap<String, StatLine> {
        let requests = PROJECTION_POSITIONS.iter().map(|position| {
            let url = format!(
                "{}/{season}/{week}?season_type=regular&position[]={position}",
                self.projections_url
            );
            async move {
                let label = format!("/projections/nfl/{season}/{week}?position={position}");
                (position, get_json::<Value>(&self.http, &url, &label).await)
            }
        });

        let mut out = BTreeMap::new();
        for (position, result) in join_all(requests).await {
            match result {
                Ok(body) => out.extend(parse_projections(&body)),
                Err(e) => warn!("projections for {position} unavailable: {e}"),
            }
        }
        out
    }
}

#[async_trait]
impl LeagueSource for SleeperClient {
    async fn league(&self, league_id: &str) -> ApiResult<League> {
        self.fetch_json(&format!("/league/{league_id}")).await
    }

    async fn users(&self, league_id: &str) -> ApiResult<Vec<User>> {
        self.fetch_json(&format!("/league/{league_id}/users")).await
    }

    async fn rosters(&self, league_id: &str) -> ApiResult<Vec<Roster>> {
        self.fetch_json(&format!("/league/{league_id}/rosters")).await
    }

    async fn matchups(&self, league_id: &str, week: u32) -> ApiResult<Vec<Matchup>> {
        self.fetch_json(&format!("/league/{league_id}/matchups/{week}"))
            .await
    }

    async fn transactions(&self, league_id: &str, week: u32) -> ApiResult<Vec<Transaction>> {
        self.fetch_json(&format!("/league/{league_id}/transactions/{week}"))
            .await
    }

    async fn drafts(&self, league_id: &str) -> ApiResult<Vec<Draft>> {
        self.fetch_json(&format!("/league/{league_id}/drafts")).await
    }

    async fn draft_picks(&self, draft_id: &str) -> ApiResult<Vec<DraftPick>> {
        self.fetch_json(&format!("/draft/{draft_id}/picks")).await
    }

    async fn nfl_state(&self) -> ApiResult<NflState> {
        self.fetch_json("/state/nfl").await
    }

    async fn players(&self) -> ApiResult<HashMap<String, RawPlayer>> {
        self.fetch_json("/players/nfl").await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendKind {
    Add,
    Drop,
}

impl TrendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendKind::Add => "add",
            TrendKind::Drop => "drop",
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// GET an absolute URL and decode JSON. `label` is the path reported in errors.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    label: &str,
) -> ApiResult<T> {
    debug!(%url, "GET");
    let response = http.get(url).send().await.map_err(|source| ApiError::Network {
        path: label.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            path: label.to_string(),
        });
    }

    let bytes = response.bytes().await.map_err(|source| ApiError::Network {
        path: label.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        path: label.to_string(),
        message: e.to_string(),
    })
}

/// Projection documents are arrays of `{player_id, stats: {...}}`.
fn parse_projections(body: &Value) -> BTreeMap<String, StatLine> {
    let Some(entries) = body.as_array() else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("player_id")?.as_str()?;
            let stats = entry.get("stats")?.as_object()?;
            Some((id.to_string(), StatLine::from_map(stats)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::normalize::ScoringFormat;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_league_decodes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/league/111")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"league_id":"111","name":"Gridiron","season":"2024","status":"in_season",
                    "previous_league_id":"110","settings":{"playoff_week_start":15}}"#,
            )
            .create_async()
            .await;

        let client = SleeperClient::with_base_url(&server.url());
        let league = client.league("111").await.unwrap();
        assert_eq!(league.year(), 2024);
        assert_eq!(league.previous_id(), Some("110"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_path() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/league/404/rosters")
            .with_status(404)
            .create_async()
            .await;

        let client = SleeperClient::with_base_url(&server.url());
        match client.rosters("404").await.unwrap_err() {
            ApiError::Http { status, path } => {
                assert_eq!(status, 404);
                assert_eq!(path, "/league/404/rosters");
            }
            other => panic!("expected Http error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn null_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/league/999")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let client = SleeperClient::with_base_url(&server.url());
        match client.league("999").await.unwrap_err() {
            ApiError::Decode { path, .. } => assert_eq!(path, "/league/999"),
            other => panic!("expected Decode error, got: {other}"),
        }
    }

    fn http_config(user_agent: &str) -> HttpConfig {
        HttpConfig {
            base_url: "https://api.sleeper.app/v1/".into(),
            projections_url: "https://api.sleeper.app/projections/nfl".into(),
            scores_url: "https://site.api.espn.com/apis/site/v2/sports/football/nfl".into(),
            user_agent: user_agent.into(),
        }
    }

    #[test]
    fn from_config_trims_base_url() {
        let client = SleeperClient::from_config(&http_config("leaguebook/0.1")).unwrap();
        assert_eq!(client.base_url, "https://api.sleeper.app/v1");
    }

    #[test]
    fn from_config_rejects_invalid_user_agent() {
        let err = SleeperClient::from_config(&http_config("leaguebook\n0.1")).unwrap_err();
        assert!(matches!(err, ApiError::Client(_)));
    }

    #[tokio::test]
    async fn trending_builds_query_string() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/players/nfl/trending/add")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("lookback_hours".into(), "24".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"player_id":"4046","count":812}]"#)
            .create_async()
            .await;

        let client = SleeperClient::with_base_url(&server.url());
        let trending = client.trending(TrendKind::Add, 24, 10).await.unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].count, 812);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn projections_skip_failed_positions() {
        let mut server = mockito::Server::new_async().await;
        let _qb = server
            .mock("GET", "/projections/nfl/2024/3")
            .match_query(mockito::Matcher::UrlEncoded(
                "position[]".into(),
                "QB".into(),
            ))
            .with_status(200)
            .with_body(r#"[{"player_id":"4046","stats":{"pts_ppr":22.5}}]"#)
            .create_async()
            .await;
        // Every other position request falls through to a 500.
        let _rest = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = SleeperClient::with_base_url(&server.url());
        let projections = client.weekly_projections(2024, 3).await;
        assert_eq!(projections.len(), 1);
        assert_eq!(projections["4046"].points(ScoringFormat::Ppr), 22.5);
    }

    #[test]
    fn parse_projections_ignores_malformed_entries() {
        let body = json!([
            {"player_id": "1", "stats": {"pts_std": 8.0}},
            {"player_id": "2"},
            {"stats": {"pts_std": 3.0}},
        ]);
        let parsed = parse_projections(&body);
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("1"));
        assert!(parse_projections(&json!({"oops": true})).is_empty());
    }
}
