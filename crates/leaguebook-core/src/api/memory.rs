// In-memory `LeagueSource` for offline replay of recorded league data and for
// tests. Counts requests per resource and tracks peak concurrent week fetches.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{ApiError, ApiResult, LeagueSource};
use super::types::{
    Draft, DraftPick, League, Matchup, NflState, RawPlayer, Roster, Transaction, User,
};

#[derive(Default)]
pub struct MemorySource {
    leagues: HashMap<String, League>,
    users: HashMap<String, Vec<User>>,
    rosters: HashMap<String, Vec<Roster>>,
    matchups: HashMap<(String, u32), Vec<Matchup>>,
    transactions: HashMap<(String, u32), Vec<Transaction>>,
    drafts: HashMap<String, Vec<Draft>>,
    picks: HashMap<String, Vec<DraftPick>>,
    state: Option<NflState>,
    players: HashMap<String, RawPlayer>,
    failing_leagues: HashSet<String>,
    failing_weeks: HashSet<(String, u32)>,
    failing_resources: HashSet<(&'static str, String)>,
    requests: Mutex<HashMap<&'static str, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_league(&mut self, league: League) {
        self.leagues.insert(league.league_id.clone(), league);
    }

    pub fn add_users(&mut self, league_id: &str, users: Vec<User>) {
        self.users.insert(league_id.to_string(), users);
    }

    pub fn add_rosters(&mut self, league_id: &str, rosters: Vec<Roster>) {
        self.rosters.insert(league_id.to_string(), rosters);
    }

    pub fn set_matchups(&mut self, league_id: &str, week: u32, matchups: Vec<Matchup>) {
        self.matchups.insert((league_id.to_string(), week), matchups);
    }

    pub fn set_transactions(&mut self, league_id: &str, week: u32, txns: Vec<Transaction>) {
        self.transactions.insert((league_id.to_string(), week), txns);
    }

    pub fn add_draft(&mut self, league_id: &str, draft: Draft, picks: Vec<DraftPick>) {
        self.picks.insert(draft.draft_id.clone(), picks);
        self.drafts.entry(league_id.to_string()).or_default().push(draft);
    }

    pub fn set_nfl_state(&mut self, state: NflState) {
        self.state = Some(state);
    }

    pub fn add_player(&mut self, player_id: &str, player: RawPlayer) {
        self.players.insert(player_id.to_string(), player);
    }

    /// Every request touching `league_id` fails with HTTP 500.
    pub fn fail_league(&mut self, league_id: &str) {
        self.failing_leagues.insert(league_id.to_string());
    }

    /// Matchup and transaction requests for one week fail with HTTP 500.
    pub fn fail_week(&mut self, league_id: &str, week: u32) {
        self.failing_weeks.insert((league_id.to_string(), week));
    }

    /// Requests for one per-league resource ("users", "rosters", "drafts")
    /// fail with HTTP 500 while the league itself still loads.
    pub fn fail_resource(&mut self, resource: &'static str, league_id: &str) {
        self.failing_resources.insert((resource, league_id.to_string()));
    }

    /// Number of requests made for `resource` ("league", "matchups", ...).
    pub fn request_count(&self, resource: &str) -> usize {
        self.requests
            .lock()
            .expect("request counter mutex poisoned")
            .get(resource)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of matchup fetches observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, resource: &'static str) {
        *self
            .requests
            .lock()
            .expect("request counter mutex poisoned")
            .entry(resource)
            .or_insert(0) += 1;
    }

    fn check_league(&self, league_id: &str, path: String) -> ApiResult<()> {
        if self.failing_leagues.contains(league_id) {
            return Err(ApiError::Http { status: 500, path });
        }
        if !self.leagues.contains_key(league_id) {
            return Err(ApiError::Http { status: 404, path });
        }
        Ok(())
    }

    fn check_resource(&self, resource: &'static str, league_id: &str, path: String) -> ApiResult<()> {
        self.check_league(league_id, path.clone())?;
        if self.failing_resources.contains(&(resource, league_id.to_string())) {
            return Err(ApiError::Http { status: 500, path });
        }
        Ok(())
    }

    fn check_week(&self, league_id: &str, week: u32, path: String) -> ApiResult<()> {
        self.check_league(league_id, path.clone())?;
        if self.failing_weeks.contains(&(league_id.to_string(), week)) {
            return Err(ApiError::Http { status: 500, path });
        }
        Ok(())
    }
}

#[async_trait]
impl LeagueSource for MemorySource {
    async fn league(&self, league_id: &str) -> ApiResult<League> {
        self.record("league");
        let path = format!("/league/{league_id}");
        self.check_league(league_id, path.clone())?;
        self.leagues
            .get(league_id)
            .cloned()
            .ok_or(ApiError::Http { status: 404, path })
    }

    async fn users(&self, league_id: &str) -> ApiResult<Vec<User>> {
        self.record("users");
        self.check_resource("users", league_id, format!("/league/{league_id}/users"))?;
        Ok(self.users.get(league_id).cloned().unwrap_or_default())
    }

    async fn rosters(&self, league_id: &str) -> ApiResult<Vec<Roster>> {
        self.record("rosters");
        self.check_resource("rosters", league_id, format!("/league/{league_id}/rosters"))?;
        Ok(self.rosters.get(league_id).cloned().unwrap_or_default())
    }

    async fn matchups(&self, league_id: &str, week: u32) -> ApiResult<Vec<Matchup>> {
        self.record("matchups");
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // Suspend once so other workers get a chance to start their fetch.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check_week(league_id, week, format!("/league/{league_id}/matchups/{week}"))?;
        Ok(self
            .matchups
            .get(&(league_id.to_string(), week))
            .cloned()
            .unwrap_or_default())
    }

    async fn transactions(&self, league_id: &str, week: u32) -> ApiResult<Vec<Transaction>> {
        self.record("transactions");
        self.check_week(
            league_id,
            week,
            format!("/league/{league_id}/transactions/{week}"),
        )?;
        Ok(self
            .transactions
            .get(&(league_id.to_string(), week))
            .cloned()
            .unwrap_or_default())
    }

    async fn drafts(&self, league_id: &str) -> ApiResult<Vec<Draft>> {
        self.record("drafts");
        self.check_resource("drafts", league_id, format!("/league/{league_id}/drafts"))?;
        Ok(self.drafts.get(league_id).cloned().unwrap_or_default())
    }

    async fn draft_picks(&self, draft_id: &str) -> ApiResult<Vec<DraftPick>> {
        self.record("draft_picks");
        self.picks
            .get(draft_id)
            .cloned()
            .ok_or_else(|| ApiError::Http {
                status: 404,
                path: format!("/draft/{draft_id}/picks"),
            })
    }

    async fn nfl_state(&self) -> ApiResult<NflState> {
        self.record("nfl_state");
        self.state.clone().ok_or_else(|| ApiError::Http {
            status: 404,
            path: "/state/nfl".into(),
        })
    }

    async fn players(&self) -> ApiResult<HashMap<String, RawPlayer>> {
        self.record("players");
        Ok(self.players.clone())
    }
}
