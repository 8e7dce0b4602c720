// League history: season chain, week fetching, per-user aggregation, and the
// caches in front of them.

pub mod aggregate;
pub mod averages;
pub mod cache;
pub mod chain;
pub mod pool;
pub mod weeks;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::types::{DraftPick, NflState};
use crate::api::LeagueSource;
use crate::config::AggregationSettings;
use chain::{walk_season_chain, ChainBreak, Season};
use weeks::{fetch_season_weeks, WeekData};

/// Draft picks of one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDraft {
    pub year: u16,
    pub league_id: String,
    pub picks: Vec<DraftPick>,
}

/// Everything fetched for one run, league-wide. Accolades and per-user
/// accumulators are folds over this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueHistory {
    /// Newest first.
    pub seasons: Vec<Season>,
    pub truncated: Option<ChainBreak>,
    pub state: Option<NflState>,
    pub weeks: Vec<WeekData>,
    pub drafts: Vec<SeasonDraft>,
}

impl LeagueHistory {
    pub fn season(&self, league_id: &str) -> Option<&Season> {
        self.seasons.iter().find(|s| s.league_id == league_id)
    }

    pub fn season_by_year(&self, year: u16) -> Option<&Season> {
        self.seasons.iter().find(|s| s.year == year)
    }

    pub fn weeks_of<'a>(&'a self, season: &'a Season) -> impl Iterator<Item = &'a WeekData> + 'a {
        self.weeks.iter().filter(move |w| w.league_id == season.league_id)
    }
}

/// Walk the chain from `start_league_id`, then fetch every season's weeks and
/// drafts. The NFL state and drafts are best-effort; the chain walk and week
/// fetches degrade per season and per week.
pub async fn load_league_history(
    source: &dyn LeagueSource,
    start_league_id: &str,
    settings: &AggregationSettings,
    cutoff: Option<u32>,
) -> LeagueHistory {
    let (chain, state) = tokio::join!(walk_season_chain(source, start_league_id), source.nfl_state());
    let state = state
        .map_err(|e| warn!("NFL state unavailable, treating every season as finished: {e}"))
        .ok();

    let weeks = fetch_season_weeks(source, &chain.seasons, state.as_ref(), settings, cutoff).await;
    let drafts = fetch_drafts(source, &chain.seasons).await;

    info!(
        "League history loaded: {} seasons, {} weeks, {} drafts",
        chain.seasons.len(),
        weeks.len(),
        drafts.len()
    );

    LeagueHistory {
        seasons: chain.seasons,
        truncated: chain.truncated,
        state,
        weeks,
        drafts,
    }
}

async fn fetch_drafts(source: &dyn LeagueSource, seasons: &[Season]) -> Vec<SeasonDraft> {
    let mut drafts = Vec::new();
    for season in seasons {
        let listed = match source.drafts(&season.league_id).await {
            Ok(listed) => listed,
            Err(e) => {
                warn!("{} drafts unavailable: {e}", season.year);
                continue;
            }
        };
        for draft in listed {
            match source.draft_picks(&draft.draft_id).await {
                Ok(picks) => drafts.push(SeasonDraft {
                    // A draft without a parseable season inherits the league year.
                    year: match draft.year() {
                        0 => season.year,
                        year => year,
                    },
                    league_id: season.league_id.clone(),
                    picks,
                }),
                Err(e) => warn!("{} draft {} picks unavailable: {e}", season.year, draft.draft_id),
            }
        }
    }
    drafts
}
