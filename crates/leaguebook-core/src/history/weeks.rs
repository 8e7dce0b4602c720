// Per-season week ranges and pooled fetching of weekly matchups and
// transactions.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::chain::Season;
use super::pool::run_bounded;
use crate::api::types::{Matchup, NflState, Transaction};
use crate::api::LeagueSource;
use crate::config::AggregationSettings;

/// Week 18 is never aggregated: most leagues leave it unplayed and those that
/// play it treat it as non-competitive.
pub const NON_COMPETITIVE_WEEK: u32 = 18;

/// Matchups and transactions of one season week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekData {
    pub league_id: String,
    pub year: u16,
    pub week: u32,
    pub matchups: Vec<Matchup>,
    pub transactions: Vec<Transaction>,
    /// The matchup fetch failed and `matchups` is empty as a result.
    pub failed: bool,
}

impl WeekData {
    /// Opposing pairs: records sharing a `matchup_id`. Groups of any other
    /// size are byes (one record) or malformed, and yield no pair.
    pub fn pairs(&self) -> Vec<(&Matchup, &Matchup)> {
        let mut pairs = Vec::new();
        for (i, a) in self.matchups.iter().enumerate() {
            let Some(id) = a.matchup_id else { continue };
            let partners: Vec<&Matchup> = self.matchups[i + 1..]
                .iter()
                .filter(|b| b.matchup_id == Some(id))
                .collect();
            let earlier = self.matchups[..i]
                .iter()
                .any(|b| b.matchup_id == Some(id));
            if earlier {
                continue;
            }
            match partners.as_slice() {
                [b] => pairs.push((a, *b)),
                [] => {}
                _ => warn!(
                    "{} week {}: matchup {id} has {} records, ignoring",
                    self.year,
                    self.week,
                    partners.len() + 1
                ),
            }
        }
        pairs
    }

    /// The record facing `roster_id` this week, if it had an opponent.
    pub fn opponent_of(&self, roster_id: u32) -> Option<&Matchup> {
        self.pairs().into_iter().find_map(|(a, b)| {
            if a.roster_id == roster_id {
                Some(b)
            } else if b.roster_id == roster_id {
                Some(a)
            } else {
                None
            }
        })
    }
}

/// Last week worth aggregating for `season`: regular season plus playoff weeks,
/// capped at `max_week`, and at the last finished week while the season is
/// still being played.
pub fn last_week(season: &Season, state: Option<&NflState>, settings: &AggregationSettings) -> u32 {
    let regular_weeks = season.playoff_week_start.saturating_sub(1);
    let mut last = (regular_weeks + settings.playoff_weeks).min(settings.max_week);
    if let Some(state) = state {
        if season.is_in_progress(state) {
            last = last.min(state.week.saturating_sub(1));
        }
    }
    last
}

/// Weeks to aggregate for `season`, ascending, never including week 18.
/// `cutoff` caps the range further when set.
pub fn season_weeks(
    season: &Season,
    state: Option<&NflState>,
    settings: &AggregationSettings,
    cutoff: Option<u32>,
) -> Vec<u32> {
    let mut last = last_week(season, state, settings);
    if let Some(cutoff) = cutoff {
        last = last.min(cutoff);
    }
    (1..=last).filter(|w| *w != NON_COMPETITIVE_WEEK).collect()
}

/// Fetch every season's weeks through the bounded pool.
///
/// One pool job per week fetches matchups and transactions together. A failed
/// matchup fetch degrades to an empty week flagged `failed`; a failed
/// transaction fetch degrades to no transactions.
pub async fn fetch_season_weeks(
    source: &dyn LeagueSource,
    seasons: &[Season],
    state: Option<&NflState>,
    settings: &AggregationSettings,
    cutoff: Option<u32>,
) -> Vec<WeekData> {
    let pending: Vec<(&Season, u32)> = seasons
        .iter()
        .flat_map(|s| {
            season_weeks(s, state, settings, cutoff)
                .into_iter()
                .map(move |w| (s, w))
        })
        .collect();

    info!(
        "Fetching {} weeks across {} seasons ({} workers)",
        pending.len(),
        seasons.len(),
        settings.pool_size
    );

    run_bounded(&pending, settings.pool_size, |(season, week)| {
        let (season, week) = (*season, *week);
        async move { fetch_week(source, season, week).await }
    })
    .await
}

async fn fetch_week(source: &dyn LeagueSource, season: &Season, week: u32) -> WeekData {
    let (matchups, transactions) = tokio::join!(
        source.matchups(&season.league_id, week),
        source.transactions(&season.league_id, week)
    );

    let (matchups, failed) = match matchups {
        Ok(m) => (m, false),
        Err(e) => {
            warn!("{} week {week}: matchups unavailable: {e}", season.year);
            (Vec::new(), true)
        }
    };
    let transactions = transactions.unwrap_or_else(|e| {
        warn!("{} week {week}: transactions unavailable: {e}", season.year);
        Vec::new()
    });

    WeekData {
        league_id: season.league_id.clone(),
        year: season.year,
        week,
        matchups,
        transactions,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemorySource;
    use crate::test_fixtures::{four_team_season, league, matchup, week};

    fn state(year: u16, week: u32) -> NflState {
        NflState {
            week,
            season: year.to_string(),
            season_type: "regular".into(),
        }
    }

    #[test]
    fn completed_season_covers_regular_and_playoff_weeks() {
        let season = four_team_season("L", 2023);
        let settings = AggregationSettings::default();
        assert_eq!(last_week(&season, None, &settings), 17);
        assert_eq!(
            season_weeks(&season, None, &settings, None),
            (1..=17).collect::<Vec<_>>()
        );
    }

    #[test]
    fn week_eighteen_is_always_excluded() {
        let mut season = four_team_season("L", 2023);
        season.playoff_week_start = 16;
        let settings = AggregationSettings::default();
        assert_eq!(last_week(&season, None, &settings), 18);
        let weeks = season_weeks(&season, None, &settings, None);
        assert_eq!(weeks.last(), Some(&17));
        assert!(!weeks.contains(&18));
    }

    #[test]
    fn in_progress_season_stops_before_current_week() {
        let mut season = four_team_season("L", 2024);
        season.status = "in_season".into();
        let settings = AggregationSettings::default();
        assert_eq!(last_week(&season, Some(&state(2024, 9)), &settings), 8);
        // A finished season is unaffected by the NFL state.
        let done = four_team_season("L", 2023);
        assert_eq!(last_week(&done, Some(&state(2024, 9)), &settings), 17);
    }

    #[test]
    fn cutoff_caps_the_range() {
        let season = four_team_season("L", 2023);
        let weeks = season_weeks(&season, None, &AggregationSettings::default(), Some(5));
        assert_eq!(weeks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn pairs_skip_byes_and_null_ids() {
        let season = four_team_season("L", 2023);
        let data = week(
            &season,
            1,
            vec![
                matchup(1, Some(1), 100.0),
                matchup(3, None, 80.0),
                matchup(2, Some(1), 90.0),
                matchup(4, Some(2), 70.0),
            ],
        );
        let pairs = data.pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].0.roster_id, pairs[0].1.roster_id), (1, 2));
        assert_eq!(data.opponent_of(2).map(|m| m.roster_id), Some(1));
        assert!(data.opponent_of(4).is_none());
        assert!(data.opponent_of(3).is_none());
    }

    #[test]
    fn malformed_triple_yields_no_pair() {
        let season = four_team_season("L", 2023);
        let data = week(
            &season,
            1,
            vec![
                matchup(1, Some(1), 100.0),
                matchup(2, Some(1), 90.0),
                matchup(3, Some(1), 80.0),
            ],
        );
        assert!(data.pairs().is_empty());
    }

    #[tokio::test]
    async fn fetch_is_bounded_and_degrades_failed_weeks() {
        let mut source = MemorySource::new();
        source.add_league(league("L", 2023, None));
        source.set_matchups("L", 3, vec![matchup(1, Some(1), 99.0), matchup(2, Some(1), 98.0)]);
        source.fail_week("L", 4);

        let season = four_team_season("L", 2023);
        let settings = AggregationSettings {
            pool_size: 3,
            ..AggregationSettings::default()
        };
        let weeks = fetch_season_weeks(&source, &[season], None, &settings, None).await;

        assert_eq!(weeks.len(), 17);
        assert_eq!(weeks.iter().map(|w| w.week).collect::<Vec<_>>(), (1..=17).collect::<Vec<_>>());
        assert_eq!(weeks[2].matchups.len(), 2);
        assert!(weeks[3].failed);
        assert!(weeks[3].matchups.is_empty());
        assert!(source.peak_in_flight() <= 3);
        assert_eq!(source.request_count("matchups"), 17);
    }
}
