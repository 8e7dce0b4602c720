// Season chain walker.
//
// Each Sleeper league season links to its predecessor through
// `previous_league_id`. Walking that list backward from the current league
// materializes league history, newest season first.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::types::{League, NflState, Roster, User};
use crate::api::LeagueSource;

/// One league season with resolved roster ownership. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub league_id: String,
    pub year: u16,
    pub name: String,
    pub status: String,
    pub previous_league_id: Option<String>,
    /// First playoff week; weeks at or after it are not regular season.
    pub playoff_week_start: u32,
    pub rosters: Vec<Roster>,
    pub users_by_id: BTreeMap<String, User>,
    pub owner_by_roster: BTreeMap<u32, String>,
}

impl Season {
    pub fn from_parts(league: League, users: Vec<User>, rosters: Vec<Roster>) -> Self {
        let owner_by_roster = rosters
            .iter()
            .filter_map(|r| r.owner_id.clone().map(|owner| (r.roster_id, owner)))
            .collect();
        let users_by_id = users.into_iter().map(|u| (u.user_id.clone(), u)).collect();
        Season {
            year: league.year(),
            previous_league_id: league.previous_id().map(str::to_string),
            playoff_week_start: league.settings.playoff_week_start,
            league_id: league.league_id,
            name: league.name,
            status: league.status,
            rosters,
            users_by_id,
            owner_by_roster,
        }
    }

    pub fn owner_of(&self, roster_id: u32) -> Option<&str> {
        self.owner_by_roster.get(&roster_id).map(String::as_str)
    }

    /// Roster ids owned by `user_id` this season (normally one).
    pub fn rosters_of(&self, user_id: &str) -> Vec<u32> {
        self.owner_by_roster
            .iter()
            .filter(|(_, owner)| owner.as_str() == user_id)
            .map(|(roster_id, _)| *roster_id)
            .collect()
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users_by_id.get(user_id)
    }

    /// Team name shown for `user_id` this season, or the id itself.
    pub fn team_name(&self, user_id: &str) -> String {
        self.user(user_id)
            .map(|u| u.team_name().to_string())
            .unwrap_or_else(|| user_id.to_string())
    }

    /// Team name of whoever owns `roster_id`, or "Roster N" when unowned.
    pub fn roster_label(&self, roster_id: u32) -> String {
        match self.owner_of(roster_id) {
            Some(owner) => self.team_name(owner),
            None => format!("Roster {roster_id}"),
        }
    }

    pub fn is_regular_season_week(&self, week: u32) -> bool {
        week < self.playoff_week_start
    }

    /// Still being played: same season as the NFL state and not marked
    /// complete by the league.
    pub fn is_in_progress(&self, state: &NflState) -> bool {
        self.year == state.year() && self.status != "complete"
    }
}

/// Where and why a chain walk stopped early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainBreak {
    pub league_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonChain {
    /// Newest first.
    pub seasons: Vec<Season>,
    /// Set when history is incomplete because a season could not be loaded.
    pub truncated: Option<ChainBreak>,
}

/// Walk the chain starting at `start_league_id`.
///
/// A season whose users or rosters fail to load is dropped, and the walk
/// continues with its predecessor, which the league metadata already names.
/// A league whose metadata fails to load ends the walk, since its predecessor
/// is unknown. Revisiting a league id also ends the walk. Every gap is
/// recorded in `truncated` (the last one wins) and never returned as an error.
pub async fn walk_season_chain(source: &dyn LeagueSource, start_league_id: &str) -> SeasonChain {
    let mut chain = SeasonChain::default();
    let mut visited = HashSet::new();
    let mut next = Some(start_league_id.to_string());

    while let Some(league_id) = next.take() {
        if !visited.insert(league_id.clone()) {
            warn!("season chain revisits league {league_id}; stopping");
            chain.truncated = Some(ChainBreak {
                league_id,
                reason: "league already visited".into(),
            });
            break;
        }

        let league = match source.league(&league_id).await {
            Ok(league) => league,
            Err(e) => {
                warn!("season chain truncated at league {league_id}: {e}");
                chain.truncated = Some(ChainBreak {
                    league_id,
                    reason: e.to_string(),
                });
                break;
            }
        };
        next = league.previous_id().map(str::to_string);

        let (users, rosters) = tokio::join!(source.users(&league_id), source.rosters(&league_id));
        match (users, rosters) {
            (Ok(users), Ok(rosters)) => {
                let season = Season::from_parts(league, users, rosters);
                info!("Loaded season {} (league {})", season.year, season.league_id);
                chain.seasons.push(season);
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("season {} (league {league_id}) dropped: {e}", league.year());
                chain.truncated = Some(ChainBreak {
                    league_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemorySource;
    use crate::test_fixtures::{league, roster, user};

    /// Chain of `years.len()` seasons, ids "L{year}", newest first in `years`.
    fn chained_source(years: &[u16]) -> MemorySource {
        let mut source = MemorySource::new();
        for (i, year) in years.iter().enumerate() {
            let id = format!("L{year}");
            let prev = years.get(i + 1).map(|y| format!("L{y}"));
            source.add_league(league(&id, *year, prev.as_deref()));
            source.add_users(&id, vec![user("u1", "alice"), user("u2", "bob")]);
            source.add_rosters(&id, vec![roster(1, "u1", 8, 6, 1500), roster(2, "u2", 6, 8, 1400)]);
        }
        source
    }

    #[tokio::test]
    async fn walks_n_seasons_newest_first() {
        let source = chained_source(&[2024, 2023, 2022]);
        let chain = walk_season_chain(&source, "L2024").await;

        let years: Vec<u16> = chain.seasons.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2024, 2023, 2022]);
        assert!(chain.truncated.is_none());
        assert_eq!(source.request_count("league"), 3);
    }

    #[tokio::test]
    async fn resolves_roster_ownership() {
        let source = chained_source(&[2024]);
        let chain = walk_season_chain(&source, "L2024").await;
        let season = &chain.seasons[0];

        assert_eq!(season.owner_of(1), Some("u1"));
        assert_eq!(season.rosters_of("u2"), vec![2]);
        assert_eq!(season.team_name("u2"), "bob");
        assert_eq!(season.roster_label(9), "Roster 9");
    }

    #[tokio::test]
    async fn failed_season_truncates_and_is_reported() {
        let mut source = chained_source(&[2024, 2023, 2022]);
        source.fail_league("L2023");

        let chain = walk_season_chain(&source, "L2024").await;
        assert_eq!(chain.seasons.len(), 1);
        let gap = chain.truncated.expect("truncation should be reported");
        assert_eq!(gap.league_id, "L2023");
        assert!(gap.reason.contains("500"));
    }

    #[tokio::test]
    async fn season_with_failed_users_is_skipped() {
        let mut source = chained_source(&[2024, 2023, 2022]);
        source.fail_resource("users", "L2023");

        let chain = walk_season_chain(&source, "L2024").await;
        let years: Vec<u16> = chain.seasons.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2024, 2022]);
        let gap = chain.truncated.expect("skipped season should be reported");
        assert_eq!(gap.league_id, "L2023");
        assert!(gap.reason.contains("/league/L2023/users"));
    }

    #[tokio::test]
    async fn season_with_failed_rosters_is_skipped() {
        let mut source = chained_source(&[2024, 2023, 2022]);
        source.fail_resource("rosters", "L2024");

        let chain = walk_season_chain(&source, "L2024").await;
        let years: Vec<u16> = chain.seasons.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2023, 2022]);
        assert_eq!(chain.truncated.map(|b| b.league_id), Some("L2024".to_string()));
    }

    #[tokio::test]
    async fn cycle_terminates() {
        let mut source = MemorySource::new();
        source.add_league(league("A", 2024, Some("B")));
        source.add_league(league("B", 2023, Some("A")));

        let chain = walk_season_chain(&source, "A").await;
        assert_eq!(chain.seasons.len(), 2);
        assert_eq!(
            chain.truncated.map(|b| b.league_id),
            Some("A".to_string())
        );
    }

    #[tokio::test]
    async fn zero_predecessor_ends_chain() {
        let mut source = MemorySource::new();
        source.add_league(league("A", 2024, Some("0")));
        let chain = walk_season_chain(&source, "A").await;
        assert_eq!(chain.seasons.len(), 1);
        assert!(chain.truncated.is_none());
        assert_eq!(source.request_count("league"), 1);
    }

    #[test]
    fn in_progress_requires_matching_year_and_open_status() {
        let mut season = Season::from_parts(league("A", 2024, None), vec![], vec![]);
        let state = NflState {
            week: 9,
            season: "2024".into(),
            season_type: "regular".into(),
        };
        assert!(!season.is_in_progress(&state));
        season.status = "in_season".into();
        assert!(season.is_in_progress(&state));
        season.year = 2023;
        assert!(!season.is_in_progress(&state));
    }
}
