// Integration tests for leaguebook.
//
// These tests drive the library through its public API against an in-memory
// league source: season chain walking, pooled week fetching, per-user
// aggregation, the two-level history cache, and report assembly.

use std::fs;
use std::path::PathBuf;

use leaguebook_core::api::catalog::PlayerCatalog;
use leaguebook_core::api::memory::MemorySource;
use leaguebook_core::api::types::{
    League, LeagueSettings, Matchup, NflState, Roster, RosterSettings, User, UserMetadata,
};
use leaguebook_core::config::{load_config_from, AggregationSettings, Config};
use leaguebook_core::db::Database;
use leaguebook_core::history::aggregate::aggregate_user;
use leaguebook_core::history::cache::HistoryCache;
use leaguebook_core::history::load_league_history;
use leaguebook_core::report::{Leaguebook, Section};

// ===========================================================================
// Test helpers
// ===========================================================================

const YEARS: [u16; 3] = [2023, 2022, 2021];

fn league_id(year: u16) -> String {
    format!("L{year}")
}

/// Deterministic but uneven weekly score for a roster.
fn score(year: u16, week: u32, roster_id: u32) -> f64 {
    let spread = (roster_id * 7 + week * 13 + u32::from(year)) % 50;
    80.0 + f64::from(spread) + 0.25 * f64::from(roster_id)
}

/// Odd weeks pair 1v2 and 3v4, even weeks pair 1v3 and 2v4.
fn week_matchups(year: u16, week: u32) -> Vec<Matchup> {
    let pairs: [(u32, u32); 2] = if week % 2 == 1 { [(1, 2), (3, 4)] } else { [(1, 3), (2, 4)] };
    let mut out = Vec::new();
    for (matchup_id, (a, b)) in pairs.iter().enumerate() {
        for roster_id in [*a, *b] {
            out.push(Matchup {
                roster_id,
                matchup_id: Some(matchup_id as u32 + 1),
                points: score(year, week, roster_id),
                players_points: [(format!("p{roster_id}"), score(year, week, roster_id))]
                    .into_iter()
                    .collect(),
                starters: vec![format!("p{roster_id}")],
            });
        }
    }
    out
}

/// Three chained four-team seasons, 2023 back to 2021, with weeks 1-18
/// populated. "u1" owns roster 1 in every season.
fn three_season_source() -> MemorySource {
    let mut source = MemorySource::new();
    for (i, year) in YEARS.iter().enumerate() {
        let id = league_id(*year);
        source.add_league(League {
            league_id: id.clone(),
            name: "Integration League".into(),
            season: year.to_string(),
            status: "complete".into(),
            previous_league_id: YEARS.get(i + 1).map(|y| league_id(*y)),
            settings: LeagueSettings {
                playoff_week_start: 15,
            },
        });
        source.add_users(
            &id,
            (1..=4)
                .map(|n| User {
                    user_id: format!("u{n}"),
                    display_name: format!("owner{n}"),
                    avatar: None,
                    metadata: UserMetadata::default(),
                })
                .collect(),
        );
        source.add_rosters(
            &id,
            (1..=4)
                .map(|n| Roster {
                    roster_id: n,
                    owner_id: Some(format!("u{n}")),
                    players: vec![format!("p{n}")],
                    settings: RosterSettings::default(),
                })
                .collect(),
        );
        for week in 1..=18 {
            source.set_matchups(&id, week, week_matchups(*year, week));
        }
    }
    source
}

/// Default config from a private temp copy of `defaults/`.
fn test_config(name: &str) -> Config {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
    let tmp = std::env::temp_dir().join(format!("leaguebook-it-{name}"));
    let config_dir = tmp.join("config");
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(&config_dir).unwrap();
    for file in ["league.toml", "settings.toml"] {
        fs::copy(root.join("defaults").join(file), config_dir.join(file)).unwrap();
    }
    let mut config = load_config_from(&tmp).unwrap();
    config.league.id = league_id(2023);
    config
}

// ===========================================================================
// End-to-end aggregation
// ===========================================================================

#[tokio::test]
async fn three_season_history_end_to_end() {
    let source = three_season_source();
    let settings = AggregationSettings::default();
    let history = load_league_history(&source, "L2023", &settings, None).await;

    let years: Vec<u16> = history.seasons.iter().map(|s| s.year).collect();
    assert_eq!(years, vec![2023, 2022, 2021]);
    assert!(history.truncated.is_none());
    // Weeks 1-17 per season; week 18 is never fetched.
    assert_eq!(history.weeks.len(), 51);
    assert!(history.weeks.iter().all(|w| w.week <= 17));

    let acc = aggregate_user(
        &history.seasons,
        &history.weeks,
        "u1",
        None,
        &PlayerCatalog::default(),
        &settings,
    );

    assert_eq!(acc.season_stats.len(), 3);
    for stat in &acc.season_stats {
        assert_eq!(stat.weeks_played, 14);
        assert_eq!(stat.wins + stat.losses + stat.ties, 14);
    }
    assert_eq!(acc.weekly_points.len(), 51);

    assert_eq!(acc.top_weeks.len(), 5);
    assert!(acc
        .top_weeks
        .windows(2)
        .all(|pair| pair[0].points >= pair[1].points));
    let best = acc
        .weekly_points
        .iter()
        .map(|w| w.points)
        .fold(f64::MIN, f64::max);
    assert_eq!(acc.top_weeks[0].points, best);

    // Roster 1 alternates between rosters 2 and 3.
    assert_eq!(acc.head_to_head.len(), 2);
    assert_eq!(acc.head_to_head["u2"].games() + acc.head_to_head["u3"].games(), 51);
    assert_eq!(acc.mvp().map(|(id, _)| id), Some("p1"));
}

async fn aggregate_u2_as_json(cutoff: Option<u32>) -> String {
    let settings = AggregationSettings::default();
    let source = three_season_source();
    let history = load_league_history(&source, "L2023", &settings, cutoff).await;
    let acc = aggregate_user(
        &history.seasons,
        &history.weeks,
        "u2",
        cutoff,
        &PlayerCatalog::default(),
        &settings,
    );
    serde_json::to_string(&acc).unwrap()
}

#[tokio::test]
async fn aggregation_is_reproducible() {
    assert_eq!(aggregate_u2_as_json(Some(12)).await, aggregate_u2_as_json(Some(12)).await);
    assert_eq!(aggregate_u2_as_json(None).await, aggregate_u2_as_json(None).await);
}

#[tokio::test]
async fn week_fetches_stay_within_pool_size() {
    let source = three_season_source();
    let settings = AggregationSettings {
        pool_size: 4,
        ..AggregationSettings::default()
    };
    load_league_history(&source, "L2023", &settings, None).await;

    assert_eq!(source.request_count("matchups"), 51);
    assert!(source.peak_in_flight() >= 1);
    assert!(source.peak_in_flight() <= 4);
}

#[tokio::test]
async fn in_progress_season_stops_at_last_finished_week() {
    let mut source = three_season_source();
    source.set_nfl_state(NflState {
        week: 9,
        season: "2023".into(),
        season_type: "regular".into(),
    });
    let mut current = source_league(&source, "L2023").await;
    current.status = "in_season".into();
    source.add_league(current);

    let history = load_league_history(&source, "L2023", &AggregationSettings::default(), None).await;
    let current_weeks = history.weeks.iter().filter(|w| w.year == 2023).count();
    assert_eq!(current_weeks, 8);
    assert_eq!(history.weeks.len(), 8 + 17 + 17);
}

async fn source_league(source: &MemorySource, id: &str) -> League {
    use leaguebook_core::api::LeagueSource;
    source.league(id).await.unwrap()
}

#[tokio::test]
async fn broken_chain_is_reported_not_fatal() {
    let mut source = three_season_source();
    source.fail_league("L2021");
    let history = load_league_history(&source, "L2023", &AggregationSettings::default(), None).await;

    assert_eq!(history.seasons.len(), 2);
    let gap = history.truncated.expect("truncation reported");
    assert_eq!(gap.league_id, "L2021");
}

// ===========================================================================
// Caching
// ===========================================================================

#[tokio::test]
async fn history_cache_survives_restart() {
    let path = std::env::temp_dir().join("leaguebook-it-history-cache.db");
    let _ = fs::remove_file(&path);
    let config = test_config("history-cache");
    let source = three_season_source();

    let first = {
        let db = Database::open(&path.to_string_lossy()).unwrap();
        let book = Leaguebook::new(&source, &db, &config);
        let mut cache = HistoryCache::new(Some(&db), &config.cache.version);
        book.user_history(&mut cache, "u1", None).await
    };
    let fetched = source.request_count("matchups");
    assert_eq!(first.season_stats.len(), 3);

    // A new process: fresh memory cache, same database file.
    let db = Database::open(&path.to_string_lossy()).unwrap();
    let book = Leaguebook::new(&source, &db, &config);
    let mut cache = HistoryCache::new(Some(&db), &config.cache.version);
    let second = book.user_history(&mut cache, "u1", None).await;

    assert_eq!(first, second);
    assert_eq!(source.request_count("matchups"), fetched);
    assert_eq!(cache.memory_len(), 1);

    // A different cutoff is a different entry.
    let capped = book.user_history(&mut cache, "u1", Some(6)).await;
    assert_eq!(capped.weekly_points.len(), 18);
    assert!(source.request_count("matchups") > fetched);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn version_bump_invalidates_history() {
    let config = test_config("version-bump");
    let source = three_season_source();
    let db = Database::open(":memory:").unwrap();
    let book = Leaguebook::new(&source, &db, &config);

    let mut v3 = HistoryCache::new(Some(&db), "v3");
    book.user_history(&mut v3, "u3", Some(4)).await;
    let fetched = source.request_count("matchups");

    let mut v4 = HistoryCache::new(Some(&db), "v4");
    book.user_history(&mut v4, "u3", Some(4)).await;
    assert!(source.request_count("matchups") > fetched);
}

// ===========================================================================
// Report
// ===========================================================================

#[tokio::test]
async fn report_over_three_seasons() {
    let mut config = test_config("report");
    config.league.bracket_seasons = vec![2023];
    let source = three_season_source();
    let db = Database::open(":memory:").unwrap();
    let report = Leaguebook::new(&source, &db, &config).report().await;

    assert_eq!(report.seasons.len(), 3);
    let accolades = report.accolades.ready().expect("accolades");
    let best = accolades.best_week.as_ref().expect("best week");
    let worst = accolades.worst_week.as_ref().expect("worst week");
    assert!(best.points >= worst.points);
    assert_eq!(accolades.records.len(), 4);
    let total_wins: u32 = accolades.records.values().map(|r| r.wins).sum();
    let total_losses: u32 = accolades.records.values().map(|r| r.losses).sum();
    assert_eq!(total_wins, total_losses);

    // A four-team league cannot fill the six-team bracket.
    match &report.playoffs {
        Section::Ready(playoffs) => {
            assert!(playoffs.brackets.is_empty());
            assert!(playoffs.skipped.contains_key(&2023));
        }
        Section::Unavailable { reason } => panic!("playoffs unavailable: {reason}"),
    }

    let franchises = report.franchises.ready().expect("franchises");
    assert_eq!(franchises.len(), 4);
    assert!(franchises.iter().all(|f| f.seasons == 3));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["accolades"]["ready"].is_object());
}
