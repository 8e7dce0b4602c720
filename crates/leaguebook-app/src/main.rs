// Leaguebook entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries the report)
// 2. Parse the command line
// 3. Load config
// 4. Open the cache database
// 5. Build the Sleeper client and run the command

use leaguebook_core::api::scores::ScoresClient;
use leaguebook_core::api::{LeagueSource, SleeperClient};
use leaguebook_core::config;
use leaguebook_core::db::Database;
use leaguebook_core::history::averages::TeamAverages;
use leaguebook_core::history::cache::HistoryCache;
use leaguebook_core::report::{self, Leaguebook, Section, TrendingPlayer};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

/// Trending lookback window and list length.
const TRENDING_LOOKBACK_HOURS: u32 = 24;
const TRENDING_LIMIT: u32 = 25;

/// Averages range when no week is given and the NFL state has no finished week.
const FULL_SEASON_WEEKS: u32 = 17;

#[derive(Parser, Debug)]
#[command(name = "leaguebook")]
#[command(about = "Sleeper league history, records and accolades")]
#[command(version)]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Full league report (the default)
    Report,
    /// Career history of one user
    History {
        user_id: String,
        /// Only count weeks up to and including this one each season
        cutoff: Option<u32>,
    },
    /// Average points per team through a week of the current season
    Averages {
        /// Defaults to the last finished week
        upto_week: Option<u32>,
    },
    /// Players trending on waivers, with this week's projections
    Trending,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Leaguebook starting up");

    // 2. Parse the command line
    let cli = Cli::parse();
    let json = cli.json;
    let command = cli.command.unwrap_or(Command::Report);

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={} ({}), cache version {}",
        config.league.name, config.league.id, config.cache.version
    );

    // 4. Open database
    let db_path = Database::resolve_path(&config.cache.path)?;
    let db = Database::open(&db_path.to_string_lossy()).context("failed to open database")?;
    info!("Database opened at {}", db_path.display());
    for namespace in ["history", "players"] {
        match db.prune_versions(namespace, &config.cache.version) {
            Ok(0) => {}
            Ok(n) => info!("Pruned {n} stale {namespace} cache entries"),
            Err(e) => warn!("cache pruning failed: {e:#}"),
        }
    }
    if let Ok(count) = db.entry_count() {
        info!("Cache holds {count} entries");
    }

    // 5. Run the command
    let client = SleeperClient::from_config(&config.http).context("failed to build HTTP client")?;
    let book = Leaguebook::new(&client, &db, &config);

    match command {
        Command::Report => {
            let report = book.report().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for line in report.summary_lines() {
                    println!("{line}");
                }
            }
        }
        Command::History { user_id, cutoff } => {
            let mut cache = HistoryCache::new(Some(&db), &config.cache.version);
            let acc = book.user_history(&mut cache, &user_id, cutoff).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&acc)?);
            } else {
                println!(
                    "{}: {} weeks, {:.2} points, {} trades",
                    acc.user_id,
                    acc.weekly_points.len(),
                    acc.total_points(),
                    acc.trades.len()
                );
                for stat in &acc.season_stats {
                    println!(
                        "  {} {:<24} {}-{}-{}  PF {:.2}  PA {:.2}",
                        stat.year,
                        stat.team_name,
                        stat.wins,
                        stat.losses,
                        stat.ties,
                        stat.points_for,
                        stat.points_against
                    );
                }
                for week in &acc.top_weeks {
                    println!("  top: {} week {:>2}  {:.2}", week.year, week.week, week.points);
                }
                match acc.mvp() {
                    Some((_, total)) => println!("  MVP: {:.2} starter points", total.starter_points),
                    None => println!("  MVP: {}", report::PLACEHOLDER),
                }
            }
        }
        Command::Averages { upto_week } => {
            let upto_week = match upto_week {
                Some(week) => week,
                None => client
                    .nfl_state()
                    .await
                    .map(|s| s.week.saturating_sub(1))
                    .ok()
                    .filter(|w| *w > 0)
                    .unwrap_or(FULL_SEASON_WEEKS),
            };
            let mut averages = TeamAverages::new(config.aggregation.pool_size);
            let rows = book.team_averages(&mut averages, upto_week).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Average points through week {upto_week}:");
                match &rows {
                    Section::Ready(rows) => {
                        for row in rows {
                            println!("  {:<24} {:>7.2}", row.team_name, row.average);
                        }
                    }
                    Section::Unavailable { reason } => {
                        println!("  {} ({reason})", report::PLACEHOLDER)
                    }
                }
            }
        }
        Command::Trending => {
            let (catalog, state) = tokio::join!(book.catalog(), client.nfl_state());
            let state = state
                .map_err(|e| warn!("NFL state unavailable, skipping week context: {e}"))
                .ok();
            let scores = ScoresClient::new(client.http().clone(), &config.http);
            let trending = report::trending_report(
                &client,
                &scores,
                &catalog,
                state.as_ref(),
                TRENDING_LOOKBACK_HOURS,
                TRENDING_LIMIT,
            )
            .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&trending)?);
            } else {
                print_trending("Adds", &trending.adds);
                print_trending("Drops", &trending.drops);
            }
        }
    }

    info!("Leaguebook finished");
    Ok(())
}

fn print_trending(title: &str, section: &Section<Vec<TrendingPlayer>>) {
    println!("{title}:");
    match section {
        Section::Ready(players) => {
            for player in players {
                println!("  {}", player.line());
            }
        }
        Section::Unavailable { reason } => println!("  {} ({reason})", report::PLACEHOLDER),
    }
}

/// Initialize tracing to log to a file so stdout stays clean for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("leaguebook.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("leaguebook=info,leaguebook_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("leaguebook").chain(args.iter().copied()))
    }

    #[test]
    fn no_subcommand_means_report() {
        let cli = parse(&[]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn parses_subcommands() {
        assert_eq!(parse(&["trending"]).unwrap().command, Some(Command::Trending));
        assert_eq!(
            parse(&["history", "u1", "9"]).unwrap().command,
            Some(Command::History {
                user_id: "u1".into(),
                cutoff: Some(9)
            })
        );
        assert_eq!(
            parse(&["averages"]).unwrap().command,
            Some(Command::Averages { upto_week: None })
        );
        assert_eq!(
            parse(&["averages", "6"]).unwrap().command,
            Some(Command::Averages { upto_week: Some(6) })
        );
    }

    #[test]
    fn json_flag_is_accepted_anywhere() {
        assert!(parse(&["--json", "report"]).unwrap().json);
        assert!(parse(&["history", "u1", "--json"]).unwrap().json);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["history", "u1", "nine"]).is_err());
        assert!(parse(&["history"]).is_err());
        assert!(parse(&["bogus"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
