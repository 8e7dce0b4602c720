// Report assembly: wires the history loader, caches, and statistics into the
// documents the binary prints.
//
// Every section degrades on its own. A section whose inputs are missing is
// `Unavailable` with a reason, and optional enrichment renders a placeholder.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::catalog::{PlayerCatalog, Position};
use crate::api::normalize::ScoringFormat;
use crate::api::scores::ScoresClient;
use crate::api::types::{NflState, TrendingEntry};
use crate::api::{ApiError, LeagueSource, SleeperClient, TrendKind};
use crate::config::Config;
use crate::db::Database;
use crate::history::aggregate::{aggregate_user, Accumulator};
use crate::history::averages::TeamAverages;
use crate::history::cache::HistoryCache;
use crate::history::chain::{ChainBreak, Season};
use crate::history::{load_league_history, LeagueHistory};
use crate::stats::accolades::{compute_accolades, Accolades};
use crate::stats::bracket::{summarize_playoffs, PlayoffSummary};
use crate::stats::franchise::{build_franchises, Franchise};
use crate::stats::standings::{standings, StandingRow};

/// Shown wherever a value could not be computed.
pub const PLACEHOLDER: &str = "—";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => Section::unavailable(e.to_string()),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }
}

fn or_placeholder<T>(value: Option<T>, render: impl FnOnce(T) -> String) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), render)
}

// ---------------------------------------------------------------------------
// League report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub year: u16,
    pub league_id: String,
    pub name: String,
    pub standings: Vec<StandingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueReport {
    pub league_name: String,
    pub generated_at: String,
    /// Newest first.
    pub seasons: Vec<SeasonSummary>,
    pub truncated: Option<ChainBreak>,
    pub franchises: Section<Vec<Franchise>>,
    pub accolades: Section<Accolades>,
    pub playoffs: Section<PlayoffSummary>,
}

impl LeagueReport {
    /// Short human-readable digest of the report.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}: {} seasons",
            self.league_name,
            self.seasons.len()
        )];
        if let Some(gap) = &self.truncated {
            lines.push(format!(
                "History incomplete at league {}: {}",
                gap.league_id, gap.reason
            ));
        }

        match &self.accolades {
            Section::Ready(a) => {
                lines.push(format!(
                    "Best week: {}",
                    or_placeholder(a.best_week.as_ref(), |w| format!(
                        "{} {:.2} ({} week {})",
                        w.team_name, w.points, w.year, w.week
                    ))
                ));
                lines.push(format!(
                    "Worst week: {}",
                    or_placeholder(a.worst_week.as_ref(), |w| format!(
                        "{} {:.2} ({} week {})",
                        w.team_name, w.points, w.year, w.week
                    ))
                ));
                lines.push(format!(
                    "Biggest blowout: {}",
                    or_placeholder(a.biggest_blowout.as_ref(), |g| format!(
                        "{} vs {} by {:.2} ({} week {})",
                        g.home.team_name,
                        g.away.team_name,
                        g.margin(),
                        g.year,
                        g.week
                    ))
                ));
                lines.push(format!(
                    "Biggest rivalry: {}",
                    or_placeholder(a.biggest_rivalry.as_ref(), |r| format!(
                        "{} vs {} ({}-{}-{})",
                        r.first, r.second, r.first_wins, r.second_wins, r.ties
                    ))
                ));
                lines.push(format!(
                    "Draft bust: {}",
                    or_placeholder(a.draft_bust.as_ref(), |d| format!(
                        "{} ({} pick {}, {:.2} pts)",
                        d.player_name, d.year, d.pick_no, d.points
                    ))
                ));
                lines.push(format!(
                    "Draft steal: {}",
                    or_placeholder(a.draft_steal.as_ref(), |d| format!(
                        "{} ({} pick {}, {:.2} pts)",
                        d.player_name, d.year, d.pick_no, d.points
                    ))
                ));
                lines.push(format!(
                    "Community player: {}",
                    or_placeholder(a.community_player.as_ref(), |p| format!(
                        "{} ({} moves)",
                        p.name, p.events
                    ))
                ));
            }
            Section::Unavailable { reason } => lines.push(format!("Accolades unavailable: {reason}")),
        }

        match &self.playoffs {
            Section::Ready(p) => lines.push(format!(
                "Biggest upset: {}",
                or_placeholder(p.biggest_upset.as_ref(), |u| format!(
                    "seed {} over seed {} ({} week {})",
                    u.winner_seed, u.loser_seed, u.year, u.week
                ))
            )),
            Section::Unavailable { reason } => lines.push(format!("Playoffs unavailable: {reason}")),
        }

        if let Section::Ready(franchises) = &self.franchises {
            for f in franchises.iter().filter(|f| f.championships() > 0) {
                lines.push(format!("Champion: {} x{}", f.display_name, f.championships()));
            }
        }
        lines
    }
}

/// Assemble the league report from already-loaded history.
pub fn build_report(history: &LeagueHistory, catalog: &PlayerCatalog, config: &Config) -> LeagueReport {
    let seasons = history
        .seasons
        .iter()
        .map(|s| SeasonSummary {
            year: s.year,
            league_id: s.league_id.clone(),
            name: s.name.clone(),
            standings: standings(s),
        })
        .collect();

    let (accolades, playoffs, franchises) = if history.seasons.is_empty() {
        let reason = match &history.truncated {
            Some(gap) => format!("no seasons loaded ({})", gap.reason),
            None => "no seasons loaded".to_string(),
        };
        (
            Section::unavailable(reason.clone()),
            Section::unavailable(reason.clone()),
            Section::unavailable(reason),
        )
    } else {
        let playoffs = Section::from_result(summarize_playoffs(history, config));
        let computed = playoffs
            .ready()
            .map(|p| p.champions.clone())
            .unwrap_or_default();
        let franchises = build_franchises(&history.seasons, &computed, &config.championships);
        (
            Section::Ready(compute_accolades(history, catalog, config)),
            playoffs,
            Section::Ready(franchises),
        )
    };

    LeagueReport {
        league_name: config.league.name.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        seasons,
        truncated: history.truncated.clone(),
        franchises,
        accolades,
        playoffs,
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Entry point for the binary: a data source, the cache store, and config.
pub struct Leaguebook<'a> {
    source: &'a dyn LeagueSource,
    db: &'a Database,
    config: &'a Config,
}

impl<'a> Leaguebook<'a> {
    pub fn new(source: &'a dyn LeagueSource, db: &'a Database, config: &'a Config) -> Self {
        Self { source, db, config }
    }

    /// Player catalog, or an empty one when it cannot be loaded.
    pub async fn catalog(&self) -> PlayerCatalog {
        match PlayerCatalog::load(self.source, self.db, &self.config.cache.version).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("player catalog unavailable, names and positions degraded: {e}");
                PlayerCatalog::default()
            }
        }
    }

    pub async fn history(&self, cutoff: Option<u32>) -> LeagueHistory {
        load_league_history(
            self.source,
            &self.config.league.id,
            &self.config.aggregation,
            cutoff,
        )
        .await
    }

    pub async fn report(&self) -> LeagueReport {
        let (history, catalog) = tokio::join!(self.history(None), self.catalog());
        let report = build_report(&history, &catalog, self.config);
        info!("Report built for {} seasons", report.seasons.len());
        report
    }

    /// Accumulator for `user_id`, served from `cache` when present.
    pub async fn user_history(
        &self,
        cache: &mut HistoryCache<'_>,
        user_id: &str,
        cutoff: Option<u32>,
    ) -> Accumulator {
        if let Some(hit) = cache.get(user_id, cutoff) {
            return hit;
        }
        let (history, catalog) = tokio::join!(self.history(cutoff), self.catalog());
        let acc = aggregate_user(
            &history.seasons,
            &history.weeks,
            user_id,
            cutoff,
            &catalog,
            &self.config.aggregation,
        );
        cache.put(&acc);
        acc
    }

    /// Mean weekly points per roster of the configured league through
    /// `upto_week`, highest first.
    pub async fn team_averages(
        &self,
        averages: &mut TeamAverages,
        upto_week: u32,
    ) -> Section<Vec<TeamAverage>> {
        let league_id = self.config.league.id.as_str();
        let result = async {
            let league = self.source.league(league_id).await?;
            let (users, rosters) =
                tokio::join!(self.source.users(league_id), self.source.rosters(league_id));
            let season = Season::from_parts(league, users?, rosters?);
            let means = averages.get(self.source, league_id, upto_week).await?;

            let mut rows: Vec<TeamAverage> = means
                .into_iter()
                .map(|(roster_id, average)| TeamAverage {
                    roster_id,
                    team_name: season.roster_label(roster_id),
                    average,
                })
                .collect();
            rows.sort_by(|a, b| {
                b.average
                    .total_cmp(&a.average)
                    .then(a.roster_id.cmp(&b.roster_id))
            });
            Ok::<_, ApiError>(rows)
        }
        .await;
        if let Err(e) = &result {
            warn!("team averages unavailable: {e}");
        }
        Section::from_result(result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAverage {
    pub roster_id: u32,
    pub team_name: String,
    pub average: f64,
}

// ---------------------------------------------------------------------------
// Trending players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPlayer {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub team: Option<String>,
    pub count: u32,
    /// This week's NFL opponent.
    pub opponent: Option<String>,
    /// Projected PPR points this week.
    pub projected: Option<f64>,
}

impl TrendingPlayer {
    pub fn line(&self) -> String {
        format!(
            "{:<24} {:<4} {:<4} {:>6}  vs {:<4} proj {}",
            self.name,
            self.position,
            self.team.as_deref().unwrap_or(PLACEHOLDER),
            self.count,
            self.opponent.as_deref().unwrap_or(PLACEHOLDER),
            or_placeholder(self.projected, |p| format!("{p:.1}")),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingReport {
    pub adds: Section<Vec<TrendingPlayer>>,
    pub drops: Section<Vec<TrendingPlayer>>,
}

/// Trending adds and drops joined with the catalog. When the NFL week is
/// known, players also get their opponent and projection; either lookup
/// failing leaves those fields empty.
pub async fn trending_report(
    client: &SleeperClient,
    scores: &ScoresClient,
    catalog: &PlayerCatalog,
    state: Option<&NflState>,
    lookback_hours: u32,
    limit: u32,
) -> TrendingReport {
    let (adds, drops) = tokio::join!(
        client.trending(TrendKind::Add, lookback_hours, limit),
        client.trending(TrendKind::Drop, lookback_hours, limit)
    );

    let (opponents, projections) = match state {
        Some(state) => {
            let (opponents, projections) = tokio::join!(
                scores.opponents(state.year(), state.week),
                client.weekly_projections(state.year(), state.week)
            );
            let opponents = opponents.unwrap_or_else(|e| {
                warn!("opponent lookup unavailable: {e}");
                BTreeMap::new()
            });
            (opponents, projections)
        }
        None => (BTreeMap::new(), BTreeMap::new()),
    };

    let enrich = |entries: Vec<TrendingEntry>| -> Vec<TrendingPlayer> {
        entries
            .into_iter()
            .map(|e| {
                let slim = catalog.get(&e.player_id);
                let team = slim.and_then(|p| p.team.clone());
                TrendingPlayer {
                    name: catalog.name(&e.player_id),
                    position: catalog.position(&e.player_id),
                    opponent: team.as_ref().and_then(|t| opponents.get(t).cloned()),
                    projected: projections
                        .get(&e.player_id)
                        .map(|s| s.points(ScoringFormat::Ppr)),
                    team,
                    count: e.count,
                    player_id: e.player_id,
                }
            })
            .collect()
    };

    TrendingReport {
        adds: Section::from_result(adds.map(&enrich)),
        drops: Section::from_result(drops.map(&enrich)),
    }
}
