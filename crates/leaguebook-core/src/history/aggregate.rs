// Per-user reduction of fetched weeks into an `Accumulator`.
//
// Pure and deterministic: weeks are reduced in (year, week, league) order and
// every keyed collection is a BTreeMap, so identical input serializes to
// identical bytes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::chain::Season;
use super::weeks::{WeekData, NON_COMPETITIVE_WEEK};
use crate::api::catalog::{PlayerCatalog, Position};
use crate::api::types::{Matchup, Transaction};
use crate::config::AggregationSettings;

/// Sleeper fills empty starting slots with this id.
pub const EMPTY_SLOT: &str = "0";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

/// Result for the side scoring `points` against `opponent_points`. Equal
/// scores are a tie and credit neither side.
pub fn decide(points: f64, opponent_points: f64) -> Outcome {
    if points > opponent_points {
        Outcome::Win
    } else if points < opponent_points {
        Outcome::Loss
    } else {
        Outcome::Tie
    }
}

// ---------------------------------------------------------------------------
// Accumulator records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyScore {
    pub year: u16,
    pub week: u32,
    pub points: f64,
    pub opponent_id: Option<String>,
    pub opponent_points: Option<f64>,
    pub playoff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerTotal {
    /// Everything the player scored while on the user's roster.
    pub points: f64,
    /// Only the weeks the player started.
    pub starter_points: f64,
    pub weeks: u32,
    pub starts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
}

impl HeadToHead {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    pub fn record(&mut self, points: f64, opponent_points: f64) {
        match decide(points, opponent_points) {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
        self.points_for += points;
        self.points_against += opponent_points;
    }
}

/// Regular-season line for one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStat {
    pub year: u16,
    pub league_id: String,
    pub team_name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub weeks_played: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRef {
    pub season: String,
    pub round: u32,
    /// Roster the pick originally belonged to.
    pub original_roster_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub year: u16,
    pub week: u32,
    pub transaction_id: String,
    pub gained_players: Vec<String>,
    pub sent_players: Vec<String>,
    pub gained_picks: Vec<PickRef>,
    pub sent_picks: Vec<PickRef>,
    /// User ids on the other side of the trade.
    pub partners: Vec<String>,
}

/// Everything known about one user over the aggregated weeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub user_id: String,
    pub cutoff: Option<u32>,
    pub weekly_points: Vec<WeeklyScore>,
    pub player_totals: BTreeMap<String, PlayerTotal>,
    pub position_points: BTreeMap<Position, f64>,
    pub head_to_head: BTreeMap<String, HeadToHead>,
    pub season_stats: Vec<SeasonStat>,
    pub trades: Vec<TradeRecord>,
    pub top_weeks: Vec<WeeklyScore>,
}

impl Accumulator {
    fn new(user_id: &str, cutoff: Option<u32>) -> Self {
        Self {
            user_id: user_id.to_string(),
            cutoff,
            weekly_points: Vec::new(),
            player_totals: BTreeMap::new(),
            position_points: BTreeMap::new(),
            head_to_head: BTreeMap::new(),
            season_stats: Vec::new(),
            trades: Vec::new(),
            top_weeks: Vec::new(),
        }
    }

    /// Player with the most starter points. Ties go to the lower player id.
    pub fn mvp(&self) -> Option<(&str, &PlayerTotal)> {
        let mut best: Option<(&str, &PlayerTotal)> = None;
        for (id, total) in &self.player_totals {
            if total.starts == 0 {
                continue;
            }
            match best {
                Some((_, b)) if b.starter_points >= total.starter_points => {}
                _ => best = Some((id.as_str(), total)),
            }
        }
        best
    }

    pub fn total_points(&self) -> f64 {
        self.weekly_points.iter().map(|w| w.points).sum()
    }
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

/// Reduce `weeks` into the accumulator for `user_id`.
///
/// Weeks whose league is not among `seasons`, weeks past `cutoff`, and week 18
/// are ignored. Weeks where the user had no roster or no record are skipped.
pub fn aggregate_user(
    seasons: &[Season],
    weeks: &[WeekData],
    user_id: &str,
    cutoff: Option<u32>,
    catalog: &PlayerCatalog,
    settings: &AggregationSettings,
) -> Accumulator {
    let mut acc = Accumulator::new(user_id, cutoff);
    let by_league: HashMap<&str, &Season> =
        seasons.iter().map(|s| (s.league_id.as_str(), s)).collect();

    // One stat line per season the user played, oldest first.
    let mut ordered: Vec<&Season> = seasons
        .iter()
        .filter(|s| !s.rosters_of(user_id).is_empty())
        .collect();
    ordered.sort_by_key(|s| s.year);
    let mut stat_index: HashMap<&str, usize> = HashMap::new();
    for season in ordered {
        stat_index.insert(season.league_id.as_str(), acc.season_stats.len());
        acc.season_stats.push(SeasonStat {
            year: season.year,
            league_id: season.league_id.clone(),
            team_name: season.team_name(user_id),
            wins: 0,
            losses: 0,
            ties: 0,
            points_for: 0.0,
            points_against: 0.0,
            weeks_played: 0,
        });
    }

    let mut sorted: Vec<&WeekData> = weeks.iter().collect();
    sorted.sort_by(|a, b| {
        (a.year, a.week, a.league_id.as_str()).cmp(&(b.year, b.week, b.league_id.as_str()))
    });

    for data in sorted {
        if data.week == NON_COMPETITIVE_WEEK || cutoff.is_some_and(|c| data.week > c) {
            continue;
        }
        let Some(season) = by_league.get(data.league_id.as_str()) else {
            continue;
        };
        let rosters = season.rosters_of(user_id);
        if rosters.is_empty() {
            continue;
        }

        for record in data.matchups.iter().filter(|m| rosters.contains(&m.roster_id)) {
            let stat = stat_index
                .get(season.league_id.as_str())
                .map(|i| &mut acc.season_stats[*i]);
            reduce_matchup(
                &mut acc.weekly_points,
                &mut acc.player_totals,
                &mut acc.position_points,
                &mut acc.head_to_head,
                stat,
                season,
                data,
                record,
                catalog,
            );
        }

        for txn in data.transactions.iter().filter(|t| t.is_trade() && t.is_complete()) {
            for roster_id in &rosters {
                if let Some(trade) = trade_record(season, data.week, txn, *roster_id) {
                    acc.trades.push(trade);
                }
            }
        }
    }

    acc.top_weeks = top_weeks(&acc.weekly_points, settings.top_weeks);
    acc
}

#[allow(clippy::too_many_arguments)]
fn reduce_matchup(
    weekly_points: &mut Vec<WeeklyScore>,
    player_totals: &mut BTreeMap<String, PlayerTotal>,
    position_points: &mut BTreeMap<Position, f64>,
    head_to_head: &mut BTreeMap<String, HeadToHead>,
    stat: Option<&mut SeasonStat>,
    season: &Season,
    data: &WeekData,
    record: &Matchup,
    catalog: &PlayerCatalog,
) {
    let opponent = data.opponent_of(record.roster_id);
    let opponent_id = opponent.and_then(|o| season.owner_of(o.roster_id).map(str::to_string));

    weekly_points.push(WeeklyScore {
        year: season.year,
        week: data.week,
        points: record.points,
        opponent_id: opponent_id.clone(),
        opponent_points: opponent.map(|o| o.points),
        playoff: !season.is_regular_season_week(data.week),
    });

    for (player_id, points) in &record.players_points {
        let total = player_totals.entry(player_id.clone()).or_default();
        total.points += points;
        total.weeks += 1;
    }
    for starter in record.starters.iter().filter(|s| s.as_str() != EMPTY_SLOT) {
        let points = record.players_points.get(starter).copied().unwrap_or(0.0);
        let total = player_totals.entry(starter.clone()).or_default();
        total.starter_points += points;
        total.starts += 1;
        *position_points.entry(catalog.position(starter)).or_insert(0.0) += points;
    }

    if let (Some(opp), Some(opp_id)) = (opponent, opponent_id) {
        head_to_head
            .entry(opp_id)
            .or_default()
            .record(record.points, opp.points);
    }

    if !season.is_regular_season_week(data.week) {
        return;
    }
    let Some(stat) = stat else { return };
    stat.weeks_played += 1;
    stat.points_for += record.points;
    if let Some(opp) = opponent {
        stat.points_against += opp.points;
        match decide(record.points, opp.points) {
            Outcome::Win => stat.wins += 1,
            Outcome::Loss => stat.losses += 1,
            Outcome::Tie => stat.ties += 1,
        }
    }
}

fn trade_record(season: &Season, week: u32, txn: &Transaction, roster_id: u32) -> Option<TradeRecord> {
    if !txn.roster_ids.contains(&roster_id) {
        return None;
    }
    let players_for = |side: &BTreeMap<String, u32>| -> Vec<String> {
        side.iter()
            .filter(|(_, r)| **r == roster_id)
            .map(|(p, _)| p.clone())
            .collect()
    };
    let pick_ref = |p: &crate::api::types::TradedPick| PickRef {
        season: p.season.clone(),
        round: p.round,
        original_roster_id: p.roster_id,
    };

    let mut partners: Vec<String> = txn
        .roster_ids
        .iter()
        .filter(|r| **r != roster_id)
        .map(|r| {
            season
                .owner_of(*r)
                .map(str::to_string)
                .unwrap_or_else(|| format!("roster:{r}"))
        })
        .collect();
    partners.sort();
    partners.dedup();

    Some(TradeRecord {
        year: season.year,
        week,
        transaction_id: txn.transaction_id.clone(),
        gained_players: players_for(&txn.adds),
        sent_players: players_for(&txn.drops),
        gained_picks: txn
            .draft_picks
            .iter()
            .filter(|p| p.owner_id == roster_id)
            .map(pick_ref)
            .collect(),
        sent_picks: txn
            .draft_picks
            .iter()
            .filter(|p| p.previous_owner_id == roster_id)
            .map(pick_ref)
            .collect(),
        partners,
    })
}

/// Highest `n` scores, descending; equal scores keep chronological order.
pub fn top_weeks(weekly: &[WeeklyScore], n: usize) -> Vec<WeeklyScore> {
    let mut sorted = weekly.to_vec();
    sorted.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(a.year.cmp(&b.year))
            .then(a.week.cmp(&b.week))
    });
    sorted.truncate(n);
    sorted
}
