// Playoff bracket reconstruction and upset detection.
//
// Only the six-team shape is supported: seeds 1 and 2 sit out the first round
// while 3 plays 6 and 4 plays 5; seed 1 then meets the 3/6 winner and seed 2
// the 4/5 winner; the two semifinal winners play the final. Each round is
// decided by the matchup points of that round's week.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::standings::standings;
use crate::config::{BracketConfig, Config};
use crate::history::chain::Season;
use crate::history::weeks::WeekData;
use crate::history::LeagueHistory;

#[derive(Debug, Error, PartialEq)]
pub enum BracketError {
    #[error("unsupported bracket shape: {teams} teams, {byes} byes, {rounds} rounds")]
    UnsupportedShape {
        teams: usize,
        byes: usize,
        rounds: usize,
    },

    #[error("season {year} has {found} rosters, bracket needs {needed}")]
    NotEnoughTeams {
        year: u16,
        found: usize,
        needed: usize,
    },
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketShape {
    pub teams: usize,
    pub byes: usize,
    /// Week of each round, first round first.
    pub round_weeks: Vec<u32>,
}

impl BracketShape {
    pub fn six_team(round_weeks: [u32; 3]) -> Self {
        Self {
            teams: 6,
            byes: 2,
            round_weeks: round_weeks.to_vec(),
        }
    }

    pub fn from_config(config: &BracketConfig) -> Result<Self, BracketError> {
        let shape = Self {
            teams: config.teams,
            byes: config.byes,
            round_weeks: config.round_weeks.clone(),
        };
        shape.check()?;
        Ok(shape)
    }

    fn check(&self) -> Result<(), BracketError> {
        if self.teams == 6 && self.byes == 2 && self.round_weeks.len() == 3 {
            Ok(())
        } else {
            Err(BracketError::UnsupportedShape {
                teams: self.teams,
                byes: self.byes,
                rounds: self.round_weeks.len(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub seed: u32,
    pub roster_id: u32,
    pub user_id: Option<String>,
    pub team_name: String,
    pub wins: u32,
    pub points_for: f64,
}

/// One bracket game. `winner` is `None` when either side has no points for
/// that week, and nothing downstream of it is played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// 1-based.
    pub round: u32,
    pub week: u32,
    pub higher_seed: u32,
    pub lower_seed: u32,
    pub higher_points: Option<f64>,
    pub lower_points: Option<f64>,
    pub winner: Option<u32>,
}

impl GameResult {
    pub fn is_upset(&self) -> bool {
        self.winner == Some(self.lower_seed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upset {
    pub year: u16,
    pub round: u32,
    pub week: u32,
    pub winner_seed: u32,
    pub loser_seed: u32,
    pub seed_diff: u32,
    pub winner_user_id: Option<String>,
    pub loser_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketResult {
    pub year: u16,
    pub seeds: Vec<Seed>,
    pub games: Vec<GameResult>,
    pub champion: Option<Seed>,
    pub upsets: Vec<Upset>,
}

/// Top `teams` rosters by wins, then points for, then roster id.
pub fn seed_rosters(season: &Season, teams: usize) -> Vec<Seed> {
    standings(season)
        .into_iter()
        .take(teams)
        .enumerate()
        .map(|(i, row)| Seed {
            seed: i as u32 + 1,
            roster_id: row.roster_id,
            user_id: row.user_id,
            team_name: row.team_name,
            wins: row.wins,
            points_for: row.points_for,
        })
        .collect()
}

/// Rebuild `season`'s bracket from its weekly matchup points.
pub fn reconstruct(
    season: &Season,
    weeks: &[WeekData],
    shape: &BracketShape,
) -> Result<BracketResult, BracketError> {
    shape.check()?;
    let seeds = seed_rosters(season, shape.teams);
    if seeds.len() < shape.teams {
        return Err(BracketError::NotEnoughTeams {
            year: season.year,
            found: seeds.len(),
            needed: shape.teams,
        });
    }

    let points = |week: u32, seed: u32| -> Option<f64> {
        let roster_id = seeds[seed as usize - 1].roster_id;
        weeks
            .iter()
            .filter(|w| w.league_id == season.league_id && w.week == week)
            .flat_map(|w| w.matchups.iter())
            .find(|m| m.roster_id == roster_id)
            .map(|m| m.points)
    };
    let play = |round: u32, a: u32, b: u32| -> GameResult {
        let week = shape.round_weeks[round as usize - 1];
        let (higher_seed, lower_seed) = (a.min(b), a.max(b));
        let higher_points = points(week, higher_seed);
        let lower_points = points(week, lower_seed);
        let winner = match (higher_points, lower_points) {
            // Equal points advance the higher seed.
            (Some(h), Some(l)) => Some(if l > h { lower_seed } else { higher_seed }),
            _ => None,
        };
        GameResult {
            round,
            week,
            higher_seed,
            lower_seed,
            higher_points,
            lower_points,
            winner,
        }
    };

    let mut games = Vec::new();
    let first_a = play(1, 3, 6);
    let first_b = play(1, 4, 5);
    let (advance_a, advance_b) = (first_a.winner, first_b.winner);
    games.push(first_a);
    games.push(first_b);

    let semi_a = advance_a.map(|s| play(2, 1, s));
    let semi_b = advance_b.map(|s| play(2, 2, s));
    let finalists = (
        semi_a.as_ref().and_then(|g| g.winner),
        semi_b.as_ref().and_then(|g| g.winner),
    );
    games.extend(semi_a);
    games.extend(semi_b);

    let mut champion = None;
    if let (Some(a), Some(b)) = finalists {
        let final_game = play(3, a, b);
        champion = final_game.winner.map(|s| seeds[s as usize - 1].clone());
        games.push(final_game);
    }

    let upsets = games
        .iter()
        .filter(|g| g.is_upset())
        .map(|g| Upset {
            year: season.year,
            round: g.round,
            week: g.week,
            winner_seed: g.lower_seed,
            loser_seed: g.higher_seed,
            seed_diff: g.lower_seed - g.higher_seed,
            winner_user_id: seeds[g.lower_seed as usize - 1].user_id.clone(),
            loser_user_id: seeds[g.higher_seed as usize - 1].user_id.clone(),
        })
        .collect();

    Ok(BracketResult {
        year: season.year,
        seeds,
        games,
        champion,
        upsets,
    })
}

// ---------------------------------------------------------------------------
// League-wide summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayoffSummary {
    pub brackets: Vec<BracketResult>,
    /// User id → upsets won across all reconstructed brackets.
    pub upset_wins: BTreeMap<String, u32>,
    pub biggest_upset: Option<Upset>,
    /// User id → titles won in reconstructed brackets.
    pub champions: BTreeMap<String, u32>,
    /// Seasons that could not be reconstructed, with the reason.
    pub skipped: BTreeMap<u16, String>,
}

/// Tally upsets and titles over a set of reconstructed brackets. The biggest
/// upset is the largest seed difference; the earliest one wins ties.
pub fn tally(brackets: Vec<BracketResult>) -> PlayoffSummary {
    let mut summary = PlayoffSummary::default();
    for bracket in &brackets {
        for upset in &bracket.upsets {
            if let Some(user) = &upset.winner_user_id {
                *summary.upset_wins.entry(user.clone()).or_insert(0) += 1;
            }
            let bigger = summary
                .biggest_upset
                .as_ref()
                .map_or(true, |best| upset.seed_diff > best.seed_diff);
            if bigger {
                summary.biggest_upset = Some(upset.clone());
            }
        }
        if let Some(user) = bracket.champion.as_ref().and_then(|c| c.user_id.clone()) {
            *summary.champions.entry(user).or_insert(0) += 1;
        }
    }
    summary.brackets = brackets;
    summary
}

/// Reconstruct every configured bracket season present in `history`.
pub fn summarize_playoffs(
    history: &LeagueHistory,
    config: &Config,
) -> Result<PlayoffSummary, BracketError> {
    let shape = BracketShape::from_config(&config.bracket)?;
    let mut years = config.league.bracket_seasons.clone();
    years.sort_unstable();
    years.dedup();

    let mut brackets = Vec::new();
    let mut skipped = BTreeMap::new();
    for year in years {
        let Some(season) = history.season_by_year(year) else {
            warn!("bracket season {year} is not in the loaded history");
            skipped.insert(year, "season not loaded".to_string());
            continue;
        };
        match reconstruct(season, &history.weeks, &shape) {
            Ok(bracket) => brackets.push(bracket),
            Err(e) => {
                warn!("bracket for {year} skipped: {e}");
                skipped.insert(year, e.to_string());
            }
        }
    }

    let mut summary = tally(brackets);
    summary.skipped = skipped;
    info!(
        "Reconstructed {} playoff brackets ({} upsets)",
        summary.brackets.len(),
        summary.upset_wins.values().sum::<u32>()
    );
    Ok(summary)
}
