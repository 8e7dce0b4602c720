// League-wide superlatives. Every function here is a pure fold over data the
// history loader already fetched.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::api::catalog::{PlayerCatalog, Position};
use crate::api::types::DraftPick;
use crate::config::{Config, ExceptionsConfig};
use crate::history::aggregate::{decide, Outcome};
use crate::history::weeks::NON_COMPETITIVE_WEEK;
use crate::history::LeagueHistory;

// ---------------------------------------------------------------------------
// Flattened league data
// ---------------------------------------------------------------------------

/// One owned team's score in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekEntry {
    pub user_id: String,
    pub team_name: String,
    pub display_name: String,
    pub year: u16,
    pub week: u32,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSide {
    pub roster_id: u32,
    pub user_id: Option<String>,
    pub team_name: String,
    pub points: f64,
}

/// A decided or tied pairing between two rosters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedGame {
    pub year: u16,
    pub week: u32,
    pub regular_season: bool,
    pub home: GameSide,
    pub away: GameSide,
}

impl PairedGame {
    pub fn margin(&self) -> f64 {
        (self.home.points - self.away.points).abs()
    }

    /// Winner then loser, or `None` for a tie.
    pub fn decided(&self) -> Option<(&GameSide, &GameSide)> {
        match decide(self.home.points, self.away.points) {
            Outcome::Win => Some((&self.home, &self.away)),
            Outcome::Loss => Some((&self.away, &self.home)),
            Outcome::Tie => None,
        }
    }

    fn sides(&self) -> [&GameSide; 2] {
        [&self.home, &self.away]
    }
}

/// Week entries and paired games in (year, week, league, roster) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueData {
    pub entries: Vec<WeekEntry>,
    pub games: Vec<PairedGame>,
}

impl LeagueData {
    pub fn from_history(history: &LeagueHistory) -> Self {
        let mut weeks: Vec<_> = history.weeks.iter().collect();
        weeks.sort_by(|a, b| {
            (a.year, a.week, a.league_id.as_str()).cmp(&(b.year, b.week, b.league_id.as_str()))
        });

        let mut data = LeagueData::default();
        for week in weeks {
            let Some(season) = history.season(&week.league_id) else {
                continue;
            };

            let mut records: Vec<_> = week.matchups.iter().collect();
            records.sort_by_key(|m| m.roster_id);
            for record in records {
                let Some(owner) = season.owner_of(record.roster_id) else {
                    continue;
                };
                data.entries.push(WeekEntry {
                    user_id: owner.to_string(),
                    team_name: season.team_name(owner),
                    display_name: season
                        .user(owner)
                        .map(|u| u.display_name.clone())
                        .unwrap_or_default(),
                    year: week.year,
                    week: week.week,
                    points: record.points,
                });
            }

            let side = |roster_id: u32, points: f64| GameSide {
                roster_id,
                user_id: season.owner_of(roster_id).map(str::to_string),
                team_name: season.roster_label(roster_id),
                points,
            };
            let mut pairs = week.pairs();
            pairs.sort_by_key(|(a, b)| a.roster_id.min(b.roster_id));
            for (a, b) in pairs {
                let (home, away) = if a.roster_id <= b.roster_id { (a, b) } else { (b, a) };
                data.games.push(PairedGame {
                    year: week.year,
                    week: week.week,
                    regular_season: season.is_regular_season_week(week.week),
                    home: side(home.roster_id, home.points),
                    away: side(away.roster_id, away.points),
                });
            }
        }
        data
    }
}

// ---------------------------------------------------------------------------
// Weekly extremes
// ---------------------------------------------------------------------------

/// Highest single-week score. The earliest entry wins ties.
pub fn best_week(entries: &[WeekEntry]) -> Option<&WeekEntry> {
    entries.iter().fold(None, |best: Option<&WeekEntry>, e| match best {
        Some(b) if b.points >= e.points => Some(b),
        _ => Some(e),
    })
}

/// Lowest single-week score, ignoring week 18, scores of exactly zero, and
/// teams named in the worst-week exception list.
pub fn worst_week<'a>(entries: &'a [WeekEntry], exceptions: &ExceptionsConfig) -> Option<&'a WeekEntry> {
    entries
        .iter()
        .filter(|e| e.week != NON_COMPETITIVE_WEEK)
        .filter(|e| e.points != 0.0)
        .filter(|e| {
            !exceptions.excludes_worst_week_team(&e.team_name)
                && !exceptions.excludes_worst_week_team(&e.display_name)
        })
        .fold(None, |worst: Option<&WeekEntry>, e| match worst {
            Some(w) if w.points <= e.points => Some(w),
            _ => Some(e),
        })
}

// ---------------------------------------------------------------------------
// Records and close games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

/// Regular-season win/loss records per user over every loaded season.
pub fn records(games: &[PairedGame]) -> BTreeMap<String, Record> {
    let mut out: BTreeMap<String, Record> = BTreeMap::new();
    for game in games.iter().filter(|g| g.regular_season) {
        match game.decided() {
            Some((winner, loser)) => {
                if let Some(id) = &winner.user_id {
                    out.entry(id.clone()).or_default().wins += 1;
                }
                if let Some(id) = &loser.user_id {
                    out.entry(id.clone()).or_default().losses += 1;
                }
            }
            None => {
                for side in game.sides() {
                    if let Some(id) = &side.user_id {
                        out.entry(id.clone()).or_default().ties += 1;
                    }
                }
            }
        }
    }
    out
}

pub fn close_games(games: &[PairedGame], margin: f64) -> Vec<&PairedGame> {
    games.iter().filter(|g| g.margin() <= margin).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseGameCount {
    pub user_id: String,
    pub count: u32,
}

/// User involved in the most close games. Both sides of a close game are
/// credited; ties go to the lower user id.
pub fn most_close_games(games: &[PairedGame], margin: f64) -> Option<CloseGameCount> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for game in close_games(games, margin) {
        for side in game.sides() {
            if let Some(id) = &side.user_id {
                *counts.entry(id.as_str()).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, u32)>, (id, n)| match best {
            Some((_, b)) if b >= n => best,
            _ => Some((id, n)),
        })
        .map(|(id, count)| CloseGameCount {
            user_id: id.to_string(),
            count,
        })
}

/// Largest margin of victory. The earliest game wins ties.
pub fn biggest_blowout(games: &[PairedGame]) -> Option<&PairedGame> {
    games.iter().fold(None, |best: Option<&PairedGame>, g| match best {
        Some(b) if b.margin() >= g.margin() => Some(b),
        _ => Some(g),
    })
}

/// Smallest margin. The earliest game wins ties.
pub fn closest_game(games: &[PairedGame]) -> Option<&PairedGame> {
    games.iter().fold(None, |best: Option<&PairedGame>, g| match best {
        Some(b) if b.margin() <= g.margin() => Some(b),
        _ => Some(g),
    })
}

// ---------------------------------------------------------------------------
// Head-to-head and rivalry
// ---------------------------------------------------------------------------

/// All-time record between two users; `first` sorts before `second`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rivalry {
    pub first: String,
    pub second: String,
    pub first_wins: u32,
    pub second_wins: u32,
    pub ties: u32,
}

impl Rivalry {
    pub fn games(&self) -> u32 {
        self.first_wins + self.second_wins + self.ties
    }

    pub fn win_diff(&self) -> u32 {
        self.first_wins.abs_diff(self.second_wins)
    }
}

/// League-wide head-to-head matrix over every paired game between two owned
/// rosters of different users.
pub fn league_head_to_head(games: &[PairedGame]) -> BTreeMap<(String, String), Rivalry> {
    let mut out: BTreeMap<(String, String), Rivalry> = BTreeMap::new();
    for game in games {
        let (Some(home), Some(away)) = (&game.home.user_id, &game.away.user_id) else {
            continue;
        };
        if home == away {
            continue;
        }
        let (first, second) = if home < away { (home, away) } else { (away, home) };
        let entry = out
            .entry((first.clone(), second.clone()))
            .or_insert_with(|| Rivalry {
                first: first.clone(),
                second: second.clone(),
                first_wins: 0,
                second_wins: 0,
                ties: 0,
            });
        match game.decided() {
            Some((winner, _)) if winner.user_id.as_ref() == Some(first) => entry.first_wins += 1,
            Some(_) => entry.second_wins += 1,
            None => entry.ties += 1,
        }
    }
    out
}

/// Among pairs with at least `min_games` meetings, the one with the smallest
/// win differential; more meetings break ties.
pub fn biggest_rivalry(
    matrix: &BTreeMap<(String, String), Rivalry>,
    min_games: u32,
) -> Option<&Rivalry> {
    matrix
        .values()
        .filter(|r| r.games() >= min_games)
        .fold(None, |best: Option<&Rivalry>, r| match best {
            Some(b) if rivalry_rank(b) <= rivalry_rank(r) => Some(b),
            _ => Some(r),
        })
}

fn rivalry_rank(r: &Rivalry) -> (u32, Reverse<u32>) {
    (r.win_diff(), Reverse(r.games()))
}

// ---------------------------------------------------------------------------
// Draft bust and steal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftHighlight {
    pub year: u16,
    pub round: u32,
    pub pick_no: u32,
    pub player_id: String,
    pub player_name: String,
    pub picked_by: String,
    /// Points the player scored in the aggregated weeks of the draft season.
    pub points: f64,
}

/// (year, player id) → points scored over that season's aggregated weeks.
pub fn rookie_points(history: &LeagueHistory) -> HashMap<(u16, String), f64> {
    let mut weeks: Vec<_> = history.weeks.iter().collect();
    weeks.sort_by_key(|w| (w.year, w.week));
    let mut out = HashMap::new();
    for week in weeks {
        for record in &week.matchups {
            for (player_id, points) in &record.players_points {
                *out.entry((week.year, player_id.clone())).or_insert(0.0) += points;
            }
        }
    }
    out
}

fn highlights(
    history: &LeagueHistory,
    exceptions: &ExceptionsConfig,
    catalog: &PlayerCatalog,
) -> Vec<DraftHighlight> {
    let rookie = rookie_points(history);
    let mut out = Vec::new();
    for draft in &history.drafts {
        if exceptions.excludes_draft_season(draft.year) {
            continue;
        }
        for pick in draft.picks.iter().filter(|p| !p.player_id.is_empty()) {
            out.push(DraftHighlight {
                year: draft.year,
                round: pick.round,
                pick_no: pick.pick_no,
                player_id: pick.player_id.clone(),
                player_name: pick_name(pick, catalog),
                picked_by: pick.picked_by.clone(),
                points: rookie
                    .get(&(draft.year, pick.player_id.clone()))
                    .copied()
                    .unwrap_or(0.0),
            });
        }
    }
    out.sort_by_key(|h| (h.year, h.pick_no));
    out
}

fn pick_name(pick: &DraftPick, catalog: &PlayerCatalog) -> String {
    if let Some(player) = catalog.get(&pick.player_id) {
        return player.name.clone();
    }
    let joined = format!("{} {}", pick.metadata.first_name, pick.metadata.last_name);
    let joined = joined.trim();
    if joined.is_empty() {
        pick.player_id.clone()
    } else {
        joined.to_string()
    }
}

/// First-round pick with the fewest rookie-season points; the earlier pick
/// wins ties.
pub fn draft_bust(
    history: &LeagueHistory,
    exceptions: &ExceptionsConfig,
    catalog: &PlayerCatalog,
) -> Option<DraftHighlight> {
    highlights(history, exceptions, catalog)
        .into_iter()
        .filter(|h| h.round == 1)
        .fold(None, |best: Option<DraftHighlight>, h| match best {
            Some(b) if b.points <= h.points => Some(b),
            _ => Some(h),
        })
}

/// Pick from any round with the most rookie-season points; the later pick
/// wins ties.
pub fn draft_steal(
    history: &LeagueHistory,
    exceptions: &ExceptionsConfig,
    catalog: &PlayerCatalog,
) -> Option<DraftHighlight> {
    highlights(history, exceptions, catalog)
        .into_iter()
        .fold(None, |best: Option<DraftHighlight>, h| match best {
            Some(b) if b.points > h.points || (b.points == h.points && b.pick_no > h.pick_no) => {
                Some(b)
            }
            _ => Some(h),
        })
}

// ---------------------------------------------------------------------------
// Community player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityPlayer {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    /// Completed adds plus drops across all transaction types.
    pub events: u32,
}

/// Player added and dropped most often, kickers and defenses excluded. Ties
/// go to the lower player id.
pub fn community_player(history: &LeagueHistory, catalog: &PlayerCatalog) -> Option<CommunityPlayer> {
    let mut events: BTreeMap<&str, u32> = BTreeMap::new();
    for week in &history.weeks {
        for txn in week.transactions.iter().filter(|t| t.is_complete()) {
            for player_id in txn.adds.keys().chain(txn.drops.keys()) {
                *events.entry(player_id.as_str()).or_insert(0) += 1;
            }
        }
    }

    events
        .into_iter()
        .filter(|(id, _)| !catalog.position(id).is_streamer())
        .fold(None, |best: Option<(&str, u32)>, (id, n)| match best {
            Some((_, b)) if b >= n => best,
            _ => Some((id, n)),
        })
        .map(|(id, events)| CommunityPlayer {
            player_id: id.to_string(),
            name: catalog.name(id),
            position: catalog.position(id),
            events,
        })
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accolades {
    pub best_week: Option<WeekEntry>,
    pub worst_week: Option<WeekEntry>,
    pub records: BTreeMap<String, Record>,
    pub close_games: usize,
    pub most_close_games: Option<CloseGameCount>,
    pub biggest_blowout: Option<PairedGame>,
    pub closest_game: Option<PairedGame>,
    pub biggest_rivalry: Option<Rivalry>,
    pub draft_bust: Option<DraftHighlight>,
    pub draft_steal: Option<DraftHighlight>,
    pub community_player: Option<CommunityPlayer>,
}

pub fn compute_accolades(history: &LeagueHistory, catalog: &PlayerCatalog, config: &Config) -> Accolades {
    let data = LeagueData::from_history(history);
    let margin = config.aggregation.close_game_margin;
    let matrix = league_head_to_head(&data.games);

    Accolades {
        best_week: best_week(&data.entries).cloned(),
        worst_week: worst_week(&data.entries, &config.exceptions).cloned(),
        records: records(&data.games),
        close_games: close_games(&data.games, margin).len(),
        most_close_games: most_close_games(&data.games, margin),
        biggest_blowout: biggest_blowout(&data.games).cloned(),
        closest_game: closest_game(&data.games).cloned(),
        biggest_rivalry: biggest_rivalry(&matrix, config.aggregation.rivalry_min_games).cloned(),
        draft_bust: draft_bust(history, &config.exceptions, catalog),
        draft_steal: draft_steal(history, &config.exceptions, catalog),
        community_player: community_player(history, catalog),
    }
}
