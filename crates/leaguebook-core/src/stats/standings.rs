// Season standings from roster settings.

use serde::{Deserialize, Serialize};

use crate::history::chain::Season;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub roster_id: u32,
    pub user_id: Option<String>,
    pub team_name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
}

/// Rows ordered by wins, then points for, then roster id.
pub fn standings(season: &Season) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = season
        .rosters
        .iter()
        .map(|r| StandingRow {
            roster_id: r.roster_id,
            user_id: r.owner_id.clone(),
            team_name: season.roster_label(r.roster_id),
            wins: r.settings.wins,
            losses: r.settings.losses,
            ties: r.settings.ties,
            points_for: r.settings.points_for(),
            points_against: r.settings.points_against(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.points_for.total_cmp(&a.points_for))
            .then(a.roster_id.cmp(&b.roster_id))
    });
    rows
}
