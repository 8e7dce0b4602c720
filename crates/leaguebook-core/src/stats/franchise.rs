// Franchise table: one row per user across every loaded season.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ManualChampionship;
use crate::history::chain::Season;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Franchise {
    pub user_id: String,
    /// Longest display name the user has gone by.
    pub display_name: String,
    pub seasons: u32,
    pub computed_championships: u32,
    pub manual_championships: u32,
}

impl Franchise {
    /// Computed and manual titles are added, never substituted.
    pub fn championships(&self) -> u32 {
        self.computed_championships + self.manual_championships
    }
}

/// Fold every season's owners into franchises ordered by user id.
///
/// `computed` holds bracket winners per user id. Users that only appear in the
/// manual table still get a row, named by their id.
pub fn build_franchises(
    seasons: &[Season],
    computed: &BTreeMap<String, u32>,
    manual: &[ManualChampionship],
) -> Vec<Franchise> {
    let mut table: BTreeMap<String, Franchise> = BTreeMap::new();

    for season in seasons {
        let mut owners: Vec<&str> = season.owner_by_roster.values().map(String::as_str).collect();
        owners.sort_unstable();
        owners.dedup();
        for owner in owners {
            let row = row_for(&mut table, owner);
            row.seasons += 1;
            if let Some(user) = season.user(owner) {
                if user.display_name.chars().count() > row.display_name.chars().count() {
                    row.display_name = user.display_name.clone();
                }
            }
        }
    }

    for (user_id, count) in computed {
        row_for(&mut table, user_id).computed_championships += count;
    }
    for entry in manual {
        row_for(&mut table, &entry.user_id).manual_championships += entry.count;
    }

    table
        .into_values()
        .map(|mut row| {
            if row.display_name.is_empty() {
                row.display_name = row.user_id.clone();
            }
            row
        })
        .collect()
}

fn row_for<'a>(table: &'a mut BTreeMap<String, Franchise>, user_id: &str) -> &'a mut Franchise {
    table
        .entry(user_id.to_string())
        .or_insert_with(|| Franchise {
            user_id: user_id.to_string(),
            display_name: String::new(),
            seasons: 0,
            computed_championships: 0,
            manual_championships: 0,
        })
}
