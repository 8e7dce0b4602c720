// Average points per roster over weeks `1..=upto_week`, memoized per
// (league, cutoff).

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::pool::run_bounded;
use crate::api::{ApiResult, LeagueSource};

pub struct TeamAverages {
    pool_size: usize,
    memo: HashMap<(String, u32), BTreeMap<u32, f64>>,
}

impl TeamAverages {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            memo: HashMap::new(),
        }
    }

    /// Roster id → mean weekly points. A roster's mean covers only the weeks it
    /// has a record for. Fetch errors propagate and nothing is memoized.
    pub async fn get(
        &mut self,
        source: &dyn LeagueSource,
        league_id: &str,
        upto_week: u32,
    ) -> ApiResult<BTreeMap<u32, f64>> {
        let key = (league_id.to_string(), upto_week);
        if let Some(hit) = self.memo.get(&key) {
            return Ok(hit.clone());
        }

        let weeks: Vec<u32> = (1..=upto_week).collect();
        let fetched = run_bounded(&weeks, self.pool_size, |week| {
            let week = *week;
            async move { source.matchups(league_id, week).await }
        })
        .await;

        let mut sums: BTreeMap<u32, (f64, u32)> = BTreeMap::new();
        for matchups in fetched {
            for m in matchups? {
                let entry = sums.entry(m.roster_id).or_insert((0.0, 0));
                entry.0 += m.points;
                entry.1 += 1;
            }
        }
        let averages: BTreeMap<u32, f64> = sums
            .into_iter()
            .map(|(roster_id, (total, n))| (roster_id, total / f64::from(n)))
            .collect();

        debug!("team averages for {league_id} through week {upto_week} computed");
        self.memo.insert(key, averages.clone());
        Ok(averages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemorySource;
    use crate::test_fixtures::{league, matchup};

    fn source() -> MemorySource {
        let mut source = MemorySource::new();
        source.add_league(league("L", 2023, None));
        source.set_matchups("L", 1, vec![matchup(1, Some(1), 100.0), matchup(2, Some(1), 80.0)]);
        source.set_matchups("L", 2, vec![matchup(1, Some(1), 120.0), matchup(2, Some(1), 90.0)]);
        source.set_matchups("L", 3, vec![matchup(1, Some(1), 50.0)]);
        source
    }

    #[tokio::test]
    async fn averages_per_roster() {
        let source = source();
        let mut averages = TeamAverages::new(4);
        let two = averages.get(&source, "L", 2).await.unwrap();
        assert_eq!(two[&1], 110.0);
        assert_eq!(two[&2], 85.0);

        let three = averages.get(&source, "L", 3).await.unwrap();
        assert_eq!(three[&1], 90.0);
        assert_eq!(three[&2], 85.0);
    }

    #[tokio::test]
    async fn memoized_per_cutoff() {
        let source = source();
        let mut averages = TeamAverages::new(4);
        averages.get(&source, "L", 2).await.unwrap();
        averages.get(&source, "L", 2).await.unwrap();
        assert_eq!(source.request_count("matchups"), 2);
    }

    #[tokio::test]
    async fn errors_propagate() {
        let mut source = source();
        source.fail_week("L", 2);
        let mut averages = TeamAverages::new(4);
        assert!(averages.get(&source, "L", 3).await.is_err());
    }
}
