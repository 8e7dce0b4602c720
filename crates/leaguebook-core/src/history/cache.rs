// Two-level accumulator cache: an in-memory map in front of the persisted
// key-value store.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::aggregate::Accumulator;
use crate::db::Database;

pub struct HistoryCache<'a> {
    memory: HashMap<String, Accumulator>,
    db: Option<&'a Database>,
    version: String,
}

impl<'a> HistoryCache<'a> {
    /// `db` is optional so a run can work purely in memory.
    pub fn new(db: Option<&'a Database>, version: &str) -> Self {
        Self {
            memory: HashMap::new(),
            db,
            version: version.to_string(),
        }
    }

    /// `history:{version}:{user_id}:{cutoff}`, with `all` for no cutoff.
    pub fn key(&self, user_id: &str, cutoff: Option<u32>) -> String {
        let cutoff = cutoff.map_or_else(|| "all".to_string(), |c| c.to_string());
        format!("history:{}:{user_id}:{cutoff}", self.version)
    }

    /// Memory first, then the persisted copy. A persisted hit is promoted into
    /// memory. Unreadable persisted entries are treated as misses.
    pub fn get(&mut self, user_id: &str, cutoff: Option<u32>) -> Option<Accumulator> {
        let key = self.key(user_id, cutoff);
        if let Some(acc) = self.memory.get(&key) {
            debug!("history cache hit (memory): {key}");
            return Some(acc.clone());
        }
        let db = self.db?;
        match db.load_typed::<Accumulator>(&key) {
            Ok(Some(acc)) => {
                debug!("history cache hit (store): {key}");
                self.memory.insert(key, acc.clone());
                Some(acc)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("ignoring unreadable history cache entry: {e:#}");
                None
            }
        }
    }

    /// Write to both levels. Persistence failures are logged, not returned.
    pub fn put(&mut self, acc: &Accumulator) {
        let key = self.key(&acc.user_id, acc.cutoff);
        if let Some(db) = self.db {
            if let Err(e) = db.save_typed(&key, acc) {
                warn!("failed to persist {key}: {e:#}");
            }
        }
        self.memory.insert(key, acc.clone());
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }
}
