use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;

use crate::record::{DedupKey, Record};

/// Keys already stored by an external persistence layer.
///
/// Shared by all workers and only expected to be eventually consistent: a
/// record upserted during a crawl may or may not be seen by a later lookup.
pub trait Lookaside: Send + Sync {
    /// Returns the subset of `keys` already stored in `scope`, with their
    /// stored summary when there is one.
    fn bulk_lookup(
        &self,
        keys: &[DedupKey],
        scope: &str,
    ) -> anyhow::Result<HashMap<DedupKey, Option<String>>>;

    fn upsert(&self, record: &Record, scope: &str) -> anyhow::Result<()>;
}

/// Knows nothing, stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookaside;

impl Lookaside for NoLookaside {
    fn bulk_lookup(
        &self,
        _keys: &[DedupKey],
        _scope: &str,
    ) -> anyhow::Result<HashMap<DedupKey, Option<String>>> {
        Ok(HashMap::new())
    }

    fn upsert(&self, _record: &Record, _scope: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryLookaside {
    entries: RwLock<HashMap<(String, DedupKey), Option<String>>>,
}

impl MemoryLookaside {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored entries of `scope`, sorted by key.
    pub fn entries(&self, scope: &str) -> anyhow::Result<Vec<(DedupKey, Option<String>)>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("Lookaside lock poisoned"))?;
        let mut scoped = entries
            .iter()
            .filter(|((s, _), _)| s == scope)
            .map(|((_, key), summary)| (key.clone(), summary.clone()))
            .collect::<Vec<_>>();
        scoped.sort();
        Ok(scoped)
    }

    pub fn insert(&self, key: DedupKey, summary: Option<String>, scope: &str) -> anyhow::Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow!("Lookaside lock poisoned"))?
            .insert((scope.to_string(), key), summary);
        Ok(())
    }
}

impl Lookaside for MemoryLookaside {
    fn bulk_lookup(
        &self,
        keys: &[DedupKey],
        scope: &str,
    ) -> anyhow::Result<HashMap<DedupKey, Option<String>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("Lookaside lock poisoned"))?;
        let found = keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(&(scope.to_string(), key.clone()))
                    .map(|summary| (key.clone(), summary.clone()))
            })
            .collect();
        Ok(found)
    }

    fn upsert(&self, record: &Record, scope: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("Lookaside lock poisoned"))?;
        let slot = entries
            .entry((scope.to_string(), record.key()))
            .or_insert(None);
        // Keep a stored summary over a missing one
        if record.summary.is_some() {
            *slot = record.summary.clone();
        }
        Ok(())
    }
}
