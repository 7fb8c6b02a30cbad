use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use nws_crawler::{DedupKey, Lookaside, MemoryLookaside, Record};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KnownArticle {
    title: String,
    date: String,
    #[serde(default)]
    summary: Option<String>,
}

/// Articles stored by previous crawls, grouped by lookaside scope.
type KnownFile = BTreeMap<String, Vec<KnownArticle>>;

/// JSON file backing an in-memory lookaside.
pub struct KnownStore {
    path: PathBuf,
    scopes: BTreeSet<String>,
    lookaside: Arc<MemoryLookaside>,
}

impl KnownStore {
    /// Loads `path`, a missing file being an empty store.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let lookaside = MemoryLookaside::new();
        let mut scopes = BTreeSet::new();

        if path.exists() {
            let file = File::open(path).with_context(|| format!("Couldn't open {path:?}"))?;
            let known: KnownFile = serde_json::from_reader(file)
                .with_context(|| format!("Invalid known articles file {path:?}"))?;
            for (scope, articles) in known {
                for article in articles {
                    lookaside.insert(DedupKey::new(article.title, article.date), article.summary, &scope)?;
                }
                scopes.insert(scope);
            }
        }
        log::info!("Loaded {} known articles from {path:?}", lookaside.len());

        Ok(Self {
            path: path.to_path_buf(),
            scopes,
            lookaside: Arc::new(lookaside),
        })
    }

    pub fn lookaside(&self) -> Arc<MemoryLookaside> {
        self.lookaside.clone()
    }

    /// Stores the records that have a summary and saves the file. Returns the
    /// number of records stored.
    pub fn persist(&mut self, records: &[Record], scope: &str) -> anyhow::Result<usize> {
        let mut stored = 0;
        for record in records {
            if record.summary.is_none() {
                log::warn!("Empty summary, not storing: {}", record.title);
                continue;
            }
            self.lookaside.upsert(record, scope)?;
            stored += 1;
        }
        self.scopes.insert(scope.to_string());
        self.save()?;
        Ok(stored)
    }

    fn save(&self) -> anyhow::Result<()> {
        let mut known = KnownFile::new();
        for scope in &self.scopes {
            let articles = self
                .lookaside
                .entries(scope)?
                .into_iter()
                .map(|(key, summary)| KnownArticle {
                    title: key.title,
                    date: key.date,
                    summary,
                })
                .collect();
            known.insert(scope.clone(), articles);
        }

        let file = File::create(&self.path).with_context(|| format!("Couldn't create {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &known)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, summary: Option<&str>) -> Record {
        Record {
            title: title.into(),
            press: "연합뉴스".into(),
            date: "2025/01/02".into(),
            writer: String::new(),
            summary: summary.map(String::from),
            link: String::new(),
        }
    }

    #[test]
    fn persisted_records_are_known_next_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.json");

        let mut store = KnownStore::load(&path).unwrap();
        assert!(store.lookaside().is_empty());
        let stored = store
            .persist(&[record("a", Some("body a")), record("b", None)], "vote")
            .unwrap();
        assert_eq!(stored, 1);

        let store = KnownStore::load(&path).unwrap();
        let keys = vec![DedupKey::new("a", "2025/01/02"), DedupKey::new("b", "2025/01/02")];
        let found = store.lookaside().bulk_lookup(&keys, "vote").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&keys[0]].as_deref(), Some("body a"));
        assert!(store.lookaside().bulk_lookup(&keys, "kcbert").unwrap().is_empty());
    }
}
