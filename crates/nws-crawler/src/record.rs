use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub press: String,
    pub date: String,
    pub writer: String,
    pub summary: Option<String>,
    pub link: String,
}

impl Record {
    pub fn key(&self) -> DedupKey {
        DedupKey::new(&self.title, &self.date)
    }
}

/// Identity of an article: two records with the same title and date are the
/// same article whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey {
    pub title: String,
    pub date: String,
}

impl DedupKey {
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
        }
    }
}

/// Outcome of extracting one listed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// Full record, summary read from the detail view
    New(Record),
    /// Already stored elsewhere: metadata only, summary backfilled if known
    Known(Record),
}

impl Extracted {
    pub fn into_record(self) -> Record {
        match self {
            Self::New(r) | Self::Known(r) => r,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// Inclusive, 1-based span of pages owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub worker_id: usize,
    pub start_page: usize,
    pub end_page: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerResult {
    pub worker_id: usize,
    pub records: Vec<Record>,
    /// Records skipped because this worker had already collected their key
    pub duplicates: usize,
    /// Elements abandoned: unparseable, or retries exhausted
    pub failures: usize,
    /// Records whose detail view was skipped thanks to the lookaside
    pub known: usize,
    pub pages_visited: usize,
    /// False when the worker stopped before the end of its range
    pub completed: bool,
}

impl WorkerResult {
    pub fn empty(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub workers: usize,
    pub workers_incomplete: usize,
    pub workers_timed_out: usize,
    pub pages_visited: usize,
    /// Records returned by workers, before the merge
    pub collected: usize,
    pub local_duplicates: usize,
    /// Copies dropped by the merge because an earlier worker had the key
    pub merged_duplicates: usize,
    /// Distinct keys that were returned more than once across workers
    pub duplicated_keys: usize,
    pub failures: usize,
    pub known: usize,
    /// Deduplicated records cut by `maxRecords`
    pub truncated: usize,
    /// Workers were asked to stop early, records are partial
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedResult {
    pub records: Vec<Record>,
    pub stats: CrawlStats,
}
