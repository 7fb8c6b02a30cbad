use std::cmp;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Engine settings, independent of what is being searched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_num_workers")]
    pub num_workers: Option<usize>,

    #[serde(default = "default_mode")]
    pub mode: CrawlMode,

    #[serde(default = "default_max_record_retries")]
    pub max_record_retries: usize,

    #[serde(default = "default_stale_retry_pause_ms")]
    pub stale_retry_pause_ms: u64,

    #[serde(default = "default_count_retries")]
    pub count_retries: usize,

    #[serde(default = "default_count_retry_pause_ms")]
    pub count_retry_pause_ms: u64,

    #[serde(default = "default_max_block_jumps")]
    pub max_block_jumps: usize,

    #[serde(default = "default_page_wait_ms")]
    pub page_wait_ms: u64,

    #[serde(default = "default_page_poll_interval_ms")]
    pub page_poll_interval_ms: u64,

    #[serde(default = "default_page_pause_ms")]
    pub page_pause_ms: u64,

    #[serde(default = "default_duplicate_run_threshold")]
    pub duplicate_run_threshold: usize,

    #[serde(default = "default_lookaside_scope")]
    pub lookaside_scope: String,

    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: Option<u64>,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            mode: default_mode(),
            max_record_retries: default_max_record_retries(),
            stale_retry_pause_ms: default_stale_retry_pause_ms(),
            count_retries: default_count_retries(),
            count_retry_pause_ms: default_count_retry_pause_ms(),
            max_block_jumps: default_max_block_jumps(),
            page_wait_ms: default_page_wait_ms(),
            page_poll_interval_ms: default_page_poll_interval_ms(),
            page_pause_ms: default_page_pause_ms(),
            duplicate_run_threshold: default_duplicate_run_threshold(),
            lookaside_scope: default_lookaside_scope(),
            deadline_ms: default_deadline_ms(),
            handle_sigint: default_handle_sigint(),
        }
    }
}

impl CrawlerConfig {
    pub fn stale_retry_pause(&self) -> Duration {
        Duration::from_millis(self.stale_retry_pause_ms)
    }

    pub fn count_retry_pause(&self) -> Duration {
        Duration::from_millis(self.count_retry_pause_ms)
    }

    pub fn page_wait(&self) -> Duration {
        Duration::from_millis(self.page_wait_ms)
    }

    pub fn page_poll_interval(&self) -> Duration {
        Duration::from_millis(self.page_poll_interval_ms)
    }

    pub fn page_pause(&self) -> Duration {
        Duration::from_millis(self.page_pause_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

fn default_num_workers() -> Option<usize> {
    None
}

fn default_mode() -> CrawlMode {
    CrawlMode::Partitioned
}

fn default_max_record_retries() -> usize {
    2
}

fn default_stale_retry_pause_ms() -> u64 {
    150
}

fn default_count_retries() -> usize {
    3
}

fn default_count_retry_pause_ms() -> u64 {
    500
}

fn default_max_block_jumps() -> usize {
    30
}

fn default_page_wait_ms() -> u64 {
    10_000
}

fn default_page_poll_interval_ms() -> u64 {
    100
}

fn default_page_pause_ms() -> u64 {
    200
}

fn default_duplicate_run_threshold() -> usize {
    4
}

fn default_lookaside_scope() -> String {
    String::from("vote")
}

fn default_deadline_ms() -> Option<u64> {
    None
}

fn default_handle_sigint() -> bool {
    true
}

/// Number of workers used when none is requested: a resource budget, any
/// positive value keeps the partitioning invariants.
pub fn default_parallelism() -> usize {
    if num_cpus::get() >= 8 {
        4
    } else {
        2
    }
}

/// Clamps a requested worker count to `[1, total_pages]`.
pub fn worker_count(requested: Option<usize>, total_pages: usize) -> usize {
    let wanted = requested.unwrap_or_else(default_parallelism);
    cmp::max(1, cmp::min(wanted, total_pages))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CrawlMode {
    /// Estimate, split pages across isolated workers, merge
    Partitioned,
    /// Walk pages on a single session, stop on a run of duplicates
    Sequential,
}

/// What the navigation session should be configured to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    pub query: String,

    #[serde(default)]
    pub unified_categories: Vec<String>,

    #[serde(default)]
    pub incident_categories: Vec<String>,

    #[serde(default)]
    pub period: Period,

    #[serde(default)]
    pub max_records: Option<usize>,
}

impl CrawlConfig {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            unified_categories: vec![],
            incident_categories: vec![],
            period: Period::default(),
            max_records: None,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.query.trim().is_empty() {
            anyhow::bail!("Invalid crawl config, the query term must not be empty");
        }
        if let Period::Range { start, end } = self.period {
            if start > end {
                anyhow::bail!("Invalid crawl config, period starts ({start}) after it ends ({end})");
            }
        }
        if self.max_records == Some(0) {
            anyhow::bail!("Invalid crawl config, `maxRecords` must be positive when set");
        }
        Ok(())
    }

    /// Year the crawl is about, used to name outputs.
    pub fn year(&self) -> i32 {
        match self.period {
            Period::Range { start, .. } => start.year(),
            Period::Preset(_) => Local::now().year(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Period {
    Preset(PresetPeriod),
    Range { start: NaiveDate, end: NaiveDate },
}

impl Default for Period {
    fn default() -> Self {
        Self::Preset(PresetPeriod::Week)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum PresetPeriod {
    Day,
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl PresetPeriod {
    /// Identifier of the matching preset control on the search form.
    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "date1-7",
            Self::Week => "date1-2",
            Self::Month => "date1-3",
            Self::Quarter => "date1-4",
            Self::HalfYear => "date1-5",
            Self::Year => "date1-6",
        }
    }
}
