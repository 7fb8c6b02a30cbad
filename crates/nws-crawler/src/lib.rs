mod config;
mod crawler;
mod estimate;
mod extract;
mod lookaside;
mod merge;
mod pagination;
mod partition;
mod record;
pub mod replay;
mod session;
mod worker;

pub use config::{
    default_parallelism, worker_count, CrawlConfig, CrawlMode, CrawlerConfig, Period, PresetPeriod,
};
pub use crawler::{crawl, crawl_news, crawl_until};
pub use estimate::{estimate_total, parse_count, parse_summary_count, Estimate, EstimateSource};
pub use extract::{extract_record, read_key};
pub use lookaside::{Lookaside, MemoryLookaside, NoLookaside};
pub use merge::merge;
pub use pagination::{goto_page, wait_for_page, PaginationSettings};
pub use partition::{partition, total_pages};
pub use record::{CrawlStats, DedupKey, Extracted, MergedResult, PageRange, Record, WorkerResult};
pub use session::{Field, NavigationSession, SessionError, SessionGuard};
pub use worker::{crawl_range, crawl_sequential, EarlyStop, WorkerSettings};

pub use anyhow;
