use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{CrawlConfig, CrawlerConfig};
use crate::extract::{extract_record, read_key};
use crate::lookaside::Lookaside;
use crate::pagination::{goto_page, PaginationSettings};
use crate::record::{DedupKey, Extracted, PageRange, WorkerResult};
use crate::session::{NavigationSession, SessionError, SessionGuard};

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub max_record_retries: usize,
    pub stale_retry_pause: Duration,
    pub page_pause: Duration,
    pub scope: String,
    pub pagination: PaginationSettings,
    /// Raised to make workers stop before their next record
    pub stop: Arc<AtomicBool>,
}

impl From<&CrawlerConfig> for WorkerSettings {
    fn from(c: &CrawlerConfig) -> Self {
        Self {
            max_record_retries: c.max_record_retries,
            stale_retry_pause: c.stale_retry_pause(),
            page_pause: c.page_pause(),
            scope: c.lookaside_scope.clone(),
            pagination: c.into(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl WorkerSettings {
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Crawls one page range on a session of its own.
///
/// Never fails: navigation trouble ends the range early with whatever was
/// collected, record trouble is counted and skipped.
pub fn crawl_range<S>(
    range: PageRange,
    session_conf: &S::Config,
    crawl_conf: &CrawlConfig,
    lookaside: &dyn Lookaside,
    settings: &WorkerSettings,
) -> WorkerResult
where
    S: NavigationSession,
{
    let id = range.worker_id;
    let mut session = match SessionGuard::<S>::open(session_conf, crawl_conf) {
        Ok(session) => session,
        Err(e) => {
            log::error!("[W{id}] Couldn't open session got: {e}");
            return WorkerResult::empty(id);
        }
    };

    if range.start_page > 1 && !goto_page(&mut *session, range.start_page, &settings.pagination) {
        log::error!("[W{id}] Couldn't reach start page {}", range.start_page);
        return WorkerResult::empty(id);
    }

    let mut scanner = PageScanner::new(id, lookaside, settings, None);
    for page in range.start_page..=range.end_page {
        match scanner.scan_page(&mut *session, page) {
            Ok(true) => (),
            Ok(false) => {
                log::warn!("[W{id}] Asked to stop at page {page}");
                break;
            }
            Err(e) => {
                log::warn!("[W{id}] Stopping at page {page} got: {e}");
                break;
            }
        }

        if page == range.end_page {
            scanner.result.completed = true;
            break;
        }

        match session.goto_next() {
            Ok(true) => thread::sleep(settings.page_pause),
            Ok(false) => {
                log::warn!("[W{id}] No page after {page}, range ends early");
                break;
            }
            Err(e) => {
                log::warn!("[W{id}] Couldn't move past page {page} got: {e}");
                break;
            }
        }
    }

    let result = scanner.result;
    log::info!(
        "[W{id}] Done with pages {}~{}: {} records, {} duplicates, {} failures",
        range.start_page,
        range.end_page,
        result.records.len(),
        result.duplicates,
        result.failures
    );
    result
}

/// When the sequential scan gives up.
#[derive(Debug, Clone, Copy)]
pub struct EarlyStop {
    /// Consecutive already-collected keys that end the scan
    pub duplicate_run: usize,
    pub max_records: Option<usize>,
}

/// Walks pages from the one `session` currently shows until the result set
/// ends or `stop` triggers.
///
/// Relies on results being roughly freshness-ordered, so it must not be used
/// on a partitioned range.
pub fn crawl_sequential<S>(
    session: &mut S,
    lookaside: &dyn Lookaside,
    settings: &WorkerSettings,
    stop: EarlyStop,
) -> WorkerResult
where
    S: NavigationSession,
{
    let mut scanner = PageScanner::new(0, lookaside, settings, Some(stop));
    let mut page = session.current_page().unwrap_or(1);

    loop {
        match scanner.scan_page(session, page) {
            Ok(true) => (),
            Ok(false) => {
                scanner.result.completed = !settings.stopped();
                break;
            }
            Err(e) => {
                log::warn!("Stopping at page {page} got: {e}");
                break;
            }
        }

        match session.goto_next() {
            Ok(true) => {
                page += 1;
                thread::sleep(settings.page_pause);
            }
            Ok(false) => {
                log::info!("No page after {page}, crawl complete");
                scanner.result.completed = true;
                break;
            }
            Err(e) => {
                log::warn!("Couldn't move past page {page} got: {e}");
                break;
            }
        }
    }

    scanner.result
}

struct PageScanner<'a> {
    id: usize,
    lookaside: &'a dyn Lookaside,
    settings: &'a WorkerSettings,
    seen: HashSet<DedupKey>,
    stop: Option<EarlyStop>,
    duplicate_run: usize,
    result: WorkerResult,
}

impl<'a> PageScanner<'a> {
    fn new(
        id: usize,
        lookaside: &'a dyn Lookaside,
        settings: &'a WorkerSettings,
        stop: Option<EarlyStop>,
    ) -> Self {
        Self {
            id,
            lookaside,
            settings,
            seen: HashSet::new(),
            stop,
            duplicate_run: 0,
            result: WorkerResult::empty(id),
        }
    }

    /// Extracts every record of the current page. `Ok(false)` asks the
    /// caller to stop scanning.
    fn scan_page<S>(&mut self, session: &mut S, page: usize) -> Result<bool, SessionError>
    where
        S: NavigationSession,
    {
        if self.settings.stopped() {
            return Ok(false);
        }
        let elements = session.visible_record_elements()?;
        let known = self.lookup_known(session, &elements);
        let count = elements.len();
        self.result.pages_visited += 1;
        log::debug!("[W{}] Page {page}: {count} records", self.id);

        for idx in 0..count {
            if self.settings.stopped() {
                return Ok(false);
            }
            if let Some(extracted) = self.extract_with_retry(session, idx, &known) {
                if !self.accept(extracted) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    // One lookaside call per page, with the keys that could be read cheaply.
    fn lookup_known<S>(
        &self,
        session: &mut S,
        elements: &[S::Element],
    ) -> HashMap<DedupKey, Option<String>>
    where
        S: NavigationSession,
    {
        let keys = elements
            .iter()
            .filter_map(|element| read_key(session, element).ok().flatten())
            .collect::<Vec<_>>();
        if keys.is_empty() {
            return HashMap::new();
        }
        match self.lookaside.bulk_lookup(&keys, &self.settings.scope) {
            Ok(known) => known,
            Err(e) => {
                log::warn!("[W{}] Lookaside unavailable, extracting everything: {e}", self.id);
                HashMap::new()
            }
        }
    }

    fn extract_with_retry<S>(
        &mut self,
        session: &mut S,
        idx: usize,
        known: &HashMap<DedupKey, Option<String>>,
    ) -> Option<Extracted>
    where
        S: NavigationSession,
    {
        let mut attempt = 0;
        loop {
            match extract_once(session, idx, known) {
                Ok(Some(extracted)) => return Some(extracted),
                Ok(None) => {
                    log::debug!("[W{}] Record #{} has no title, skipped", self.id, idx + 1);
                    self.result.failures += 1;
                    return None;
                }
                Err(e) if e.is_stale() => {
                    attempt += 1;
                    if attempt > self.settings.max_record_retries {
                        log::warn!(
                            "[W{}] Record #{} still stale after {} retries, skipped",
                            self.id,
                            idx + 1,
                            self.settings.max_record_retries
                        );
                        self.result.failures += 1;
                        return None;
                    }
                    thread::sleep(self.settings.stale_retry_pause);
                }
                Err(e) => {
                    log::warn!("[W{}] Record #{} extraction failed: {e}", self.id, idx + 1);
                    self.result.failures += 1;
                    return None;
                }
            }
        }
    }

    /// Adds a record unless its key was already collected. `false` when an
    /// early stop condition is reached.
    fn accept(&mut self, extracted: Extracted) -> bool {
        let is_known = extracted.is_known();
        let record = extracted.into_record();

        if !self.seen.insert(record.key()) {
            log::debug!("[W{}] Duplicate skipped: {}", self.id, record.title);
            self.result.duplicates += 1;
            self.duplicate_run += 1;
            return match self.stop {
                Some(stop) if self.duplicate_run >= stop.duplicate_run => {
                    log::info!(
                        "{} consecutive duplicates, caught up with known articles",
                        self.duplicate_run
                    );
                    false
                }
                _ => true,
            };
        }

        self.duplicate_run = 0;
        if is_known {
            self.result.known += 1;
        }
        log::debug!(
            "[W{}] [{}] {} | {}",
            self.id,
            record.date,
            record.press,
            record.title.chars().take(40).collect::<String>()
        );
        self.result.records.push(record);

        match self.stop.and_then(|stop| stop.max_records) {
            Some(max) => self.result.records.len() < max,
            None => true,
        }
    }
}

// Elements are located again on every attempt: the list may have been
// re-rendered since the previous one.
fn extract_once<S>(
    session: &mut S,
    idx: usize,
    known: &HashMap<DedupKey, Option<String>>,
) -> Result<Option<Extracted>, SessionError>
where
    S: NavigationSession,
{
    let elements = session.visible_record_elements()?;
    let element = elements
        .get(idx)
        .ok_or_else(|| SessionError::NotFound(format!("record element #{}", idx + 1)))?;
    extract_record(session, element, known)
}
