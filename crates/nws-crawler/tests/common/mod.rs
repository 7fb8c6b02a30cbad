#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nws_crawler::replay::{ReplayArticle, ReplayElement, ReplaySession, ResultSet};
use nws_crawler::{CrawlConfig, CrawlerConfig, Field, NavigationSession, SessionError};

/// Faults injected on top of a replayed result set.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_open: bool,
    /// Page links and block controls are broken
    pub fail_jumps: bool,
    /// The total-count display never becomes readable
    pub fail_total_count: bool,
    /// No pagination control is rendered
    pub no_pagination: bool,
    /// Article index -> number of detail openings that hit a stale element
    pub stale_details: HashMap<usize, usize>,
    /// Articles whose detail view opens but can't be read
    pub broken_details: HashSet<usize>,
    /// Listing this page hangs for the given time
    pub slow_page: Option<(usize, Duration)>,
    /// Every listing takes at least this long
    pub listing_delay: Option<Duration>,
    /// The next control breaks once this page is shown
    pub fail_next_after_page: Option<usize>,
    /// Listing this page crashes the thread
    pub panic_on_page: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Probes {
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub details: Arc<AtomicUsize>,
    pub total_count_reads: Arc<AtomicUsize>,
}

impl Probes {
    pub fn get(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct FlakyConfig {
    pub set: Arc<ResultSet>,
    pub faults: Faults,
    pub probes: Probes,
}

impl FlakyConfig {
    pub fn new(set: ResultSet) -> Self {
        Self {
            set: Arc::new(set),
            faults: Faults::default(),
            probes: Probes::default(),
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }
}

pub struct FlakySession {
    inner: ReplaySession,
    faults: Faults,
    probes: Probes,
}

impl NavigationSession for FlakySession {
    type Config = FlakyConfig;
    type Element = ReplayElement;

    fn open(config: &FlakyConfig, crawl: &CrawlConfig) -> Result<Self, SessionError> {
        if config.faults.fail_open {
            return Err(SessionError::Timeout("result view".into()));
        }
        config.probes.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            inner: ReplaySession::open(&config.set, crawl)?,
            faults: config.faults.clone(),
            probes: config.probes.clone(),
        })
    }

    fn current_page(&mut self) -> Result<usize, SessionError> {
        self.inner.current_page()
    }

    fn goto_next(&mut self) -> Result<bool, SessionError> {
        if self.faults.fail_next_after_page == Some(self.inner.current_page()?) {
            return Err(SessionError::NotFound("next page control".into()));
        }
        self.inner.goto_next()
    }

    fn visible_record_elements(&mut self) -> Result<Vec<ReplayElement>, SessionError> {
        let page = self.inner.current_page()?;
        if self.faults.panic_on_page == Some(page) {
            panic!("result view crashed on page {page}");
        }
        if let Some((slow, delay)) = self.faults.slow_page {
            if page == slow {
                thread::sleep(delay);
            }
        }
        if let Some(delay) = self.faults.listing_delay {
            thread::sleep(delay);
        }
        self.inner.visible_record_elements()
    }

    fn read_field(
        &mut self,
        element: &ReplayElement,
        field: Field,
    ) -> Result<Option<String>, SessionError> {
        self.inner.read_field(element, field)
    }

    fn open_detail(&mut self, element: &ReplayElement) -> Result<String, SessionError> {
        if let Some(left) = self.faults.stale_details.get_mut(&element.index) {
            if *left > 0 {
                *left -= 1;
                return Err(SessionError::Stale);
            }
        }
        let content = self.inner.open_detail(element)?;
        self.probes.details.fetch_add(1, Ordering::SeqCst);
        if self.faults.broken_details.contains(&element.index) {
            return Err(SessionError::Timeout("detail content".into()));
        }
        Ok(content)
    }

    fn close_detail(&mut self) -> Result<(), SessionError> {
        self.inner.close_detail()
    }

    fn total_count_text(&mut self) -> Result<Option<String>, SessionError> {
        self.probes.total_count_reads.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_total_count {
            return Err(SessionError::NotFound("span.total-news-cnt".into()));
        }
        self.inner.total_count_text()
    }

    fn result_summary_text(&mut self) -> Result<Option<String>, SessionError> {
        self.inner.result_summary_text()
    }

    fn pagination_numbers(&mut self) -> Result<Vec<usize>, SessionError> {
        if self.faults.no_pagination {
            return Ok(vec![]);
        }
        self.inner.pagination_numbers()
    }

    fn click_page(&mut self, page: usize) -> Result<(), SessionError> {
        if self.faults.fail_jumps {
            return Err(SessionError::NotFound(format!("page link {page}")));
        }
        self.inner.click_page(page)
    }

    fn next_block(&mut self) -> Result<bool, SessionError> {
        if self.faults.fail_jumps {
            return Err(SessionError::NotFound("next block".into()));
        }
        self.inner.next_block()
    }

    fn close(&mut self) {
        self.probes.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn article(title: &str, date: &str, press: &str) -> ReplayArticle {
    ReplayArticle {
        title: title.into(),
        press: press.into(),
        date: date.into(),
        writer: format!("{press} 기자"),
        link: format!("https://news.example/{press}/{title}"),
        body: format!("{title} 본문"),
    }
}

/// `n` distinct articles, one per day.
pub fn articles(n: usize) -> Vec<ReplayArticle> {
    (1..=n)
        .map(|i| article(&format!("기사 {i}"), &format!("2025/01/{:02}", i % 28 + 1), "연합뉴스"))
        .collect()
}

pub fn result_set(articles: Vec<ReplayArticle>, per_page: usize) -> ResultSet {
    let total = articles.len();
    let mut set = ResultSet::new(articles, per_page);
    set.total_display = Some(format!("{total}"));
    set
}

/// Engine settings without pauses so tests run fast.
pub fn fast_config(num_workers: usize) -> CrawlerConfig {
    CrawlerConfig {
        num_workers: Some(num_workers),
        stale_retry_pause_ms: 0,
        count_retry_pause_ms: 0,
        page_wait_ms: 200,
        page_poll_interval_ms: 1,
        page_pause_ms: 0,
        handle_sigint: false,
        ..Default::default()
    }
}

pub fn titles(records: &[nws_crawler::Record]) -> Vec<String> {
    records.iter().map(|r| r.title.clone()).collect()
}
