use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::RecvTimeoutError;

use crate::config::{worker_count, CrawlConfig, CrawlMode, CrawlerConfig};
use crate::estimate::estimate_total;
use crate::lookaside::Lookaside;
use crate::merge::merge;
use crate::partition::{partition, total_pages};
use crate::record::{MergedResult, WorkerResult};
use crate::session::{NavigationSession, SessionGuard};
use crate::worker::{crawl_range, crawl_sequential, EarlyStop, WorkerSettings};

/// Crawls every record matching `crawl_conf`, blocking until done.
///
/// Each worker opens its own `S` session from `session_conf` on a dedicated
/// thread. Only a result view that can't be shown at all is an error; worker
/// failures shrink the result instead.
pub fn crawl<S>(
    crawler_conf: &CrawlerConfig,
    session_conf: &S::Config,
    crawl_conf: &CrawlConfig,
    lookaside: Arc<dyn Lookaside>,
) -> Result<MergedResult>
where
    S: NavigationSession + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    crawl_until::<S>(crawler_conf, session_conf, crawl_conf, lookaside, stop)
}

/// Same as [`crawl`], but workers stop before their next record once `stop`
/// is raised. What was collected so far is still merged and returned, with
/// `stats.interrupted` set.
pub fn crawl_until<S>(
    crawler_conf: &CrawlerConfig,
    session_conf: &S::Config,
    crawl_conf: &CrawlConfig,
    lookaside: Arc<dyn Lookaside>,
    stop: Arc<AtomicBool>,
) -> Result<MergedResult>
where
    S: NavigationSession + 'static,
{
    crawl_conf.validate()?;
    let started = Instant::now();
    let settings = WorkerSettings::from(crawler_conf).with_stop(stop.clone());

    let mut merged = match crawler_conf.mode {
        CrawlMode::Partitioned => {
            crawl_partitioned::<S>(crawler_conf, session_conf, crawl_conf, lookaside, settings)?
        }
        CrawlMode::Sequential => crawl_single::<S>(
            crawler_conf,
            session_conf,
            crawl_conf,
            lookaside.as_ref(),
            &settings,
        )?,
    };
    merged.stats.interrupted = stop.load(Ordering::SeqCst);

    log::info!(
        "Crawled {:?} in {:.2}s: {} records{}",
        crawl_conf.query,
        started.elapsed().as_secs_f32(),
        merged.records.len(),
        if merged.stats.interrupted { " (interrupted)" } else { "" }
    );
    Ok(merged)
}

/// Async flavour of [`crawl`].
///
/// When `crawler_conf.handle_sigint` is set, Ctrl-C stops the workers and the
/// partial result is returned once they have all let go of their sessions.
pub async fn crawl_news<S>(
    crawler_conf: CrawlerConfig,
    session_conf: S::Config,
    crawl_conf: CrawlConfig,
    lookaside: Arc<dyn Lookaside>,
) -> Result<MergedResult>
where
    S: NavigationSession + 'static,
{
    let handle_sigint = crawler_conf.handle_sigint;
    let stop = Arc::new(AtomicBool::new(false));
    let crawl_stop = stop.clone();
    let mut crawling = tokio::task::spawn_blocking(move || {
        crawl_until::<S>(&crawler_conf, &session_conf, &crawl_conf, lookaside, crawl_stop)
    });

    if handle_sigint {
        tokio::select! {
            res = &mut crawling => return res?,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted, stopping workers");
                stop.store(true, Ordering::SeqCst);
            }
        }
    }
    crawling.await?
}

fn crawl_partitioned<S>(
    crawler_conf: &CrawlerConfig,
    session_conf: &S::Config,
    crawl_conf: &CrawlConfig,
    lookaside: Arc<dyn Lookaside>,
    settings: WorkerSettings,
) -> Result<MergedResult>
where
    S: NavigationSession + 'static,
{
    let deadline = crawler_conf.deadline().map(|d| Instant::now() + d);

    // Estimate

    let estimate = {
        let mut session = SessionGuard::<S>::open(session_conf, crawl_conf)
            .map_err(|e| anyhow!("Couldn't open result view for {:?} got: {e}", crawl_conf.query))?;
        estimate_total(&mut *session, crawler_conf)
            .map_err(|e| anyhow!("No result list for {:?} got: {e}", crawl_conf.query))?
    };
    if estimate.per_page == 0 {
        log::info!("No results for {:?}", crawl_conf.query);
        return Ok(MergedResult::default());
    }

    // Partition

    let pages = total_pages(estimate.total_records, estimate.per_page, crawl_conf.max_records);
    let ranges = partition(pages, worker_count(crawler_conf.num_workers, pages));
    log::info!(
        "{} records ({:?}), {} per page, {pages} pages over {} workers",
        estimate.total_records,
        estimate.source,
        estimate.per_page,
        ranges.len()
    );

    // Workers

    let (tx_result, rx_result) = crossbeam_channel::unbounded::<WorkerResult>();
    let mut workers = vec![];
    for range in ranges.iter().copied() {
        let tx_result = tx_result.clone();
        let session_conf = session_conf.clone();
        let crawl_conf = crawl_conf.clone();
        let lookaside = lookaside.clone();
        let settings = settings.clone();
        let worker = thread::Builder::new()
            .name(format!("worker-{}", range.worker_id))
            .spawn(move || {
                let result =
                    crawl_range::<S>(range, &session_conf, &crawl_conf, lookaside.as_ref(), &settings);
                tx_result.send(result).ok();
            })?;
        workers.push(worker);
    }
    drop(tx_result);

    // Barrier: every worker reports, disconnects, or the deadline passes

    let mut slots: Vec<Option<WorkerResult>> = vec![None; ranges.len()];
    let mut pending = ranges.len();
    let mut timed_out = false;
    while pending > 0 {
        let received = match deadline {
            Some(at) => match rx_result.recv_deadline(at) {
                Ok(result) => Some(result),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("Crawl deadline reached with {pending} workers still running");
                    timed_out = true;
                    None
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => rx_result.recv().ok(),
        };
        let Some(result) = received else { break };
        let id = result.worker_id;
        slots[id] = Some(result);
        pending -= 1;
    }

    for (id, worker) in workers.into_iter().enumerate() {
        if timed_out && slots[id].is_none() {
            // Left running, its session closes whenever it gives up
            continue;
        }
        if worker.join().is_err() {
            log::error!("Worker {id} panicked, its pages are missing");
        }
    }

    let missing = slots.iter().filter(|slot| slot.is_none()).count();
    let results = slots
        .into_iter()
        .enumerate()
        .map(|(id, slot)| slot.unwrap_or_else(|| WorkerResult::empty(id)))
        .collect::<Vec<_>>();

    let mut merged = merge(&results, crawl_conf.max_records);
    if timed_out {
        merged.stats.workers_timed_out = missing;
    }
    Ok(merged)
}

fn crawl_single<S>(
    crawler_conf: &CrawlerConfig,
    session_conf: &S::Config,
    crawl_conf: &CrawlConfig,
    lookaside: &dyn Lookaside,
    settings: &WorkerSettings,
) -> Result<MergedResult>
where
    S: NavigationSession,
{
    let mut session = SessionGuard::<S>::open(session_conf, crawl_conf)
        .map_err(|e| anyhow!("Couldn't open result view for {:?} got: {e}", crawl_conf.query))?;
    let first_page = session
        .visible_record_elements()
        .map_err(|e| anyhow!("No result list for {:?} got: {e}", crawl_conf.query))?;
    if first_page.is_empty() {
        log::info!("No results for {:?}", crawl_conf.query);
        return Ok(MergedResult::default());
    }

    let stop = EarlyStop {
        duplicate_run: crawler_conf.duplicate_run_threshold,
        max_records: crawl_conf.max_records,
    };
    let result = crawl_sequential(&mut *session, lookaside, settings, stop);
    Ok(merge(&[result], crawl_conf.max_records))
}
