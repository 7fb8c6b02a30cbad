use std::thread;
use std::time::{Duration, Instant};

use crate::config::CrawlerConfig;
use crate::session::{NavigationSession, SessionError};

#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    pub max_block_jumps: usize,
    pub page_wait: Duration,
    pub poll_interval: Duration,
}

impl From<&CrawlerConfig> for PaginationSettings {
    fn from(c: &CrawlerConfig) -> Self {
        Self {
            max_block_jumps: c.max_block_jumps,
            page_wait: c.page_wait(),
            poll_interval: c.page_poll_interval(),
        }
    }
}

/// Makes `session` display `target`, clicking through pagination blocks.
///
/// Returns `false` instead of erroring: a failed jump only costs the caller
/// its own range.
pub fn goto_page<S>(session: &mut S, target: usize, settings: &PaginationSettings) -> bool
where
    S: NavigationSession,
{
    let mut current = current_page(session);
    if current == target {
        return true;
    }

    if is_visible(session, target) {
        match click_and_wait(session, target, settings) {
            Ok(()) => {
                log::debug!("Jumped to page {target} from the pagination block");
                return true;
            }
            Err(e) => log::debug!("Direct click on page {target} failed: {e}"),
        }
    }

    for _ in 0..settings.max_block_jumps {
        current = current_page(session);
        if current == target {
            return true;
        }

        let last_in_block = session
            .pagination_numbers()
            .ok()
            .and_then(|pages| pages.into_iter().max())
            .unwrap_or(current);

        if target <= last_in_block {
            return match click_and_wait(session, target, settings) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Couldn't click page {target} got: {e}");
                    current_page(session) == target
                }
            };
        }

        match session.next_block() {
            Ok(true) => (),
            Ok(false) => {
                log::warn!("Next pagination block disabled before page {target}");
                return false;
            }
            Err(e) => {
                log::warn!("Couldn't move to next pagination block got: {e}");
                return false;
            }
        }
        if let Err(e) = wait_for_page(session, settings, |page| page != current) {
            log::warn!("Pagination stopped changing at page {current} got: {e}");
            return false;
        }
    }

    let reached = current_page(session) == target;
    if !reached {
        log::warn!(
            "Gave up reaching page {target} after {} block jumps",
            settings.max_block_jumps
        );
    }
    reached
}

/// Polls the session until its current page satisfies `reached`.
pub fn wait_for_page<S, F>(
    session: &mut S,
    settings: &PaginationSettings,
    reached: F,
) -> Result<usize, SessionError>
where
    S: NavigationSession,
    F: Fn(usize) -> bool,
{
    let started = Instant::now();
    loop {
        if let Ok(page) = session.current_page() {
            if reached(page) {
                return Ok(page);
            }
        }
        if started.elapsed() >= settings.page_wait {
            return Err(SessionError::Timeout(String::from("page change")));
        }
        thread::sleep(settings.poll_interval);
    }
}

fn click_and_wait<S>(
    session: &mut S,
    target: usize,
    settings: &PaginationSettings,
) -> Result<(), SessionError>
where
    S: NavigationSession,
{
    session.click_page(target)?;
    wait_for_page(session, settings, |page| page == target).map(|_| ())
}

fn is_visible<S: NavigationSession>(session: &mut S, page: usize) -> bool {
    session
        .pagination_numbers()
        .map(|pages| pages.contains(&page))
        .unwrap_or(false)
}

// An unreadable page indicator counts as the first page.
fn current_page<S: NavigationSession>(session: &mut S) -> usize {
    session.current_page().unwrap_or(1)
}
