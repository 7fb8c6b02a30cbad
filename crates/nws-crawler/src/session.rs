use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::config::CrawlConfig;

/// A stateful, single-owner view over one filtered result set.
///
/// Every call may block while the underlying view loads. Implementations are
/// constructed inside the worker thread that uses them, so they don't need to
/// be `Send`; only their `Config` crosses threads.
pub trait NavigationSession {
    type Config: Clone + Send + 'static;
    type Element;

    /// Opens the result view filtered by `crawl`, showing its first page.
    fn open(config: &Self::Config, crawl: &CrawlConfig) -> Result<Self, SessionError>
    where
        Self: Sized;

    fn current_page(&mut self) -> Result<usize, SessionError>;

    /// Moves to the following page, `Ok(false)` when there is none.
    fn goto_next(&mut self) -> Result<bool, SessionError>;

    /// Locates the record elements of the current page, freshly.
    fn visible_record_elements(&mut self) -> Result<Vec<Self::Element>, SessionError>;

    fn read_field(
        &mut self,
        element: &Self::Element,
        field: Field,
    ) -> Result<Option<String>, SessionError>;

    /// Opens the detail view of `element` and returns its full content.
    fn open_detail(&mut self, element: &Self::Element) -> Result<String, SessionError>;

    fn close_detail(&mut self) -> Result<(), SessionError>;

    /// Raw text of the dedicated total-count display, if rendered yet.
    fn total_count_text(&mut self) -> Result<Option<String>, SessionError>;

    /// Raw text of the free-form result summary header.
    fn result_summary_text(&mut self) -> Result<Option<String>, SessionError>;

    /// Page numbers exposed by the currently rendered pagination block.
    fn pagination_numbers(&mut self) -> Result<Vec<usize>, SessionError>;

    /// Clicks a page number of the current pagination block.
    fn click_page(&mut self, page: usize) -> Result<(), SessionError>;

    /// Shows the next pagination block, `Ok(false)` when the control is disabled.
    fn next_block(&mut self) -> Result<bool, SessionError>;

    /// Releases the underlying resources.
    fn close(&mut self) {}
}

/// Fields that can be read cheaply from a listed record element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Press,
    Date,
    Writer,
    Link,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The element was located before a re-render and is no longer valid
    #[error("Stale element reference")]
    Stale,
    #[error("Element not found: {0}")]
    NotFound(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SessionError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// Owns an opened session and closes it on every exit path.
pub struct SessionGuard<S: NavigationSession> {
    session: S,
}

impl<S: NavigationSession> SessionGuard<S> {
    pub fn open(config: &S::Config, crawl: &CrawlConfig) -> Result<Self, SessionError> {
        Ok(Self {
            session: S::open(config, crawl)?,
        })
    }
}

impl<S: NavigationSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: NavigationSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: NavigationSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}
