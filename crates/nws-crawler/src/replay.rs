//! A navigation session over a captured result set.
//!
//! Behaves like the live search page it replaces: records are listed one page
//! at a time, page links are only clickable inside the current pagination
//! block, elements located before a page change turn stale, and the detail
//! view must be closed before another one can be opened.

use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::config::CrawlConfig;
use crate::session::{Field, NavigationSession, SessionError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Text of the total-count display, e.g. `"1,234"`
    #[serde(default)]
    pub total_display: Option<String>,

    /// Text of the result summary header, e.g. `"총 1,234건"`
    #[serde(default)]
    pub summary_display: Option<String>,

    #[serde(default)]
    pub articles: Vec<ReplayArticle>,
}

fn default_per_page() -> usize {
    10
}

fn default_block_size() -> usize {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayArticle {
    pub title: String,
    #[serde(default)]
    pub press: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub writer: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub body: String,
}

impl ResultSet {
    pub fn new(articles: Vec<ReplayArticle>, per_page: usize) -> Self {
        Self {
            per_page,
            block_size: default_block_size(),
            total_display: None,
            summary_display: None,
            articles,
        }
    }

    pub fn page_count(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.articles.len().div_ceil(self.per_page)
    }

    fn block_start(&self, page: usize) -> usize {
        let block = self.block_size.max(1);
        (page - 1) / block * block + 1
    }
}

/// Handle on one listed record, valid until the list is re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayElement {
    pub index: usize,
    render: u64,
}

pub struct ReplaySession {
    set: Arc<ResultSet>,
    page: usize,
    block_start: usize,
    render: u64,
    detail_open: bool,
}

impl ReplaySession {
    pub fn new(set: Arc<ResultSet>) -> Self {
        Self {
            set,
            page: 1,
            block_start: 1,
            render: 0,
            detail_open: false,
        }
    }

    pub fn is_detail_open(&self) -> bool {
        self.detail_open
    }

    fn show(&mut self, page: usize) {
        self.page = page;
        self.block_start = self.set.block_start(page);
        self.render += 1;
    }

    fn article(&self, element: &ReplayElement) -> Result<&ReplayArticle, SessionError> {
        if element.render != self.render {
            return Err(SessionError::Stale);
        }
        self.set
            .articles
            .get(element.index)
            .ok_or_else(|| SessionError::NotFound(format!("article #{}", element.index)))
    }

    fn ensure_list_visible(&self) -> Result<(), SessionError> {
        if self.detail_open {
            return Err(SessionError::Other(anyhow!("Detail view covers the list")));
        }
        Ok(())
    }
}

impl NavigationSession for ReplaySession {
    type Config = Arc<ResultSet>;
    type Element = ReplayElement;

    fn open(config: &Arc<ResultSet>, crawl: &CrawlConfig) -> Result<Self, SessionError> {
        log::debug!(
            "Replaying {} articles for {:?}",
            config.articles.len(),
            crawl.query
        );
        Ok(Self::new(config.clone()))
    }

    fn current_page(&mut self) -> Result<usize, SessionError> {
        Ok(self.page)
    }

    fn goto_next(&mut self) -> Result<bool, SessionError> {
        self.ensure_list_visible()?;
        if self.page >= self.set.page_count() {
            return Ok(false);
        }
        self.show(self.page + 1);
        Ok(true)
    }

    fn visible_record_elements(&mut self) -> Result<Vec<ReplayElement>, SessionError> {
        self.ensure_list_visible()?;
        let start = (self.page - 1) * self.set.per_page;
        let end = (start + self.set.per_page).min(self.set.articles.len());
        Ok((start..end.max(start))
            .map(|index| ReplayElement {
                index,
                render: self.render,
            })
            .collect())
    }

    fn read_field(
        &mut self,
        element: &ReplayElement,
        field: Field,
    ) -> Result<Option<String>, SessionError> {
        let article = self.article(element)?;
        let value = match field {
            Field::Title => &article.title,
            Field::Press => &article.press,
            Field::Date => &article.date,
            Field::Writer => &article.writer,
            Field::Link => &article.link,
        };
        Ok(Some(value.clone()).filter(|v| !v.is_empty()))
    }

    fn open_detail(&mut self, element: &ReplayElement) -> Result<String, SessionError> {
        self.ensure_list_visible()?;
        let body = self.article(element)?.body.clone();
        self.detail_open = true;
        Ok(body)
    }

    fn close_detail(&mut self) -> Result<(), SessionError> {
        self.detail_open = false;
        Ok(())
    }

    fn total_count_text(&mut self) -> Result<Option<String>, SessionError> {
        Ok(self.set.total_display.clone())
    }

    fn result_summary_text(&mut self) -> Result<Option<String>, SessionError> {
        Ok(self.set.summary_display.clone())
    }

    fn pagination_numbers(&mut self) -> Result<Vec<usize>, SessionError> {
        let pages = self.set.page_count();
        let block_end = (self.block_start + self.set.block_size.max(1) - 1).min(pages);
        Ok((self.block_start..=block_end).collect())
    }

    fn click_page(&mut self, page: usize) -> Result<(), SessionError> {
        self.ensure_list_visible()?;
        if !self.pagination_numbers()?.contains(&page) {
            return Err(SessionError::NotFound(format!("page link {page}")));
        }
        self.show(page);
        Ok(())
    }

    fn next_block(&mut self) -> Result<bool, SessionError> {
        self.ensure_list_visible()?;
        let next = self.block_start + self.set.block_size.max(1);
        if next > self.set.page_count() {
            return Ok(false);
        }
        self.show(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles(n: usize) -> Vec<ReplayArticle> {
        (1..=n)
            .map(|i| ReplayArticle {
                title: format!("title {i}"),
                date: "2025/01/01".into(),
                body: format!("body {i}"),
                ..Default::default()
            })
            .collect()
    }

    fn session(n: usize, per_page: usize) -> ReplaySession {
        ReplaySession::new(Arc::new(ResultSet::new(articles(n), per_page)))
    }

    #[test]
    fn elements_turn_stale_after_page_change() {
        let mut s = session(5, 2);
        let first = s.visible_record_elements().unwrap();
        assert_eq!(first.len(), 2);
        assert!(s.goto_next().unwrap());
        assert!(matches!(
            s.read_field(&first[0], Field::Title),
            Err(SessionError::Stale)
        ));

        assert!(s.goto_next().unwrap());
        assert_eq!(s.visible_record_elements().unwrap().len(), 1);
        assert!(!s.goto_next().unwrap());
    }

    #[test]
    fn page_links_are_limited_to_the_block() {
        let mut s = session(25, 1);
        assert_eq!(s.pagination_numbers().unwrap(), (1..=10).collect::<Vec<_>>());
        assert!(s.click_page(12).is_err());
        assert!(s.next_block().unwrap());
        assert_eq!(s.current_page().unwrap(), 11);
        assert!(s.click_page(12).is_ok());
        assert!(s.next_block().unwrap());
        assert_eq!(s.pagination_numbers().unwrap(), (21..=25).collect::<Vec<_>>());
        assert!(!s.next_block().unwrap());
    }

    #[test]
    fn open_detail_blocks_the_list() {
        let mut s = session(3, 3);
        let elements = s.visible_record_elements().unwrap();
        assert_eq!(s.open_detail(&elements[0]).unwrap(), "body 1");
        assert!(s.open_detail(&elements[1]).is_err());
        s.close_detail().unwrap();
        assert_eq!(s.open_detail(&elements[1]).unwrap(), "body 2");
    }
}
