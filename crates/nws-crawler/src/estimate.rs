use std::thread;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CrawlerConfig;
use crate::session::{NavigationSession, SessionError};

lazy_static! {
    static ref SUMMARY_COUNT: Regex =
        Regex::new(r"(\d[\d,]*)\s*(?:건|results?\b)").expect("Invalid summary count regex");
}

/// Size of the result set shown by a session sitting on its first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub total_records: usize,
    pub per_page: usize,
    pub source: EstimateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    TotalCount,
    ResultSummary,
    Pagination,
    VisiblePage,
}

/// Estimates `(total_records, per_page)`, degrading through the fallbacks.
///
/// Read failures only lower the quality of the estimate; the only error is
/// being unable to list the visible records at all.
pub fn estimate_total<S>(session: &mut S, config: &CrawlerConfig) -> Result<Estimate, SessionError>
where
    S: NavigationSession,
{
    let per_page = session.visible_record_elements()?.len();

    let estimate = |total_records, source| Estimate {
        total_records,
        per_page,
        source,
    };

    for attempt in 1..=config.count_retries {
        match session.total_count_text() {
            Ok(Some(raw)) => {
                if let Some(total) = parse_count(&raw) {
                    log::info!("Total count display reads {total} records");
                    return Ok(estimate(total, EstimateSource::TotalCount));
                }
                log::debug!("Total count display not ready ({attempt}): {raw:?}");
            }
            Ok(None) => log::debug!("Total count display missing ({attempt})"),
            Err(e) => log::debug!("Couldn't read total count ({attempt}) got: {e}"),
        }
        if attempt < config.count_retries {
            thread::sleep(config.count_retry_pause());
        }
    }

    match session.result_summary_text() {
        Ok(Some(text)) => {
            if let Some(total) = parse_summary_count(&text) {
                log::warn!("Total estimated from result summary: {total} records");
                return Ok(estimate(total, EstimateSource::ResultSummary));
            }
        }
        Ok(None) => (),
        Err(e) => log::warn!("Couldn't read result summary got: {e}"),
    }

    match session.pagination_numbers() {
        Ok(pages) => {
            if let Some(last) = pages.into_iter().max() {
                let total = last * per_page;
                log::warn!("Total estimated from pagination: {last} pages, {total} records");
                return Ok(estimate(total, EstimateSource::Pagination));
            }
        }
        Err(e) => log::warn!("Couldn't read pagination got: {e}"),
    }

    log::warn!("No total available, assuming the visible page is the whole result set");
    Ok(estimate(per_page, EstimateSource::VisiblePage))
}

/// Parses a bare count such as `"12,345"`.
pub fn parse_count(raw: &str) -> Option<usize> {
    let digits: String = raw.trim().chars().filter(|&c| c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Finds a `"<number> results"` or `"<number>건"` count in free text.
pub fn parse_summary_count(text: &str) -> Option<usize> {
    SUMMARY_COUNT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_count(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_counts() {
        assert_eq!(parse_count(" 1,234 "), Some(1234));
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("12건"), None);
    }

    #[test]
    fn summary_counts() {
        assert_eq!(parse_summary_count("총 1,234건"), Some(1234));
        assert_eq!(parse_summary_count("뉴스 5,000 건 검색됨"), Some(5000));
        assert_eq!(parse_summary_count("About 87 results"), Some(87));
        assert_eq!(parse_summary_count("1 result"), Some(1));
        assert_eq!(parse_summary_count("no matches"), None);
    }
}
