use crate::record::PageRange;

/// Pages to crawl once the optional record cap is applied, at least one.
pub fn total_pages(total_records: usize, per_page: usize, max_records: Option<usize>) -> usize {
    let total = match max_records {
        Some(cap) => total_records.min(cap),
        None => total_records,
    };
    if per_page == 0 {
        return 1;
    }
    total.div_ceil(per_page).max(1)
}

/// Splits `[1, total_pages]` into at most `workers` contiguous ranges.
///
/// Ranges are handed out greedily in page order with `ceil(pages / workers)`
/// pages each, so trailing ranges may be shorter. A range never eats into the
/// single page each following worker is owed, hence exactly
/// `min(workers, total_pages)` ranges.
pub fn partition(total_pages: usize, workers: usize) -> Vec<PageRange> {
    if total_pages == 0 {
        return vec![];
    }
    let workers = workers.clamp(1, total_pages);
    let per_worker = total_pages.div_ceil(workers);

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 1;
    for worker_id in 0..workers {
        let owed = workers - worker_id - 1;
        let end = (start + per_worker - 1).min(total_pages - owed);
        ranges.push(PageRange {
            worker_id,
            start_page: start,
            end_page: end,
        });
        start = end + 1;
    }
    ranges
}
