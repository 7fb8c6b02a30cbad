use std::collections::{HashMap, HashSet};

use crate::record::{CrawlStats, MergedResult, WorkerResult};

/// Merges worker outputs given in ascending page order.
///
/// The first copy of a key wins, so a record found on a lower page is kept
/// over later ones. The deduplicated list is then cut to `max_records`.
pub fn merge(results: &[WorkerResult], max_records: Option<usize>) -> MergedResult {
    let mut stats = CrawlStats {
        workers: results.len(),
        ..Default::default()
    };

    let mut occurrences = HashMap::new();
    let mut seen = HashSet::new();
    let mut records = vec![];

    for result in results {
        stats.pages_visited += result.pages_visited;
        stats.local_duplicates += result.duplicates;
        stats.failures += result.failures;
        stats.known += result.known;
        if !result.completed {
            stats.workers_incomplete += 1;
        }

        for record in &result.records {
            stats.collected += 1;
            let key = record.key();
            *occurrences.entry(key.clone()).or_insert(0usize) += 1;
            if seen.insert(key) {
                records.push(record.clone());
            } else {
                stats.merged_duplicates += 1;
            }
        }
    }
    stats.duplicated_keys = occurrences.values().filter(|&&n| n > 1).count();

    if let Some(max) = max_records {
        stats.truncated = records.len().saturating_sub(max);
        records.truncate(max);
    }

    log::info!(
        "Merged {} workers: {} collected, {} duplicates dropped ({} keys), {} kept",
        stats.workers,
        stats.collected,
        stats.merged_duplicates,
        stats.duplicated_keys,
        records.len()
    );

    MergedResult { records, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn record(title: &str, date: &str, press: &str) -> Record {
        Record {
            title: title.into(),
            press: press.into(),
            date: date.into(),
            writer: String::new(),
            summary: Some(format!("{title} body")),
            link: format!("https://news.example/{title}"),
        }
    }

    fn worker(id: usize, records: Vec<Record>) -> WorkerResult {
        WorkerResult {
            worker_id: id,
            records,
            completed: true,
            ..Default::default()
        }
    }

    fn titles(merged: &MergedResult) -> Vec<&str> {
        merged.records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn first_seen_wins_across_workers() {
        let a = worker(
            0,
            vec![record("X", "2025-01-01", "A"), record("Y", "2025-01-02", "A")],
        );
        let b = worker(
            1,
            vec![record("Y", "2025-01-02", "B"), record("Z", "2025-01-03", "B")],
        );

        let merged = merge(&[a, b], None);
        assert_eq!(titles(&merged), vec!["X", "Y", "Z"]);
        assert_eq!(merged.records[1].press, "A");
        assert_eq!(merged.stats.merged_duplicates, 1);
        assert_eq!(merged.stats.duplicated_keys, 1);
        assert_eq!(merged.stats.collected, 4);
    }

    #[test]
    fn same_title_other_date_is_another_article() {
        let a = worker(0, vec![record("X", "2025-01-01", "A")]);
        let b = worker(1, vec![record("X", "2025-01-02", "A")]);
        assert_eq!(merge(&[a, b], None).records.len(), 2);
    }

    #[test]
    fn truncates_after_dedup() {
        let a = worker(
            0,
            vec![record("X", "2025-01-01", "A"), record("X", "2025-01-01", "A")],
        );
        let b = worker(
            1,
            vec![record("Y", "2025-01-02", "B"), record("Z", "2025-01-03", "B")],
        );

        let merged = merge(&[a, b], Some(2));
        assert_eq!(titles(&merged), vec!["X", "Y"]);
        assert_eq!(merged.stats.truncated, 1);
    }

    #[test]
    fn merge_is_repeatable() {
        let results = vec![
            worker(0, vec![record("X", "2025-01-01", "A"), record("Y", "2025-01-02", "A")]),
            worker(1, vec![record("Y", "2025-01-02", "B"), record("Z", "2025-01-03", "B")]),
        ];
        assert_eq!(merge(&results, Some(2)), merge(&results, Some(2)));
    }

    #[test]
    fn counters_are_aggregated() {
        let mut a = worker(0, vec![]);
        a.duplicates = 2;
        a.failures = 1;
        a.pages_visited = 4;
        let mut b = WorkerResult::empty(1);
        b.known = 3;

        let stats = merge(&[a, b], None).stats;
        assert_eq!(stats.workers, 2);
        assert_eq!(stats.local_duplicates, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.known, 3);
        assert_eq!(stats.pages_visited, 4);
        assert_eq!(stats.workers_incomplete, 1);
    }
}
