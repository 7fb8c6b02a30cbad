mod common;

use std::time::Duration;

use common::{articles, result_set, Faults, FlakyConfig, FlakySession};
use nws_crawler::{goto_page, CrawlConfig, NavigationSession, PaginationSettings};

fn settings(max_block_jumps: usize) -> PaginationSettings {
    PaginationSettings {
        max_block_jumps,
        page_wait: Duration::from_millis(100),
        poll_interval: Duration::from_millis(1),
    }
}

/// One article per page, pagination blocks of 10.
fn session(pages: usize, faults: Faults) -> FlakySession {
    let conf = FlakyConfig::new(result_set(articles(pages), 1)).with_faults(faults);
    FlakySession::open(&conf, &CrawlConfig::new("hybe")).unwrap()
}

#[test]
fn jumps_inside_the_current_block() {
    let mut s = session(25, Faults::default());
    assert!(goto_page(&mut s, 7, &settings(30)));
    assert_eq!(s.current_page().unwrap(), 7);
}

#[test]
fn walks_blocks_to_a_far_page() {
    let mut s = session(25, Faults::default());
    assert!(goto_page(&mut s, 23, &settings(30)));
    assert_eq!(s.current_page().unwrap(), 23);

    let titles = s
        .visible_record_elements()
        .unwrap()
        .iter()
        .map(|el| s.read_field(el, nws_crawler::Field::Title).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec![Some("기사 23".to_string())]);
}

#[test]
fn current_page_needs_no_navigation() {
    let mut s = session(25, Faults {
        fail_jumps: true,
        ..Default::default()
    });
    assert!(goto_page(&mut s, 1, &settings(30)));
}

#[test]
fn page_past_the_end_is_unreachable() {
    let mut s = session(25, Faults::default());
    assert!(!goto_page(&mut s, 30, &settings(30)));
}

#[test]
fn block_jump_budget_is_honoured() {
    let mut s = session(25, Faults::default());
    assert!(!goto_page(&mut s, 23, &settings(1)));
    assert_eq!(s.current_page().unwrap(), 11);
}

#[test]
fn broken_controls_fail_the_jump() {
    let mut s = session(25, Faults {
        fail_jumps: true,
        ..Default::default()
    });
    assert!(!goto_page(&mut s, 3, &settings(30)));
    assert!(!goto_page(&mut s, 15, &settings(30)));
    assert_eq!(s.current_page().unwrap(), 1);
}
