mod common;

use chrono::{FixedOffset, Utc};
use common::*;
use rss_curator::processing::{candidate_titles, enrich, filter_recent};
use rss_curator::types::*;
use std::collections::HashSet;

#[test]
fn recency_filter_keeps_window_and_order() {
    init_tracing();
    let entries = vec![
        entry("today", Some(at(2025, 1, 17, 1))),
        entry("undated", None),
        entry("two days ago", Some(at(2025, 1, 15, 23))),
        entry("yesterday", Some(at(2025, 1, 16, 0))),
    ];

    let kept = filter_recent(entries, 1, today(), &Utc);
    let titles: Vec<&str> = kept.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["today", "yesterday"]);
}

#[test]
fn recency_filter_judges_dates_in_the_given_zone() {
    // 23:00 UTC on the 15th is already the 16th in UTC+2.
    let entries = vec![entry("late", Some(at(2025, 1, 15, 23)))];
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

    assert_eq!(filter_recent(entries.clone(), 1, today(), &plus_two).len(), 1);
    assert!(filter_recent(entries, 1, today(), &Utc).is_empty());
}

#[test]
fn wider_window_keeps_more() {
    let entries = vec![
        entry("a", Some(at(2025, 1, 17, 1))),
        entry("b", Some(at(2025, 1, 14, 1))),
    ];
    assert_eq!(filter_recent(entries.clone(), 1, today(), &Utc).len(), 1);
    assert_eq!(filter_recent(entries, 3, today(), &Utc).len(), 2);
}

#[test]
fn enricher_joins_on_normalized_title() {
    let candidates = vec![
        entry("Foo.\nBar", Some(at(2025, 1, 17, 5))),
        entry("Not wanted", Some(at(2025, 1, 17, 5))),
    ];
    let accepted: HashSet<String> = HashSet::from(["Foo Bar".to_string()]);

    let records = enrich(&accepted, &candidates, DuplicateTitlePolicy::Collapse);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.title, "Foo Bar");
    assert_eq!(record.abstract_text, "Abstract of Foo.\nBar");
    assert_eq!(record.link, candidates[0].link);
    assert_eq!(record.date, "Fri, 17 Jan 2025 05:00:00 +0000");
    assert_eq!(record.authors, vec!["Ada Lovelace", "Alan Turing"]);
    assert_eq!(record.source, "cs.LG updates on arXiv.org");
}

#[test]
fn candidate_titles_are_unique_and_ordered() {
    let entries = vec![
        entry("B. title", None),
        entry("A title", None),
        entry("B title", None),
    ];
    assert_eq!(candidate_titles(&entries), vec!["B title", "A title"]);
}

#[test]
fn title_normalization() {
    assert_eq!(normalize_title("Foo.\nBar"), "Foo Bar");
    assert_eq!(normalize_title("  Deep   nets.  "), "Deep nets");
}
