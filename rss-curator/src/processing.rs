use crate::types::{CanonicalRecord, DuplicateTitlePolicy, FeedEntry};
use chrono::{Days, NaiveDate, TimeZone};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Keeps entries updated on or after `today - window_days`, judged in `tz`.
///
/// Entries without a usable timestamp are dropped. Order is preserved.
pub fn filter_recent<Tz: TimeZone>(
    entries: Vec<FeedEntry>,
    window_days: u32,
    today: NaiveDate,
    tz: &Tz,
) -> Vec<FeedEntry> {
    let Some(cutoff) = today.checked_sub_days(Days::new(window_days as u64)) else {
        return entries
            .into_iter()
            .filter(|entry| entry.updated.is_some())
            .collect();
    };

    let total = entries.len();
    let recent: Vec<FeedEntry> = entries
        .into_iter()
        .filter(|entry| match entry.updated {
            Some(updated) => updated.with_timezone(tz).date_naive() >= cutoff,
            None => {
                debug!("Dropping undated entry: {}", entry.title);
                false
            }
        })
        .collect();

    info!(
        "Kept {}/{} entries updated since {}",
        recent.len(),
        total,
        cutoff
    );
    recent
}

/// Unique normalized titles in first-seen order; this is what the classifier sees.
pub fn candidate_titles(entries: &[FeedEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(FeedEntry::normalized_title)
        .filter(|title| seen.insert(title.clone()))
        .collect()
}

/// Joins accepted titles back to their entries by normalized title.
///
/// Entries whose title was not accepted are dropped; that is the filtering step,
/// not an error.
pub fn enrich(
    accepted_titles: &HashSet<String>,
    candidates: &[FeedEntry],
    policy: DuplicateTitlePolicy,
) -> Vec<CanonicalRecord> {
    let mut emitted = HashSet::new();
    let mut records = Vec::new();

    for entry in candidates {
        let title = entry.normalized_title();
        if !accepted_titles.contains(&title) {
            continue;
        }

        if !emitted.insert(title.clone()) {
            match policy {
                DuplicateTitlePolicy::Collapse => {
                    warn!("Collapsing duplicate entry '{}' from {} ({})", title, entry.feed_title, entry.link);
                    continue;
                }
                DuplicateTitlePolicy::KeepAll => {
                    debug!("Keeping duplicate entry '{}' ({})", title, entry.link);
                }
            }
        }

        records.push(to_record(title, entry));
    }

    info!("Enriched {} accepted entries", records.len());
    records
}

fn to_record(title: String, entry: &FeedEntry) -> CanonicalRecord {
    CanonicalRecord {
        title,
        abstract_text: entry.summary.clone(),
        link: entry.link.clone(),
        date: entry.updated.map(|d| d.to_rfc2822()).unwrap_or_default(),
        authors: entry.authors.clone(),
        source: entry.feed_title.clone(),
    }
}
