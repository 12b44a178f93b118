//! Dated-section placement in the reading-list document and the conditional
//! commit that writes it back.
//!
//! Sections are located by searching for `## DD Mon YYYY` headers, newest
//! first. A run either appends to today's section or opens a new one above
//! the most recent older section, so there is never more than one header per
//! date.

use crate::traits::DocumentStore;
use crate::types::{CommitAuthor, CuratorError, DailyDigestPayload, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

/// Explicit insert point for documents that have no dated section yet.
pub const INSERT_MARKER: &str = "<!-- curator:insert -->";

const HEADER_PREFIX: &str = "## ";
const HEADER_DATE_FORMAT: &str = "%d %b %Y";

/// `DD Mon YYYY`, the date text used in section headers.
pub fn header_date(day: NaiveDate) -> String {
    day.format(HEADER_DATE_FORMAT).to_string()
}

/// Section header line for `day`, with the trailing hard break.
pub fn section_header(day: NaiveDate) -> String {
    format!("{}{}  ", HEADER_PREFIX, header_date(day))
}

pub fn commit_message(day: NaiveDate) -> String {
    format!("Curator added papers from {}", day.format("%d-%m-%Y"))
}

fn header_text(line: &str) -> Option<&str> {
    line.strip_prefix(HEADER_PREFIX).map(str::trim)
}

fn is_dated_header(line: &str) -> bool {
    header_text(line)
        .map(|text| NaiveDate::parse_from_str(text, HEADER_DATE_FORMAT).is_ok())
        .unwrap_or(false)
}

/// Where a payload ended up in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Appended under today's existing header, found at this line.
    ExistingSection { header_line: usize },
    /// New header block inserted starting at this line.
    NewSection { header_line: usize },
}

/// Inserts `payload` into `content` under today's section and returns the new text.
pub fn place_payload(content: &str, payload: &DailyDigestPayload, today: NaiveDate) -> (String, Placement) {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let payload_markdown = payload.to_markdown();
    let payload_lines = payload_markdown.split('\n').map(str::to_string);
    let today_text = header_date(today);

    if let Some(header) = lines
        .iter()
        .position(|line| header_text(line) == Some(today_text.as_str()))
    {
        let mut at = header + 1;
        if lines.get(at).map(|l| l.trim().is_empty()).unwrap_or(false) {
            at += 1;
        }
        lines.splice(at..at, payload_lines);
        return (lines.join("\n"), Placement::ExistingSection { header_line: header });
    }

    let mut block = vec![section_header(today), String::new()];
    block.extend(payload_lines);

    let at = if let Some(older) = lines.iter().position(|line| is_dated_header(line)) {
        block.push(String::new());
        older
    } else if let Some(marker) = lines.iter().position(|line| line.trim() == INSERT_MARKER) {
        block.insert(0, String::new());
        block.push(String::new());
        marker + 1
    } else {
        // Append, keeping a blank line before the header and a final newline.
        if lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }
        if lines.last().map(|l| !l.trim().is_empty()).unwrap_or(false) {
            block.insert(0, String::new());
        }
        block.push(String::new());
        lines.len()
    };

    let header_line = if block[0].is_empty() { at + 1 } else { at };
    lines.splice(at..at, block);
    (lines.join("\n"), Placement::NewSection { header_line })
}

/// Writes daily digests into one document of a [`DocumentStore`].
pub struct DigestPublisher<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> DigestPublisher<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Reads the document, places the payload, and writes it back conditioned
    /// on the revision that was read. Returns the new commit hash.
    ///
    /// Single shot: a conflict or an unconfirmed commit is returned to the
    /// caller as is.
    pub async fn publish(
        &self,
        payload: &DailyDigestPayload,
        target_path: &str,
        author: &CommitAuthor,
        today: NaiveDate,
    ) -> Result<String> {
        if payload.is_empty() {
            return Err(CuratorError::General(
                "digest payload is empty; nothing to publish".to_string(),
            ));
        }

        let document = self.store.fetch(target_path).await?;
        info!("Read {} at revision {}", document.path, document.sha);

        let (updated, placement) = place_payload(&document.content, payload, today);
        match placement {
            Placement::ExistingSection { header_line } => {
                info!("Appending {} entries under existing header at line {}", payload.len(), header_line)
            }
            Placement::NewSection { header_line } => {
                info!("Opening section for {} at line {}", header_date(today), header_line)
            }
        }

        let commit = self
            .store
            .update(&document, &updated, &commit_message(today), author)
            .await
            .map_err(|e| {
                if let CuratorError::PublishConflict { .. } = e {
                    warn!("Revision of {} moved since read; not overwriting", target_path);
                }
                e
            })?;

        match commit {
            Some(hash) => {
                info!("Published digest to {} in commit {}", target_path, hash);
                Ok(hash)
            }
            None => {
                error!("Write to {} was accepted without a commit id", target_path);
                Err(CuratorError::CommitUnconfirmed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DigestLine;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()
    }

    fn payload(items: &[&str]) -> DailyDigestPayload {
        items.iter().map(|i| DigestLine::new(*i)).collect()
    }

    #[test]
    fn header_and_commit_formats() {
        assert_eq!(section_header(day()), "## 17 Jan 2025  ");
        assert_eq!(commit_message(day()), "Curator added papers from 17-01-2025");
    }

    #[test]
    fn appends_under_todays_header() {
        let doc = "# Reading list\n\n## 17 Jan 2025  \n\n- old  \n\n## 16 Jan 2025  \n\n- older  \n";
        let (out, placement) = place_payload(doc, &payload(&["- new  "]), day());
        assert_eq!(placement, Placement::ExistingSection { header_line: 2 });
        assert_eq!(
            out,
            "# Reading list\n\n## 17 Jan 2025  \n\n- new  \n- old  \n\n## 16 Jan 2025  \n\n- older  \n"
        );
        assert_eq!(out.matches("## 17 Jan 2025").count(), 1);
    }

    #[test]
    fn new_section_goes_above_older_sections() {
        let doc = "# Reading list\n\n## 16 Jan 2025  \n\n- older  \n";
        let (out, placement) = place_payload(doc, &payload(&["- new  "]), day());
        assert_eq!(placement, Placement::NewSection { header_line: 2 });
        assert_eq!(
            out,
            "# Reading list\n\n## 17 Jan 2025  \n\n- new  \n\n## 16 Jan 2025  \n\n- older  \n"
        );
    }

    #[test]
    fn undated_headers_are_not_sections() {
        let doc = "# Reading list\n## About\n<!-- curator:insert -->\n";
        let (out, placement) = place_payload(doc, &payload(&["- new  "]), day());
        assert_eq!(placement, Placement::NewSection { header_line: 4 });
        assert_eq!(
            out,
            "# Reading list\n## About\n<!-- curator:insert -->\n\n## 17 Jan 2025  \n\n- new  \n\n"
        );
    }

    #[test]
    fn appends_to_end_without_marker() {
        let (out, placement) = place_payload("# Reading list\n", &payload(&["- a  ", "- b  "]), day());
        assert_eq!(placement, Placement::NewSection { header_line: 2 });
        assert_eq!(out, "# Reading list\n\n## 17 Jan 2025  \n\n- a  \n- b  \n");
    }

    #[test]
    fn empty_document_gets_one_section() {
        let (out, _) = place_payload("", &payload(&["- a  "]), day());
        assert_eq!(out, "## 17 Jan 2025  \n\n- a  \n");
    }
}
