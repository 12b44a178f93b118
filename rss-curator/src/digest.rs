use crate::types::{CanonicalRecord, DigestLine};

/// Renders one record as a markdown list item.
///
/// Title as a link, then authors, italic source, date and the indented summary,
/// each on its own line. Lines end in two spaces so markdown keeps the breaks.
pub fn format_entry(record: &CanonicalRecord, summary: &str) -> DigestLine {
    DigestLine::new(format!(
        "- [{}]({})  \n{}  \n*{}*  \n{}  \n&ensp;{}  ",
        record.title,
        record.link,
        record.authors.join(", "),
        record.source,
        record.date,
        summary.trim()
    ))
}
