use crate::traits::SummaryModel;
use crate::types::{CanonicalRecord, CuratorError, Result};
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

/// Condenses one abstract. Failures carry the record title and are not retried.
pub async fn summarize(model: &dyn SummaryModel, title: &str, abstract_text: &str) -> Result<String> {
    debug!("Summarizing '{}'", title);
    model
        .summarize(title, abstract_text)
        .await
        .map_err(|e| {
            warn!("Summary failed for '{}': {}", title, e);
            match e {
                e @ CuratorError::Summarizer { .. } => e,
                other => CuratorError::Summarizer {
                    title: title.to_string(),
                    reason: other.to_string(),
                },
            }
        })
}

/// Summarizes every record with at most `concurrency` requests in flight.
///
/// Yields one result per record, in record order, as soon as each is ready.
pub fn summary_stream<'a>(
    model: &'a dyn SummaryModel,
    records: Vec<CanonicalRecord>,
    concurrency: usize,
) -> impl Stream<Item = (CanonicalRecord, Result<String>)> + 'a {
    stream::iter(records)
        .map(move |record| async move {
            let summary = summarize(model, &record.title, &record.abstract_text).await;
            (record, summary)
        })
        .buffered(concurrency.max(1))
}
