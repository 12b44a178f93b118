//! The curation workflow: a fixed stage machine over the pipeline
//! capabilities, plus a [`ToolCall`] surface for an external planner.

use crate::config::CuratorConfig;
use crate::digest::format_entry;
use crate::processing::{candidate_titles, enrich, filter_recent};
use crate::publisher::DigestPublisher;
use crate::relevance::RelevanceClassifier;
use crate::summarizer::{summarize, summary_stream};
use crate::traits::{DigestNotifier, DocumentStore, FeedSource, PreferenceAssistant, SummaryModel};
use crate::types::{
    CanonicalRecord, CuratorError, DailyDigestPayload, DigestLine, FeedEntry, Result,
    SummaryFailurePolicy,
};
use chrono::{FixedOffset, Local, NaiveDate, Offset};
use email_notifier::NotifyOutcome;
use futures::{pin_mut, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Stages of one daily run, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurationStage {
    Idle,
    Fetched,
    Filtered,
    Triaged,
    Summarized,
    Formatted,
    Delivered,
}

impl CurationStage {
    pub fn next(self) -> Option<Self> {
        use CurationStage::*;
        match self {
            Idle => Some(Fetched),
            Fetched => Some(Filtered),
            Filtered => Some(Triaged),
            Triaged => Some(Summarized),
            Summarized => Some(Formatted),
            Formatted => Some(Delivered),
            Delivered => None,
        }
    }
}

/// Tracks the stage of a run and rejects out-of-order transitions.
#[derive(Debug)]
pub struct StageTracker {
    run_id: Uuid,
    stage: CurationStage,
}

impl StageTracker {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stage: CurationStage::Idle,
        }
    }

    pub fn stage(&self) -> CurationStage {
        self.stage
    }

    pub fn advance(&mut self, to: CurationStage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(CuratorError::Workflow(format!(
                "run {} cannot move from {:?} to {:?}",
                self.run_id, self.stage, to
            )));
        }
        info!("Run {} entered {:?}", self.run_id, to);
        self.stage = to;
        Ok(())
    }
}

/// Where the finished digest goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    #[default]
    Github,
    Email,
    Both,
    None,
}

impl Delivery {
    pub fn wants_github(self) -> bool {
        matches!(self, Delivery::Github | Delivery::Both)
    }

    pub fn wants_email(self) -> bool {
        matches!(self, Delivery::Email | Delivery::Both)
    }
}

/// External capabilities a [`Curator`] drives.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub feeds: &'a dyn FeedSource,
    pub assistant: &'a dyn PreferenceAssistant,
    pub summarizer: &'a dyn SummaryModel,
    pub store: Option<&'a dyn DocumentStore>,
    pub notifier: Option<&'a dyn DigestNotifier>,
}

/// Everything a planner can ask the curator to do.
#[derive(Debug, Clone)]
pub enum ToolCall {
    UserSources,
    Read { url: String, max_count: Option<usize> },
    ReadAndTriage { url: String },
    Classify { titles: Vec<String> },
    Summarize { title: String, abstract_text: String },
    Format { record: CanonicalRecord, summary: String },
    Publish { payload: DailyDigestPayload },
    Notify { payload: DailyDigestPayload },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::UserSources => "user_sources",
            ToolCall::Read { .. } => "read",
            ToolCall::ReadAndTriage { .. } => "read_and_triage",
            ToolCall::Classify { .. } => "classify",
            ToolCall::Summarize { .. } => "summarize",
            ToolCall::Format { .. } => "format",
            ToolCall::Publish { .. } => "publish",
            ToolCall::Notify { .. } => "notify",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ToolOutput {
    Sources(Vec<String>),
    Entries(Vec<FeedEntry>),
    Records(Vec<CanonicalRecord>),
    Verdicts(Vec<bool>),
    Summary(String),
    Line(DigestLine),
    Commit(String),
    Notified(NotifyOutcome),
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutput::Sources(urls) => write!(f, "{}", urls.join("\n")),
            ToolOutput::Entries(entries) => {
                for entry in entries {
                    writeln!(f, "{} ({})", entry.title, entry.link)?;
                }
                Ok(())
            }
            ToolOutput::Records(records) => {
                for record in records {
                    writeln!(f, "{} ({})", record.title, record.link)?;
                }
                Ok(())
            }
            ToolOutput::Verdicts(verdicts) => write!(f, "{:?}", verdicts),
            ToolOutput::Summary(summary) => write!(f, "{}", summary),
            ToolOutput::Line(line) => write!(f, "{}", line),
            ToolOutput::Commit(hash) => write!(f, "Readinglist Updated!\nCommit hash: {}", hash),
            ToolOutput::Notified(outcome) => write!(f, "{}", outcome),
        }
    }
}

/// What a daily run produced.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub payload: DailyDigestPayload,
    /// Titles dropped because their summary failed.
    pub omitted: Vec<String>,
    pub commit: Option<String>,
    /// Set when the document write failed; the payload above is still complete.
    pub publish_error: Option<CuratorError>,
    pub email: Option<NotifyOutcome>,
}

type LineSink<'a> = Box<dyn Fn(&DigestLine) + Send + Sync + 'a>;

/// One user's curation agent.
pub struct Curator<'a> {
    config: &'a CuratorConfig,
    caps: Capabilities<'a>,
    today: NaiveDate,
    offset: FixedOffset,
    line_sink: Option<LineSink<'a>>,
}

impl<'a> Curator<'a> {
    /// A curator working on today's local date.
    pub fn new(config: &'a CuratorConfig, caps: Capabilities<'a>) -> Self {
        let now = Local::now();
        Self::with_clock(config, caps, now.date_naive(), now.offset().fix())
    }

    pub fn with_clock(
        config: &'a CuratorConfig,
        caps: Capabilities<'a>,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> Self {
        Self {
            config,
            caps,
            today,
            offset,
            line_sink: None,
        }
    }

    /// Called with every digest line as soon as it is formatted.
    pub fn on_line(mut self, sink: impl Fn(&DigestLine) + Send + Sync + 'a) -> Self {
        self.line_sink = Some(Box::new(sink));
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn user_sources(&self) -> Vec<String> {
        self.config.user.top_rss_feeds.clone()
    }

    pub async fn read(&self, url: &str, max_count: Option<usize>) -> Vec<FeedEntry> {
        self.caps.feeds.read(url, max_count).await
    }

    pub async fn classify(&self, titles: &[String]) -> Result<Vec<bool>> {
        self.classifier().classify(titles).await
    }

    /// Reads one feed and returns the recent entries the user would want.
    pub async fn read_and_triage(&self, url: &str) -> Result<Vec<CanonicalRecord>> {
        let entries = self.read(url, None).await;
        let recent = self.filter(entries);
        self.triage(&recent).await
    }

    pub async fn summarize(&self, title: &str, abstract_text: &str) -> Result<String> {
        summarize(self.caps.summarizer, title, abstract_text).await
    }

    pub fn format(&self, record: &CanonicalRecord, summary: &str) -> DigestLine {
        format_entry(record, summary)
    }

    /// Writes `payload` into today's section of the configured document.
    pub async fn publish(&self, payload: &DailyDigestPayload) -> Result<String> {
        let target = self
            .config
            .user
            .github
            .as_ref()
            .ok_or_else(|| CuratorError::Config("no [user.github] target configured".to_string()))?;
        let store = self
            .caps
            .store
            .ok_or_else(|| CuratorError::Config("no document store available".to_string()))?;

        DigestPublisher::new(store)
            .publish(payload, &target.write_file, &target.author(), self.today)
            .await
    }

    pub async fn notify(&self, payload: &DailyDigestPayload) -> Result<NotifyOutcome> {
        let notifier = self
            .caps
            .notifier
            .ok_or_else(|| CuratorError::Config("no [user.email] settings configured".to_string()))?;
        Ok(notifier.notify(payload, self.today).await)
    }

    /// Runs one capability on behalf of a planner.
    pub async fn dispatch(&self, call: ToolCall) -> Result<ToolOutput> {
        info!("Dispatching {}", call.name());
        let output = match call {
            ToolCall::UserSources => ToolOutput::Sources(self.user_sources()),
            ToolCall::Read { url, max_count } => ToolOutput::Entries(self.read(&url, max_count).await),
            ToolCall::ReadAndTriage { url } => ToolOutput::Records(self.read_and_triage(&url).await?),
            ToolCall::Classify { titles } => ToolOutput::Verdicts(self.classify(&titles).await?),
            ToolCall::Summarize { title, abstract_text } => {
                ToolOutput::Summary(self.summarize(&title, &abstract_text).await?)
            }
            ToolCall::Format { record, summary } => ToolOutput::Line(self.format(&record, &summary)),
            ToolCall::Publish { payload } => ToolOutput::Commit(self.publish(&payload).await?),
            ToolCall::Notify { payload } => ToolOutput::Notified(self.notify(&payload).await?),
        };
        Ok(output)
    }

    /// Fetch, filter, classify, summarize, format and deliver today's digest.
    ///
    /// All candidate titles across `feeds` go to the classifier in one request.
    /// Email goes out before the document write. A failed write is kept in
    /// [`RunReport::publish_error`] so the caller still gets the payload.
    pub async fn run_daily(&self, feeds: &[String], delivery: Delivery) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let mut tracker = StageTracker::new(run_id);
        info!("Run {} started for {} with {} feeds", run_id, self.today, feeds.len());

        let mut entries = Vec::new();
        for url in feeds {
            entries.extend(self.read(url, None).await);
        }
        tracker.advance(CurationStage::Fetched)?;

        let recent = self.filter(entries);
        tracker.advance(CurationStage::Filtered)?;

        let records = self.triage(&recent).await?;
        tracker.advance(CurationStage::Triaged)?;

        let (lines, omitted) = self.summarize_and_format(records).await?;
        tracker.advance(CurationStage::Summarized)?;

        let payload: DailyDigestPayload = lines.into_iter().collect();
        tracker.advance(CurationStage::Formatted)?;

        let mut report = RunReport {
            run_id,
            payload,
            omitted,
            commit: None,
            publish_error: None,
            email: None,
        };

        if report.payload.is_empty() {
            info!("Run {}: nothing new to deliver", run_id);
        } else {
            if delivery.wants_email() {
                let outcome = self.notify(&report.payload).await?;
                info!("Run {}: {}", run_id, outcome);
                report.email = Some(outcome);
            }
            if delivery.wants_github() {
                match self.publish(&report.payload).await {
                    Ok(commit) => report.commit = Some(commit),
                    Err(e) => {
                        error!("Run {}: publish failed: {}", run_id, e);
                        report.publish_error = Some(e);
                    }
                }
            }
        }
        tracker.advance(CurationStage::Delivered)?;

        info!("Run {} finished with {} digest lines", run_id, report.payload.len());
        Ok(report)
    }

    fn classifier(&self) -> RelevanceClassifier<'_> {
        RelevanceClassifier::new(self.caps.assistant, &self.config.user.user_rec_bot_id)
    }

    fn filter(&self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        filter_recent(entries, self.config.curator.window_days, self.today, &self.offset)
    }

    async fn triage(&self, recent: &[FeedEntry]) -> Result<Vec<CanonicalRecord>> {
        let titles = candidate_titles(recent);
        let accepted = self.classifier().accepted_titles(&titles).await?;
        Ok(enrich(&accepted, recent, self.config.curator.duplicate_titles))
    }

    /// Summarizes records in order and formats each one as its summary lands,
    /// handing the line to the sink before the next result is awaited.
    async fn summarize_and_format(
        &self,
        records: Vec<CanonicalRecord>,
    ) -> Result<(Vec<DigestLine>, Vec<String>)> {
        let mut lines = Vec::with_capacity(records.len());
        let mut omitted = Vec::new();

        let results = summary_stream(
            self.caps.summarizer,
            records,
            self.config.curator.summary_concurrency,
        );
        pin_mut!(results);

        while let Some((record, result)) = results.next().await {
            match result {
                Ok(summary) => {
                    let line = format_entry(&record, &summary);
                    if let Some(sink) = &self.line_sink {
                        sink(&line);
                    }
                    lines.push(line);
                }
                Err(e) => match self.config.curator.summary_failures {
                    SummaryFailurePolicy::Abort => return Err(e),
                    SummaryFailurePolicy::Omit => {
                        warn!("Omitting '{}' from digest: {}", record.title, e);
                        omitted.push(record.title);
                    }
                },
            }
        }
        Ok((lines, omitted))
    }
}
