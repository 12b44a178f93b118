use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use email_notifier::Notifier;
use rss_curator::config::DEFAULT_CONFIG_FILE;
use rss_curator::{
    Capabilities, Curator, CuratorConfig, Delivery, DigestNotifier, DocumentStore, GithubDocumentStore,
    OpenAiAdapter, OpenAiConfig, RssFeedReader, Secrets,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeliverArg {
    Github,
    Email,
    Both,
    None,
}

impl From<DeliverArg> for Delivery {
    fn from(arg: DeliverArg) -> Self {
        match arg {
            DeliverArg::Github => Delivery::Github,
            DeliverArg::Email => Delivery::Email,
            DeliverArg::Both => Delivery::Both,
            DeliverArg::None => Delivery::None,
        }
    }
}

/// Builds today's reading list from your feeds.
#[derive(Debug, Parser)]
#[command(name = "rss-curator", version)]
struct Cli {
    /// Per-user TOML configuration
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory for the run's digest file
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Print each digest line as it is produced
    #[arg(long)]
    stream: bool,

    /// Feed to read instead of the configured ones (repeatable)
    #[arg(long = "feed")]
    feeds: Vec<String>,

    #[arg(long, value_enum, default_value = "github")]
    deliver: DeliverArg,

    /// Free-text instruction, recorded in the run log
    #[arg(long)]
    message: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rss_curator=info,email_notifier=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn write_digest(dir: &Path, run_id: &uuid::Uuid, markdown: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(format!("{}_{}.md", Local::now().format("%Y-%m-%dT%H-%M-%S"), run_id));
    std::fs::write(&path, markdown).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = CuratorConfig::from_file(&cli.config)?;
    let secrets = Secrets::from_env()?;
    let settings = &config.curator;
    let delivery = Delivery::from(cli.deliver);

    if let Some(message) = &cli.message {
        info!("Instruction: {}", message);
    }

    let feeds = if cli.feeds.is_empty() {
        config.user.top_rss_feeds.clone()
    } else {
        cli.feeds.clone()
    };
    if feeds.is_empty() {
        anyhow::bail!("no feeds configured in {} and none given with --feed", cli.config.display());
    }

    let reader = RssFeedReader::new(settings.fetch_config())?;
    let adapter = OpenAiAdapter::new(OpenAiConfig {
        api_key: secrets.openai_api_key.clone(),
        base_url: settings.openai_base_url.clone(),
        summary_model: settings.summary_model.clone(),
        summary_word_limit: settings.summary_word_limit,
        request_timeout: Duration::from_secs(settings.http_timeout_seconds),
        run_timeout: Duration::from_secs(settings.classifier_timeout_seconds),
        poll_interval: Duration::from_millis(settings.classifier_poll_interval_ms),
    })?;

    let store = match (&config.user.github, &secrets.github) {
        (Some(target), Some(auth)) if delivery.wants_github() => Some(
            GithubDocumentStore::connect(
                &settings.github_api_url,
                &target.write_repo,
                auth,
                Duration::from_secs(settings.http_timeout_seconds),
            )
            .await?,
        ),
        (Some(_), None) => {
            warn!("GitHub target configured but no GITHUB_TOKEN or GITHUB_APP_ID/GITHUB_APP_PRIVATE_KEY set");
            None
        }
        _ => None,
    };
    let notifier = config
        .user
        .email
        .clone()
        .map(|email| Notifier::new(email).with_options(settings.smtp_options()));

    let caps = Capabilities {
        feeds: &reader,
        assistant: &adapter,
        summarizer: &adapter,
        store: store.as_ref().map(|s| s as &dyn DocumentStore),
        notifier: notifier.as_ref().map(|n| n as &dyn DigestNotifier),
    };

    let mut curator = Curator::new(&config, caps);
    if cli.stream {
        curator = curator.on_line(|line| println!("{}\n", line));
    }

    let mut report = curator.run_daily(&feeds, delivery).await?;

    let path = write_digest(&cli.output_dir, &report.run_id, &report.payload.to_markdown())?;
    info!("Digest written to {}", path.display());
    if let Some(commit) = &report.commit {
        info!("Readinglist updated in commit {}", commit);
    }
    if let Some(outcome) = &report.email {
        info!("{}", outcome);
    }
    if !report.omitted.is_empty() {
        warn!("{} papers omitted after failed summaries", report.omitted.len());
    }
    if let Some(e) = report.publish_error.take() {
        return Err(anyhow::Error::new(e).context(format!("digest kept at {}", path.display())));
    }
    Ok(())
}
