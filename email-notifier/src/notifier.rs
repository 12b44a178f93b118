use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use interfaces::DailyDigestPayload;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::Message;
use tracing::{error, info, warn};

use crate::config::{EmailSettings, SmtpOptions};
use crate::session::{LettreConnector, SmtpConnector, SmtpSession};

const SENDER_DISPLAY_NAME: &str = "arXivCurator";

/// What happened to one delivery attempt. Never raised, always reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    TimedOut(String),
    ConnectionFailed(String),
    Failed(String),
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent)
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Sent => write!(f, "Email sent successfully!"),
            NotifyOutcome::TimedOut(cause) => {
                write!(f, "Email could not be sent. Connection timed out.\n{}", cause)
            }
            NotifyOutcome::ConnectionFailed(cause) => {
                write!(f, "Email could not be sent. Connection error.\n{}", cause)
            }
            NotifyOutcome::Failed(cause) => write!(f, "Email could not be sent.\n{}", cause),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error("{step} timed out after {limit:?}")]
    Timeout { step: &'static str, limit: Duration },

    #[error("{step} failed: {cause:#}")]
    Failed {
        step: &'static str,
        cause: anyhow::Error,
    },
}

/// Sends the daily digest over an authenticated SMTP session.
pub struct Notifier<C = LettreConnector> {
    connector: C,
    settings: EmailSettings,
    options: SmtpOptions,
}

impl Notifier<LettreConnector> {
    pub fn new(settings: EmailSettings) -> Self {
        Self::with_connector(LettreConnector::default(), settings)
    }
}

impl<C: SmtpConnector> Notifier<C> {
    pub fn with_connector(connector: C, settings: EmailSettings) -> Self {
        Self {
            connector,
            settings,
            options: SmtpOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SmtpOptions) -> Self {
        self.options = options;
        self
    }

    /// Sends `payload` with a subject dated `today`.
    ///
    /// Once connected, the session is closed on every path, including failed
    /// authentication.
    pub async fn notify(&self, payload: &DailyDigestPayload, today: NaiveDate) -> NotifyOutcome {
        let message = match build_message(&self.settings, payload, today) {
            Ok(message) => message,
            Err(e) => {
                error!("Could not build digest email: {:#}", e);
                return NotifyOutcome::Failed(format!("{:#}", e));
            }
        };

        let host = self.settings.sender_smtp.as_str();
        let port = self.options.port;
        let limit = self.options.timeout;

        info!("Sending digest with {} entries via {}:{}", payload.len(), host, port);

        let mut session = match tokio::time::timeout(limit, self.connector.connect(host, port, limit)).await {
            Err(_) => {
                warn!("SMTP connection to {}:{} timed out", host, port);
                return NotifyOutcome::TimedOut(format!(
                    "connecting to {}:{} timed out after {:?}",
                    host, port, limit
                ));
            }
            Ok(Err(e)) => {
                warn!("SMTP connection to {}:{} failed: {:#}", host, port, e);
                return NotifyOutcome::ConnectionFailed(format!("{:#}", e));
            }
            Ok(Ok(session)) => session,
        };

        let delivered = self.deliver(&mut session, &message).await;

        if tokio::time::timeout(limit, session.close()).await.is_err() {
            warn!("SMTP session close timed out, dropping connection");
        }

        match delivered {
            Ok(()) => {
                info!("Digest email sent to {}", self.settings.recipient_email);
                NotifyOutcome::Sent
            }
            Err(e @ StepError::Timeout { .. }) => {
                warn!("Digest email not sent: {}", e);
                NotifyOutcome::TimedOut(e.to_string())
            }
            Err(e) => {
                warn!("Digest email not sent: {}", e);
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    async fn deliver(&self, session: &mut C::Session, message: &Message) -> Result<(), StepError> {
        let limit = self.options.timeout;
        step("STARTTLS", limit, session.starttls()).await?;
        step(
            "login",
            limit,
            session.login(&self.settings.sender_email, &self.settings.sender_email_app_pw),
        )
        .await?;
        step("send", limit, session.send(message)).await
    }
}

async fn step<F>(name: &'static str, limit: Duration, fut: F) -> Result<(), StepError>
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(limit, fut).await {
        Err(_) => Err(StepError::Timeout { step: name, limit }),
        Ok(Err(cause)) => Err(StepError::Failed { step: name, cause }),
        Ok(Ok(())) => Ok(()),
    }
}

/// Builds the digest email: plain text body inside a multipart message.
pub fn build_message(
    settings: &EmailSettings,
    payload: &DailyDigestPayload,
    today: NaiveDate,
) -> Result<Message> {
    let from: Mailbox = format!("{} <{}>", SENDER_DISPLAY_NAME, settings.sender_email)
        .parse()
        .context("parse sender address")?;
    let to: Mailbox = settings
        .recipient_email
        .parse()
        .context("parse recipient address")?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject_for(today))
        .multipart(MultiPart::mixed().singlepart(SinglePart::plain(payload.to_markdown())))
        .context("build email")
}

pub fn subject_for(today: NaiveDate) -> String {
    format!("Your Daily Reading List - {}", today.format("%d %b %Y"))
}

/// Sends `payload` with the real transport, default options and today's local date.
pub async fn notify(payload: &DailyDigestPayload, settings: &EmailSettings) -> NotifyOutcome {
    Notifier::new(settings.clone())
        .notify(payload, Local::now().date_naive())
        .await
}
