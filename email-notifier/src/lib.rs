pub mod config;
pub mod notifier;
pub mod session;

pub use config::{EmailSettings, SmtpOptions, DEFAULT_SMTP_PORT, DEFAULT_SMTP_TIMEOUT};
pub use notifier::{build_message, notify, subject_for, Notifier, NotifyOutcome};
pub use session::{LettreConnector, LettreSession, SmtpConnector, SmtpSession};
