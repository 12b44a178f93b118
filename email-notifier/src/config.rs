use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Default submission port; the session always upgrades with STARTTLS.
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// The `[user.email]` block of the user configuration.
#[derive(Clone, Deserialize)]
pub struct EmailSettings {
    pub sender_smtp: String,
    pub sender_email: String,
    pub sender_email_app_pw: String,
    pub recipient_email: String,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("sender_smtp", &self.sender_smtp)
            .field("sender_email", &self.sender_email)
            .field("sender_email_app_pw", &"***")
            .field("recipient_email", &self.recipient_email)
            .finish()
    }
}

/// Transport knobs that are not part of the per-user settings.
#[derive(Debug, Clone, Copy)]
pub struct SmtpOptions {
    pub port: u16,
    /// Applied to connecting and to every command exchanged afterwards.
    pub timeout: Duration,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SMTP_PORT,
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }
}
