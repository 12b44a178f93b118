use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::Message;
use tracing::{debug, warn};

/// Opens SMTP sessions. Connecting includes reading the greeting and sending EHLO.
#[async_trait]
pub trait SmtpConnector: Send + Sync {
    type Session: SmtpSession;

    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<Self::Session>;
}

/// The steps of one mail session after the greeting.
///
/// `close` must be safe to call after any other step failed.
#[async_trait]
pub trait SmtpSession: Send {
    async fn starttls(&mut self) -> Result<()>;

    async fn login(&mut self, username: &str, password: &str) -> Result<()>;

    async fn send(&mut self, message: &Message) -> Result<()>;

    async fn close(&mut self);
}

/// Real SMTP sessions over tokio, backed by lettre's async connection.
#[derive(Debug, Clone)]
pub struct LettreConnector {
    hello_name: String,
}

impl LettreConnector {
    pub fn new(hello_name: impl Into<String>) -> Self {
        Self {
            hello_name: hello_name.into(),
        }
    }
}

impl Default for LettreConnector {
    fn default() -> Self {
        Self::new("localhost")
    }
}

pub struct LettreSession {
    connection: AsyncSmtpConnection,
    host: String,
    hello_name: ClientId,
}

#[async_trait]
impl SmtpConnector for LettreConnector {
    type Session = LettreSession;

    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<LettreSession> {
        let hello_name = ClientId::Domain(self.hello_name.clone());
        debug!("Opening SMTP connection to {}:{}", host, port);

        let connection = AsyncSmtpConnection::connect_tokio1(
            (host, port),
            Some(timeout),
            &hello_name,
            None,
            None,
        )
        .await
        .with_context(|| format!("connect to {}:{}", host, port))?;

        Ok(LettreSession {
            connection,
            host: host.to_string(),
            hello_name,
        })
    }
}

#[async_trait]
impl SmtpSession for LettreSession {
    async fn starttls(&mut self) -> Result<()> {
        let tls = TlsParameters::new(self.host.clone()).context("build TLS parameters")?;
        self.connection
            .starttls(tls, &self.hello_name)
            .await
            .context("upgrade to TLS")?;
        Ok(())
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let credentials = Credentials::new(username.to_string(), password.to_string());
        self.connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .await
            .context("authenticate")?;
        Ok(())
    }

    async fn send(&mut self, message: &Message) -> Result<()> {
        self.connection
            .send(message.envelope(), &message.formatted())
            .await
            .context("send message")?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.connection.quit().await {
            warn!("SMTP QUIT failed, aborting connection: {}", e);
            self.connection.abort().await;
        }
    }
}
