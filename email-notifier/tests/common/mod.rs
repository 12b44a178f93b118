// Scripted SMTP sessions for exercising the notifier without a mail server
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use email_notifier::{EmailSettings, SmtpConnector, SmtpSession};
use lettre::Message;

/// Which step of the scripted session should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    RefuseConnect,
    HangOnConnect,
    RejectLogin,
    HangOnSend,
}

/// Everything the fake saw, in order.
#[derive(Debug, Default)]
pub struct Transcript {
    pub steps: Vec<String>,
    pub sent: Vec<Vec<u8>>,
}

#[derive(Clone)]
pub struct ScriptedConnector {
    pub fault: Fault,
    pub transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedConnector {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            transcript: Arc::new(Mutex::new(Transcript::default())),
        }
    }

    pub fn steps(&self) -> Vec<String> {
        self.transcript.lock().unwrap().steps.clone()
    }
}

pub struct ScriptedSession {
    fault: Fault,
    transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedSession {
    fn record(&self, step: &str) {
        self.transcript.lock().unwrap().steps.push(step.to_string());
    }
}

#[async_trait]
impl SmtpConnector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, host: &str, port: u16, _timeout: Duration) -> Result<ScriptedSession> {
        self.transcript.lock().unwrap().steps.push(format!("connect {}:{}", host, port));
        match self.fault {
            Fault::RefuseConnect => Err(anyhow!("connection refused")),
            Fault::HangOnConnect => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("connect should have been cancelled by the timeout")
            }
            _ => Ok(ScriptedSession {
                fault: self.fault,
                transcript: self.transcript.clone(),
            }),
        }
    }
}

#[async_trait]
impl SmtpSession for ScriptedSession {
    async fn starttls(&mut self) -> Result<()> {
        self.record("starttls");
        Ok(())
    }

    async fn login(&mut self, username: &str, _password: &str) -> Result<()> {
        self.record(&format!("login {}", username));
        if self.fault == Fault::RejectLogin {
            return Err(anyhow!("535 authentication failed"));
        }
        Ok(())
    }

    async fn send(&mut self, message: &Message) -> Result<()> {
        self.record("send");
        if self.fault == Fault::HangOnSend {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.transcript.lock().unwrap().sent.push(message.formatted());
        Ok(())
    }

    async fn close(&mut self) {
        self.record("close");
    }
}

pub fn test_settings() -> EmailSettings {
    EmailSettings {
        sender_smtp: "smtp.example.com".to_string(),
        sender_email: "curator@example.com".to_string(),
        sender_email_app_pw: "app-password".to_string(),
        recipient_email: "reader@example.com".to_string(),
    }
}
