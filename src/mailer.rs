use async_trait::async_trait;
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("mail transport: {0}")]
    Transport(String),
    #[error("mail webhook rejected with status {0}")]
    Rejected(u16),
}

/// Outbound mail for identity flows.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, link: &str) -> Result<(), MailError>;
}

pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), urlencoding::encode(token))
}

/// Writes the link to the log. Development default.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, link: &str) -> Result<(), MailError> {
        tracing::info!(%email, %link, "password reset link (log mailer)");
        Ok(())
    }
}

#[derive(Serialize)]
struct ResetMail<'a> {
    kind: &'static str,
    to: &'a str,
    link: &'a str,
}

/// POSTs a JSON envelope to an external mail relay.
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send_password_reset(&self, email: &str, link: &str) -> Result<(), MailError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ResetMail { kind: "password_reset", to: email, link })
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MailError::Rejected(resp.status().as_u16()));
        }
        tracing::info!(%email, "password reset mail handed to webhook");
        Ok(())
    }
}
