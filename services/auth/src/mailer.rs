//! Outbound transactional email
//!
//! Messages go to an HTTP mail API when one is configured. Without one the
//! service logs each message instead, which is enough for local development.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur when sending email
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Mail API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected message with status {0}")]
    Rejected(u16),
}

/// Sends a single message to one recipient
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), EmailError>;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mail API client posting JSON messages
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), EmailError> {
        let mut request = self.client.post(&self.api_url).json(&MailRequest {
            from: &self.from,
            to,
            subject,
            html: html_body,
        });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(EmailError::Rejected(response.status().as_u16()));
        }

        info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), EmailError> {
        info!(to = %to, subject = %subject, body = %html_body, "Email delivery disabled, message logged");
        Ok(())
    }
}

/// Subject and HTML body of the registration confirmation message
pub fn verification_email(code: &str, ttl_seconds: u64) -> (String, String) {
    let minutes = ttl_seconds / 60;
    let subject = "Confirm your registration".to_string();
    let body = format!(
        "<h1>Confirm your registration</h1>\
         <p>Your verification code: <strong>{}</strong></p>\
         <p>The code is valid for {} minutes.</p>",
        code, minutes
    );
    (subject, body)
}
