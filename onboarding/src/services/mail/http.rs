// onboarding/src/services/mail/http.rs

use super::{MailBody, MailTransport, NotificationMessage, SendError};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Transactional mail HTTP API client (bearer auth, JSON body).
pub struct HttpMailSender {
  client: reqwest::Client,
  api_url: String,
  api_key: String,
  from: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
  from: &'a str,
  to: [&'a str; 1],
  subject: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  html: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  text: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendEmailResponse {
  id: String,
}

impl HttpMailSender {
  pub fn new(api_url: &str, api_key: &str, from: &str, timeout: Duration) -> AppResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build mail HTTP client: {}", e)))?;
    Ok(Self {
      client,
      api_url: api_url.to_string(),
      api_key: api_key.to_string(),
      from: from.to_string(),
    })
  }
}

#[async_trait]
impl MailTransport for HttpMailSender {
  #[instrument(name = "mail::http::deliver", skip_all, fields(url = %self.api_url))]
  async fn deliver(&self, message: &NotificationMessage) -> Result<String, SendError> {
    let (html, text) = match &message.body {
      MailBody::Html(h) => (Some(h.as_str()), None),
      MailBody::Text(t) => (None, Some(t.as_str())),
    };
    let payload = SendEmailRequest {
      from: &self.from,
      to: [&message.to],
      subject: &message.subject,
      html,
      text,
    };

    let response = self
      .client
      .post(&self.api_url)
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await
      .map_err(|e| SendError::Transport(format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
      return Err(SendError::RateLimited);
    }
    if !status.is_success() {
      let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
      return Err(SendError::Rejected {
        status: status.as_u16(),
        body,
      });
    }

    let sent: SendEmailResponse = response
      .json()
      .await
      .map_err(|e| SendError::Transport(format!("unreadable response body: {}", e)))?;
    debug!(message_id = %sent.id, "Mail API accepted message.");
    Ok(sent.id)
  }
}
