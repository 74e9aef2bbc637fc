// onboarding/src/services/mail/mod.rs

//! Outbound email. One transport is chosen at startup from configuration;
//! there is no per-message failover between the two.

pub mod http;
pub mod smtp;

use crate::config::{MailConfig, MailTransportConfig};
use crate::errors::Result as AppResult;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use self::http::HttpMailSender;
pub use self::smtp::SmtpMailSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  /// Transactional mail HTTP API.
  Primary,
  /// SMTP relay.
  Fallback,
}

impl std::fmt::Display for Channel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Channel::Primary => "primary",
      Channel::Fallback => "fallback",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
  Html(String),
  Text(String),
}

impl MailBody {
  pub fn content(&self) -> &str {
    match self {
      MailBody::Html(s) | MailBody::Text(s) => s,
    }
  }
}

/// One email to one recipient. Lives only for the run that composed it.
#[derive(Clone, PartialEq, Eq)]
pub struct NotificationMessage {
  pub to: String,
  pub subject: String,
  pub body: MailBody,
}

// Bodies may carry a password, so Debug only reports their size.
impl std::fmt::Debug for NotificationMessage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NotificationMessage")
      .field("to", &self.to)
      .field("subject", &self.subject)
      .field("body_len", &self.body.content().len())
      .finish()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
  #[error("mail transport error: {0}")]
  Transport(String),
  #[error("mail provider rejected the message ({status}): {body}")]
  Rejected { status: u16, body: String },
  #[error("mail provider rate limit exceeded")]
  RateLimited,
  #[error("mail send timed out after {0:?}")]
  Timeout(Duration),
  #[error("message could not be built: {0}")]
  InvalidMessage(String),
}

/// What a successful send reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
  pub channel: Channel,
  pub message_id: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
  /// Hands the message to the provider and returns the provider's message id.
  async fn deliver(&self, message: &NotificationMessage) -> Result<String, SendError>;
}

/// The single `send` entry point the pipelines use.
pub struct MailGateway {
  channel: Channel,
  transport: Arc<dyn MailTransport>,
  timeout: Duration,
}

impl MailGateway {
  pub fn new(channel: Channel, transport: Arc<dyn MailTransport>, timeout: Duration) -> Self {
    Self {
      channel,
      transport,
      timeout,
    }
  }

  /// Builds the transport named by configuration.
  pub fn from_config(config: &MailConfig) -> AppResult<Self> {
    let transport: Arc<dyn MailTransport> = match &config.transport {
      MailTransportConfig::Primary { api_url, api_key } => {
        Arc::new(HttpMailSender::new(api_url, api_key, &config.from, config.timeout)?)
      }
      MailTransportConfig::Fallback(smtp) => Arc::new(SmtpMailSender::new(smtp, &config.from, config.timeout)?),
    };
    let channel = config.transport.channel();
    info!(%channel, "Mail gateway configured.");
    Ok(Self::new(channel, transport, config.timeout))
  }

  pub fn channel(&self) -> Channel {
    self.channel
  }

  #[instrument(name = "mail::send", skip_all, fields(channel = %self.channel, to = %message.to, subject = %message.subject))]
  pub async fn send(&self, message: &NotificationMessage) -> Result<Receipt, SendError> {
    let outcome = match tokio::time::timeout(self.timeout, self.transport.deliver(message)).await {
      Ok(result) => result,
      Err(_) => Err(SendError::Timeout(self.timeout)),
    };
    match outcome {
      Ok(message_id) => {
        info!(channel = %self.channel, %message_id, "Email handed to provider.");
        Ok(Receipt {
          channel: self.channel,
          message_id,
        })
      }
      Err(e) => {
        warn!(channel = %self.channel, error = %e, "Email delivery failed.");
        Err(e)
      }
    }
  }
}
