// onboarding/src/services/mail/smtp.rs

use super::{MailBody, MailTransport, NotificationMessage, SendError};
use crate::config::{SmtpConfig, SmtpSecurity};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

/// SMTP relay sender. The connection pool lives inside the lettre transport.
pub struct SmtpMailSender {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from: Mailbox,
  host: String,
}

impl SmtpMailSender {
  pub fn new(config: &SmtpConfig, from: &str, timeout: Duration) -> AppResult<Self> {
    let from: Mailbox = from
      .parse()
      .map_err(|e| AppError::Config(format!("Invalid MAIL_FROM address '{}': {}", from, e)))?;

    let builder = match config.security {
      SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
      SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host),
      SmtpSecurity::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)),
    }
    .map_err(|e| AppError::Config(format!("Invalid SMTP relay '{}': {}", config.host, e)))?;

    let mut builder = builder.port(config.port).timeout(Some(timeout));
    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
      builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    Ok(Self {
      transport: builder.build(),
      from,
      host: config.host.clone(),
    })
  }

  fn build_message(&self, message: &NotificationMessage, message_id: &str) -> Result<Message, SendError> {
    let to: Mailbox = message
      .to
      .parse()
      .map_err(|e| SendError::InvalidMessage(format!("recipient '{}': {}", message.to, e)))?;
    let (content_type, body) = match &message.body {
      MailBody::Html(h) => (ContentType::TEXT_HTML, h.clone()),
      MailBody::Text(t) => (ContentType::TEXT_PLAIN, t.clone()),
    };
    Message::builder()
      .from(self.from.clone())
      .to(to)
      .subject(message.subject.clone())
      .message_id(Some(message_id.to_string()))
      .header(content_type)
      .body(body)
      .map_err(|e| SendError::InvalidMessage(e.to_string()))
  }
}

#[async_trait]
impl MailTransport for SmtpMailSender {
  #[instrument(name = "mail::smtp::deliver", skip_all, fields(host = %self.host))]
  async fn deliver(&self, message: &NotificationMessage) -> Result<String, SendError> {
    let message_id = format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain());
    let email = self.build_message(message, &message_id)?;

    let response = self
      .transport
      .send(email)
      .await
      .map_err(|e| SendError::Transport(e.to_string()))?;
    debug!(code = %response.code(), %message_id, "SMTP relay accepted message.");
    Ok(message_id)
  }
}
