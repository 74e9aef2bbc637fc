// onboarding/src/config.rs

use crate::errors::{AppError, Result};
use crate::services::mail::Channel;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

const DEFAULT_IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";

/// Everything the worker needs, resolved once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub identity: IdentityConfig,
  pub mail: MailConfig,

  /// Shown in email subjects and greetings.
  pub platform_name: String,
  /// Sign-in link included in the approval email.
  pub login_url: String,
  /// Inbox that receives new-application alerts. Alerts are skipped when unset.
  pub reviewer_alert_email: Option<String>,

  /// How many accepted event ids the watcher remembers for redelivery suppression.
  pub event_dedup_capacity: usize,
  /// How long an accepted event id is remembered.
  pub event_dedup_ttl: Duration,
  /// Upper bound on waiting for in-flight runs when the server stops.
  pub shutdown_grace: Duration,
}

#[derive(Clone)]
pub struct IdentityConfig {
  pub api_base: String,
  pub project_id: String,
  pub access_token: String,
  pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
  pub from: String,
  pub transport: MailTransportConfig,
  pub timeout: Duration,
}

/// Which outbound mail mechanism this process uses. Chosen once, from configuration.
#[derive(Clone)]
pub enum MailTransportConfig {
  /// Transactional mail HTTP API with bearer-token auth.
  Primary { api_url: String, api_key: String },
  /// SMTP relay.
  Fallback(SmtpConfig),
}

#[derive(Clone)]
pub struct SmtpConfig {
  pub host: String,
  pub port: u16,
  pub security: SmtpSecurity,
  pub username: Option<String>,
  pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
  /// TLS from the first byte (usually port 465).
  Implicit,
  /// Plain connection upgraded with STARTTLS.
  StartTls,
  /// No TLS at all. Local relays and test servers only.
  None,
}

impl MailTransportConfig {
  pub fn channel(&self) -> Channel {
    match self {
      MailTransportConfig::Primary { .. } => Channel::Primary,
      MailTransportConfig::Fallback(_) => Channel::Fallback,
    }
  }
}

impl std::fmt::Debug for IdentityConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("IdentityConfig")
      .field("api_base", &self.api_base)
      .field("project_id", &self.project_id)
      .field("access_token", &"[REDACTED]")
      .field("timeout", &self.timeout)
      .finish()
  }
}

impl std::fmt::Debug for MailTransportConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MailTransportConfig::Primary { api_url, .. } => f
        .debug_struct("Primary")
        .field("api_url", api_url)
        .field("api_key", &"[REDACTED]")
        .finish(),
      MailTransportConfig::Fallback(smtp) => f.debug_tuple("Fallback").field(smtp).finish(),
    }
  }
}

impl std::fmt::Debug for SmtpConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SmtpConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("security", &self.security)
      .field("username", &self.username)
      .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
      .finish()
  }
}

impl AppConfig {
  /// Loads `.env` when present, then reads the process environment.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let require = |name: &str| get(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)));

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;

    let identity = IdentityConfig {
      api_base: get("IDENTITY_API_BASE").unwrap_or_else(|| DEFAULT_IDENTITY_API_BASE.to_string()),
      project_id: require("IDENTITY_PROJECT_ID")?,
      access_token: require("IDENTITY_ACCESS_TOKEN")?,
      timeout: positive_secs("IDENTITY_TIMEOUT_SECS", get("IDENTITY_TIMEOUT_SECS"), 10)?,
    };

    // Presence of the API key is the whole selection rule.
    let transport = match get("MAIL_API_KEY") {
      Some(api_key) => MailTransportConfig::Primary {
        api_url: get("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
        api_key,
      },
      None => {
        let host = get("SMTP_HOST").ok_or_else(|| {
          AppError::Config("Neither MAIL_API_KEY nor SMTP_HOST is set; no mail channel available".to_string())
        })?;
        MailTransportConfig::Fallback(SmtpConfig {
          host,
          port: parse_or("SMTP_PORT", get("SMTP_PORT"), 465u16)?,
          security: parse_smtp_security(get("SMTP_SECURE"))?,
          username: get("SMTP_USERNAME"),
          password: get("SMTP_PASSWORD"),
        })
      }
    };

    let mail = MailConfig {
      from: require("MAIL_FROM")?,
      transport,
      timeout: positive_secs("MAIL_TIMEOUT_SECS", get("MAIL_TIMEOUT_SECS"), 10)?,
    };

    let event_dedup_capacity = parse_or("EVENT_DEDUP_CAPACITY", get("EVENT_DEDUP_CAPACITY"), 10_000usize)?;
    if event_dedup_capacity == 0 {
      return Err(AppError::Config("EVENT_DEDUP_CAPACITY must be greater than zero".to_string()));
    }

    let config = Self {
      server_host,
      server_port,
      identity,
      mail,
      platform_name: get("PLATFORM_NAME").unwrap_or_else(|| "Tutor Platform".to_string()),
      login_url: get("LOGIN_URL").unwrap_or_else(|| "https://example.com/login".to_string()),
      reviewer_alert_email: get("REVIEWER_ALERT_EMAIL"),
      event_dedup_capacity,
      event_dedup_ttl: positive_secs("EVENT_DEDUP_TTL_SECS", get("EVENT_DEDUP_TTL_SECS"), 86_400)?,
      shutdown_grace: positive_secs("SHUTDOWN_GRACE_SECS", get("SHUTDOWN_GRACE_SECS"), 30)?,
    };

    tracing::info!(mail_channel = %config.mail.transport.channel(), "Application configuration loaded successfully.");
    Ok(config)
  }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(v) => v
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, v, e))),
  }
}

/// A whole number of seconds that must be greater than zero.
fn positive_secs(name: &str, raw: Option<String>, default: u64) -> Result<Duration> {
  match parse_or(name, raw, default)? {
    0 => Err(AppError::Config(format!("{} must be greater than zero", name))),
    secs => Ok(Duration::from_secs(secs)),
  }
}

fn parse_smtp_security(raw: Option<String>) -> Result<SmtpSecurity> {
  match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
    None | Some("true") | Some("implicit") => Ok(SmtpSecurity::Implicit),
    Some("false") | Some("starttls") => Ok(SmtpSecurity::StartTls),
    Some("none") => Ok(SmtpSecurity::None),
    Some(other) => Err(AppError::Config(format!(
      "Invalid SMTP_SECURE value '{}': expected true, false, implicit, starttls or none",
      other
    ))),
  }
}
