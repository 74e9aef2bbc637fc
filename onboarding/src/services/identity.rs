// onboarding/src/services/identity.rs

//! Account creation at the external identity provider.
//!
//! Provider error shapes stop here: callers only ever see `ProvisionError`.

use crate::config::IdentityConfig;
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Request to create one login identity.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdentity {
  pub email: String,
  pub password: String,
  pub display_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone_number: Option<String>,
}

impl NewIdentity {
  /// Same request with the phone number dropped.
  pub fn without_phone(&self) -> Self {
    Self {
      phone_number: None,
      ..self.clone()
    }
  }
}

impl std::fmt::Debug for NewIdentity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NewIdentity")
      .field("email", &self.email)
      .field("password", &"[REDACTED]")
      .field("display_name", &self.display_name)
      .field("phone_number", &self.phone_number)
      .finish()
  }
}

/// Provider-side id of a created account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRef(pub String);

impl std::fmt::Display for IdentityRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
  #[error("the identity provider rejected the phone number")]
  InvalidPhone,
  #[error("an identity already exists for this email")]
  AlreadyExists,
  #[error("identity provisioning failed: {0}")]
  Other(String),
}

#[async_trait]
pub trait IdentityProvisioner: Send + Sync {
  async fn provision(&self, request: &NewIdentity) -> Result<IdentityRef, ProvisionError>;
}

/// Maps a provider error code or message onto `ProvisionError`.
///
/// Accepts both the REST API's upper-case messages (`EMAIL_EXISTS`,
/// `INVALID_PHONE_NUMBER : TOO_SHORT`) and the admin SDK's `auth/...` codes.
pub fn classify_provider_error(code: &str) -> ProvisionError {
  let head = code.split(':').next().unwrap_or_default().trim();
  match head {
    "EMAIL_EXISTS" | "DUPLICATE_EMAIL" | "auth/email-already-exists" => ProvisionError::AlreadyExists,
    "INVALID_PHONE_NUMBER" | "auth/invalid-phone-number" => ProvisionError::InvalidPhone,
    _ => ProvisionError::Other(code.to_string()),
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedAccount {
  local_id: String,
}

#[derive(Deserialize)]
struct ProviderErrorEnvelope {
  error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  status: Option<String>,
}

/// `IdentityProvisioner` backed by the provider's admin REST API.
pub struct RestIdentityProvisioner {
  client: reqwest::Client,
  accounts_url: String,
  access_token: String,
}

impl RestIdentityProvisioner {
  pub fn new(config: &IdentityConfig) -> AppResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build identity HTTP client: {}", e)))?;
    Ok(Self {
      client,
      accounts_url: format!(
        "{}/v1/projects/{}/accounts",
        config.api_base.trim_end_matches('/'),
        config.project_id
      ),
      access_token: config.access_token.clone(),
    })
  }
}

#[async_trait]
impl IdentityProvisioner for RestIdentityProvisioner {
  #[instrument(name = "identity::provision", skip_all, fields(email = %request.email, with_phone = request.phone_number.is_some()))]
  async fn provision(&self, request: &NewIdentity) -> Result<IdentityRef, ProvisionError> {
    let response = self
      .client
      .post(&self.accounts_url)
      .bearer_auth(&self.access_token)
      .json(request)
      .send()
      .await
      .map_err(|e| ProvisionError::Other(format!("request failed: {}", e)))?;

    let status = response.status();
    if status.is_success() {
      let created: CreatedAccount = response
        .json()
        .await
        .map_err(|e| ProvisionError::Other(format!("unreadable success body: {}", e)))?;
      debug!(local_id = %created.local_id, "Identity created.");
      return Ok(IdentityRef(created.local_id));
    }

    let body = response.text().await.unwrap_or_default();
    let mapped = match serde_json::from_str::<ProviderErrorEnvelope>(&body) {
      Ok(envelope) => {
        let code = envelope
          .error
          .message
          .or(envelope.error.status)
          .unwrap_or_else(|| format!("HTTP {}", status));
        classify_provider_error(&code)
      }
      Err(_) => ProvisionError::Other(format!("HTTP {}: {}", status, body)),
    };
    warn!(http_status = %status, error = %mapped, "Identity provider refused account creation.");
    Err(mapped)
  }
}
