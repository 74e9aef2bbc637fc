// onboarding/src/state.rs

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::services::identity::{IdentityProvisioner, RestIdentityProvisioner};
use crate::services::mail::MailGateway;
use crate::services::templates::Branding;
use crate::watcher::ApplicationWatcher;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators every pipeline run needs. Built once at startup and cloned
/// into each run's context; clones share the same clients.
#[derive(Clone)]
pub struct Services {
  pub identity: Arc<dyn IdentityProvisioner>,
  pub mailer: Arc<MailGateway>,
  pub branding: Branding,
  pub identity_timeout: Duration,
  pub reviewer_alert_email: Option<String>,
}

impl Services {
  pub fn from_config(config: &AppConfig) -> AppResult<Self> {
    Ok(Self {
      identity: Arc::new(RestIdentityProvisioner::new(&config.identity)?),
      mailer: Arc::new(MailGateway::from_config(&config.mail)?),
      branding: Branding {
        platform_name: config.platform_name.clone(),
        login_url: config.login_url.clone(),
      },
      identity_timeout: config.identity.timeout,
      reviewer_alert_email: config.reviewer_alert_email.clone(),
    })
  }
}

/// Shared with every actix worker.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub watcher: ApplicationWatcher,
}
