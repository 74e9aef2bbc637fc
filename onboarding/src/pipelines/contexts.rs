// onboarding/src/pipelines/contexts.rs

//! Root data for each pipeline. Handlers receive these wrapped in
//! `flowline::ContextData`; the watcher reads the final state back as a report.

use crate::models::Application;
use crate::services::credentials::OneTimePassword;
use crate::services::identity::IdentityRef;
use crate::services::mail::{Channel, NotificationMessage};
use crate::state::Services;

/// Where an approval run is, or where it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalStage {
  Start,
  CredentialsGenerated,
  /// An identity is available: created in this run, or found to exist already.
  IdentityProvisioned,
  NotificationSent,
  Done,
  Failed(String),
}

impl std::fmt::Display for ApprovalStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ApprovalStage::Start => f.write_str("start"),
      ApprovalStage::CredentialsGenerated => f.write_str("credentials_generated"),
      ApprovalStage::IdentityProvisioned => f.write_str("identity_provisioned"),
      ApprovalStage::NotificationSent => f.write_str("notification_sent"),
      ApprovalStage::Done => f.write_str("done"),
      ApprovalStage::Failed(reason) => write!(f, "failed: {}", reason),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
  Delivered(Channel),
  Failed(String),
}

// --- Approval ---

#[derive(Clone)]
pub struct ApprovalCtxData {
  pub services: Services,
  pub event_id: String,
  pub application: Application,

  // Filled in by the steps:
  pub stage: ApprovalStage,
  pub password: Option<OneTimePassword>,
  pub identity: Option<IdentityRef>,
  pub phone_dropped: bool,
  pub identity_preexisted: bool,
  pub message: Option<NotificationMessage>,
  pub delivery: Option<DeliveryOutcome>,
  pub message_id: Option<String>,
}

impl ApprovalCtxData {
  pub fn new(services: Services, event_id: String, application: Application) -> Self {
    Self {
      services,
      event_id,
      application,
      stage: ApprovalStage::Start,
      password: None,
      identity: None,
      phone_dropped: false,
      identity_preexisted: false,
      message: None,
      delivery: None,
      message_id: None,
    }
  }

  pub fn report(&self) -> ApprovalReport {
    ApprovalReport {
      application_id: self.application.id.clone(),
      stage: self.stage.clone(),
      phone_dropped: self.phone_dropped,
      identity_preexisted: self.identity_preexisted,
      identity: self.identity.clone(),
      delivery: self.delivery.clone(),
      message_id: self.message_id.clone(),
    }
  }
}

/// Outcome of one approval run. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReport {
  pub application_id: String,
  pub stage: ApprovalStage,
  pub phone_dropped: bool,
  pub identity_preexisted: bool,
  pub identity: Option<IdentityRef>,
  pub delivery: Option<DeliveryOutcome>,
  pub message_id: Option<String>,
}

// --- Rejection ---

#[derive(Clone)]
pub struct RejectionCtxData {
  pub services: Services,
  pub event_id: String,
  pub application: Application,
  pub message: Option<NotificationMessage>,
  pub delivery: Option<DeliveryOutcome>,
  pub message_id: Option<String>,
}

impl RejectionCtxData {
  pub fn new(services: Services, event_id: String, application: Application) -> Self {
    Self {
      services,
      event_id,
      application,
      message: None,
      delivery: None,
      message_id: None,
    }
  }

  pub fn report(&self) -> RejectionReport {
    RejectionReport {
      application_id: self.application.id.clone(),
      delivery: self.delivery.clone(),
      message_id: self.message_id.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReport {
  pub application_id: String,
  pub delivery: Option<DeliveryOutcome>,
  pub message_id: Option<String>,
}

// --- Intake ---

#[derive(Clone)]
pub struct IntakeCtxData {
  pub services: Services,
  pub event_id: String,
  pub application: Application,
  pub acknowledgement: Option<DeliveryOutcome>,
  /// Stays `None` when no reviewer inbox is configured.
  pub reviewer_alert: Option<DeliveryOutcome>,
}

impl IntakeCtxData {
  pub fn new(services: Services, event_id: String, application: Application) -> Self {
    Self {
      services,
      event_id,
      application,
      acknowledgement: None,
      reviewer_alert: None,
    }
  }

  pub fn report(&self) -> IntakeReport {
    IntakeReport {
      application_id: self.application.id.clone(),
      acknowledgement: self.acknowledgement.clone(),
      reviewer_alert: self.reviewer_alert.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReport {
  pub application_id: String,
  pub acknowledgement: Option<DeliveryOutcome>,
  pub reviewer_alert: Option<DeliveryOutcome>,
}
