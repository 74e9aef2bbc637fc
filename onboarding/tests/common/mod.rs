// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use flowline::Flows;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tutor_onboarding::errors::AppError;
use tutor_onboarding::models::{Application, ApplicationStatus, ApplicationUpdateEvent};
use tutor_onboarding::pipelines::register_all_pipelines;
use tutor_onboarding::services::identity::{IdentityProvisioner, IdentityRef, NewIdentity, ProvisionError};
use tutor_onboarding::services::mail::{Channel, MailGateway, MailTransport, NotificationMessage, SendError};
use tutor_onboarding::services::templates::Branding;
use tutor_onboarding::state::Services;
use tutor_onboarding::watcher::{ApplicationWatcher, EventLedger};

/// Identity provider double: answers from a script, records every request.
/// Once the script is exhausted every call succeeds.
#[derive(Default)]
pub struct FakeProvisioner {
  script: Mutex<VecDeque<Result<IdentityRef, ProvisionError>>>,
  calls: Mutex<Vec<NewIdentity>>,
  delay: Option<Duration>,
}

impl FakeProvisioner {
  pub fn scripted(results: Vec<Result<IdentityRef, ProvisionError>>) -> Arc<Self> {
    Arc::new(Self {
      script: Mutex::new(results.into()),
      ..Default::default()
    })
  }

  pub fn succeeding() -> Arc<Self> {
    Self::scripted(vec![])
  }

  /// Every call sleeps for `delay` before answering.
  pub fn stalled(delay: Duration) -> Arc<Self> {
    Arc::new(Self {
      delay: Some(delay),
      ..Default::default()
    })
  }

  pub fn calls(&self) -> Vec<NewIdentity> {
    self.calls.lock().clone()
  }
}

#[async_trait]
impl IdentityProvisioner for FakeProvisioner {
  async fn provision(&self, request: &NewIdentity) -> Result<IdentityRef, ProvisionError> {
    let call_no = {
      let mut calls = self.calls.lock();
      calls.push(request.clone());
      calls.len()
    };
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    let next = self.script.lock().pop_front();
    next.unwrap_or_else(|| Ok(IdentityRef(format!("uid-{}", call_no))))
  }
}

/// Mail transport double: records every message, optionally fails all sends.
#[derive(Default)]
pub struct RecordingTransport {
  sent: Mutex<Vec<NotificationMessage>>,
  failure: Option<SendError>,
}

impl RecordingTransport {
  pub fn working() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn failing(error: SendError) -> Arc<Self> {
    Arc::new(Self {
      failure: Some(error),
      ..Default::default()
    })
  }

  pub fn sent(&self) -> Vec<NotificationMessage> {
    self.sent.lock().clone()
  }
}

#[async_trait]
impl MailTransport for RecordingTransport {
  async fn deliver(&self, message: &NotificationMessage) -> Result<String, SendError> {
    let n = {
      let mut sent = self.sent.lock();
      sent.push(message.clone());
      sent.len()
    };
    match &self.failure {
      Some(e) => Err(e.clone()),
      None => Ok(format!("msg-{}", n)),
    }
  }
}

pub fn services(
  provisioner: Arc<FakeProvisioner>,
  transport: Arc<RecordingTransport>,
  reviewer_alert_email: Option<&str>,
) -> Services {
  Services {
    identity: provisioner,
    mailer: Arc::new(MailGateway::new(Channel::Primary, transport, Duration::from_secs(5))),
    branding: Branding {
      platform_name: "Tutor Platform".to_string(),
      login_url: "https://tutors.example/login".to_string(),
    },
    identity_timeout: Duration::from_secs(10),
    reviewer_alert_email: reviewer_alert_email.map(str::to_string),
  }
}

pub fn watcher(services: Services) -> ApplicationWatcher {
  let flows = Arc::new(Flows::<AppError>::new());
  register_all_pipelines(&flows);
  ApplicationWatcher::new(flows, services, EventLedger::new(100, Duration::from_secs(3600)))
}

pub fn application(status: ApplicationStatus, phone: Option<&str>) -> Application {
  Application {
    id: "app-42".to_string(),
    applicant_name: "Grace Hopper".to_string(),
    applicant_email: "grace@example.com".to_string(),
    phone: phone.map(str::to_string),
    subjects: vec!["Computer Science".to_string()],
    qualifications: "PhD, Yale".to_string(),
    status,
    submitted_at: Utc::now(),
    decided_at: None,
  }
}

pub fn status_change(
  event_id: &str,
  before: Option<ApplicationStatus>,
  after: ApplicationStatus,
  phone: Option<&str>,
) -> ApplicationUpdateEvent {
  ApplicationUpdateEvent {
    event_id: event_id.to_string(),
    application_id: "app-42".to_string(),
    before: before.map(|s| application(s, phone)),
    after: application(after, phone),
    occurred_at: Utc::now(),
  }
}

pub fn approval_event(event_id: &str, phone: Option<&str>) -> ApplicationUpdateEvent {
  status_change(event_id, Some(ApplicationStatus::Pending), ApplicationStatus::Approved, phone)
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
