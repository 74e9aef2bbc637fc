// tests/approval_flow_tests.rs

mod common;

use common::*;
use serial_test::serial;
use std::time::Duration;
use tutor_onboarding::pipelines::contexts::{ApprovalReport, ApprovalStage, DeliveryOutcome};
use tutor_onboarding::services::identity::{IdentityRef, ProvisionError};
use tutor_onboarding::services::mail::{Channel, SendError};
use tutor_onboarding::watcher::WatchOutcome;

fn expect_approval(outcome: WatchOutcome) -> ApprovalReport {
  match outcome {
    WatchOutcome::Approval(report) => report,
    other => panic!("expected an approval outcome, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn approval_provisions_once_and_sends_credentials() {
  setup_tracing();
  let provisioner = FakeProvisioner::succeeding();
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", Some("+1 555 0100"))).await.unwrap());

  assert_eq!(report.stage, ApprovalStage::Done);
  assert_eq!(report.identity, Some(IdentityRef("uid-1".to_string())));
  assert_eq!(report.delivery, Some(DeliveryOutcome::Delivered(Channel::Primary)));
  assert_eq!(report.message_id.as_deref(), Some("msg-1"));
  assert!(!report.phone_dropped);
  assert!(!report.identity_preexisted);

  let calls = provisioner.calls();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].email, "grace@example.com");
  assert_eq!(calls[0].display_name, "Grace Hopper");
  assert_eq!(calls[0].phone_number.as_deref(), Some("+1 555 0100"));

  let sent = transport.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "grace@example.com");
}

#[tokio::test]
#[serial]
async fn emailed_password_is_the_provisioned_password() {
  setup_tracing();
  let provisioner = FakeProvisioner::succeeding();
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  watcher.handle(approval_event("evt-1", None)).await.unwrap();

  let password = provisioner.calls()[0].password.clone();
  assert!(password.len() >= 22, "password should carry at least 16 bytes of entropy");
  let body = transport.sent()[0].body.content().to_string();
  assert!(body.contains(&password));
  assert!(body.contains("grace@example.com"));
  assert!(body.contains("change this password"));
}

#[tokio::test]
#[serial]
async fn each_run_generates_a_fresh_password() {
  setup_tracing();
  let provisioner = FakeProvisioner::succeeding();
  let watcher = watcher(services(provisioner.clone(), RecordingTransport::working(), None));

  watcher.handle(approval_event("evt-1", None)).await.unwrap();
  watcher.handle(approval_event("evt-2", None)).await.unwrap();

  let calls = provisioner.calls();
  assert_eq!(calls.len(), 2);
  assert_ne!(calls[0].password, calls[1].password);
}

#[tokio::test]
#[serial]
async fn invalid_phone_is_retried_once_without_phone() {
  setup_tracing();
  let provisioner = FakeProvisioner::scripted(vec![
    Err(ProvisionError::InvalidPhone),
    Ok(IdentityRef("uid-retry".to_string())),
  ]);
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", Some("not-a-phone"))).await.unwrap());

  assert_eq!(report.stage, ApprovalStage::Done);
  assert!(report.phone_dropped);
  assert_eq!(report.identity, Some(IdentityRef("uid-retry".to_string())));

  let calls = provisioner.calls();
  assert_eq!(calls.len(), 2);
  assert_eq!(calls[0].phone_number.as_deref(), Some("not-a-phone"));
  assert_eq!(calls[1].phone_number, None);
  assert_eq!(calls[0].password, calls[1].password);

  let sent = transport.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "grace@example.com");
  assert!(sent[0].body.content().contains(&calls[1].password));
}

#[tokio::test]
#[serial]
async fn second_invalid_phone_fails_without_further_retries() {
  setup_tracing();
  let provisioner = FakeProvisioner::scripted(vec![Err(ProvisionError::InvalidPhone), Err(ProvisionError::InvalidPhone)]);
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", Some("12"))).await.unwrap());

  assert!(matches!(report.stage, ApprovalStage::Failed(_)));
  assert_eq!(provisioner.calls().len(), 2);
  assert!(transport.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn invalid_phone_without_a_phone_is_not_retried() {
  setup_tracing();
  let provisioner = FakeProvisioner::scripted(vec![Err(ProvisionError::InvalidPhone)]);
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", Some("   "))).await.unwrap());

  assert!(matches!(report.stage, ApprovalStage::Failed(_)));
  assert_eq!(provisioner.calls().len(), 1);
  assert_eq!(provisioner.calls()[0].phone_number, None);
  assert!(transport.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn existing_identity_still_gets_exactly_one_notification_without_password() {
  setup_tracing();
  let provisioner = FakeProvisioner::scripted(vec![Err(ProvisionError::AlreadyExists)]);
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", None)).await.unwrap());

  assert_eq!(report.stage, ApprovalStage::Done);
  assert!(report.identity_preexisted);
  assert_eq!(report.identity, None);
  assert_eq!(report.delivery, Some(DeliveryOutcome::Delivered(Channel::Primary)));

  let calls = provisioner.calls();
  assert_eq!(calls.len(), 1);
  let sent = transport.sent();
  assert_eq!(sent.len(), 1);
  let body = sent[0].body.content();
  assert!(!body.contains(&calls[0].password), "an unregistered password must not be emailed");
  assert!(body.contains("existing password"));
}

#[tokio::test]
#[serial]
async fn other_provider_error_fails_and_sends_nothing() {
  setup_tracing();
  let provisioner = FakeProvisioner::scripted(vec![Err(ProvisionError::Other("quota exceeded".to_string()))]);
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", Some("+1 555 0100"))).await.unwrap());

  match &report.stage {
    ApprovalStage::Failed(reason) => assert!(reason.contains("quota exceeded")),
    other => panic!("expected Failed, got {:?}", other),
  }
  assert_eq!(report.delivery, None);
  assert_eq!(provisioner.calls().len(), 1);
  assert!(transport.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn delivery_failure_keeps_the_identity_and_reports_a_warning() {
  setup_tracing();
  let provisioner = FakeProvisioner::succeeding();
  let transport = RecordingTransport::failing(SendError::Rejected {
    status: 503,
    body: "unavailable".to_string(),
  });
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", None)).await.unwrap());

  assert_eq!(report.stage, ApprovalStage::IdentityProvisioned);
  assert_eq!(report.identity, Some(IdentityRef("uid-1".to_string())));
  assert!(matches!(report.delivery, Some(DeliveryOutcome::Failed(ref reason)) if reason.contains("503")));
  assert_eq!(report.message_id, None);
  // One attempt, no failover and no rollback call.
  assert_eq!(transport.sent().len(), 1);
  assert_eq!(provisioner.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn identity_call_is_bounded_by_timeout() {
  setup_tracing();
  let provisioner = FakeProvisioner::stalled(Duration::from_secs(600));
  let transport = RecordingTransport::working();
  let watcher = watcher(services(provisioner.clone(), transport.clone(), None));

  let report = expect_approval(watcher.handle(approval_event("evt-1", None)).await.unwrap());

  match &report.stage {
    ApprovalStage::Failed(reason) => assert!(reason.contains("timed out")),
    other => panic!("expected Failed, got {:?}", other),
  }
  assert_eq!(provisioner.calls().len(), 1);
  assert!(transport.sent().is_empty());
}
