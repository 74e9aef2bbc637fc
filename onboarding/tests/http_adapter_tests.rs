// tests/http_adapter_tests.rs

mod common;

use common::setup_tracing;
use serde_json::json;
use std::time::Duration;
use tutor_onboarding::config::IdentityConfig;
use tutor_onboarding::services::identity::{
  IdentityProvisioner, IdentityRef, NewIdentity, ProvisionError, RestIdentityProvisioner,
};
use tutor_onboarding::services::mail::{HttpMailSender, MailBody, MailTransport, NotificationMessage, SendError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message(body: MailBody) -> NotificationMessage {
  NotificationMessage {
    to: "grace@example.com".to_string(),
    subject: "Approved".to_string(),
    body,
  }
}

fn sender(server: &MockServer) -> HttpMailSender {
  HttpMailSender::new(
    &format!("{}/emails", server.uri()),
    "re_test_key",
    "Tutors <noreply@tutors.example>",
    Duration::from_secs(5),
  )
  .unwrap()
}

#[tokio::test]
async fn mail_api_receives_bearer_auth_and_html_payload() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/emails"))
    .and(header("authorization", "Bearer re_test_key"))
    .and(body_json(json!({
      "from": "Tutors <noreply@tutors.example>",
      "to": ["grace@example.com"],
      "subject": "Approved",
      "html": "<p>Welcome</p>"
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_123"})))
    .expect(1)
    .mount(&server)
    .await;

  let id = sender(&server)
    .deliver(&message(MailBody::Html("<p>Welcome</p>".to_string())))
    .await
    .unwrap();
  assert_eq!(id, "email_123");
}

#[tokio::test]
async fn mail_api_text_body_uses_text_field() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/emails"))
    .and(body_json(json!({
      "from": "Tutors <noreply@tutors.example>",
      "to": ["grace@example.com"],
      "subject": "Approved",
      "text": "plain"
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_456"})))
    .expect(1)
    .mount(&server)
    .await;

  let id = sender(&server).deliver(&message(MailBody::Text("plain".to_string()))).await.unwrap();
  assert_eq!(id, "email_456");
}

#[tokio::test]
async fn mail_api_errors_map_to_send_errors() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/emails"))
    .respond_with(ResponseTemplate::new(429))
    .up_to_n_times(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/emails"))
    .respond_with(ResponseTemplate::new(422).set_body_string("invalid `to` field"))
    .mount(&server)
    .await;

  let sender = sender(&server);
  let msg = message(MailBody::Text("x".to_string()));
  assert_eq!(sender.deliver(&msg).await.unwrap_err(), SendError::RateLimited);
  assert_eq!(
    sender.deliver(&msg).await.unwrap_err(),
    SendError::Rejected {
      status: 422,
      body: "invalid `to` field".to_string()
    }
  );
}

fn provisioner(server: &MockServer) -> RestIdentityProvisioner {
  RestIdentityProvisioner::new(&IdentityConfig {
    api_base: server.uri(),
    project_id: "tutors-test".to_string(),
    access_token: "ya29.token".to_string(),
    timeout: Duration::from_secs(5),
  })
  .unwrap()
}

fn new_identity(phone: Option<&str>) -> NewIdentity {
  NewIdentity {
    email: "grace@example.com".to_string(),
    password: "pw-123".to_string(),
    display_name: "Grace Hopper".to_string(),
    phone_number: phone.map(str::to_string),
  }
}

fn provider_error(message: &str) -> ResponseTemplate {
  ResponseTemplate::new(400).set_body_json(json!({
    "error": {"code": 400, "message": message, "errors": [{"message": message, "reason": "invalid"}]}
  }))
}

#[tokio::test]
async fn identity_api_creates_account() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/v1/projects/tutors-test/accounts"))
    .and(header("authorization", "Bearer ya29.token"))
    .and(body_json(json!({
      "email": "grace@example.com",
      "password": "pw-123",
      "displayName": "Grace Hopper",
      "phoneNumber": "+15550100"
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "identitytoolkit#SignupNewUserResponse", "localId": "uid-abc"})))
    .expect(1)
    .mount(&server)
    .await;

  let identity = provisioner(&server).provision(&new_identity(Some("+15550100"))).await.unwrap();
  assert_eq!(identity, IdentityRef("uid-abc".to_string()));
}

#[tokio::test]
async fn identity_api_errors_are_classified() {
  setup_tracing();
  let cases = [
    (provider_error("EMAIL_EXISTS"), ProvisionError::AlreadyExists),
    (provider_error("INVALID_PHONE_NUMBER : Invalid format."), ProvisionError::InvalidPhone),
    (
      provider_error("QUOTA_EXCEEDED : Exceeded quota for account creation."),
      ProvisionError::Other("QUOTA_EXCEEDED : Exceeded quota for account creation.".to_string()),
    ),
  ];

  for (response, expected) in cases {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/v1/projects/tutors-test/accounts"))
      .respond_with(response)
      .mount(&server)
      .await;
    let err = provisioner(&server).provision(&new_identity(None)).await.unwrap_err();
    assert_eq!(err, expected);
  }
}

#[tokio::test]
async fn identity_api_non_json_failure_is_other() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/v1/projects/tutors-test/accounts"))
    .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
    .mount(&server)
    .await;

  match provisioner(&server).provision(&new_identity(None)).await.unwrap_err() {
    ProvisionError::Other(detail) => assert!(detail.contains("502")),
    other => panic!("expected Other, got {:?}", other),
  }
}
