// onboarding/src/services/templates.rs

//! Email bodies for every flow. Pure functions, no I/O.
//!
//! HTML bodies are askama templates, so every interpolated value is escaped.

use crate::models::Application;
use crate::services::credentials::OneTimePassword;
use crate::services::mail::{MailBody, NotificationMessage, SendError};
use askama::Template;

/// Values every template needs besides the application itself.
#[derive(Debug, Clone)]
pub struct Branding {
  pub platform_name: String,
  pub login_url: String,
}

#[derive(Template)]
#[template(
  source = r#"<p>Hello {{ name }},</p>
<p>Your application to teach on {{ platform }} has been approved.</p>
<p>You can now sign in at <a href="{{ login_url }}">{{ login_url }}</a> with:</p>
<ul><li>Email: <strong>{{ email }}</strong></li><li>Password: <strong>{{ password }}</strong></li></ul>
<p>Please change this password the first time you log in.</p>
<p>Welcome aboard,<br/>The {{ platform }} team</p>"#,
  ext = "html"
)]
struct ApprovalWithCredentialsHtml<'a> {
  name: &'a str,
  platform: &'a str,
  login_url: &'a str,
  email: &'a str,
  password: &'a str,
}

#[derive(Template)]
#[template(
  source = r#"<p>Hello {{ name }},</p>
<p>Your application to teach on {{ platform }} has been approved.</p>
<p>An account already exists for <strong>{{ email }}</strong>. Sign in at
<a href="{{ login_url }}">{{ login_url }}</a> with your existing password, or use
"Forgot password" on that page to set a new one.</p>
<p>Welcome aboard,<br/>The {{ platform }} team</p>"#,
  ext = "html"
)]
struct ExistingAccountHtml<'a> {
  name: &'a str,
  platform: &'a str,
  login_url: &'a str,
  email: &'a str,
}

#[derive(Template)]
#[template(
  source = r#"<p>Hello {{ name }},</p>
<p>Thank you for your interest in teaching on {{ platform }}. After reviewing
your application we are unable to approve it at this time.</p>
<p>You are welcome to apply again in the future.</p>
<p>Kind regards,<br/>The {{ platform }} team</p>"#,
  ext = "html"
)]
struct RejectionHtml<'a> {
  name: &'a str,
  platform: &'a str,
}

#[derive(Template)]
#[template(
  source = r#"<p>Hello {{ name }},</p>
<p>We have received your application to teach {{ subjects }} on {{ platform }}.</p>
<p>Our team will review it and email you once a decision has been made.</p>
<p>Kind regards,<br/>The {{ platform }} team</p>"#,
  ext = "html"
)]
struct IntakeAcknowledgementHtml<'a> {
  name: &'a str,
  subjects: &'a str,
  platform: &'a str,
}

fn html_to(
  application: &Application,
  subject: String,
  template: &impl Template,
) -> Result<NotificationMessage, SendError> {
  let html = template
    .render()
    .map_err(|e| SendError::InvalidMessage(format!("email template failed to render: {}", e)))?;
  Ok(NotificationMessage {
    to: application.applicant_email.clone(),
    subject,
    body: MailBody::Html(html),
  })
}

/// Approval with a freshly provisioned account: carries the login email and
/// the one-time password.
pub fn approval_with_credentials(
  branding: &Branding,
  application: &Application,
  password: &OneTimePassword,
) -> Result<NotificationMessage, SendError> {
  let template = ApprovalWithCredentialsHtml {
    name: &application.applicant_name,
    platform: &branding.platform_name,
    login_url: &branding.login_url,
    email: &application.applicant_email,
    password: password.expose(),
  };
  let subject = format!("Your {} tutor application has been approved", branding.platform_name);
  html_to(application, subject, &template)
}

/// Approval for an applicant whose account already existed. No password:
/// the one generated in this run was never registered.
pub fn approval_for_existing_account(
  branding: &Branding,
  application: &Application,
) -> Result<NotificationMessage, SendError> {
  let template = ExistingAccountHtml {
    name: &application.applicant_name,
    platform: &branding.platform_name,
    login_url: &branding.login_url,
    email: &application.applicant_email,
  };
  let subject = format!("Your {} tutor application has been approved", branding.platform_name);
  html_to(application, subject, &template)
}

pub fn rejection_notice(branding: &Branding, application: &Application) -> Result<NotificationMessage, SendError> {
  let template = RejectionHtml {
    name: &application.applicant_name,
    platform: &branding.platform_name,
  };
  let subject = format!("Update on your {} tutor application", branding.platform_name);
  html_to(application, subject, &template)
}

pub fn intake_acknowledgement(
  branding: &Branding,
  application: &Application,
) -> Result<NotificationMessage, SendError> {
  let subjects = application.subjects_display();
  let template = IntakeAcknowledgementHtml {
    name: &application.applicant_name,
    subjects: &subjects,
    platform: &branding.platform_name,
  };
  let subject = format!("We received your {} tutor application", branding.platform_name);
  html_to(application, subject, &template)
}

/// Plain-text alert for the review inbox.
pub fn reviewer_alert(branding: &Branding, application: &Application, reviewer_email: &str) -> NotificationMessage {
  let text = format!(
    "A new tutor application is waiting for review.\n\n\
     Application: {id}\n\
     Name: {name}\n\
     Email: {email}\n\
     Phone: {phone}\n\
     Subjects: {subjects}\n\
     Submitted: {submitted}\n\n\
     Qualifications:\n{qualifications}\n",
    id = application.id,
    name = application.applicant_name,
    email = application.applicant_email,
    phone = application.contact_phone().unwrap_or_else(|| "(not given)".to_string()),
    subjects = application.subjects_display(),
    submitted = application.submitted_at.to_rfc3339(),
    qualifications = application.qualifications,
  );
  NotificationMessage {
    to: reviewer_email.to_string(),
    subject: format!("[{}] New tutor application from {}", branding.platform_name, application.applicant_name),
    body: MailBody::Text(text),
  }
}
