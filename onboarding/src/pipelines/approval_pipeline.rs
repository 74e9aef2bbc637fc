// onboarding/src/pipelines/approval_pipeline.rs

//! The approval orchestrator: credentials, identity, notification, outcome.

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::{ApprovalCtxData, ApprovalStage, DeliveryOutcome};
use crate::services::credentials::OneTimePassword;
use crate::services::identity::{IdentityRef, NewIdentity, ProvisionError};
use crate::services::templates;
use crate::state::Services;
use chrono::Utc;
use flowline::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{error, event, info, instrument, warn, Level};

pub fn build_approval_pipeline() -> Pipeline<ApprovalCtxData, AppError> {
  let mut approval_p = Pipeline::<ApprovalCtxData, AppError>::new(&[
    ("generate_credentials", false, None),
    ("provision_identity", false, None),
    ("send_notification", false, None),
    ("record_outcome", false, None),
  ]);

  approval_p.on_root("generate_credentials", |ctx_data: ContextData<ApprovalCtxData>| {
    Box::pin(async move {
      ctx_data.with_write(|d| {
        d.password = Some(OneTimePassword::generate());
        d.stage = ApprovalStage::CredentialsGenerated;
      });
      event!(Level::DEBUG, "One-time password generated.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  approval_p.on_root("provision_identity", provision_identity);

  // Composing happens in `before` so the `on` handler only deals with delivery.
  approval_p.before_root("send_notification", |ctx_data: ContextData<ApprovalCtxData>| {
    Box::pin(async move {
      ctx_data.with_write(|d| {
        let composed = if d.identity_preexisted {
          templates::approval_for_existing_account(&d.services.branding, &d.application)
        } else {
          let password = d.password.as_ref().ok_or_else(|| {
            AppError::Internal("approval email composed without a generated password".to_string())
          })?;
          templates::approval_with_credentials(&d.services.branding, &d.application, password)
        };
        match composed {
          Ok(message) => d.message = Some(message),
          Err(e) => {
            warn!(application_id = %d.application.id, error = %e, "Approval email could not be composed.");
            d.delivery = Some(DeliveryOutcome::Failed(e.to_string()));
          }
        }
        Ok::<_, AppError>(())
      })?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  approval_p.on_root("send_notification", send_notification);
  approval_p.on_root("record_outcome", record_outcome);

  approval_p
}

pub fn register_approval_pipeline(flows: &Flows<AppError>) {
  flows.register_pipeline(build_approval_pipeline());
}

/// One bounded call to the identity provider. An elapsed timeout is `Other`.
async fn call_provider(services: &Services, request: &NewIdentity) -> Result<IdentityRef, ProvisionError> {
  match tokio::time::timeout(services.identity_timeout, services.identity.provision(request)).await {
    Ok(result) => result,
    Err(_) => Err(ProvisionError::Other(format!(
      "identity provider timed out after {:?}",
      services.identity_timeout
    ))),
  }
}

#[instrument(name = "approval::provision_identity", skip_all)]
async fn provision_identity(ctx_data: ContextData<ApprovalCtxData>) -> AppResult<PipelineControl> {
  let (services, application, password) = {
    let guard = ctx_data.read();
    (
      guard.services.clone(),
      guard.application.clone(),
      guard.password.as_ref().map(|p| p.expose().to_string()),
    )
  };
  let password =
    password.ok_or_else(|| AppError::Internal("identity requested before credentials were generated".to_string()))?;

  let request = NewIdentity {
    email: application.applicant_email.clone(),
    password,
    display_name: application.applicant_name.clone(),
    phone_number: application.contact_phone(),
  };

  let mut phone_dropped = false;
  let mut result = call_provider(&services, &request).await;
  if matches!(result, Err(ProvisionError::InvalidPhone)) && request.phone_number.is_some() {
    warn!(application_id = %application.id, "Identity provider rejected the phone number; retrying once without it.");
    phone_dropped = true;
    result = call_provider(&services, &request.without_phone()).await;
  }

  match result {
    Ok(identity) => {
      info!(application_id = %application.id, identity = %identity, phone_dropped, "Identity provisioned.");
      ctx_data.with_write(|d| {
        d.identity = Some(identity);
        d.phone_dropped = phone_dropped;
        d.stage = ApprovalStage::IdentityProvisioned;
      });
      Ok(PipelineControl::Continue)
    }
    Err(ProvisionError::AlreadyExists) => {
      info!(application_id = %application.id, "Identity already exists for applicant; notifying without new credentials.");
      ctx_data.with_write(|d| {
        d.identity_preexisted = true;
        d.phone_dropped = phone_dropped;
        d.stage = ApprovalStage::IdentityProvisioned;
      });
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      error!(application_id = %application.id, error = %e, "Identity provisioning failed; no notification will be sent.");
      ctx_data.with_write(|d| {
        d.password = None;
        d.stage = ApprovalStage::Failed(e.to_string());
      });
      Ok(PipelineControl::Stop)
    }
  }
}

#[instrument(name = "approval::send_notification", skip_all)]
async fn send_notification(ctx_data: ContextData<ApprovalCtxData>) -> AppResult<PipelineControl> {
  let (mailer, message, application_id, compose_failed) = ctx_data.with_read(|d| {
    (
      d.services.mailer.clone(),
      d.message.clone(),
      d.application.id.clone(),
      d.delivery.is_some(),
    )
  });
  let message = match message {
    Some(message) => message,
    None if compose_failed => return Ok(PipelineControl::Continue),
    None => return Err(AppError::Internal("no approval email was composed".to_string())),
  };

  match mailer.send(&message).await {
    Ok(receipt) => {
      ctx_data.with_write(|d| {
        d.delivery = Some(DeliveryOutcome::Delivered(receipt.channel));
        d.message_id = Some(receipt.message_id);
        d.stage = ApprovalStage::NotificationSent;
      });
    }
    Err(e) => {
      // The identity stays in place; the applicant has an account but no email.
      warn!(%application_id, error = %e, "Approval email was not delivered; provisioned identity left intact.");
      ctx_data.with_write(|d| d.delivery = Some(DeliveryOutcome::Failed(e.to_string())));
    }
  }
  Ok(PipelineControl::Continue)
}

async fn record_outcome(ctx_data: ContextData<ApprovalCtxData>) -> AppResult<PipelineControl> {
  let report = ctx_data.with_write(|d| {
    d.password = None;
    d.message = None;
    if d.stage == ApprovalStage::NotificationSent {
      d.stage = ApprovalStage::Done;
    }
    d.report()
  });

  match &report.delivery {
    Some(DeliveryOutcome::Delivered(channel)) => info!(
      application_id = %report.application_id,
      %channel,
      message_id = report.message_id.as_deref().unwrap_or_default(),
      identity_preexisted = report.identity_preexisted,
      completed_at = %Utc::now().to_rfc3339(),
      "Approval completed."
    ),
    _ => warn!(
      application_id = %report.application_id,
      stage = %report.stage,
      completed_at = %Utc::now().to_rfc3339(),
      "Approval finished without notifying the applicant."
    ),
  }
  Ok(PipelineControl::Continue)
}
