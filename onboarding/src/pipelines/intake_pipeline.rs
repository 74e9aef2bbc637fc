// onboarding/src/pipelines/intake_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::{DeliveryOutcome, IntakeCtxData};
use crate::services::mail::{MailGateway, NotificationMessage};
use crate::services::templates;
use flowline::{ContextData, Flows, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{info, warn};

/// New submission: acknowledge the applicant, alert the review inbox.
pub fn build_intake_pipeline() -> Pipeline<IntakeCtxData, AppError> {
  let no_reviewer_inbox: SkipCondition<IntakeCtxData> =
    Arc::new(|ctx_data: ContextData<IntakeCtxData>| ctx_data.with_read(|d| d.services.reviewer_alert_email.is_none()));

  let mut intake_p = Pipeline::<IntakeCtxData, AppError>::new(&[
    ("acknowledge_applicant", false, None),
    ("alert_reviewer", false, Some(no_reviewer_inbox)),
  ]);

  intake_p.on_root("acknowledge_applicant", |ctx_data: ContextData<IntakeCtxData>| {
    Box::pin(async move {
      let (mailer, message, application_id) = ctx_data.with_read(|d| {
        (
          d.services.mailer.clone(),
          templates::intake_acknowledgement(&d.services.branding, &d.application),
          d.application.id.clone(),
        )
      });
      let outcome = match message {
        Ok(message) => deliver(&mailer, &message, &application_id, "acknowledgement").await,
        Err(e) => {
          warn!(%application_id, error = %e, "Acknowledgement could not be composed.");
          DeliveryOutcome::Failed(e.to_string())
        }
      };
      ctx_data.with_write(|d| d.acknowledgement = Some(outcome));
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  intake_p.on_root("alert_reviewer", |ctx_data: ContextData<IntakeCtxData>| {
    Box::pin(async move {
      let (mailer, message, application_id) = ctx_data.with_read(|d| {
        let reviewer = d.services.reviewer_alert_email.clone().unwrap_or_default();
        (
          d.services.mailer.clone(),
          templates::reviewer_alert(&d.services.branding, &d.application, &reviewer),
          d.application.id.clone(),
        )
      });
      let outcome = deliver(&mailer, &message, &application_id, "reviewer_alert").await;
      ctx_data.with_write(|d| d.reviewer_alert = Some(outcome));
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  intake_p
}

pub fn register_intake_pipeline(flows: &Flows<AppError>) {
  flows.register_pipeline(build_intake_pipeline());
}

async fn deliver(
  mailer: &MailGateway,
  message: &NotificationMessage,
  application_id: &str,
  kind: &'static str,
) -> DeliveryOutcome {
  match mailer.send(message).await {
    Ok(receipt) => {
      info!(application_id, kind, channel = %receipt.channel, message_id = %receipt.message_id, "Intake email sent.");
      DeliveryOutcome::Delivered(receipt.channel)
    }
    Err(e) => {
      warn!(application_id, kind, error = %e, "Intake email was not delivered.");
      DeliveryOutcome::Failed(e.to_string())
    }
  }
}
