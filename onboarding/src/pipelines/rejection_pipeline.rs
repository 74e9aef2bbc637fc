// onboarding/src/pipelines/rejection_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::{DeliveryOutcome, RejectionCtxData};
use crate::services::templates;
use flowline::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{info, instrument, warn};

/// Rejection notice. Same delivery rules as approval, no identity call.
pub fn build_rejection_pipeline() -> Pipeline<RejectionCtxData, AppError> {
  let mut rejection_p = Pipeline::<RejectionCtxData, AppError>::new(&[
    ("compose_notice", false, None),
    ("send_notice", false, None),
    ("record_outcome", false, None),
  ]);

  rejection_p.on_root("compose_notice", |ctx_data: ContextData<RejectionCtxData>| {
    Box::pin(async move {
      ctx_data.with_write(|d| match templates::rejection_notice(&d.services.branding, &d.application) {
        Ok(message) => d.message = Some(message),
        Err(e) => {
          warn!(application_id = %d.application.id, error = %e, "Rejection notice could not be composed.");
          d.delivery = Some(DeliveryOutcome::Failed(e.to_string()));
        }
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  rejection_p.on_root("send_notice", send_notice);

  rejection_p.on_root("record_outcome", |ctx_data: ContextData<RejectionCtxData>| {
    Box::pin(async move {
      let report = ctx_data.with_write(|d| {
        d.message = None;
        d.report()
      });
      match &report.delivery {
        Some(DeliveryOutcome::Delivered(channel)) => {
          info!(application_id = %report.application_id, %channel, "Rejection notice sent.")
        }
        _ => warn!(application_id = %report.application_id, "Rejection finished without notifying the applicant."),
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  rejection_p
}

pub fn register_rejection_pipeline(flows: &Flows<AppError>) {
  flows.register_pipeline(build_rejection_pipeline());
}

#[instrument(name = "rejection::send_notice", skip_all)]
async fn send_notice(ctx_data: ContextData<RejectionCtxData>) -> Result<PipelineControl, AppError> {
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
    None => return Err(AppError::Internal("no rejection notice was composed".to_string())),
  };

  let outcome = match mailer.send(&message).await {
    Ok(receipt) => {
      ctx_data.with_write(|d| d.message_id = Some(receipt.message_id));
      DeliveryOutcome::Delivered(receipt.channel)
    }
    Err(e) => {
      warn!(%application_id, error = %e, "Rejection notice was not delivered.");
      DeliveryOutcome::Failed(e.to_string())
    }
  };
  ctx_data.with_write(|d| d.delivery = Some(outcome));
  Ok(PipelineControl::Continue)
}
