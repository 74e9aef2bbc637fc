use super::Application;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Change notification from the application store: the record as it was
/// before the write and as it is after. `before` is `None` for a create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdateEvent {
  /// Delivery-independent id; redeliveries of one change share it.
  pub event_id: String,
  pub application_id: String,
  #[serde(default)]
  pub before: Option<Application>,
  pub after: Application,
  #[serde(default = "Utc::now")]
  pub occurred_at: DateTime<Utc>,
}
