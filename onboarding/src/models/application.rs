use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
  Pending,
  Approved,
  Rejected,
}

impl ApplicationStatus {
  /// `approved` and `rejected` are final decisions.
  pub fn is_terminal(self) -> bool {
    matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ApplicationStatus::Pending => "pending",
      ApplicationStatus::Approved => "approved",
      ApplicationStatus::Rejected => "rejected",
    }
  }
}

impl std::fmt::Display for ApplicationStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One tutor's submission for platform approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
  pub id: String,
  pub applicant_name: String,
  pub applicant_email: String,
  /// Free text as typed into the intake form; never validated there.
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub subjects: Vec<String>,
  #[serde(default)]
  pub qualifications: String,
  pub status: ApplicationStatus,
  pub submitted_at: DateTime<Utc>,
  #[serde(default)]
  pub decided_at: Option<DateTime<Utc>>,
}

impl Application {
  /// Phone number worth sending to the identity provider, if any.
  pub fn contact_phone(&self) -> Option<String> {
    self
      .phone
      .as_deref()
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .map(str::to_string)
  }

  pub fn subjects_display(&self) -> String {
    if self.subjects.is_empty() {
      "(none listed)".to_string()
    } else {
      self.subjects.join(", ")
    }
  }
}
