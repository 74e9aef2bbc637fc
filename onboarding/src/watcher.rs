// onboarding/src/watcher.rs

//! Turns application update events into pipeline runs.
//!
//! Each event is classified by its before/after status. Relevant events are
//! admitted at most once per event id; redeliveries of an admitted id are
//! reported as `Duplicate` and run nothing.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{ApplicationStatus, ApplicationUpdateEvent};
use crate::pipelines::contexts::{
  ApprovalCtxData, ApprovalReport, IntakeCtxData, IntakeReport, RejectionCtxData, RejectionReport,
};
use crate::state::Services;
use flowline::{ContextData, Flows};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
  /// Record created in `pending`.
  Submitted,
  Approved,
  Rejected,
}

impl std::fmt::Display for Transition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Transition::Submitted => "submitted",
      Transition::Approved => "approved",
      Transition::Rejected => "rejected",
    })
  }
}

/// The transition an event represents, if any flow cares about it.
/// A decided application is final: nothing moves it out of `approved` or `rejected`.
pub fn classify(event: &ApplicationUpdateEvent) -> Option<Transition> {
  let before = event.before.as_ref().map(|b| b.status);
  if before.is_some_and(ApplicationStatus::is_terminal) {
    return None;
  }
  match (before, event.after.status) {
    (None, ApplicationStatus::Pending) => Some(Transition::Submitted),
    (_, ApplicationStatus::Approved) => Some(Transition::Approved),
    (_, ApplicationStatus::Rejected) => Some(Transition::Rejected),
    _ => None,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  Accepted(Transition),
  Ignored,
  Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
  Ignored,
  Duplicate,
  Approval(ApprovalReport),
  Rejection(RejectionReport),
  Intake(IntakeReport),
}

/// Memory of admitted event ids, bounded in size and in age.
pub struct EventLedger {
  seen: Cache<String, ()>,
}

impl EventLedger {
  pub fn new(capacity: u64, ttl: Duration) -> Self {
    Self {
      seen: Cache::builder()
        .max_capacity(capacity.max(1))
        .time_to_live(ttl)
        .eviction_policy(EvictionPolicy::lru())
        .build(),
    }
  }

  /// Records `event_id`. Returns `false` when it was already present.
  pub fn record(&self, event_id: &str) -> bool {
    self.seen.entry(event_id.to_string()).or_insert(()).is_fresh()
  }

  pub fn len(&self) -> u64 {
    self.seen.run_pending_tasks();
    self.seen.entry_count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Decrements the in-flight counter however the run ends.
struct InFlightGuard(Arc<AtomicU64>);

impl InFlightGuard {
  fn enter(counter: &Arc<AtomicU64>) -> Self {
    counter.fetch_add(1, Ordering::SeqCst);
    Self(counter.clone())
  }
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

#[derive(Clone)]
pub struct ApplicationWatcher {
  flows: Arc<Flows<AppError>>,
  services: Services,
  ledger: Arc<EventLedger>,
  in_flight: Arc<AtomicU64>,
  /// Runtime that owns background runs. HTTP worker runtimes stop before
  /// the main one, so runs are not spawned on them.
  runtime: Option<Handle>,
}

impl ApplicationWatcher {
  pub fn new(flows: Arc<Flows<AppError>>, services: Services, ledger: EventLedger) -> Self {
    Self {
      flows,
      services,
      ledger: Arc::new(ledger),
      in_flight: Arc::new(AtomicU64::new(0)),
      runtime: Handle::try_current().ok(),
    }
  }

  /// Background runs started by `dispatch` that have not finished yet.
  pub fn in_flight(&self) -> u64 {
    self.in_flight.load(Ordering::SeqCst)
  }

  /// Waits for background runs to finish, at most `grace`.
  /// Returns `false` when runs were still active at the deadline.
  pub async fn drain(&self, grace: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + grace;
    while self.in_flight() > 0 {
      if tokio::time::Instant::now() >= deadline {
        warn!(active_runs = self.in_flight(), "Timed out waiting for in-flight runs.");
        return false;
      }
      tokio::time::sleep(Duration::from_millis(50)).await;
    }
    info!("All in-flight runs finished.");
    true
  }

  /// Classifies `event` and claims its id. Only an `Accepted` admission may run a flow.
  pub fn admit(&self, event: &ApplicationUpdateEvent) -> Admission {
    if let Some(before) = &event.before {
      if before.status.is_terminal() && before.status != event.after.status {
        warn!(
          event_id = %event.event_id,
          application_id = %event.application_id,
          from = ?before.status,
          to = ?event.after.status,
          "Decided application changed status; ignoring."
        );
        return Admission::Ignored;
      }
    }

    if event.application_id != event.after.id {
      warn!(
        event_id = %event.event_id,
        application_id = %event.application_id,
        after_id = %event.after.id,
        "Event application id does not match its after-image; ignoring."
      );
      return Admission::Ignored;
    }

    let Some(transition) = classify(event) else {
      debug!(event_id = %event.event_id, application_id = %event.application_id, "No actionable transition.");
      return Admission::Ignored;
    };

    if !self.ledger.record(&event.event_id) {
      info!(
        event_id = %event.event_id,
        application_id = %event.application_id,
        %transition,
        "Redelivered event suppressed."
      );
      return Admission::Duplicate;
    }
    Admission::Accepted(transition)
  }

  /// Admits `event` and runs its flow to completion.
  pub async fn handle(&self, event: ApplicationUpdateEvent) -> AppResult<WatchOutcome> {
    match self.admit(&event) {
      Admission::Ignored => Ok(WatchOutcome::Ignored),
      Admission::Duplicate => Ok(WatchOutcome::Duplicate),
      Admission::Accepted(transition) => self.run(transition, event).await,
    }
  }

  /// Admits `event` and, when accepted, runs its flow on a background task.
  /// The run counts as in flight until it finishes; see `drain`.
  pub fn dispatch(&self, event: ApplicationUpdateEvent) -> Admission {
    let admission = self.admit(&event);
    if let Admission::Accepted(transition) = admission {
      let watcher = self.clone();
      let guard = InFlightGuard::enter(&self.in_flight);
      let task = async move {
        let _guard = guard;
        let event_id = event.event_id.clone();
        if let Err(e) = watcher.run(transition, event).await {
          error!(%event_id, %transition, error = %e, "Background flow failed.");
        }
      };
      match &self.runtime {
        Some(runtime) => drop(runtime.spawn(task)),
        None => drop(tokio::spawn(task)),
      }
    }
    admission
  }

  async fn run(&self, transition: Transition, event: ApplicationUpdateEvent) -> AppResult<WatchOutcome> {
    let span = info_span!(
      "watcher::run",
      event_id = %event.event_id,
      application_id = %event.application_id,
      %transition
    );
    let ApplicationUpdateEvent { event_id, after, .. } = event;
    let services = self.services.clone();

    async move {
      info!("Running flow for transition.");
      match transition {
        Transition::Approved => {
          let ctx = ContextData::new(ApprovalCtxData::new(services, event_id, after));
          let result = self.flows.run(ctx.clone()).await?;
          debug!(completed = result.is_completed(), stopped_at = ?result.stopped_at(), "Approval pipeline returned.");
          let report = ctx.read().report();
          Ok(WatchOutcome::Approval(report))
        }
        Transition::Rejected => {
          let ctx = ContextData::new(RejectionCtxData::new(services, event_id, after));
          self.flows.run(ctx.clone()).await?;
          let report = ctx.read().report();
          Ok(WatchOutcome::Rejection(report))
        }
        Transition::Submitted => {
          let ctx = ContextData::new(IntakeCtxData::new(services, event_id, after));
          self.flows.run(ctx.clone()).await?;
          let report = ctx.read().report();
          Ok(WatchOutcome::Intake(report))
        }
      }
    }
    .instrument(span)
    .await
  }
}
