//! Records the pipeline observes. The application store owns them; this
//! crate only reads snapshots delivered with update events.

pub mod application;
pub mod event;

pub use application::{Application, ApplicationStatus};
pub use event::ApplicationUpdateEvent;
