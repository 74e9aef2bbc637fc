// onboarding/src/lib.rs

//! Tutor onboarding worker: reacts to application status changes by
//! provisioning identities and emailing applicants.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod watcher;
pub mod web;
