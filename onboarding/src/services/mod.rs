// onboarding/src/services/mod.rs

//! Adapters over the external systems the pipelines call, plus the pure
//! helpers (credentials, templates) they share.

pub mod credentials;
pub mod identity;
pub mod mail;
pub mod templates;
