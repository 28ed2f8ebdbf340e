//! C1 — Credential Lifecycle Manager: maintains the invariant "every
//! active Integration Credential is usable within the next N minutes
//! with probability ~= P" (spec §4.1).

pub mod adapter;
pub mod manager;

pub use adapter::{AdapterError, ProviderAdapter, RefreshedCredential};
pub use manager::{CredentialManager, RefreshOutcome, RefreshRecord};
