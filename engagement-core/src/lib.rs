//! Shared types, error taxonomy, clock and configuration for the
//! cross-integration orchestration core: the identifiers, data model
//! structs, error kinds, and configuration every other `engagement-*`
//! crate builds on.

pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod webhook;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use error::{CoreError, ErrorCategory, Result};
pub use ids::{
    ActionKind, FeedbackId, GlobalTopicId, IntegrationKind, SuggestionId, TenantId,
    TenantIntegration, UserId, WorkQueueItemId,
};
pub use webhook::{HmacSha256Verifier, InsecureNoopVerifier, WebhookHeaders, WebhookVerifier};
