use async_trait::async_trait;
use engagement_core::model::{AiFeedback, AiSuggestion, OutcomeMeasurement};
use engagement_core::{FeedbackId, Result, SuggestionId};

/// §6.3 "AI Suggestions" — immutable once emitted.
#[async_trait]
pub trait AiSuggestionStore: Send + Sync {
    async fn insert(&self, suggestion: AiSuggestion) -> Result<()>;
    async fn get(&self, id: &SuggestionId) -> Result<Option<AiSuggestion>>;
}

/// §6.3 "AI Feedback" — rows are immutable except for the one-time,
/// monotonic `outcome` field (spec §4.4.3: "idempotent and monotonic;
/// outcome may be set once").
#[async_trait]
pub trait AiFeedbackStore: Send + Sync {
    async fn insert(&self, feedback: AiFeedback) -> Result<()>;
    async fn get(&self, id: &FeedbackId) -> Result<Option<AiFeedback>>;

    /// No-op if `outcome.measured` is already `true` on the stored row —
    /// the second call is a successful idempotent no-op, not an error.
    async fn set_outcome(&self, id: &FeedbackId, outcome: OutcomeMeasurement) -> Result<()>;
}
