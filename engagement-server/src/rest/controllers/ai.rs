//! `POST /ai/feedback` and `POST /ai/outcome` (spec §6.1) — C4's
//! feedback loop: record a user's reaction to an `AiSuggestion`
//! (computing the edit delta when the reaction is an edit) and, later
//! and independently, close the loop with an outcome measurement.

use axum::Json;
use axum::extract::State;
use engagement_auth::AnyPrincipal;
use engagement_core::model::{FeedbackAction, OutcomeKind, OutcomeMeasurement};
use engagement_core::{CoreError, FeedbackId, SuggestionId};
use serde::Deserialize;
use serde_json::json;

use crate::{AppError, ServerConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FeedbackActionPayload {
    Approved,
    Edited,
    Rejected,
    Ignored,
}

impl From<FeedbackActionPayload> for FeedbackAction {
    fn from(p: FeedbackActionPayload) -> Self {
        match p {
            FeedbackActionPayload::Approved => FeedbackAction::Approved,
            FeedbackActionPayload::Edited => FeedbackAction::Edited,
            FeedbackActionPayload::Rejected => FeedbackAction::Rejected,
            FeedbackActionPayload::Ignored => FeedbackAction::Ignored,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub suggestion_id: String,
    pub action: FeedbackActionPayload,
    pub original_content: Option<String>,
    pub edited_content: Option<String>,
    #[serde(default)]
    pub decision_latency_ms: i64,
}

/// `POST /ai/feedback` — called by the end user who approved, edited,
/// rejected or ignored a suggestion. Cross-tenant reads are forbidden
/// (spec §3 ownership rule), so a suggestion belonging to another
/// tenant than the caller's own is reported as not found rather than
/// leaking its existence.
pub async fn feedback(
    State(state): State<ServerConfig>,
    AnyPrincipal(principal): AnyPrincipal,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let suggestion_id = SuggestionId::from(req.suggestion_id);
    let suggestion = state
        .ai
        .suggestions
        .get(&suggestion_id)
        .await?
        .ok_or_else(|| AppError(CoreError::validation("unknown suggestion_id")))?;

    let (tenant, user) = match &principal {
        engagement_auth::Principal::EndUser { user, tenant } => (tenant.clone(), user.clone()),
        _ => return Err(AppError(CoreError::validation("feedback requires an end-user principal"))),
    };

    if suggestion.tenant != tenant {
        return Err(AppError(CoreError::validation("unknown suggestion_id")));
    }

    let feedback = state
        .ai
        .record_feedback(
            &tenant,
            &user,
            &suggestion,
            req.action.into(),
            req.original_content,
            req.edited_content,
            req.decision_latency_ms,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "feedback_id": feedback.id.to_string(),
        "edit_delta": feedback.edit_delta,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OutcomeKindPayload {
    ReplyReceived,
    MeetingBooked,
    TaskCompleted,
    Other,
}

impl From<OutcomeKindPayload> for OutcomeKind {
    fn from(p: OutcomeKindPayload) -> Self {
        match p {
            OutcomeKindPayload::ReplyReceived => OutcomeKind::ReplyReceived,
            OutcomeKindPayload::MeetingBooked => OutcomeKind::MeetingBooked,
            OutcomeKindPayload::TaskCompleted => OutcomeKind::TaskCompleted,
            OutcomeKindPayload::Other => OutcomeKind::Other,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub feedback_id: String,
    pub positive: bool,
    pub kind: OutcomeKindPayload,
}

/// `POST /ai/outcome` — a later process closing the loop (spec §4.4.4
/// "Outcome measurement"). Idempotent and monotonic: `record_outcome`
/// only ever sets `measured` once, so replays are a no-op success.
pub async fn outcome(
    State(state): State<ServerConfig>,
    AnyPrincipal(_principal): AnyPrincipal,
    Json(req): Json<OutcomeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let feedback_id = FeedbackId::from(req.feedback_id);
    state
        .ai
        .record_outcome(
            &feedback_id,
            OutcomeMeasurement {
                measured: true,
                positive: req.positive,
                kind: Some(req.kind.into()),
            },
        )
        .await?;

    Ok(Json(json!({ "success": true })))
}
