use std::sync::Arc;

use engagement_core::model::{AiFeedback, AiSuggestion, FeedbackAction, OutcomeMeasurement, UserAiPreferences};
use engagement_core::{Clock, FeedbackId, Result, TenantId};
use engagement_store::{AiFeedbackStore, UserPreferencesStore};

use crate::edit_delta::classify;

/// Records user reactions to `AiSuggestion`s and keeps
/// `UserAiPreferences`'s running counters and learned attributes in sync
/// (spec §4.4.4's preference update law).
pub struct FeedbackRecorder {
    pub feedback: Arc<dyn AiFeedbackStore>,
    pub user_preferences: Arc<dyn UserPreferencesStore>,
    pub clock: Arc<dyn Clock>,
}

impl FeedbackRecorder {
    pub async fn record(
        &self,
        tenant: &TenantId,
        user: &engagement_core::UserId,
        suggestion: &AiSuggestion,
        action: FeedbackAction,
        original_content: Option<String>,
        edited_content: Option<String>,
        decision_latency_ms: i64,
    ) -> Result<AiFeedback> {
        let edit_delta = match (action, &original_content, &edited_content) {
            (FeedbackAction::Edited, Some(original), Some(edited)) => Some(classify(original, edited)),
            _ => None,
        };

        let feedback = AiFeedback {
            id: FeedbackId::generate(),
            tenant: tenant.clone(),
            suggestion_ref: suggestion.id.clone(),
            action,
            original_content,
            edited_content,
            edit_delta: edit_delta.clone(),
            confidence_at_generation: suggestion.confidence,
            context_quality_at_generation: suggestion.context_quality,
            decision_latency_ms,
            outcome: OutcomeMeasurement::default(),
            recorded_at: self.clock.now(),
        };

        self.feedback.insert(feedback.clone()).await?;
        self.update_preferences(tenant, user, action, edit_delta.as_ref()).await?;
        Ok(feedback)
    }

    pub async fn record_outcome(&self, id: &FeedbackId, outcome: OutcomeMeasurement) -> Result<()> {
        self.feedback.set_outcome(id, outcome).await
    }

    async fn update_preferences(
        &self,
        tenant: &TenantId,
        user: &engagement_core::UserId,
        action: FeedbackAction,
        edit_delta: Option<&engagement_core::model::EditDelta>,
    ) -> Result<()> {
        let mut prefs = self.user_preferences.get_or_create(tenant, user).await?;
        apply_feedback(&mut prefs, action, edit_delta);
        self.user_preferences.save(prefs).await
    }
}

/// The running-rate update: every feedback event bumps `total_suggestions`
/// and exactly one of the four outcome counters, then all four rates are
/// recomputed against the new total (spec §4.4.4, invariant I12:
/// approval_rate + edit_rate + rejection_rate + ignored_rate == 1).
pub fn apply_feedback(prefs: &mut UserAiPreferences, action: FeedbackAction, edit_delta: Option<&engagement_core::model::EditDelta>) {
    prefs.total_suggestions += 1;
    match action {
        FeedbackAction::Approved => prefs.approvals += 1,
        FeedbackAction::Edited => prefs.edits += 1,
        FeedbackAction::Rejected => prefs.rejections += 1,
        FeedbackAction::Ignored => prefs.ignored += 1,
    }

    let total = prefs.total_suggestions as f64;
    prefs.approval_rate = prefs.approvals as f64 / total;
    prefs.edit_rate = prefs.edits as f64 / total;
    prefs.rejection_rate = prefs.rejections as f64 / total;
    prefs.ignored_rate = prefs.ignored as f64 / total;

    if let Some(delta) = edit_delta {
        use engagement_core::model::{LengthChange, PreferredLength, Tone, ToneShift, TriState};

        match delta.tone_shift {
            ToneShift::MoreFormal => prefs.preferred_tone = Some(Tone::Formal),
            ToneShift::MoreCasual => prefs.preferred_tone = Some(Tone::Casual),
            ToneShift::Same => {}
        }
        match delta.length_change {
            LengthChange::Shorter => prefs.preferred_length = Some(PreferredLength::Concise),
            LengthChange::Longer => prefs.preferred_length = Some(PreferredLength::Detailed),
            LengthChange::Same => {}
        }
        if delta.added_cta {
            prefs.prefers_ctas = TriState::True;
        } else if delta.removed_cta {
            prefs.prefers_ctas = TriState::False;
        }
        if delta.added_bullet_points {
            prefs.prefers_bullets = TriState::True;
        }
    }
}
