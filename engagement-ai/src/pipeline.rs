use std::sync::Arc;

use engagement_core::model::{AiSuggestion, ContextDossier, FeedbackAction, OutcomeMeasurement};
use engagement_core::{ActionKind, Clock, CoreConfig, FeedbackId, Result, SuggestionId, TenantId, UserId};
use engagement_store::{AiFeedbackStore, AiSuggestionStore, OrgPreferencesStore, UserPreferencesStore};

use crate::dossier::{DossierAssembler, DossierRequest};
use crate::feedback::FeedbackRecorder;
use crate::routing::{effective_confidence, route};
use crate::skill_guard::SkillInvocationGuard;

/// Top-level C4 entry point: assembles context, scores and routes a
/// drafted suggestion, and records the feedback loop that trains
/// `UserAiPreferences` over time.
pub struct AiPipeline {
    pub dossier: DossierAssembler,
    pub suggestions: Arc<dyn AiSuggestionStore>,
    pub feedback: FeedbackRecorder,
    pub user_preferences: Arc<dyn UserPreferencesStore>,
    pub org_preferences: Arc<dyn OrgPreferencesStore>,
    pub clock: Arc<dyn Clock>,
    pub config: CoreConfig,
}

impl AiPipeline {
    pub async fn assemble_dossier(&self, req: DossierRequest) -> Result<ContextDossier> {
        self.dossier.assemble(req).await
    }

    /// Routes an already-drafted suggestion against the tenant's learned
    /// and explicit preferences, persists it, and returns it.
    ///
    /// `skill` names the recommendation flow driving this call (e.g.
    /// `"draft_follow_up"`) and `guard` is that flow's current recursion
    /// guard — `SkillInvocationGuard::root()` for a top-level call. A
    /// flow that itself needs a further recommendation (a summarization
    /// sub-skill run before drafting, say) must call `guard.enter(skill)`
    /// itself and generate that nested suggestion with the returned
    /// guard, so the depth cap and self-invocation check actually apply
    /// to the chain instead of being bypassed.
    pub async fn generate_suggestion(
        &self,
        tenant: TenantId,
        user: &UserId,
        action_kind: ActionKind,
        raw_confidence: f64,
        dossier: &ContextDossier,
        drafted_content: String,
        related_entity_refs: Vec<String>,
        skill: &str,
        guard: &SkillInvocationGuard,
    ) -> Result<AiSuggestion> {
        guard.enter(skill)?;

        let user_prefs = self.user_preferences.get_or_create(&tenant, user).await?;
        let org_prefs = self.org_preferences.get_or_create(&tenant, &self.config).await?;

        let confidence = effective_confidence(raw_confidence, user_prefs.approval_rate, dossier.context_quality, &self.config);
        let routing_decision = route(action_kind, confidence, dossier.context_quality, &user_prefs, &org_prefs, &self.config);

        let suggestion = AiSuggestion {
            id: SuggestionId::generate(),
            tenant,
            action_kind,
            confidence,
            context_quality: dossier.context_quality,
            drafted_content,
            routing_decision,
            related_entity_refs,
            generated_at: self.clock.now(),
        };

        self.suggestions.insert(suggestion.clone()).await?;
        Ok(suggestion)
    }

    pub async fn record_feedback(
        &self,
        tenant: &TenantId,
        user: &UserId,
        suggestion: &AiSuggestion,
        action: FeedbackAction,
        original_content: Option<String>,
        edited_content: Option<String>,
        decision_latency_ms: i64,
    ) -> Result<engagement_core::model::AiFeedback> {
        self.feedback
            .record(tenant, user, suggestion, action, original_content, edited_content, decision_latency_ms)
            .await
    }

    pub async fn record_outcome(&self, id: &FeedbackId, outcome: OutcomeMeasurement) -> Result<()> {
        self.feedback.record_outcome(id, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dossier::DossierScope;
    use engagement_core::model::Urgency;
    use engagement_core::FixedClock;
    use engagement_store::inmemory::InMemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn end_to_end_generate_and_approve_updates_approval_rate() {
        let store = Arc::new(InMemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc::now()));
        let config = CoreConfig::default();

        let pipeline = AiPipeline {
            dossier: DossierAssembler {
                contact_sources: vec![],
                deal_sources: vec![],
                meeting_sources: vec![],
                email_history_sources: vec![],
                user_preferences: store.clone(),
                org_preferences: store.clone(),
                clock: clock.clone(),
                config: config.clone(),
            },
            suggestions: store.clone(),
            feedback: FeedbackRecorder {
                feedback: store.clone(),
                user_preferences: store.clone(),
                clock: clock.clone(),
            },
            user_preferences: store.clone(),
            org_preferences: store.clone(),
            clock: clock.clone(),
            config,
        };

        let tenant = TenantId::new("t1");
        let user = UserId::new("u1");

        let dossier = pipeline
            .assemble_dossier(DossierRequest {
                tenant: tenant.clone(),
                user: user.clone(),
                subject_ref: "contact-1".into(),
                scope: DossierScope::all(),
                timezone: "UTC".into(),
                utc_offset_hours: 0,
                urgency: Urgency::Flexible,
            })
            .await
            .unwrap();

        let suggestion = pipeline
            .generate_suggestion(
                tenant.clone(),
                &user,
                ActionKind::LogActivity,
                90.0,
                &dossier,
                "Logged call summary".into(),
                vec!["contact-1".into()],
                "log_activity",
                &SkillInvocationGuard::root(),
            )
            .await
            .unwrap();

        pipeline
            .record_feedback(&tenant, &user, &suggestion, FeedbackAction::Approved, None, None, 1500)
            .await
            .unwrap();

        let prefs = pipeline.user_preferences.get_or_create(&tenant, &user).await.unwrap();
        assert_eq!(prefs.total_suggestions, 1);
        assert_eq!(prefs.approvals, 1);
        assert!((prefs.approval_rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn generate_suggestion_rejects_a_re_entrant_skill_chain() {
        let store = Arc::new(InMemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc::now()));
        let config = CoreConfig::default();

        let pipeline = AiPipeline {
            dossier: DossierAssembler {
                contact_sources: vec![],
                deal_sources: vec![],
                meeting_sources: vec![],
                email_history_sources: vec![],
                user_preferences: store.clone(),
                org_preferences: store.clone(),
                clock: clock.clone(),
                config: config.clone(),
            },
            suggestions: store.clone(),
            feedback: FeedbackRecorder {
                feedback: store.clone(),
                user_preferences: store.clone(),
                clock: clock.clone(),
            },
            user_preferences: store.clone(),
            org_preferences: store.clone(),
            clock,
            config,
        };

        let tenant = TenantId::new("t1");
        let user = UserId::new("u1");
        let dossier = ContextDossier {
            tenant: tenant.clone(),
            contact: None,
            deal: None,
            meeting: None,
            email_history: None,
            user_preferences: None,
            org_preferences: None,
            current_time: Utc::now(),
            timezone: "UTC".into(),
            business_hours: true,
            urgency: Urgency::Flexible,
            context_quality: 100,
        };

        // A sub-skill invoked from within "draft_follow_up" may not invoke
        // "draft_follow_up" again — the guard passed in already carries it.
        let guard = SkillInvocationGuard::root().enter("draft_follow_up").unwrap();
        let err = pipeline
            .generate_suggestion(
                tenant.clone(),
                &user,
                ActionKind::DraftFollowUp,
                80.0,
                &dossier,
                "Hi again".into(),
                vec![],
                "draft_follow_up",
                &guard,
            )
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
