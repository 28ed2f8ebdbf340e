use engagement_core::model::{ConfidenceLevel, OrgAiPreferences, RoutingDecision, UserAiPreferences};
use engagement_core::{ActionKind, CoreConfig};

/// Spec §4.4.2's blend: a small nudge from approval history, a small
/// penalty when the dossier was thin. Intentionally additive on the
/// same 0-100 scale as `raw_confidence` rather than re-normalized —
/// `approval_history_weight`/`low_context_penalty` are tenant-tunable
/// knobs, not scale factors.
pub fn effective_confidence(raw_confidence: f64, approval_rate: f64, context_quality: u8, config: &CoreConfig) -> f64 {
    let low_context_term = (0.5 - context_quality as f64 / 100.0).max(0.0);
    raw_confidence + config.approval_history_weight * approval_rate - config.low_context_penalty * low_context_term
}

pub fn confidence_level(effective_confidence: f64, config: &CoreConfig) -> ConfidenceLevel {
    if effective_confidence >= config.confidence_threshold_high {
        ConfidenceLevel::High
    } else if effective_confidence >= config.confidence_threshold_medium {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// The §4.4.2 routing decision table, evaluated in order: the two hard
/// HITL overrides first, then the thin-context clarify floor, then the
/// confidence-level branches.
pub fn route(
    action_kind: ActionKind,
    effective_confidence: f64,
    context_quality: u8,
    user_prefs: &UserAiPreferences,
    org_prefs: &OrgAiPreferences,
    config: &CoreConfig,
) -> RoutingDecision {
    let always_hitl = user_prefs.always_hitl_actions.contains(&action_kind)
        || org_prefs.always_hitl_actions.contains(&action_kind);
    if always_hitl {
        return RoutingDecision::HitlApprove;
    }

    let never_auto_send = user_prefs.never_auto_send || org_prefs.never_auto_send;
    if never_auto_send && action_kind.has_external_side_effect() {
        return RoutingDecision::HitlApprove;
    }

    if context_quality < 40 {
        return RoutingDecision::Clarify;
    }

    let auto_approve_threshold = user_prefs
        .auto_approve_threshold
        .unwrap_or(org_prefs.auto_approve_threshold);

    match confidence_level(effective_confidence, config) {
        ConfidenceLevel::High => {
            if action_kind.is_auto_executable() && effective_confidence >= auto_approve_threshold as f64 {
                RoutingDecision::AutoExecute
            } else {
                RoutingDecision::HitlApprove
            }
        }
        ConfidenceLevel::Medium => RoutingDecision::HitlEdit,
        ConfidenceLevel::Low => RoutingDecision::Clarify,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engagement_core::model::{OrgAiPreferences, UserAiPreferences};
    use engagement_core::TenantId;

    fn prefs() -> (UserAiPreferences, OrgAiPreferences, CoreConfig) {
        let tenant = TenantId::new("t1");
        let config = CoreConfig::default();
        (
            UserAiPreferences::new(tenant.clone(), engagement_core::UserId::new("u1")),
            OrgAiPreferences::defaults(tenant, &config),
            config,
        )
    }

    #[test]
    fn always_hitl_action_never_auto_executes_even_at_full_confidence() {
        let (mut user, org, config) = prefs();
        user.always_hitl_actions.insert(ActionKind::SendEmail);
        let decision = route(ActionKind::SendEmail, 100.0, 100, &user, &org, &config);
        assert_eq!(decision, RoutingDecision::HitlApprove);
    }

    #[test]
    fn never_auto_send_blocks_external_side_effect_actions() {
        let (mut user, org, config) = prefs();
        user.never_auto_send = true;
        let decision = route(ActionKind::SendEmail, 99.0, 100, &user, &org, &config);
        assert_eq!(decision, RoutingDecision::HitlApprove);
    }

    #[test]
    fn thin_context_always_clarifies_regardless_of_confidence() {
        let (user, org, config) = prefs();
        let decision = route(ActionKind::DraftFollowUp, 95.0, 39, &user, &org, &config);
        assert_eq!(decision, RoutingDecision::Clarify);
    }

    #[test]
    fn high_confidence_auto_executable_action_above_threshold_auto_executes() {
        let (user, org, config) = prefs();
        let decision = route(ActionKind::LogActivity, 90.0, 90, &user, &org, &config);
        assert_eq!(decision, RoutingDecision::AutoExecute);
    }

    #[test]
    fn medium_confidence_routes_to_hitl_edit() {
        let (user, org, config) = prefs();
        let decision = route(ActionKind::DraftFollowUp, 60.0, 90, &user, &org, &config);
        assert_eq!(decision, RoutingDecision::HitlEdit);
    }
}
