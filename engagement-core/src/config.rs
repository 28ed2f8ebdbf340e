use crate::ids::ActionKind;
use std::collections::HashSet;
use std::env;

/// Every tunable named in spec §6.4, with its stated default. Loadable
/// from environment variables or built explicitly for tests.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub safety_window_seconds: i64,
    pub proactive_refresh_window_hours: i64,
    pub catch_up_threshold_hours: i64,
    pub catch_up_window_days: i64,
    pub webhook_replay_window_seconds: i64,
    pub allow_insecure_signatures: bool,
    pub similarity_threshold: f64,
    pub batch_size_topics: usize,
    pub auto_approve_threshold_default: u8,
    pub always_hitl_actions_default: HashSet<ActionKind>,
    pub confidence_threshold_high: f64,
    pub confidence_threshold_medium: f64,
    pub approval_history_weight: f64,
    pub low_context_penalty: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            safety_window_seconds: 60,
            proactive_refresh_window_hours: 24,
            catch_up_threshold_hours: 36,
            catch_up_window_days: 30,
            webhook_replay_window_seconds: 300,
            allow_insecure_signatures: false,
            similarity_threshold: 0.85,
            batch_size_topics: 50,
            auto_approve_threshold_default: 85,
            always_hitl_actions_default: [ActionKind::SendEmail, ActionKind::SendSlackMessage]
                .into_iter()
                .collect(),
            confidence_threshold_high: 80.0,
            confidence_threshold_medium: 50.0,
            approval_history_weight: 0.2,
            low_context_penalty: 0.3,
        }
    }
}

impl CoreConfig {
    /// Loads overrides from environment variables, falling back to the
    /// spec-mandated default for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            safety_window_seconds: env_i64(
                "SAFETY_WINDOW_SECONDS",
                defaults.safety_window_seconds,
            ),
            proactive_refresh_window_hours: env_i64(
                "PROACTIVE_REFRESH_WINDOW_HOURS",
                defaults.proactive_refresh_window_hours,
            ),
            catch_up_threshold_hours: env_i64(
                "CATCH_UP_THRESHOLD_HOURS",
                defaults.catch_up_threshold_hours,
            ),
            catch_up_window_days: env_i64(
                "CATCH_UP_WINDOW_DAYS",
                defaults.catch_up_window_days,
            ),
            webhook_replay_window_seconds: env_i64(
                "WEBHOOK_REPLAY_WINDOW_SECONDS",
                defaults.webhook_replay_window_seconds,
            ),
            allow_insecure_signatures: env_bool(
                "ALLOW_INSECURE_SIGNATURES",
                defaults.allow_insecure_signatures,
            ),
            similarity_threshold: env_f64(
                "SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            ),
            batch_size_topics: env_i64("BATCH_SIZE_TOPICS", defaults.batch_size_topics as i64)
                .max(1) as usize,
            auto_approve_threshold_default: env_i64(
                "AUTO_APPROVE_THRESHOLD_DEFAULT",
                defaults.auto_approve_threshold_default as i64,
            )
            .clamp(0, 100) as u8,
            confidence_threshold_high: env_f64(
                "CONFIDENCE_THRESHOLD_HIGH",
                defaults.confidence_threshold_high,
            ),
            confidence_threshold_medium: env_f64(
                "CONFIDENCE_THRESHOLD_MEDIUM",
                defaults.confidence_threshold_medium,
            ),
            approval_history_weight: env_f64(
                "APPROVAL_HISTORY_WEIGHT",
                defaults.approval_history_weight,
            ),
            low_context_penalty: env_f64("LOW_CONTEXT_PENALTY", defaults.low_context_penalty),
            always_hitl_actions_default: defaults.always_hitl_actions_default,
        }
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_allow_insecure_signatures(mut self, allow: bool) -> Self {
        self.allow_insecure_signatures = allow;
        self
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.safety_window_seconds, 60);
        assert_eq!(cfg.catch_up_threshold_hours, 36);
        assert_eq!(cfg.catch_up_window_days, 30);
        assert_eq!(cfg.similarity_threshold, 0.85);
        assert_eq!(cfg.batch_size_topics, 50);
        assert_eq!(cfg.auto_approve_threshold_default, 85);
        assert!(cfg.always_hitl_actions_default.contains(&ActionKind::SendEmail));
        assert!(cfg
            .always_hitl_actions_default
            .contains(&ActionKind::SendSlackMessage));
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = CoreConfig::default()
            .with_similarity_threshold(0.95)
            .with_allow_insecure_signatures(true);
        assert_eq!(cfg.similarity_threshold, 0.95);
        assert!(cfg.allow_insecure_signatures);
    }
}
