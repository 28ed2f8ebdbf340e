/// Per-integration policy inputs to reconciliation: the ordered natural
/// keys tried, in order, when an external id has never been seen before
/// (spec §4.3 "natural-key matching policies"), and the provider-status
/// translation table (spec §4.3 "status translation").
///
/// Deliberately data, not a trait with upstream-shaped methods —
/// adapters are plain declarations, not objects reaching back into
/// provider SDKs.
#[derive(Debug, Clone)]
pub struct EntityReconciliationPolicy {
    pub external_entity_kind: &'static str,
    pub internal_table: &'static str,
    /// Ordered; the first field present in the payload and matching an
    /// existing internal row wins (spec §4.3).
    pub natural_key_fields: Vec<&'static str>,
    pub status_translation: StatusTranslation,
}

impl EntityReconciliationPolicy {
    pub fn new(external_entity_kind: &'static str, internal_table: &'static str) -> Self {
        Self {
            external_entity_kind,
            internal_table,
            natural_key_fields: Vec::new(),
            status_translation: StatusTranslation::default(),
        }
    }

    pub fn with_natural_keys(mut self, fields: Vec<&'static str>) -> Self {
        self.natural_key_fields = fields;
        self
    }

    pub fn with_status_translation(mut self, translation: StatusTranslation) -> Self {
        self.status_translation = translation;
        self
    }
}

/// An ordered provider-status -> internal-status map; unknown provider
/// statuses fall back to `default` (spec §4.3: "unknown provider status
/// defaults to a policy-defined fallback").
#[derive(Debug, Clone)]
pub struct StatusTranslation {
    pub entries: Vec<(&'static str, &'static str)>,
    pub default: &'static str,
}

impl Default for StatusTranslation {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            default: "unknown",
        }
    }
}

impl StatusTranslation {
    pub fn new(entries: Vec<(&'static str, &'static str)>, default: &'static str) -> Self {
        Self { entries, default }
    }

    pub fn translate(&self, provider_status: &str) -> &'static str {
        self.entries
            .iter()
            .find(|(provider, _)| *provider == provider_status)
            .map(|(_, internal)| *internal)
            .unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_falls_back_to_default() {
        let translation = StatusTranslation::new(vec![("won", "closed_won")], "open");
        assert_eq!(translation.translate("won"), "closed_won");
        assert_eq!(translation.translate("something_new"), "open");
    }
}
