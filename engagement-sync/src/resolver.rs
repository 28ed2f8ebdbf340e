use engagement_core::TenantId;
use serde_json::Value;

/// Resolves which tenant an inbound webhook belongs to, either from a
/// payload discriminator or from the integration account the webhook is
/// bound to (spec §4.2 `handle_webhook`: "resolve tenant (by payload
/// discriminator or bound integration account)"). One per
/// `IntegrationKind`, since the discriminator field differs per
/// provider.
pub trait TenantResolver: Send + Sync {
    fn resolve(&self, payload: &Value) -> Option<TenantId>;
}

/// Looks up a tenant id at a fixed JSON pointer-ish path of top-level
/// keys, the common case for providers that embed an account/workspace
/// id directly in the payload.
pub struct FieldTenantResolver {
    pub field: String,
}

impl FieldTenantResolver {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl TenantResolver for FieldTenantResolver {
    fn resolve(&self, payload: &Value) -> Option<TenantId> {
        payload
            .get(&self.field)
            .and_then(|v| v.as_str())
            .map(TenantId::new)
    }
}
