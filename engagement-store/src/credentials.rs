use async_trait::async_trait;
use engagement_core::{CoreError, IntegrationKind, Result, TenantId};
use engagement_core::model::{ConnectionStatus, IntegrationCredential};

/// §6.3 "Integration Credentials" table. Identity is `(tenant,
/// integration_kind)`; invariant I1 (at most one active row per key) is
/// enforced by `upsert` always replacing the row for that key rather than
/// appending.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
    ) -> Result<Option<IntegrationCredential>>;

    /// Inserts or fully replaces the credential row for `(tenant,
    /// integration_kind)`.
    async fn upsert(&self, credential: IntegrationCredential) -> Result<()>;

    /// Credentials with `status == Active` for the given integration,
    /// across all tenants (spec §4.1/§4.2: "iterate over all active
    /// credentials for the given integration").
    async fn list_active(&self, integration: IntegrationKind) -> Result<Vec<IntegrationCredential>>;

    /// Marks the credential `needs_reconnect` or `revoked` without
    /// deleting the row (spec §4.1 `invalidate`).
    async fn set_status(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        status: ConnectionStatus,
    ) -> Result<()> {
        let mut cred = self
            .get(tenant, integration)
            .await?
            .ok_or_else(|| CoreError::not_connected(tenant.to_string(), integration.as_str()))?;
        cred.status = status;
        self.upsert(cred).await
    }
}
