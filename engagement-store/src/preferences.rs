use async_trait::async_trait;
use engagement_core::model::{OrgAiPreferences, UserAiPreferences};
use engagement_core::{CoreConfig, Result, TenantId, UserId};

/// §6.3 "User AI Preferences".
#[async_trait]
pub trait UserPreferencesStore: Send + Sync {
    async fn get(&self, tenant: &TenantId, user: &UserId) -> Result<Option<UserAiPreferences>>;

    /// Returns the stored row, or a freshly-initialized one if the user
    /// has never received feedback yet (spec §3: learned attributes start
    /// unset).
    async fn get_or_create(&self, tenant: &TenantId, user: &UserId) -> Result<UserAiPreferences> {
        Ok(self
            .get(tenant, user)
            .await?
            .unwrap_or_else(|| UserAiPreferences::new(tenant.clone(), user.clone())))
    }

    async fn save(&self, prefs: UserAiPreferences) -> Result<()>;
}

/// §6.3 "Org AI Preferences" — see `OrgAiPreferences` doc comment in
/// `engagement_core::model`.
#[async_trait]
pub trait OrgPreferencesStore: Send + Sync {
    async fn get(&self, tenant: &TenantId) -> Result<Option<OrgAiPreferences>>;

    async fn get_or_create(&self, tenant: &TenantId, config: &CoreConfig) -> Result<OrgAiPreferences> {
        Ok(self
            .get(tenant)
            .await?
            .unwrap_or_else(|| OrgAiPreferences::defaults(tenant.clone(), config)))
    }

    async fn save(&self, prefs: OrgAiPreferences) -> Result<()>;
}
