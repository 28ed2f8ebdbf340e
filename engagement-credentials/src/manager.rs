use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Duration;
use engagement_core::model::{ConnectionStatus, IntegrationCredential};
use engagement_core::{Clock, CoreConfig, CoreError, IntegrationKind, Result, TenantId};
use engagement_store::CredentialStore;
use tokio::sync::Mutex as AsyncMutex;

use crate::adapter::{AdapterError, ProviderAdapter};

type FlightKey = (TenantId, IntegrationKind);

/// Outcome of refreshing one credential during `refresh_proactively`
/// (spec §4.1: "Results are classified as {refreshed, skipped,
/// failed_transient, needs_reconnect}").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Skipped,
    FailedTransient,
    NeedsReconnect,
}

#[derive(Debug, Clone)]
pub struct RefreshRecord {
    pub tenant: TenantId,
    pub integration: IntegrationKind,
    pub outcome: RefreshOutcome,
    pub detail: Option<String>,
}

/// C1 — holds no process-wide tenant state beyond the per-key
/// single-flight locks (spec §5: "no in-memory process-wide state
/// carries tenant data across requests"); the locks themselves carry no
/// tenant data, only coordinate concurrent refreshers.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
    adapters: HashMap<IntegrationKind, Arc<dyn ProviderAdapter>>,
    in_flight: StdMutex<HashMap<FlightKey, Arc<AsyncMutex<()>>>>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, config: CoreConfig) -> Self {
        Self {
            store,
            clock,
            config,
            adapters: HashMap::new(),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_adapter(mut self, integration: IntegrationKind, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(integration, adapter);
        self
    }

    fn adapter_for(&self, integration: IntegrationKind) -> Result<&Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(&integration)
            .ok_or_else(|| CoreError::permanent(format!("no provider adapter registered for {integration}")))
    }

    fn flight_lock(&self, key: FlightKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.in_flight.lock().unwrap();
        locks.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Returns an access secret valid for at least the safety window,
    /// refreshing synchronously if needed (spec §4.1). Concurrent callers
    /// racing an expired credential coalesce into a single refresh
    /// (spec §5 single-flight).
    pub async fn acquire(&self, tenant: &TenantId, integration: IntegrationKind) -> Result<String> {
        let safety_window = Duration::seconds(self.config.safety_window_seconds);
        let now = self.clock.now();

        let existing = self
            .store
            .get(tenant, integration)
            .await?
            .ok_or_else(|| CoreError::not_connected(tenant.to_string(), integration.as_str()))?;

        if existing.status == ConnectionStatus::NeedsReconnect || existing.status == ConnectionStatus::Revoked
        {
            return Err(CoreError::needs_reconnect(format!(
                "{integration} credential for {tenant} requires reconnect"
            )));
        }

        if !existing.is_within(now, safety_window) {
            return Ok(existing.access_secret);
        }

        // Expiring within the safety window: serialize refreshers for
        // this (tenant, integration) and re-check after acquiring the
        // lock so only one of N racing callers actually calls upstream.
        let lock = self.flight_lock((tenant.clone(), integration));
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let current = self
            .store
            .get(tenant, integration)
            .await?
            .ok_or_else(|| CoreError::not_connected(tenant.to_string(), integration.as_str()))?;

        if current.status == ConnectionStatus::NeedsReconnect || current.status == ConnectionStatus::Revoked {
            return Err(CoreError::needs_reconnect(format!(
                "{integration} credential for {tenant} requires reconnect"
            )));
        }

        if !current.is_within(now, safety_window) {
            // Another caller already refreshed while we waited for the lock.
            return Ok(current.access_secret);
        }

        self.refresh_one(tenant, integration, current, now).await
    }

    async fn refresh_one(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        mut credential: IntegrationCredential,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<String> {
        let refresh_secret = credential
            .refresh_secret
            .clone()
            .ok_or_else(|| CoreError::needs_reconnect(format!("{integration} has no refresh secret")))?;

        let adapter = self.adapter_for(integration)?.clone();
        match adapter.refresh(&refresh_secret).await {
            Ok(refreshed) => {
                credential.access_secret = refreshed.access_secret.clone();
                if let Some(rt) = refreshed.new_refresh_secret {
                    credential.refresh_secret = Some(rt);
                }
                credential.expires_at = now + refreshed.expires_in;
                credential.last_refresh = Some(now);
                if let Some(meta) = refreshed.extra_metadata {
                    credential.metadata = meta;
                }
                if integration.requires_session_handshake() {
                    if let Some(session_token) = refreshed.session_token {
                        credential.session_token = Some(session_token);
                    }
                    if let Some(endpoint) = refreshed.endpoint_hint {
                        credential.endpoint_hint = Some(endpoint);
                    }
                }
                self.store.upsert(credential.clone()).await?;
                Ok(credential.access_secret)
            }
            Err(AdapterError::Permanent(reason)) => {
                credential.status = ConnectionStatus::NeedsReconnect;
                self.store.upsert(credential).await?;
                Err(CoreError::needs_reconnect(reason))
            }
            Err(AdapterError::Transient(reason)) => Err(CoreError::transient(reason)),
        }
    }

    /// Iterates every active credential for `integration`, refreshing
    /// those within the proactive window or whose refresh token decays
    /// with use (spec §4.1). Never aborts the batch on a single failure
    /// (spec §7).
    pub async fn refresh_proactively(&self, integration: IntegrationKind) -> Result<Vec<RefreshRecord>> {
        let now = self.clock.now();
        let proactive_window = Duration::hours(self.config.proactive_refresh_window_hours);
        let credentials = self.store.list_active(integration).await?;

        let mut records = Vec::with_capacity(credentials.len());
        for credential in credentials {
            let tenant = credential.tenant.clone();
            let due = credential.is_within(now, proactive_window) || integration.refresh_token_decays_with_use();
            if !due {
                records.push(RefreshRecord {
                    tenant,
                    integration,
                    outcome: RefreshOutcome::Skipped,
                    detail: None,
                });
                continue;
            }

            let lock = self.flight_lock((tenant.clone(), integration));
            let _guard = lock.lock().await;

            match self.refresh_one(&tenant, integration, credential, now).await {
                Ok(_) => records.push(RefreshRecord {
                    tenant,
                    integration,
                    outcome: RefreshOutcome::Refreshed,
                    detail: None,
                }),
                Err(CoreError::NeedsReconnect { reason }) => records.push(RefreshRecord {
                    tenant,
                    integration,
                    outcome: RefreshOutcome::NeedsReconnect,
                    detail: Some(reason),
                }),
                Err(CoreError::Transient(reason)) => records.push(RefreshRecord {
                    tenant,
                    integration,
                    outcome: RefreshOutcome::FailedTransient,
                    detail: Some(reason),
                }),
                Err(other) => records.push(RefreshRecord {
                    tenant,
                    integration,
                    outcome: RefreshOutcome::FailedTransient,
                    detail: Some(other.to_string()),
                }),
            }
        }

        Ok(records)
    }

    /// Completes the OAuth authorization-code exchange behind `GET
    /// /oauth/{integration}/callback` and establishes the tenant's
    /// credential row as `Active` (spec §4.1/§6.1). Callers are
    /// responsible for having already validated the single-use state
    /// token's TTL before reaching here.
    pub async fn connect(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        code: &str,
        redirect_uri: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<()> {
        let now = self.clock.now();
        let adapter = self.adapter_for(integration)?.clone();
        let exchanged = adapter
            .exchange_code(code, redirect_uri, pkce_verifier)
            .await
            .map_err(|e| match e {
                AdapterError::Transient(reason) => CoreError::transient(reason),
                AdapterError::Permanent(reason) => CoreError::needs_reconnect(reason),
            })?;

        let mut session_token = exchanged.session_token.clone();
        let mut endpoint_hint = exchanged.endpoint_hint.clone();
        if integration.requires_session_handshake() && session_token.is_none() {
            if let Some((token, hint)) = adapter
                .exchange_session(&exchanged.access_secret)
                .await
                .map_err(|e| match e {
                    AdapterError::Transient(reason) => CoreError::transient(reason),
                    AdapterError::Permanent(reason) => CoreError::needs_reconnect(reason),
                })?
            {
                session_token = Some(token);
                endpoint_hint = Some(hint);
            }
        }

        let credential = IntegrationCredential {
            tenant: tenant.clone(),
            integration_kind: integration,
            access_secret: exchanged.access_secret,
            refresh_secret: exchanged.new_refresh_secret,
            expires_at: now + exchanged.expires_in,
            status: ConnectionStatus::Active,
            last_refresh: Some(now),
            endpoint_hint,
            session_token,
            metadata: exchanged.extra_metadata.unwrap_or_else(|| serde_json::json!({})),
        };
        tracing::info!(%tenant, %integration, "connected new credential");
        self.store.upsert(credential).await
    }

    /// Marks the credential `needs_reconnect` or `revoked` without
    /// deleting the row (spec §4.1). `status` must be one of those two
    /// variants; the row's secrets and metadata are retained for reporting.
    pub async fn invalidate(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        status: ConnectionStatus,
        reason: &str,
    ) -> Result<()> {
        debug_assert_ne!(status, ConnectionStatus::Active, "invalidate never re-activates a credential");
        let mut credential = self
            .store
            .get(tenant, integration)
            .await?
            .ok_or_else(|| CoreError::not_connected(tenant.to_string(), integration.as_str()))?;
        tracing::info!(%tenant, %integration, reason, ?status, "invalidating credential");
        credential.status = status;
        self.store.upsert(credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engagement_core::{FixedClock, TenantId};
    use engagement_store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credential(tenant: &TenantId, expires_at: chrono::DateTime<chrono::Utc>) -> IntegrationCredential {
        IntegrationCredential {
            tenant: tenant.clone(),
            integration_kind: IntegrationKind::HubSpot,
            access_secret: "stale".into(),
            refresh_secret: Some("rt".into()),
            expires_at,
            status: ConnectionStatus::Active,
            last_refresh: None,
            endpoint_hint: None,
            session_token: None,
            metadata: serde_json::json!({}),
        }
    }

    struct CountingAdapter {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for CountingAdapter {
        async fn refresh(
            &self,
            _refresh_secret: &str,
        ) -> std::result::Result<crate::adapter::RefreshedCredential, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(crate::adapter::RefreshedCredential {
                access_secret: "fresh".into(),
                new_refresh_secret: None,
                expires_in: Duration::hours(1),
                extra_metadata: None,
                session_token: None,
                endpoint_hint: None,
            })
        }
    }

    struct PermanentlyFailingAdapter;

    #[async_trait::async_trait]
    impl ProviderAdapter for PermanentlyFailingAdapter {
        async fn refresh(
            &self,
            _refresh_secret: &str,
        ) -> std::result::Result<crate::adapter::RefreshedCredential, AdapterError> {
            Err(AdapterError::Permanent("invalid_grant".into()))
        }
    }

    #[tokio::test]
    async fn acquire_refreshes_when_within_safety_window() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        let now = chrono::Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        CredentialStore::upsert(&*store, credential(&tenant, now + Duration::seconds(10)))
            .await
            .unwrap();

        let manager = CredentialManager::new(store.clone(), clock, CoreConfig::default()).with_adapter(
            IntegrationKind::HubSpot,
            Arc::new(CountingAdapter { calls: AtomicUsize::new(0) }),
        );

        let secret = manager.acquire(&tenant, IntegrationKind::HubSpot).await.unwrap();
        assert_eq!(secret, "fresh");
    }

    #[tokio::test]
    async fn concurrent_acquire_single_flights_refresh() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        let now = chrono::Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        CredentialStore::upsert(&*store, credential(&tenant, now))
            .await
            .unwrap();

        let adapter = Arc::new(CountingAdapter { calls: AtomicUsize::new(0) });
        let manager = Arc::new(
            CredentialManager::new(store, clock, CoreConfig::default())
                .with_adapter(IntegrationKind::HubSpot, adapter.clone()),
        );

        let m1 = manager.clone();
        let t1 = tenant.clone();
        let h1 = tokio::spawn(async move { m1.acquire(&t1, IntegrationKind::HubSpot).await });
        let m2 = manager.clone();
        let t2 = tenant.clone();
        let h2 = tokio::spawn(async move { m2.acquire(&t2, IntegrationKind::HubSpot).await });

        let (r1, r2) = tokio::join!(h1, h2);
        assert_eq!(r1.unwrap().unwrap(), "fresh");
        assert_eq!(r2.unwrap().unwrap(), "fresh");
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1, "only one outbound refresh");
    }

    #[tokio::test]
    async fn permanent_failure_transitions_to_needs_reconnect() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        let now = chrono::Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        CredentialStore::upsert(&*store, credential(&tenant, now))
            .await
            .unwrap();

        let manager = CredentialManager::new(store.clone(), clock, CoreConfig::default())
            .with_adapter(IntegrationKind::HubSpot, Arc::new(PermanentlyFailingAdapter));

        let err = manager.acquire(&tenant, IntegrationKind::HubSpot).await.unwrap_err();
        assert!(matches!(err, CoreError::NeedsReconnect { .. }));

        let stored = CredentialStore::get(&*store, &tenant, IntegrationKind::HubSpot)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ConnectionStatus::NeedsReconnect);

        let second = manager.acquire(&tenant, IntegrationKind::HubSpot).await;
        assert!(second.is_err(), "no acquire succeeds until reconnect");
    }

    struct CodeExchangeAdapter;

    #[async_trait::async_trait]
    impl ProviderAdapter for CodeExchangeAdapter {
        async fn refresh(
            &self,
            _refresh_secret: &str,
        ) -> std::result::Result<crate::adapter::RefreshedCredential, AdapterError> {
            unreachable!("connect() never calls refresh")
        }

        async fn exchange_code(
            &self,
            code: &str,
            _redirect_uri: &str,
            _pkce_verifier: Option<&str>,
        ) -> std::result::Result<crate::adapter::RefreshedCredential, AdapterError> {
            assert_eq!(code, "auth-code-123");
            Ok(crate::adapter::RefreshedCredential {
                access_secret: "fresh-at".into(),
                new_refresh_secret: Some("fresh-rt".into()),
                expires_in: Duration::hours(1),
                extra_metadata: None,
                session_token: None,
                endpoint_hint: None,
            })
        }
    }

    #[tokio::test]
    async fn connect_establishes_an_active_credential_from_the_exchanged_code() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        let now = chrono::Utc::now();
        let clock = Arc::new(FixedClock::new(now));

        let manager = CredentialManager::new(store.clone(), clock, CoreConfig::default())
            .with_adapter(IntegrationKind::GoogleWorkspace, Arc::new(CodeExchangeAdapter));

        manager
            .connect(
                &tenant,
                IntegrationKind::GoogleWorkspace,
                "auth-code-123",
                "https://app.example/callback",
                None,
            )
            .await
            .unwrap();

        let stored = CredentialStore::get(&*store, &tenant, IntegrationKind::GoogleWorkspace)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ConnectionStatus::Active);
        assert_eq!(stored.access_secret, "fresh-at");
        assert_eq!(stored.refresh_secret.as_deref(), Some("fresh-rt"));
    }

    #[tokio::test]
    async fn connect_fails_closed_when_adapter_rejects_the_code() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));

        let manager = CredentialManager::new(store.clone(), clock, CoreConfig::default())
            .with_adapter(IntegrationKind::GoogleWorkspace, Arc::new(PermanentlyFailingAdapter));

        let err = manager
            .connect(&tenant, IntegrationKind::GoogleWorkspace, "bad-code", "uri", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NeedsReconnect { .. }));
        assert!(CredentialStore::get(&*store, &tenant, IntegrationKind::GoogleWorkspace)
            .await
            .unwrap()
            .is_none());
    }
}
