use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use engagement_core::model::WorkQueueItem;
use engagement_core::{
    Clock, CoreConfig, CoreError, IntegrationKind, Result, TenantId, WebhookHeaders, WebhookVerifier,
};
use engagement_credentials::CredentialManager;
use engagement_store::{AlreadyRunning, CredentialStore, SyncCompletion, SyncStateStore, WorkQueueStore};
use serde_json::Value;

use crate::executor::{SyncExecutor, SyncJobContext, SyncJobError, SyncSummary};
use crate::mode::{select_mode, SelectedMode};
use crate::resolver::TenantResolver;

const ALREADY_RUNNING: &str = "already_running";

#[derive(Debug, Clone)]
pub struct TenantSyncOutcome {
    pub tenant: TenantId,
    pub mode: Option<&'static str>,
    pub result: std::result::Result<SyncSummary, String>,
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub integration: IntegrationKind,
    pub results: Vec<TenantSyncOutcome>,
    pub successes: u32,
    pub failures: u32,
}

/// C2 — brings each tenant's cached mirror of external data into
/// eventual agreement with the provider (spec §4.2).
pub struct SyncOrchestrator {
    sync_states: Arc<dyn SyncStateStore>,
    credential_store: Arc<dyn CredentialStore>,
    queue: Arc<dyn WorkQueueStore>,
    credentials: Arc<CredentialManager>,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
    executors: HashMap<IntegrationKind, Arc<dyn SyncExecutor>>,
    resolvers: HashMap<IntegrationKind, Arc<dyn TenantResolver>>,
    verifiers: HashMap<IntegrationKind, Arc<dyn WebhookVerifier>>,
}

impl SyncOrchestrator {
    pub fn new(
        sync_states: Arc<dyn SyncStateStore>,
        credential_store: Arc<dyn CredentialStore>,
        queue: Arc<dyn WorkQueueStore>,
        credentials: Arc<CredentialManager>,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> Self {
        Self {
            sync_states,
            credential_store,
            queue,
            credentials,
            clock,
            config,
            executors: HashMap::new(),
            resolvers: HashMap::new(),
            verifiers: HashMap::new(),
        }
    }

    pub fn with_executor(mut self, integration: IntegrationKind, executor: Arc<dyn SyncExecutor>) -> Self {
        self.executors.insert(integration, executor);
        self
    }

    pub fn with_resolver(mut self, integration: IntegrationKind, resolver: Arc<dyn TenantResolver>) -> Self {
        self.resolvers.insert(integration, resolver);
        self
    }

    pub fn with_verifier(mut self, integration: IntegrationKind, verifier: Arc<dyn WebhookVerifier>) -> Self {
        self.verifiers.insert(integration, verifier);
        self
    }

    /// Lists tenants with an active credential for `integration` and
    /// dispatches a sync job per tenant, choosing catch-up vs
    /// incremental per the normative rule (spec §4.2).
    pub async fn tick(&self, integration: IntegrationKind) -> Result<TickReport> {
        let now = self.clock.now();
        let credentials = self.credential_store.list_active(integration).await?;

        let mut results = Vec::with_capacity(credentials.len());
        for credential in credentials {
            results.push(self.dispatch_one(&credential.tenant, integration, now).await);
        }

        let successes = results.iter().filter(|r| r.result.is_ok()).count() as u32;
        let failures = results.len() as u32 - successes;
        tracing::info!(%integration, successes, failures, "sync tick complete");

        Ok(TickReport {
            integration,
            results,
            successes,
            failures,
        })
    }

    async fn dispatch_one(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        now: DateTime<Utc>,
    ) -> TenantSyncOutcome {
        let began = match self.sync_states.try_begin(tenant, integration).await {
            Ok(Ok(state)) => state,
            Ok(Err(AlreadyRunning)) => {
                return TenantSyncOutcome {
                    tenant: tenant.clone(),
                    mode: None,
                    result: Err(ALREADY_RUNNING.to_string()),
                };
            }
            Err(e) => {
                return TenantSyncOutcome {
                    tenant: tenant.clone(),
                    mode: None,
                    result: Err(e.to_string()),
                };
            }
        };

        let mode = select_mode(began.last_successful_sync, began.cursor.clone(), now, &self.config);

        // Token-window policy (spec §4.2): a near-expiry credential must
        // never cause us to skip the sync; defer to C1.acquire, which
        // refreshes synchronously if needed.
        let access_secret = match self.credentials.acquire(tenant, integration).await {
            Ok(secret) => secret,
            Err(e) => {
                let terminated_transiently = e.is_recoverable();
                let _ = self
                    .sync_states
                    .complete(
                        tenant,
                        integration,
                        SyncCompletion {
                            new_cursor: None,
                            succeeded: false,
                            terminated_transiently,
                            completed_at: now,
                        },
                    )
                    .await;
                return TenantSyncOutcome {
                    tenant: tenant.clone(),
                    mode: Some(mode.label()),
                    result: Err(e.to_string()),
                };
            }
        };

        let Some(executor) = self.executors.get(&integration).cloned() else {
            let _ = self
                .sync_states
                .complete(
                    tenant,
                    integration,
                    SyncCompletion {
                        new_cursor: None,
                        succeeded: false,
                        terminated_transiently: true,
                        completed_at: now,
                    },
                )
                .await;
            return TenantSyncOutcome {
                tenant: tenant.clone(),
                mode: Some(mode.label()),
                result: Err(format!("no sync executor registered for {integration}")),
            };
        };

        let ctx = SyncJobContext {
            tenant: tenant.clone(),
            mode: mode.clone(),
            access_secret,
            deadline: Duration::seconds(30),
        };

        match executor.run(ctx).await {
            Ok(summary) => {
                let _ = self
                    .sync_states
                    .complete(
                        tenant,
                        integration,
                        SyncCompletion {
                            new_cursor: summary.next_cursor.clone(),
                            succeeded: true,
                            terminated_transiently: false,
                            completed_at: now,
                        },
                    )
                    .await;
                TenantSyncOutcome {
                    tenant: tenant.clone(),
                    mode: Some(mode.label()),
                    result: Ok(summary),
                }
            }
            Err(job_error) => {
                let terminated_transiently = matches!(job_error, SyncJobError::Transient(_));
                let _ = self
                    .sync_states
                    .complete(
                        tenant,
                        integration,
                        SyncCompletion {
                            new_cursor: None,
                            succeeded: false,
                            terminated_transiently,
                            completed_at: now,
                        },
                    )
                    .await;
                TenantSyncOutcome {
                    tenant: tenant.clone(),
                    mode: Some(mode.label()),
                    result: Err(job_error.message().to_string()),
                }
            }
        }
    }

    /// Verifies the signature, resolves the tenant, and dispatches a
    /// sync job scoped to the emitting entity (spec §4.2
    /// `handle_webhook`). A sync already running for this tenant
    /// coalesces into a queued retry rather than erroring.
    pub async fn handle_webhook(
        &self,
        integration: IntegrationKind,
        raw_body: &[u8],
        headers: WebhookHeaders,
        payload: Value,
    ) -> Result<SyncSummary> {
        let now = self.clock.now();

        if !self.config.allow_insecure_signatures {
            let verifier = self
                .verifiers
                .get(&integration)
                .ok_or_else(|| CoreError::permanent(format!("no webhook verifier for {integration}")))?;
            if !verifier.verify(&headers, raw_body, now) {
                return Err(CoreError::Unauthorized);
            }
        }

        let resolver = self
            .resolvers
            .get(&integration)
            .ok_or_else(|| CoreError::permanent(format!("no tenant resolver for {integration}")))?;
        let tenant = resolver
            .resolve(&payload)
            .ok_or_else(|| CoreError::validation("cannot resolve tenant from webhook payload"))?;

        let outcome = self.dispatch_one(&tenant, integration, now).await;
        match outcome.result {
            Ok(summary) => Ok(summary),
            Err(reason) if reason == ALREADY_RUNNING => {
                self.enqueue_retry(&tenant, &format!("webhook:{integration}"), "sync already running")
                    .await?;
                Ok(SyncSummary::default())
            }
            Err(reason) => Err(CoreError::transient(reason)),
        }
    }

    /// Pushes a Work Queue Item for a soft-failure retry (spec §4.2
    /// `enqueue_retry`), e.g. a transcript not yet materialized. Backoff
    /// is computed by callers draining the queue (`crate::retry`).
    pub async fn enqueue_retry(&self, tenant: &TenantId, subject_ref: &str, reason: &str) -> Result<()> {
        tracing::info!(%tenant, subject_ref, reason, "enqueuing sync retry");
        let now = self.clock.now();
        self.queue
            .enqueue(WorkQueueItem::new(tenant.clone(), subject_ref, now))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engagement_core::model::{ConnectionStatus, IntegrationCredential};
    use engagement_core::{FixedClock, WebhookHeaders};
    use engagement_store::InMemoryStore;

    fn credential(tenant: &TenantId) -> IntegrationCredential {
        IntegrationCredential {
            tenant: tenant.clone(),
            integration_kind: IntegrationKind::Fathom,
            access_secret: "at".into(),
            refresh_secret: Some("rt".into()),
            expires_at: Utc::now() + Duration::hours(1),
            status: ConnectionStatus::Active,
            last_refresh: None,
            endpoint_hint: None,
            session_token: None,
            metadata: serde_json::json!({}),
        }
    }

    struct StubExecutor;

    #[async_trait::async_trait]
    impl SyncExecutor for StubExecutor {
        async fn run(&self, ctx: SyncJobContext) -> std::result::Result<SyncSummary, SyncJobError> {
            Ok(SyncSummary {
                items_considered: 3,
                items_upserted: 3,
                items_skipped: 0,
                errors: vec![],
                next_cursor: match ctx.mode {
                    SelectedMode::CatchUp { .. } => Some("cursor-after-catchup".into()),
                    SelectedMode::Incremental { .. } => Some("cursor-after-incremental".into()),
                },
            })
        }
    }

    fn build_orchestrator(store: Arc<InMemoryStore>, clock: Arc<FixedClock>) -> SyncOrchestrator {
        let credentials = Arc::new(CredentialManager::new(store.clone(), clock.clone(), CoreConfig::default()));
        SyncOrchestrator::new(
            store.clone(),
            store.clone(),
            store,
            credentials,
            clock,
            CoreConfig::default(),
        )
        .with_executor(IntegrationKind::Fathom, Arc::new(StubExecutor))
    }

    #[tokio::test]
    async fn tick_selects_catch_up_when_never_synced() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        CredentialStore::upsert(&*store, credential(&tenant)).await.unwrap();
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let orchestrator = build_orchestrator(store, clock);

        let report = orchestrator.tick(IntegrationKind::Fathom).await.unwrap();
        assert_eq!(report.successes, 1);
        assert_eq!(report.results[0].mode, Some("catch_up"));
    }

    #[tokio::test]
    async fn second_tick_while_first_running_would_coalesce() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new("org1");
        CredentialStore::upsert(&*store, credential(&tenant)).await.unwrap();
        SyncStateStore::try_begin(&*store, &tenant, IntegrationKind::Fathom)
            .await
            .unwrap()
            .unwrap();

        let clock = Arc::new(FixedClock::new(Utc::now()));
        let orchestrator = build_orchestrator(store, clock);
        let report = orchestrator.tick(IntegrationKind::Fathom).await.unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.results[0].result.as_ref().unwrap_err(), ALREADY_RUNNING);
    }

    #[tokio::test]
    async fn handle_webhook_rejects_bad_signature() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let orchestrator = build_orchestrator(store, clock).with_verifier(
            IntegrationKind::Fathom,
            Arc::new(engagement_core::HmacSha256Verifier::new("secret", 300)),
        );

        let err = orchestrator
            .handle_webhook(
                IntegrationKind::Fathom,
                b"{}",
                WebhookHeaders {
                    signature: "bad".into(),
                    timestamp: Utc::now().timestamp(),
                },
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized));
    }
}
