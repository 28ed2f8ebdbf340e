//! Binary entrypoint: wires an in-memory `Store` behind every
//! component's capability bundle and serves the §6.1 HTTP surface.
//!
//! The in-memory `Store` sits behind a trait-object seam — a real
//! deployment swaps `InMemoryStore` for a database-backed
//! implementation of the same traits without touching this wiring or
//! any component crate.

use std::sync::Arc;

use engagement_ai::{AiPipeline, DossierAssembler};
use engagement_auth::{AuthConfig, InMemoryUserTokenStore};
use engagement_core::{Clock, CoreConfig, SystemClock};
use engagement_credentials::CredentialManager;
use engagement_server::{build_router, ServerConfig};
use engagement_store::inmemory::InMemoryStore;
use engagement_sync::SyncOrchestrator;
use engagement_topics::TopicAggregator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    engagement_telemetry::init_telemetry("engagement-server")
        .map_err(|e| anyhow::anyhow!("telemetry init failed: {e}"))?;

    let config = CoreConfig::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryStore::new());

    let credentials = Arc::new(CredentialManager::new(
        store.clone() as Arc<dyn engagement_store::CredentialStore>,
        clock.clone(),
        config.clone(),
    ));

    let sync = Arc::new(SyncOrchestrator::new(
        store.clone() as Arc<dyn engagement_store::SyncStateStore>,
        store.clone() as Arc<dyn engagement_store::CredentialStore>,
        store.clone() as Arc<dyn engagement_store::WorkQueueStore>,
        credentials.clone(),
        clock.clone(),
        config.clone(),
    ));

    let ai = Arc::new(AiPipeline {
        dossier: DossierAssembler {
            contact_sources: Vec::new(),
            deal_sources: Vec::new(),
            meeting_sources: Vec::new(),
            email_history_sources: Vec::new(),
            user_preferences: store.clone(),
            org_preferences: store.clone(),
            clock: clock.clone(),
            config: config.clone(),
        },
        suggestions: store.clone(),
        feedback: engagement_ai::FeedbackRecorder {
            feedback: store.clone(),
            user_preferences: store.clone(),
            clock: clock.clone(),
        },
        user_preferences: store.clone(),
        org_preferences: store.clone(),
        clock: clock.clone(),
        config: config.clone(),
    });

    let topics = Arc::new(TopicAggregator {
        store: store.clone(),
        clock: clock.clone(),
        config: config.clone(),
    });

    let auth = AuthConfig::from_env();

    let state = ServerConfig {
        credentials,
        sync,
        ai,
        topics,
        oauth_states: store.clone(),
        end_user_tokens: Arc::new(InMemoryUserTokenStore::new()),
        clock,
        auth,
        config,
        oauth_redirect_base: std::env::var("OAUTH_REDIRECT_BASE")
            .unwrap_or_else(|_| "https://app.example.com/integrations".to_string()),
    };

    let router = build_router(state);
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "engagement-server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
