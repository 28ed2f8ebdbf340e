//! Composition root for the cross-integration orchestration core (spec
//! §6.1): one `AppState` wiring C1-C5 against a shared `Store`, and the
//! axum router exposing the §6.1 HTTP surface on top of it.

pub mod rest;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use engagement_ai::AiPipeline;
use engagement_auth::{AuthConfig, AuthState, EndUserAuthState, EndUserTokenStore};
use engagement_core::{Clock, CoreConfig, CoreError};
use engagement_credentials::CredentialManager;
use engagement_store::OAuthStateStore;
use engagement_sync::SyncOrchestrator;
use engagement_topics::TopicAggregator;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Every component crate's composition root needs, bundled behind
/// `Arc`s so axum can cheaply clone `AppState` per request (spec §9:
/// "pass explicit capability bundles ... through call context").
#[derive(Clone)]
pub struct ServerConfig {
    pub credentials: Arc<CredentialManager>,
    pub sync: Arc<SyncOrchestrator>,
    pub ai: Arc<AiPipeline>,
    pub topics: Arc<TopicAggregator>,
    pub oauth_states: Arc<dyn OAuthStateStore>,
    pub end_user_tokens: Arc<dyn EndUserTokenStore>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthConfig,
    pub config: CoreConfig,
    /// Where `GET /oauth/{integration}/callback` redirects once the
    /// exchange settles (spec §7: "OAuth callbacks always redirect to a
    /// frontend page ... they never return JSON to the browser").
    pub oauth_redirect_base: String,
}

impl AuthState for ServerConfig {
    fn auth_config(&self) -> &AuthConfig {
        &self.auth
    }
}

impl EndUserAuthState for ServerConfig {
    fn end_user_store(&self) -> &dyn EndUserTokenStore {
        self.end_user_tokens.as_ref()
    }
}

/// §6.1 standard error envelope: `{ success:false, error, details? }`.
pub struct AppError(pub CoreError);

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    details: String,
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            success: false,
            error: self.0.category().to_string(),
            details: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

/// Builds the full §6.1 HTTP surface. CORS preflight is always honored
/// (`tower_http::cors` answers `OPTIONS` automatically); the cron/service
/// fail-closed rule lives in each handler's extractor, not in middleware,
/// so it stays visible at the route definition.
pub fn build_router(state: ServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sync/{integration}/tick", post(rest::controllers::sync::tick))
        .route("/sync/{integration}/webhook", post(rest::controllers::sync::webhook))
        .route("/oauth/{integration}/callback", get(rest::controllers::oauth::callback))
        .route("/tokens/{integration}/refresh", post(rest::controllers::tokens::refresh))
        .route("/topics/aggregate", post(rest::controllers::topics::aggregate))
        .route("/ai/feedback", post(rest::controllers::ai::feedback))
        .route("/ai/outcome", post(rest::controllers::ai::outcome))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
