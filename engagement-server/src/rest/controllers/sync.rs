//! `POST /sync/{integration}/tick` and `POST /sync/{integration}/webhook`
//! (spec §6.1) — C2's two triggers, cron-driven fanout and inbound
//! webhook, wired onto `SyncOrchestrator`.

use std::str::FromStr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use engagement_auth::InternalOnly;
use engagement_core::{CoreError, IntegrationKind, WebhookHeaders};
use serde_json::json;

use crate::{AppError, ServerConfig};

fn parse_integration(raw: &str) -> Result<IntegrationKind, AppError> {
    IntegrationKind::from_str(raw)
        .map_err(|_| AppError(CoreError::validation(format!("unknown integration '{raw}'"))))
}

/// `POST /sync/{integration}/tick` — service-role or cron only (spec
/// §6.1 fail-closed rule); `InternalOnly` rejects end users with 401
/// before this handler ever runs.
pub async fn tick(
    State(state): State<ServerConfig>,
    InternalOnly(_principal): InternalOnly,
    Path(integration): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let integration = parse_integration(&integration)?;
    let report = state.sync.tick(integration).await?;

    Ok(Json(json!({
        "success": true,
        "integration": integration.as_str(),
        "successes": report.successes,
        "failures": report.failures,
        "results": report.results.iter().map(|r| json!({
            "tenant": r.tenant.to_string(),
            "mode": r.mode,
            "ok": r.result.is_ok(),
            "error": r.result.as_ref().err(),
        })).collect::<Vec<_>>(),
    })))
}

/// `POST /sync/{integration}/webhook` — HMAC-verified webhook sink (spec
/// §6.1, §4.3). Signature and replay-window validation happen inside
/// `SyncOrchestrator::handle_webhook`; this handler only lifts the
/// transport-specific header names into `WebhookHeaders`. A dedup hit
/// downstream in C3 still answers 200 (spec §7: "webhook endpoints
/// acknowledge duplicates as success").
pub async fn webhook(
    State(state): State<ServerConfig>,
    Path(integration): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let integration = parse_integration(&integration)?;

    let signature = headers
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let timestamp = headers
        .get("x-timestamp")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    let summary = state
        .sync
        .handle_webhook(integration, &body, WebhookHeaders { signature, timestamp }, payload)
        .await?;

    Ok(Json(json!({ "success": true, "summary": summary })))
}
