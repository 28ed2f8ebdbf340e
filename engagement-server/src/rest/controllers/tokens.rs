//! `POST /tokens/{integration}/refresh` (spec §6.1) — C1's batch
//! proactive refresh, triggered by the scheduler the way `tick` is.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use engagement_auth::InternalOnly;
use engagement_core::{CoreError, IntegrationKind};
use serde_json::json;

use crate::{AppError, ServerConfig};

/// Service-role or cron only (spec §6.1). Never aborts on a single
/// credential's failure (spec §7: "batch operations ... never abort the
/// batch on a single failure"); failures are classified and returned
/// alongside the successes.
pub async fn refresh(
    State(state): State<ServerConfig>,
    InternalOnly(_principal): InternalOnly,
    Path(integration): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let integration = IntegrationKind::from_str(&integration)
        .map_err(|_| AppError(CoreError::validation(format!("unknown integration '{integration}'"))))?;

    let records = state.credentials.refresh_proactively(integration).await?;

    Ok(Json(json!({
        "success": true,
        "integration": integration.as_str(),
        "results": records.iter().map(|r| json!({
            "tenant": r.tenant.to_string(),
            "outcome": format!("{:?}", r.outcome),
            "detail": r.detail,
        })).collect::<Vec<_>>(),
    })))
}
