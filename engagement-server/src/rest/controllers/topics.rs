//! `POST /topics/aggregate` (spec §6.1) — C5's three modes, triggered
//! either by a scheduler draining the work queue (`incremental`) or by
//! an operator/service rescanning or re-processing one tenant
//! (`full`, `single`).

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use engagement_auth::AnyPrincipal;
use engagement_core::{CoreConfig, CoreError, TenantId};
use engagement_topics::{IncomingTopic, TopicAggregator};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{AppError, ServerConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMode {
    Incremental,
    Full,
    Single,
}

#[derive(Debug, Deserialize)]
pub struct IncomingTopicPayload {
    pub meeting_id: String,
    pub topic_index: u32,
    pub title: String,
    pub description: String,
    pub meeting_date: DateTime<Utc>,
    pub company_ref: Option<String>,
    pub contact_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    pub mode: AggregateMode,
    /// Required for `full`/`single`; defaults to the caller's own tenant
    /// for an end-user `AnyPrincipal`, so a service-role caller driving
    /// a tenant-scoped rescan must supply it explicitly.
    pub tenant: Option<String>,
    pub similarity_threshold: Option<f64>,
    /// `single` mode's topic records (spec §4.5: "process one meeting's
    /// topics"); ignored for the other two modes.
    pub topics: Option<Vec<IncomingTopicPayload>>,
}

fn resolve_tenant(req_tenant: &Option<String>, principal: &engagement_auth::Principal) -> Result<TenantId, AppError> {
    if let Some(t) = req_tenant {
        return Ok(TenantId::new(t.clone()));
    }
    principal
        .tenant()
        .cloned()
        .ok_or_else(|| AppError(CoreError::validation("tenant is required for this caller")))
}

fn aggregator_for_request(state: &ServerConfig, similarity_threshold: Option<f64>) -> Arc<TopicAggregator> {
    match similarity_threshold {
        None => state.topics.clone(),
        Some(threshold) => Arc::new(TopicAggregator {
            store: state.topics.store.clone(),
            clock: state.topics.clock.clone(),
            config: CoreConfig {
                similarity_threshold: threshold,
                ..state.topics.config.clone()
            },
        }),
    }
}

pub async fn aggregate(
    State(state): State<ServerConfig>,
    AnyPrincipal(principal): AnyPrincipal,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let aggregator = aggregator_for_request(&state, req.similarity_threshold);

    match req.mode {
        AggregateMode::Incremental => {
            let report = aggregator.run_incremental().await?;
            Ok(Json(json!({
                "success": true,
                "mode": "incremental",
                "claimed": report.claimed,
                "completed": report.completed,
                "failed": report.failed,
                "tenants_rescored": report.tenants_rescored,
            })))
        }
        AggregateMode::Full => {
            let tenant = resolve_tenant(&req.tenant, &principal)?;
            let rescored = aggregator.run_full(&tenant).await?;
            Ok(Json(json!({ "success": true, "mode": "full", "topics_rescored": rescored })))
        }
        AggregateMode::Single => {
            let tenant = resolve_tenant(&req.tenant, &principal)?;
            let payloads = req.topics.unwrap_or_default();
            if payloads.is_empty() {
                return Err(AppError(CoreError::validation("single mode requires at least one topic")));
            }
            let topics: Vec<IncomingTopic> = payloads
                .into_iter()
                .map(|p| IncomingTopic {
                    tenant: tenant.clone(),
                    meeting_id: p.meeting_id,
                    topic_index: p.topic_index,
                    title: p.title,
                    description: p.description,
                    meeting_date: p.meeting_date,
                    company_ref: p.company_ref,
                    contact_ref: p.contact_ref,
                })
                .collect();
            let outcomes = aggregator.run_single(topics).await?;
            Ok(Json(json!({
                "success": true,
                "mode": "single",
                "outcomes": outcomes.iter().map(|o| json!({ "topic_id": o.topic_id().to_string() })).collect::<Vec<_>>(),
            })))
        }
    }
}
