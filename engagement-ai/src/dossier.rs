use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use engagement_core::model::{ContextDossier, Urgency};
use engagement_core::{Clock, CoreConfig, CoreError, Result, TenantId, UserId};
use engagement_store::{OrgPreferencesStore, UserPreferencesStore};
use serde_json::Value;

/// One place a dossier field can be resolved from — the local store, or
/// a remote CRM. Spec §9's composite read-through design note: each
/// source is queried independently and a failure in one source must not
/// fail the whole dossier.
#[async_trait]
pub trait DossierFieldSource: Send + Sync {
    /// Used purely for provenance tagging (`_source` on the returned value).
    fn name(&self) -> &'static str;

    async fn fetch(&self, tenant: &TenantId, subject_ref: &str) -> Result<Option<Value>>;
}

/// Queries every source in `sources` concurrently, tolerating individual
/// failures, and merges the results by the case-insensitive `email`
/// natural key. Sources are listed in preference order: on a tie the
/// earliest (by convention, the local store) wins.
pub async fn resolve_composite(
    sources: &[Arc<dyn DossierFieldSource>],
    tenant: &TenantId,
    subject_ref: &str,
) -> Option<Value> {
    if sources.is_empty() {
        return None;
    }

    let fetches = sources.iter().map(|source| {
        let tenant = tenant.clone();
        let subject_ref = subject_ref.to_string();
        async move {
            match source.fetch(&tenant, &subject_ref).await {
                Ok(Some(mut value)) => {
                    if let Value::Object(ref mut map) = value {
                        map.insert("_source".to_string(), Value::String(source.name().to_string()));
                    }
                    Some(value)
                }
                Ok(None) => None,
                Err(err) => {
                    tracing::warn!(source = source.name(), error = %err, "dossier field source failed, tolerating");
                    None
                }
            }
        }
    });
    let results = futures::future::join_all(fetches).await;

    let mut seen_keys: Vec<String> = Vec::new();
    for candidate in results.into_iter().flatten() {
        let key = candidate
            .get("email")
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase());
        match key {
            Some(k) if seen_keys.contains(&k) => continue,
            Some(k) => seen_keys.push(k),
            None => {}
        }
        return Some(candidate);
    }
    None
}

/// Which fields the caller actually wants resolved, and their relative
/// importance for `context_quality` (spec §4.4.1: "weighted by
/// importance"). Weights sum to 1.0; the exact split is not specified
/// and is decided here (see DESIGN.md).
#[derive(Debug, Clone, Copy)]
pub struct DossierScope {
    pub contact: bool,
    pub deal: bool,
    pub meeting: bool,
    pub email_history: bool,
}

impl DossierScope {
    pub fn all() -> Self {
        Self {
            contact: true,
            deal: true,
            meeting: true,
            email_history: true,
        }
    }
}

const WEIGHT_CONTACT: f64 = 0.3;
const WEIGHT_DEAL: f64 = 0.25;
const WEIGHT_MEETING: f64 = 0.2;
const WEIGHT_EMAIL_HISTORY: f64 = 0.25;

pub struct DossierRequest {
    pub tenant: TenantId,
    pub user: UserId,
    pub subject_ref: String,
    pub scope: DossierScope,
    pub timezone: String,
    pub utc_offset_hours: i32,
    pub urgency: Urgency,
}

/// Assembles `ContextDossier`s by fanning out to per-field sources and
/// scoring how much of the requested context actually resolved.
pub struct DossierAssembler {
    pub contact_sources: Vec<Arc<dyn DossierFieldSource>>,
    pub deal_sources: Vec<Arc<dyn DossierFieldSource>>,
    pub meeting_sources: Vec<Arc<dyn DossierFieldSource>>,
    pub email_history_sources: Vec<Arc<dyn DossierFieldSource>>,
    pub user_preferences: Arc<dyn UserPreferencesStore>,
    pub org_preferences: Arc<dyn OrgPreferencesStore>,
    pub clock: Arc<dyn Clock>,
    pub config: CoreConfig,
}

fn is_business_hours(now: DateTime<Utc>, utc_offset_hours: i32) -> bool {
    let local = now + chrono::Duration::hours(utc_offset_hours as i64);
    let weekday = local.weekday();
    let is_weekday = !matches!(weekday, chrono::Weekday::Sat | chrono::Weekday::Sun);
    let hour = local.hour();
    is_weekday && (9..17).contains(&hour)
}

impl DossierAssembler {
    pub async fn assemble(&self, req: DossierRequest) -> Result<ContextDossier> {
        let mut requested_weight = 0.0;
        let mut resolved_weight = 0.0;

        let contact = if req.scope.contact {
            requested_weight += WEIGHT_CONTACT;
            let value = resolve_composite(&self.contact_sources, &req.tenant, &req.subject_ref).await;
            if value.is_some() {
                resolved_weight += WEIGHT_CONTACT;
            }
            value
        } else {
            None
        };

        let deal = if req.scope.deal {
            requested_weight += WEIGHT_DEAL;
            let value = resolve_composite(&self.deal_sources, &req.tenant, &req.subject_ref).await;
            if value.is_some() {
                resolved_weight += WEIGHT_DEAL;
            }
            value
        } else {
            None
        };

        let meeting = if req.scope.meeting {
            requested_weight += WEIGHT_MEETING;
            let value = resolve_composite(&self.meeting_sources, &req.tenant, &req.subject_ref).await;
            if value.is_some() {
                resolved_weight += WEIGHT_MEETING;
            }
            value
        } else {
            None
        };

        let email_history = if req.scope.email_history {
            requested_weight += WEIGHT_EMAIL_HISTORY;
            let value = resolve_composite(&self.email_history_sources, &req.tenant, &req.subject_ref).await;
            if value.is_some() {
                resolved_weight += WEIGHT_EMAIL_HISTORY;
            }
            value
        } else {
            None
        };

        let user_preferences = self.user_preferences.get_or_create(&req.tenant, &req.user).await?;
        let org_preferences = self.org_preferences.get_or_create(&req.tenant, &self.config).await?;

        let context_quality = if requested_weight > 0.0 {
            ((resolved_weight / requested_weight) * 100.0).round() as u8
        } else {
            100
        };

        let now = self.clock.now();

        Ok(ContextDossier {
            tenant: req.tenant,
            contact,
            deal,
            meeting,
            email_history,
            user_preferences: Some(user_preferences),
            org_preferences: Some(org_preferences),
            current_time: now,
            timezone: req.timezone,
            business_hours: is_business_hours(now, req.utc_offset_hours),
            urgency: req.urgency,
            context_quality,
        })
    }
}

pub fn require_dossier_field<'a>(value: &'a Option<Value>, field_name: &str) -> Result<&'a Value> {
    value
        .as_ref()
        .ok_or_else(|| CoreError::validation(format!("dossier missing required field: {field_name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use engagement_core::FixedClock;
    use engagement_store::inmemory::InMemoryStore;
    use std::sync::Arc as StdArc;

    struct StaticSource {
        name: &'static str,
        value: Option<Value>,
    }

    #[async_trait]
    impl DossierFieldSource for StaticSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _tenant: &TenantId, _subject_ref: &str) -> Result<Option<Value>> {
            Ok(self.value.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DossierFieldSource for FailingSource {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch(&self, _tenant: &TenantId, _subject_ref: &str) -> Result<Option<Value>> {
            Err(CoreError::transient("boom"))
        }
    }

    #[tokio::test]
    async fn partial_resolution_lowers_context_quality_proportionally() {
        let store = StdArc::new(InMemoryStore::new());
        let assembler = DossierAssembler {
            contact_sources: vec![StdArc::new(StaticSource {
                name: "local",
                value: Some(serde_json::json!({"email": "a@example.com"})),
            })],
            deal_sources: vec![],
            meeting_sources: vec![],
            email_history_sources: vec![],
            user_preferences: store.clone(),
            org_preferences: store.clone(),
            clock: StdArc::new(FixedClock::new(Utc::now())),
            config: CoreConfig::default(),
        };
        let dossier = assembler
            .assemble(DossierRequest {
                tenant: TenantId::new("t1"),
                user: UserId::new("u1"),
                subject_ref: "contact-1".into(),
                scope: DossierScope::all(),
                timezone: "UTC".into(),
                utc_offset_hours: 0,
                urgency: Urgency::Flexible,
            })
            .await
            .unwrap();
        assert!(dossier.contact.is_some());
        assert!(dossier.deal.is_none());
        // only the 0.3-weighted contact field resolved out of 1.0 requested
        assert_eq!(dossier.context_quality, 30);
    }

    #[tokio::test]
    async fn a_failing_source_is_tolerated_and_falls_back_to_the_next() {
        let store = StdArc::new(InMemoryStore::new());
        let assembler = DossierAssembler {
            contact_sources: vec![
                StdArc::new(FailingSource),
                StdArc::new(StaticSource {
                    name: "crm",
                    value: Some(serde_json::json!({"email": "b@example.com"})),
                }),
            ],
            deal_sources: vec![],
            meeting_sources: vec![],
            email_history_sources: vec![],
            user_preferences: store.clone(),
            org_preferences: store.clone(),
            clock: StdArc::new(FixedClock::new(Utc::now())),
            config: CoreConfig::default(),
        };
        let dossier = assembler
            .assemble(DossierRequest {
                tenant: TenantId::new("t1"),
                user: UserId::new("u1"),
                subject_ref: "contact-1".into(),
                scope: DossierScope::all(),
                timezone: "UTC".into(),
                utc_offset_hours: 0,
                urgency: Urgency::Flexible,
            })
            .await
            .unwrap();
        assert!(dossier.contact.is_some());
    }
}
