use chrono::{DateTime, Utc};
use engagement_core::TenantId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{canonicalize, sha256_hex};

/// The three shapes a reconciliation event can take (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

/// An inbound provider event, already resolved to a tenant and
/// canonicalized into the §6.2 wire format. Built by the caller
/// (typically `engagement-server`'s webhook handler, after signature
/// verification) from whatever shape the provider actually sent.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub tenant: TenantId,
    pub external_system: String,
    /// Provider event id, if the payload carries one. Falls back to
    /// `sha256(canonicalized payload)` (spec §6.2).
    pub external_event_id: Option<String>,
    pub external_entity_kind: String,
    pub external_id: String,
    pub internal_table: String,
    pub kind: EventKind,
    pub external_occurred_at: DateTime<Utc>,
    pub external_last_modified: DateTime<Utc>,
    pub payload: Value,
}

impl InboundEvent {
    pub fn resolved_event_id(&self) -> String {
        self.external_event_id
            .clone()
            .unwrap_or_else(|| sha256_hex(&canonicalize(&self.payload)))
    }

    pub fn payload_hash(&self) -> String {
        sha256_hex(&canonicalize(&self.payload))
    }
}
