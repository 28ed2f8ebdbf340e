use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engagement_core::Result;

/// The actual domain schema (contacts, deals, meetings, ...) is an
/// external collaborator out of scope for this core (spec §1: "no
/// reimplementation of domain database schema beyond the mapping tables
/// required by the core"). `InternalRecordStore` is the minimal seam C3
/// needs to apply create/update/delete against *some* internal row and
/// to perform natural-key matching — a stand-in for the relational store,
/// not a reimplementation of it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InternalRecord {
    pub tenant: String,
    pub table: String,
    pub id: String,
    pub data: serde_json::Value,
    pub last_modified: DateTime<Utc>,
    pub deleted_externally: bool,
}

#[async_trait]
pub trait InternalRecordStore: Send + Sync {
    async fn get(&self, tenant: &str, table: &str, id: &str) -> Result<Option<InternalRecord>>;

    async fn upsert(&self, record: InternalRecord) -> Result<()>;

    /// Looks up a row by one natural-key field, case-insensitively (spec
    /// §4.3: "natural-key match (e.g., email address)"). `field` names
    /// the key inside `data` (e.g. `"email"`).
    async fn find_by_natural_key(
        &self,
        tenant: &str,
        table: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<InternalRecord>>;
}
