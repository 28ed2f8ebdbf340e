use async_trait::async_trait;
use engagement_core::Result;
use engagement_core::model::EntityMapping;

/// §6.3 "Entity Mappings" table. Identity is `(tenant, external_system,
/// external_entity_kind, external_id)`; never points at two internal rows
/// simultaneously (spec §3 invariant) because `upsert` replaces the row
/// for that identity rather than appending.
#[async_trait]
pub trait EntityMappingStore: Send + Sync {
    async fn find_by_external_id(
        &self,
        tenant: &str,
        external_system: &str,
        external_entity_kind: &str,
        external_id: &str,
    ) -> Result<Option<EntityMapping>>;

    async fn upsert(&self, mapping: EntityMapping) -> Result<()>;

    async fn mark_soft_deleted(
        &self,
        tenant: &str,
        external_system: &str,
        external_entity_kind: &str,
        external_id: &str,
    ) -> Result<Option<EntityMapping>>;
}
