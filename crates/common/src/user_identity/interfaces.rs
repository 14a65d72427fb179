use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::user_identity::NumericId;

/// Read-only view of the table that owns assigned identifier pairs
///
/// Implemented by the storage layer. The allocator and resolver only read
/// through it; writes, and the uniqueness constraints that finally arbitrate
/// concurrent inserts, stay with the implementor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn exists_by_numeric_id(&self, id: NumericId) -> Result<bool, PersistenceError>;

    async fn exists_by_uuid(&self, uuid: &Uuid) -> Result<bool, PersistenceError>;

    async fn find_numeric_id_by_uuid(
        &self,
        uuid: &Uuid,
    ) -> Result<Option<NumericId>, PersistenceError>;

    async fn find_uuid_by_numeric_id(&self, id: NumericId)
        -> Result<Option<Uuid>, PersistenceError>;
}
