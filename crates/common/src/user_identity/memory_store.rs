//! In-memory identity table
//!
//! Holds assigned pairs in two maps and enforces the same uniqueness rules a
//! database table would, reporting a violation as
//! [`PersistenceError::ConstraintViolation`]. Used by tests and by tooling
//! that allocates without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::user_identity::{IdentifierPair, IdentityLookup, NumericId};

#[derive(Default)]
struct Pairs {
    by_id: HashMap<NumericId, Uuid>,
    by_uuid: HashMap<Uuid, NumericId>,
}

/// Thread-safe in-memory store of identifier pairs
#[derive(Default)]
pub struct MemoryIdentityStore {
    pairs: RwLock<Pairs>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a pair, rejecting duplicates on either half
    pub async fn insert(&self, pair: IdentifierPair) -> Result<(), PersistenceError> {
        let mut pairs = self.pairs.write().await;

        if pairs.by_id.contains_key(&pair.numeric_id()) {
            return Err(PersistenceError::ConstraintViolation {
                constraint: "numeric_id".to_string(),
            });
        }
        if pairs.by_uuid.contains_key(pair.uuid()) {
            return Err(PersistenceError::ConstraintViolation {
                constraint: "uuid".to_string(),
            });
        }

        pairs.by_id.insert(pair.numeric_id(), *pair.uuid());
        pairs.by_uuid.insert(*pair.uuid(), pair.numeric_id());
        Ok(())
    }

    /// Remove the pair owning `id`; returns whether one was present
    pub async fn remove(&self, id: NumericId) -> bool {
        let mut pairs = self.pairs.write().await;
        match pairs.by_id.remove(&id) {
            Some(uuid) => {
                pairs.by_uuid.remove(&uuid);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.pairs.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pairs.read().await.by_id.is_empty()
    }
}

#[async_trait]
impl IdentityLookup for MemoryIdentityStore {
    async fn exists_by_numeric_id(&self, id: NumericId) -> Result<bool, PersistenceError> {
        Ok(self.pairs.read().await.by_id.contains_key(&id))
    }

    async fn exists_by_uuid(&self, uuid: &Uuid) -> Result<bool, PersistenceError> {
        Ok(self.pairs.read().await.by_uuid.contains_key(uuid))
    }

    async fn find_numeric_id_by_uuid(
        &self,
        uuid: &Uuid,
    ) -> Result<Option<NumericId>, PersistenceError> {
        Ok(self.pairs.read().await.by_uuid.get(uuid).copied())
    }

    async fn find_uuid_by_numeric_id(
        &self,
        id: NumericId,
    ) -> Result<Option<Uuid>, PersistenceError> {
        Ok(self.pairs.read().await.by_id.get(&id).copied())
    }
}
