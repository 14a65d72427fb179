//! Uniqueness-checked identifier allocation
//!
//! Each attempt generates a random v4 UUID, derives its numeric id and asks
//! the [`IdentityLookup`] whether either half is already taken. The check
//! only narrows the collision window; the store's unique constraints remain
//! the final arbiter, and callers retry on a write-time violation through
//! [`IdentifierAllocator::allocate_within`] so the whole operation shares
//! one attempt budget.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ConfigValidation;
use crate::error::{ConfigurationError, IdentityError, PersistenceError};
use crate::journal::{log_allocation_collision, log_allocation_exhausted, log_allocation_success};
use crate::user_identity::{
    constants::{DEFAULT_MAX_ATTEMPTS, MAX_CONFIGURABLE_ATTEMPTS},
    retry::{with_budget, AttemptError, RetryBudget, RetryError},
    DerivationStrategy, IdDeriver, IdentifierPair, IdentityLookup,
};

/// Allocation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Candidates tried per operation before reporting exhaustion
    pub max_attempts: u32,

    /// UUID to numeric id mapping
    pub derivation: DerivationStrategy,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            derivation: DerivationStrategy::Sha256,
        }
    }
}

impl ConfigValidation for IdentityConfig {
    type Error = ConfigurationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.max_attempts == 0 || self.max_attempts > MAX_CONFIGURABLE_ATTEMPTS {
            return Err(ConfigurationError::InvalidValue {
                key: "identity.max_attempts".to_string(),
                value: self.max_attempts.to_string(),
                reason: format!("Must be between 1 and {MAX_CONFIGURABLE_ATTEMPTS}"),
            });
        }
        Ok(())
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.derivation == DerivationStrategy::XorFold {
            warnings.push(
                "identity.derivation = xor-fold: ids will not match those derived with sha256"
                    .to_string(),
            );
        }
        warnings
    }
}

/// Produces identifier pairs not present in the store at check time
#[derive(Clone)]
pub struct IdentifierAllocator {
    lookup: Arc<dyn IdentityLookup>,
    deriver: IdDeriver,
    max_attempts: u32,
}

impl IdentifierAllocator {
    /// Allocator with the default budget and SHA-256 derivation
    pub fn new(lookup: Arc<dyn IdentityLookup>) -> Self {
        Self::with_config(lookup, &IdentityConfig::default())
    }

    pub fn with_config(lookup: Arc<dyn IdentityLookup>, config: &IdentityConfig) -> Self {
        Self {
            lookup,
            deriver: IdDeriver::new(config.derivation),
            max_attempts: config.max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn deriver(&self) -> IdDeriver {
        self.deriver
    }

    /// Fresh budget sized for one whole create operation
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(self.max_attempts)
    }

    /// Allocate a pair using a fresh budget
    ///
    /// # Errors
    /// [`IdentityError::AllocationExhausted`] when every attempt collided,
    /// [`IdentityError::Persistence`] when the lookup itself failed.
    pub async fn allocate(&self) -> Result<IdentifierPair, IdentityError> {
        let mut budget = self.budget();
        self.allocate_within(&mut budget).await
    }

    /// Allocate a pair, drawing attempts from a caller-owned budget
    ///
    /// Used by writers that loop back here after a uniqueness violation at
    /// insert time, so retries across the whole operation stay bounded.
    pub async fn allocate_within(
        &self,
        budget: &mut RetryBudget,
    ) -> Result<IdentifierPair, IdentityError> {
        let result = with_budget(budget, |attempt| self.try_candidate(attempt, Uuid::new_v4())).await;

        match result {
            Ok(pair) => {
                log_allocation_success(budget.used(), pair.numeric_id().get(), &pair.uuid_string());
                Ok(pair)
            }
            Err(RetryError::Exhausted { attempts }) => {
                log_allocation_exhausted(attempts);
                Err(IdentityError::AllocationExhausted { attempts })
            }
            Err(RetryError::Fatal(e)) => Err(IdentityError::Persistence(e)),
        }
    }

    async fn try_candidate(
        &self,
        attempt: u32,
        uuid: Uuid,
    ) -> Result<IdentifierPair, AttemptError<PersistenceError>> {
        let numeric_id = self.deriver.derive(&uuid);

        if self
            .lookup
            .exists_by_numeric_id(numeric_id)
            .await
            .map_err(AttemptError::Fatal)?
        {
            log_allocation_collision(attempt, numeric_id.get(), &uuid.to_string(), false);
            return Err(AttemptError::Collision);
        }

        if self
            .lookup
            .exists_by_uuid(&uuid)
            .await
            .map_err(AttemptError::Fatal)?
        {
            log_allocation_collision(attempt, numeric_id.get(), &uuid.to_string(), true);
            return Err(AttemptError::Collision);
        }

        Ok(IdentifierPair::from_parts(uuid, numeric_id))
    }
}

impl std::fmt::Debug for IdentifierAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierAllocator")
            .field("deriver", &self.deriver)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_identity::interfaces::MockIdentityLookup;
    use crate::user_identity::MemoryIdentityStore;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_allocates_against_empty_store() {
        let store = Arc::new(MemoryIdentityStore::new());
        let allocator = IdentifierAllocator::new(store.clone());

        let pair = allocator.allocate().await.expect("Should allocate");
        assert_eq!(pair.uuid().get_version(), Some(uuid::Version::Random));
        assert_eq!(pair.numeric_id(), allocator.deriver().derive(pair.uuid()));
    }

    #[tokio::test]
    async fn test_many_allocations_are_pairwise_distinct() {
        let store = Arc::new(MemoryIdentityStore::new());
        let allocator = IdentifierAllocator::new(store.clone());

        let mut uuids = HashSet::new();
        let mut ids = HashSet::new();
        for _ in 0..200 {
            let pair = allocator.allocate().await.expect("Should allocate");
            store.insert(pair).await.expect("Store should accept new pair");
            assert!(uuids.insert(*pair.uuid()));
            assert!(ids.insert(pair.numeric_id()));
        }
        assert_eq!(store.len().await, 200);
    }

    #[tokio::test]
    async fn test_exhausts_after_exactly_max_attempts() {
        let mut lookup = MockIdentityLookup::new();
        lookup
            .expect_exists_by_numeric_id()
            .times(10)
            .returning(|_| Ok(true));
        lookup.expect_exists_by_uuid().never();

        let allocator = IdentifierAllocator::new(Arc::new(lookup));
        let err = allocator.allocate().await.unwrap_err();

        assert!(matches!(err, IdentityError::AllocationExhausted { attempts: 10 }));
        assert!(err.is_retry_later());
    }

    #[tokio::test]
    async fn test_uuid_collision_is_also_retried() {
        let mut lookup = MockIdentityLookup::new();
        lookup
            .expect_exists_by_numeric_id()
            .times(3)
            .returning(|_| Ok(false));
        let mut uuid_checks = 0;
        lookup
            .expect_exists_by_uuid()
            .times(3)
            .returning(move |_| {
                uuid_checks += 1;
                Ok(uuid_checks < 3)
            });

        let allocator = IdentifierAllocator::new(Arc::new(lookup));
        let mut budget = allocator.budget();
        allocator
            .allocate_within(&mut budget)
            .await
            .expect("Third candidate should pass");
        assert_eq!(budget.used(), 3);
    }

    #[tokio::test]
    async fn test_configured_budget_is_respected() {
        let mut lookup = MockIdentityLookup::new();
        lookup
            .expect_exists_by_numeric_id()
            .times(3)
            .returning(|_| Ok(true));

        let config = IdentityConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let allocator = IdentifierAllocator::with_config(Arc::new(lookup), &config);
        let err = allocator.allocate().await.unwrap_err();
        assert!(matches!(err, IdentityError::AllocationExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_retried() {
        let mut lookup = MockIdentityLookup::new();
        lookup
            .expect_exists_by_numeric_id()
            .times(1)
            .returning(|_| {
                Err(PersistenceError::ConnectionFailed {
                    source: "pool closed".into(),
                })
            });

        let allocator = IdentifierAllocator::new(Arc::new(lookup));
        let err = allocator.allocate().await.unwrap_err();
        assert!(matches!(err, IdentityError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_shared_budget_spans_calls() {
        let store = Arc::new(MemoryIdentityStore::new());
        let allocator = IdentifierAllocator::new(store);
        let mut budget = allocator.budget();

        for _ in 0..10 {
            allocator
                .allocate_within(&mut budget)
                .await
                .expect("Empty store never collides");
        }
        let err = allocator.allocate_within(&mut budget).await.unwrap_err();
        assert!(matches!(err, IdentityError::AllocationExhausted { attempts: 10 }));
    }

    #[test]
    fn test_identity_config_validation() {
        assert!(IdentityConfig::default().validate().is_ok());
        assert!(IdentityConfig::default().warnings().is_empty());

        let zero = IdentityConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let too_many = IdentityConfig {
            max_attempts: MAX_CONFIGURABLE_ATTEMPTS + 1,
            ..Default::default()
        };
        assert!(too_many.validate().is_err());

        let xor = IdentityConfig {
            derivation: DerivationStrategy::XorFold,
            ..Default::default()
        };
        assert!(xor.validate().is_ok());
        assert_eq!(xor.warnings().len(), 1);
    }
}
