//! Lookup of one half of an identifier pair from the other
//!
//! Assigned ids are always read back from storage, never re-derived: the
//! stored uuid may not be the first candidate the allocator tried.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::user_identity::derive::parse_canonical_uuid;
use crate::user_identity::validation::{parse_identifier, ParsedIdentifier};
use crate::user_identity::{IdentifierPair, IdentityLookup, NumericId};

/// Resolves numeric ids and UUIDs against the identity table
#[derive(Clone)]
pub struct IdentifierResolver {
    lookup: Arc<dyn IdentityLookup>,
}

impl IdentifierResolver {
    pub fn new(lookup: Arc<dyn IdentityLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve an opaque identifier to the full pair
    ///
    /// # Errors
    /// - [`IdentityError::InvalidFormat`] if the text is neither an integer
    ///   nor a canonical UUID
    /// - [`IdentityError::NotFound`] if it is well formed but unassigned
    /// - [`IdentityError::Persistence`] if the lookup failed
    pub async fn resolve(&self, identifier: &str) -> Result<IdentifierPair, IdentityError> {
        match parse_identifier(identifier)? {
            ParsedIdentifier::Numeric(id) => self.resolve_numeric(id).await,
            ParsedIdentifier::UnassignableNumber(_) => Err(IdentityError::not_found(identifier)),
            ParsedIdentifier::Uuid(uuid) => self.resolve_uuid(&uuid).await,
        }
    }

    pub async fn resolve_numeric(&self, id: NumericId) -> Result<IdentifierPair, IdentityError> {
        self.lookup
            .find_uuid_by_numeric_id(id)
            .await?
            .map(|uuid| IdentifierPair::from_parts(uuid, id))
            .ok_or_else(|| IdentityError::not_found(id))
    }

    pub async fn resolve_uuid(&self, uuid: &Uuid) -> Result<IdentifierPair, IdentityError> {
        self.lookup
            .find_numeric_id_by_uuid(uuid)
            .await?
            .map(|id| IdentifierPair::from_parts(*uuid, id))
            .ok_or_else(|| IdentityError::not_found(uuid))
    }

    /// Assigned numeric id for a UUID given as text
    pub async fn convert_uuid_to_id(&self, uuid: &str) -> Result<NumericId, IdentityError> {
        let uuid = parse_canonical_uuid(uuid)?;
        Ok(self.resolve_uuid(&uuid).await?.numeric_id())
    }

    /// Assigned UUID for a numeric id
    pub async fn convert_id_to_uuid(&self, id: NumericId) -> Result<Uuid, IdentityError> {
        Ok(*self.resolve_numeric(id).await?.uuid())
    }
}

impl std::fmt::Debug for IdentifierResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierResolver").finish_non_exhaustive()
    }
}
