//! # Account Service
//!
//! Registration and lookup of user accounts. Registration allocates an
//! identifier pair and inserts it; when the insert loses a race on either
//! identifier column the service allocates again from the same attempt
//! budget, so one registration never tries more than the configured number
//! of candidates in total.
//!
//! Updates only ever touch the profile fields; the pair assigned at
//! registration is never regenerated.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use common::error::{IdentityError, PersistenceError, UserServiceError, ValidationError};
use common::journal::{log_account_registered, log_event_publish_failure, log_write_conflict};
use common::user_identity::{IdentifierAllocator, IdentifierResolver, IdentityConfig, NumericId};

use crate::accounts::model::{Account, AccountUpdate, NewAccount, UserStatistics};
use crate::accounts::repository::AccountStore;
use crate::events::{UserEventPublisher, UserRegisteredEvent, USER_REGISTERED};

/// Account workflow errors
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("Email already exists: {0}")]
    EmailTaken(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl UserServiceError for AccountError {}

impl AccountError {
    /// True for both a missing account and an unassigned identifier
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Identity(IdentityError::NotFound { .. })
        )
    }
}

/// Which unique column rejected an insert
enum Conflict {
    Identifier(String),
    Username,
    Email,
}

fn classify_conflict(err: &PersistenceError) -> Option<Conflict> {
    let constraint = err.violated_constraint()?;
    let column = constraint.rsplit('.').next().unwrap_or(constraint);
    match column {
        "user_id" | "uuid_string" => Some(Conflict::Identifier(constraint.to_string())),
        "username" => Some(Conflict::Username),
        "email" => Some(Conflict::Email),
        _ => None,
    }
}

/// Account registration, lookup and removal
pub struct AccountService<S: AccountStore + 'static> {
    store: Arc<S>,
    allocator: IdentifierAllocator,
    resolver: IdentifierResolver,
    publisher: Arc<dyn UserEventPublisher>,
}

impl<S: AccountStore + 'static> AccountService<S> {
    pub fn new(
        store: Arc<S>,
        identity: &IdentityConfig,
        publisher: Arc<dyn UserEventPublisher>,
    ) -> Self {
        let allocator = IdentifierAllocator::with_config(store.clone(), identity);
        let resolver = IdentifierResolver::new(store.clone());
        Self {
            store,
            allocator,
            resolver,
            publisher,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn allocator(&self) -> &IdentifierAllocator {
        &self.allocator
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    /// Register a new account
    ///
    /// # Errors
    /// - [`AccountError::Validation`] for malformed input
    /// - [`AccountError::UsernameTaken`] / [`AccountError::EmailTaken`]
    /// - [`AccountError::Identity`] with `AllocationExhausted` when every
    ///   candidate of the shared budget collided
    pub async fn register(&self, request: NewAccount) -> Result<Account, AccountError> {
        let request = request.validated()?;
        info!("Registering new user: {}", request.username);

        if self.store.exists_by_username(&request.username).await? {
            return Err(AccountError::UsernameTaken(request.username));
        }
        if self.store.exists_by_email(&request.email).await? {
            return Err(AccountError::EmailTaken(request.email));
        }

        let mut budget = self.allocator.budget();
        let account = loop {
            let identifiers = self.allocator.allocate_within(&mut budget).await?;

            match self.store.insert_account(&identifiers, &request).await {
                Ok(account) => break account,
                Err(err) => match classify_conflict(&err) {
                    Some(Conflict::Identifier(constraint)) => {
                        log_write_conflict(
                            &constraint,
                            identifiers.numeric_id().get(),
                            budget.remaining(),
                        );
                    }
                    Some(Conflict::Username) => {
                        return Err(AccountError::UsernameTaken(request.username))
                    }
                    Some(Conflict::Email) => return Err(AccountError::EmailTaken(request.email)),
                    None => return Err(err.into()),
                },
            }
        };

        log_account_registered(
            account.user_id().get(),
            &account.identifiers.uuid_string(),
            &account.username,
        );
        self.publish_registration(&account).await;

        Ok(account)
    }

    /// Hand the registration to the publisher; failures are logged only
    async fn publish_registration(&self, account: &Account) {
        let event = UserRegisteredEvent::from_account(account);
        if let Err(e) = self.publisher.publish_user_registered(&event).await {
            log_event_publish_failure(USER_REGISTERED, account.user_id().get(), &e.to_string());
        }
    }

    pub async fn find_by_id(&self, id: NumericId) -> Result<Account, AccountError> {
        self.store
            .find_by_numeric_id(id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("id {id}")))
    }

    pub async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Account, AccountError> {
        self.store
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("uuid {uuid}")))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Account, AccountError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("username {username}")))
    }

    /// Lookup by email, compared in its stored lowercase form
    pub async fn find_by_email(&self, email: &str) -> Result<Account, AccountError> {
        let email = email.trim().to_lowercase();
        self.store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("email {email}")))
    }

    /// Every account, oldest first
    pub async fn list(&self) -> Result<Vec<Account>, AccountError> {
        Ok(self.store.list().await?)
    }

    /// Change profile fields of an existing account
    ///
    /// The identifier pair is kept as assigned. An update that changes
    /// nothing is not written.
    ///
    /// # Errors
    /// - [`AccountError::NotFound`] for an unknown id
    /// - [`AccountError::Validation`] when the merged profile is invalid
    /// - [`AccountError::UsernameTaken`] / [`AccountError::EmailTaken`] when
    ///   another account holds the new value
    pub async fn update(
        &self,
        id: NumericId,
        update: AccountUpdate,
    ) -> Result<Account, AccountError> {
        let current = self.find_by_id(id).await?;
        let profile = update.apply(&current)?;

        let changed = current.changed_fields(&profile);
        if changed.is_empty() {
            debug!("Update of user {} changes nothing", id);
            return Ok(current);
        }

        if profile.username != current.username
            && self.store.exists_by_username(&profile.username).await?
        {
            return Err(AccountError::UsernameTaken(profile.username));
        }
        if profile.email != current.email && self.store.exists_by_email(&profile.email).await? {
            return Err(AccountError::EmailTaken(profile.email));
        }

        let updated = match self.store.update_account(id, &profile).await {
            Ok(account) => account,
            Err(PersistenceError::NotFound { .. }) => {
                return Err(AccountError::NotFound(format!("id {id}")))
            }
            Err(err) => {
                return Err(match classify_conflict(&err) {
                    Some(Conflict::Username) => AccountError::UsernameTaken(profile.username),
                    Some(Conflict::Email) => AccountError::EmailTaken(profile.email),
                    _ => err.into(),
                })
            }
        };

        info!(user_id = %id, fields = ?changed, "Account updated");
        Ok(updated)
    }

    /// Find an account by numeric id or UUID given as text
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Account, AccountError> {
        let identifiers = self.resolver.resolve(identifier).await?;
        debug!("Resolved {} to {}", identifier, identifiers);
        self.find_by_id(identifiers.numeric_id()).await
    }

    /// Assigned numeric id for a UUID given as text
    pub async fn convert_uuid_to_id(&self, uuid: &str) -> Result<NumericId, AccountError> {
        Ok(self.resolver.convert_uuid_to_id(uuid).await?)
    }

    /// Assigned UUID for a numeric id
    pub async fn convert_id_to_uuid(&self, id: NumericId) -> Result<Uuid, AccountError> {
        Ok(self.resolver.convert_id_to_uuid(id).await?)
    }

    /// Returns whether an account was removed
    pub async fn delete_by_id(&self, id: NumericId) -> Result<bool, AccountError> {
        let deleted = self.store.delete_by_numeric_id(id).await?;
        if deleted {
            info!("Deleted user {}", id);
        }
        Ok(deleted)
    }

    /// Returns whether an account was removed
    pub async fn delete_by_uuid(&self, uuid: &Uuid) -> Result<bool, AccountError> {
        let deleted = self.store.delete_by_uuid(uuid).await?;
        if deleted {
            info!("Deleted user {}", uuid);
        }
        Ok(deleted)
    }

    pub async fn statistics(&self) -> Result<UserStatistics, AccountError> {
        Ok(UserStatistics {
            total_users: self.store.count().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(constraint: &str) -> PersistenceError {
        PersistenceError::ConstraintViolation {
            constraint: constraint.to_string(),
        }
    }

    #[test]
    fn test_conflict_classification() {
        assert!(matches!(
            classify_conflict(&violation("users.user_id")),
            Some(Conflict::Identifier(c)) if c == "users.user_id"
        ));
        assert!(matches!(
            classify_conflict(&violation("users.uuid_string")),
            Some(Conflict::Identifier(_))
        ));
        assert!(matches!(
            classify_conflict(&violation("users.username")),
            Some(Conflict::Username)
        ));
        assert!(matches!(
            classify_conflict(&violation("email")),
            Some(Conflict::Email)
        ));
        assert!(classify_conflict(&violation("users.other")).is_none());
        assert!(classify_conflict(&PersistenceError::NotFound {
            details: "x".to_string()
        })
        .is_none());
    }

    #[test]
    fn test_not_found_covers_identity_errors() {
        assert!(AccountError::NotFound("id 1".to_string()).is_not_found());
        assert!(AccountError::Identity(IdentityError::not_found("1")).is_not_found());
        assert!(!AccountError::UsernameTaken("x".to_string()).is_not_found());
    }
}
