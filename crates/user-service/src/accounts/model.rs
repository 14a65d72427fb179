//! Account records and registration input

use chrono::{DateTime, Utc};
use common::error::ValidationError;
use common::user_identity::{IdentifierPair, NumericId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Longest accepted email address, in characters
pub const MAX_EMAIL_LENGTH: usize = 100;

/// Shortest email that can hold a local part, `@`, a domain and a dot
const MIN_EMAIL_LENGTH: usize = 6;

/// Registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub goal_type: Option<String>,
    #[serde(default)]
    pub initial_avatar_type: Option<String>,
}

impl NewAccount {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            goal_type: None,
            initial_avatar_type: None,
        }
    }

    pub fn with_goal_type(mut self, goal_type: impl Into<String>) -> Self {
        self.goal_type = Some(goal_type.into());
        self
    }

    pub fn with_initial_avatar_type(mut self, avatar_type: impl Into<String>) -> Self {
        self.initial_avatar_type = Some(avatar_type.into());
        self
    }

    /// Check every field and return the request in stored form
    ///
    /// Emails are trimmed and lowercased; the username is kept verbatim.
    pub fn validated(self) -> Result<Self, ValidationError> {
        validate_username(&self.username)?;
        let email = normalize_email(&self.email)?;

        Ok(Self {
            email,
            goal_type: self.goal_type.filter(|g| !g.trim().is_empty()),
            initial_avatar_type: self.initial_avatar_type.filter(|a| !a.trim().is_empty()),
            ..self
        })
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "username".to_string(),
        });
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: MAX_USERNAME_LENGTH,
        });
    }
    Ok(())
}

fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::MissingField {
            field: "email".to_string(),
        });
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
        });
    }
    if !email.contains('@') || !email.contains('.') || email.chars().count() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            value: email,
        });
    }

    Ok(email)
}

/// Persisted user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(flatten)]
    pub identifiers: IdentifierPair,
    pub username: String,
    pub email: String,
    pub goal_type: Option<String>,
    pub initial_avatar_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn user_id(&self) -> NumericId {
        self.identifiers.numeric_id()
    }

    pub fn uuid(&self) -> &Uuid {
        self.identifiers.uuid()
    }

    /// The editable fields, in the shape stored by insert and update
    pub fn profile(&self) -> NewAccount {
        NewAccount {
            username: self.username.clone(),
            email: self.email.clone(),
            goal_type: self.goal_type.clone(),
            initial_avatar_type: self.initial_avatar_type.clone(),
        }
    }

    /// Names of the profile fields that differ from `profile`
    pub fn changed_fields(&self, profile: &NewAccount) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.username != profile.username {
            changed.push("username");
        }
        if self.email != profile.email {
            changed.push("email");
        }
        if self.goal_type != profile.goal_type {
            changed.push("goalType");
        }
        if self.initial_avatar_type != profile.initial_avatar_type {
            changed.push("initialAvatarType");
        }
        changed
    }
}

/// Partial profile change
///
/// `None` keeps the stored value. A blank goal or avatar type clears it.
/// The identifier pair is not part of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub goal_type: Option<String>,
    pub initial_avatar_type: Option<String>,
}

impl AccountUpdate {
    /// Merge onto the stored profile of `current` and validate the result
    pub fn apply(self, current: &Account) -> Result<NewAccount, ValidationError> {
        NewAccount {
            username: self.username.unwrap_or_else(|| current.username.clone()),
            email: self.email.unwrap_or_else(|| current.email.clone()),
            goal_type: self.goal_type.or_else(|| current.goal_type.clone()),
            initial_avatar_type: self
                .initial_avatar_type
                .or_else(|| current.initial_avatar_type.clone()),
        }
        .validated()
    }
}

/// Aggregate figures over the users table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub total_users: u64,
}
