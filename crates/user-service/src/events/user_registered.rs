//! Account registration event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::Account;

/// Event type tag carried by [`UserRegisteredEvent`]
pub const USER_REGISTERED: &str = "USER_REGISTERED";

/// Emitted once per successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegisteredEvent {
    pub user_id: u64,
    pub username: String,
    pub email: String,
    pub registration_date: DateTime<Utc>,
    pub goal_type: Option<String>,
    pub initial_avatar_type: Option<String>,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
}

impl UserRegisteredEvent {
    pub fn from_account(account: &Account) -> Self {
        Self {
            user_id: account.user_id().get(),
            username: account.username.clone(),
            email: account.email.clone(),
            registration_date: account.created_at,
            goal_type: account.goal_type.clone(),
            initial_avatar_type: account.initial_avatar_type.clone(),
            event_type: USER_REGISTERED.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Partition key shared by every event about this user
    pub fn key(&self) -> String {
        format!("user-{}", self.user_id)
    }

    /// Required fields are present and non-blank
    pub fn is_valid(&self) -> bool {
        self.user_id > 0 && !self.username.trim().is_empty() && !self.email.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::user_identity::{IdentifierPair, NumericId};
    use uuid::Uuid;

    fn account() -> Account {
        let now = Utc::now();
        Account {
            identifiers: IdentifierPair::from_parts(
                Uuid::parse_str("123e4567-e89b-42d3-a456-426614174000").unwrap(),
                NumericId::new(380_344_639_525_538).unwrap(),
            ),
            username: "lifter".to_string(),
            email: "lifter@example.com".to_string(),
            goal_type: Some("LOSE_WEIGHT".to_string()),
            initial_avatar_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_event_from_account() {
        let account = account();
        let event = UserRegisteredEvent::from_account(&account);

        assert!(event.is_valid());
        assert_eq!(event.key(), "user-380344639525538");
        assert_eq!(event.registration_date, account.created_at);
        assert_eq!(event.event_type, USER_REGISTERED);
    }

    #[test]
    fn test_blank_username_is_invalid() {
        let mut event = UserRegisteredEvent::from_account(&account());
        event.username = "  ".to_string();
        assert!(!event.is_valid());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let event = UserRegisteredEvent::from_account(&account());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventType"], "USER_REGISTERED");
        assert_eq!(json["userId"], 380_344_639_525_538u64);
        assert_eq!(json["goalType"], "LOSE_WEIGHT");
        assert!(json.get("registrationDate").is_some());
    }
}
