//! The bound (uuid, numeric id) pair assigned to an account

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::user_identity::NumericId;

/// Immutable UUID + numeric id pair
///
/// Produced once by the allocator at account creation, persisted as two
/// columns, and never regenerated afterwards. Reads from storage rebuild it
/// with [`IdentifierPair::from_parts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierPair {
    uuid: Uuid,
    numeric_id: NumericId,
}

impl IdentifierPair {
    /// Rebuild a pair from stored columns
    pub fn from_parts(uuid: Uuid, numeric_id: NumericId) -> Self {
        Self { uuid, numeric_id }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    /// Canonical 36-character lowercase hyphenated form
    pub fn uuid_string(&self) -> String {
        self.uuid.hyphenated().to_string()
    }

    pub fn numeric_id(&self) -> NumericId {
        self.numeric_id
    }
}

impl fmt::Display for IdentifierPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.numeric_id, self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_and_display() {
        let uuid = Uuid::parse_str("123e4567-e89b-42d3-a456-426614174000").unwrap();
        let pair = IdentifierPair::from_parts(uuid, NumericId::new(380_344_639_525_538).unwrap());

        assert_eq!(pair.uuid(), &uuid);
        assert_eq!(pair.uuid_string().len(), 36);
        assert_eq!(
            pair.to_string(),
            "380344639525538 (123e4567-e89b-42d3-a456-426614174000)"
        );
    }

    #[test]
    fn test_json_shape() {
        let uuid = Uuid::parse_str("123e4567-e89b-42d3-a456-426614174000").unwrap();
        let pair = IdentifierPair::from_parts(uuid, NumericId::new(123_456).unwrap());

        let value = serde_json::to_value(pair).unwrap();
        assert_eq!(value["uuid"], "123e4567-e89b-42d3-a456-426614174000");
        assert_eq!(value["numericId"], 123_456);
    }
}
