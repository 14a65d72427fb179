//! Constants for the user identifier system
//!
//! Bounds, attempt limits and validation patterns used by derivation,
//! allocation and resolution.

use once_cell::sync::Lazy;
use regex::Regex;

/// Largest integer a double-precision float represents exactly (2^53 - 1)
///
/// Numeric ids are reduced into this range so they survive JSON clients
/// that parse every number as a float.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Derived values below this floor get the floor added to them, so that
/// every numeric id has at least six digits.
pub const MIN_ID_FLOOR: u64 = 100_000;

/// Smallest numeric id the deriver can produce
pub const MIN_NUMERIC_ID: u64 = MIN_ID_FLOOR;

/// Default number of candidates tried before allocation gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Upper bound accepted for a configured attempt budget
pub const MAX_CONFIGURABLE_ATTEMPTS: u32 = 100;

/// Length of the canonical hyphenated UUID form
pub const UUID_STRING_LENGTH: usize = 36;

/// Canonical textual UUID: 32 hex digits grouped 8-4-4-4-12
pub static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("Invalid UUID regex pattern")
});

/// Returns `true` iff `text` is a UUID in canonical hyphenated form
///
/// Braced, URN and un-hyphenated spellings are rejected even though the
/// `uuid` crate would parse them.
pub fn is_valid_uuid(text: &str) -> bool {
    UUID_PATTERN.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_canonical_uuids() {
        assert!(is_valid_uuid("123e4567-e89b-42d3-a456-426614174000"));
        assert!(is_valid_uuid("00000000-0000-0000-0000-000000000000"));
        assert!(is_valid_uuid("ABCDEF01-2345-6789-ABCD-EF0123456789"));
        assert!(is_valid_uuid(&uuid::Uuid::new_v4().to_string()));
    }

    #[test]
    fn test_rejects_malformed_uuids() {
        // Missing hyphens
        assert!(!is_valid_uuid("123e4567e89b42d3a456426614174000"));
        // Wrong group lengths
        assert!(!is_valid_uuid("123e4567-e89b-42d3-a456-42661417400"));
        assert!(!is_valid_uuid("123e456-7e89b-42d3-a456-426614174000"));
        // Non-hex characters
        assert!(!is_valid_uuid("123e4567-e89b-42d3-a456-42661417400g"));
        // Decorated spellings
        assert!(!is_valid_uuid("{123e4567-e89b-42d3-a456-426614174000}"));
        assert!(!is_valid_uuid(
            "urn:uuid:123e4567-e89b-42d3-a456-426614174000"
        ));
        // Surrounding whitespace
        assert!(!is_valid_uuid(" 123e4567-e89b-42d3-a456-426614174000"));
        assert!(!is_valid_uuid(""));
        assert!(!is_valid_uuid("not-a-uuid-or-number"));
    }

    #[test]
    fn test_bounds_are_consistent() {
        assert_eq!(MAX_SAFE_INTEGER, (1u64 << 53) - 1);
        assert!(MIN_NUMERIC_ID < MAX_SAFE_INTEGER);
        assert!(DEFAULT_MAX_ATTEMPTS <= MAX_CONFIGURABLE_ATTEMPTS);
    }
}
