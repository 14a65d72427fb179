//! Classification of opaque identifier strings
//!
//! A caller may hold either half of an account's identifier pair as text.
//! [`parse_identifier`] decides which half it is without touching storage:
//! anything that parses as a plain integer is a numeric id, anything else
//! must be a canonical UUID.

use uuid::Uuid;

use crate::error::IdentityError;
use crate::user_identity::derive::parse_canonical_uuid;
use crate::user_identity::NumericId;

/// What an identifier string turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedIdentifier {
    /// An integer inside the numeric id range
    Numeric(NumericId),
    /// An integer that no account can own (zero, negative or above the ceiling)
    UnassignableNumber(i64),
    /// A canonical UUID
    Uuid(Uuid),
}

impl ParsedIdentifier {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_) | Self::UnassignableNumber(_))
    }
}

/// Classify `identifier`
///
/// Integer parsing takes precedence, so an all-digit string is never tried
/// as a UUID. Surrounding whitespace is not trimmed.
///
/// # Errors
/// [`IdentityError::InvalidFormat`] when the text is neither an integer nor a
/// canonical UUID.
pub fn parse_identifier(identifier: &str) -> Result<ParsedIdentifier, IdentityError> {
    if let Ok(number) = identifier.parse::<i64>() {
        return Ok(match NumericId::try_from(number) {
            Ok(id) => ParsedIdentifier::Numeric(id),
            Err(_) => ParsedIdentifier::UnassignableNumber(number),
        });
    }

    parse_canonical_uuid(identifier).map(ParsedIdentifier::Uuid)
}
