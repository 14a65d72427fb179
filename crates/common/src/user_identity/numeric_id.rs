//! Numeric surrogate key for user accounts

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::user_identity::constants::MAX_SAFE_INTEGER;

/// Positive integer id bounded by [`MAX_SAFE_INTEGER`]
///
/// Stored as a signed 64-bit column by the persistence layer; the bound
/// guarantees the conversion is lossless in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct NumericId(u64);

/// Value outside `1..=MAX_SAFE_INTEGER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("numeric id {0} is outside 1..=9007199254740991")]
pub struct OutOfRange(pub i128);

impl NumericId {
    /// Wrap a value already known to lie in range
    pub fn new(value: u64) -> Result<Self, OutOfRange> {
        if value == 0 || value > MAX_SAFE_INTEGER {
            return Err(OutOfRange(value as i128));
        }
        Ok(Self(value))
    }

    /// Deriver output, which is in range by construction
    pub(crate) fn from_derived(value: u64) -> Self {
        debug_assert!(value > 0 && value <= MAX_SAFE_INTEGER);
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Column representation
    pub fn as_i64(self) -> i64 {
        // Bounded by 2^53 - 1, always fits.
        self.0 as i64
    }
}

impl TryFrom<u64> for NumericId {
    type Error = OutOfRange;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for NumericId {
    type Error = OutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map_err(|_| OutOfRange(value as i128))
            .and_then(Self::new)
    }
}

impl From<NumericId> for u64 {
    fn from(id: NumericId) -> Self {
        id.0
    }
}

impl fmt::Display for NumericId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
