//! UUID to numeric id derivation
//!
//! The primary strategy hashes the canonical UUID string with SHA-256 and
//! reads the first eight digest bytes as a signed big-endian integer. Its
//! magnitude is reduced modulo [`MAX_SAFE_INTEGER`] and lifted by
//! [`MIN_ID_FLOOR`] when it lands below the floor.
//!
//! The xor-fold strategy folds the two 64-bit halves of the UUID together
//! instead of hashing. It is kept as an explicitly selectable alternative
//! for deployments that must not depend on a digest implementation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::user_identity::constants::{is_valid_uuid, MAX_SAFE_INTEGER, MIN_ID_FLOOR};
use crate::user_identity::NumericId;

/// How a UUID is mapped to its candidate numeric id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DerivationStrategy {
    /// SHA-256 of the canonical string, first 8 bytes
    #[default]
    Sha256,
    /// XOR of the magnitudes of the UUID's high and low halves
    XorFold,
}

impl fmt::Display for DerivationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::XorFold => f.write_str("xor-fold"),
        }
    }
}

impl FromStr for DerivationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "xor-fold" => Ok(Self::XorFold),
            other => Err(format!(
                "unknown derivation strategy '{other}' (expected sha256 or xor-fold)"
            )),
        }
    }
}

/// Pure UUID to [`NumericId`] mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdDeriver {
    strategy: DerivationStrategy,
}

impl IdDeriver {
    pub fn new(strategy: DerivationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> DerivationStrategy {
        self.strategy
    }

    /// Candidate numeric id for `uuid`; total and deterministic
    pub fn derive(&self, uuid: &Uuid) -> NumericId {
        let raw = match self.strategy {
            DerivationStrategy::Sha256 => sha256_magnitude(uuid),
            DerivationStrategy::XorFold => xor_fold_magnitude(uuid),
        };
        apply_floor(raw % MAX_SAFE_INTEGER)
    }
}

/// Derive with the default (SHA-256) strategy
pub fn derive(uuid: &Uuid) -> NumericId {
    IdDeriver::default().derive(uuid)
}

/// Re-derive the candidate id for a UUID given as text
///
/// This recomputes; it never consults storage. An account's assigned id must
/// be looked up, because its stored uuid may not be the first one tried.
pub fn uuid_to_id(text: &str) -> Result<NumericId, IdentityError> {
    let uuid = parse_canonical_uuid(text)?;
    Ok(derive(&uuid))
}

/// Parse text that must be in canonical 8-4-4-4-12 form
pub(crate) fn parse_canonical_uuid(text: &str) -> Result<Uuid, IdentityError> {
    if !is_valid_uuid(text) {
        return Err(IdentityError::invalid_format(text));
    }
    Uuid::parse_str(text).map_err(|_| IdentityError::invalid_format(text))
}

fn sha256_magnitude(uuid: &Uuid) -> u64 {
    let digest = Sha256::digest(uuid.hyphenated().to_string().as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(head).unsigned_abs()
}

fn xor_fold_magnitude(uuid: &Uuid) -> u64 {
    let (high, low) = uuid.as_u64_pair();
    (high as i64).unsigned_abs() ^ (low as i64).unsigned_abs()
}

fn apply_floor(reduced: u64) -> NumericId {
    let value = if reduced < MIN_ID_FLOOR {
        reduced + MIN_ID_FLOOR
    } else {
        reduced
    };
    // reduced < MAX_SAFE_INTEGER, so value stays within 100_000..=MAX_SAFE_INTEGER.
    NumericId::from_derived(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTOR_UUID: &str = "123e4567-e89b-42d3-a456-426614174000";

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_fixed_vector_sha256() {
        // sha256("123e4567-...")[..8] = 32 01 59 eb e3 21 91 12
        assert_eq!(derive(&uuid(VECTOR_UUID)).get(), 380_344_639_525_538);
    }

    #[test]
    fn test_fixed_vector_xor_fold() {
        let deriver = IdDeriver::new(DerivationStrategy::XorFold);
        assert_eq!(deriver.derive(&uuid(VECTOR_UUID)).get(), 6_747_694_327_629_087);
    }

    #[test]
    fn test_floor_applies_to_small_values() {
        // Halves are equal, so they cancel to 0 and the floor lifts it.
        let deriver = IdDeriver::new(DerivationStrategy::XorFold);
        let nil = Uuid::nil();
        assert_eq!(deriver.derive(&nil).get(), MIN_ID_FLOOR);

        // High half 0xffffffffffff4fff (-45057), low half 0xbfff.. (-(2^62) - 1)
        let mixed = uuid("ffffffff-ffff-4fff-bfff-ffffffffffff");
        assert_eq!(deriver.derive(&mixed).get(), 145_568);

        assert_eq!(apply_floor(0).get(), 100_000);
        assert_eq!(apply_floor(99_999).get(), 199_999);
        assert_eq!(apply_floor(100_000).get(), 100_000);
    }

    #[test]
    fn test_sha256_of_nil_uuid() {
        assert_eq!(derive(&Uuid::nil()).get(), 7_097_883_329_191_209);
    }

    #[test]
    fn test_derivation_is_deterministic_and_bounded() {
        for strategy in [DerivationStrategy::Sha256, DerivationStrategy::XorFold] {
            let deriver = IdDeriver::new(strategy);
            for _ in 0..500 {
                let id = Uuid::new_v4();
                let first = deriver.derive(&id);
                assert_eq!(first, deriver.derive(&id));
                assert!(first.get() >= MIN_ID_FLOOR);
                assert!(first.get() <= MAX_SAFE_INTEGER);
            }
        }
    }

    #[test]
    fn test_uuid_to_id_validates_input() {
        assert_eq!(uuid_to_id(VECTOR_UUID).unwrap().get(), 380_344_639_525_538);
        assert_eq!(
            uuid_to_id(&VECTOR_UUID.to_uppercase()).unwrap().get(),
            380_344_639_525_538
        );

        let err = uuid_to_id("123e4567e89b42d3a456426614174000").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidFormat { .. }));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("sha256".parse(), Ok(DerivationStrategy::Sha256));
        assert_eq!("xor-fold".parse(), Ok(DerivationStrategy::XorFold));
        assert!("md5".parse::<DerivationStrategy>().is_err());
        assert_eq!(DerivationStrategy::XorFold.to_string(), "xor-fold");
    }
}
