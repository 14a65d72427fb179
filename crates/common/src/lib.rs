//! # Muscledia Common
//!
//! Shared building blocks for Muscledia services.
//!
//! ## Key Features
//! - User identity: UUID + numeric id allocation and resolution
//! - Error taxonomy with the `UserServiceError` marker trait
//! - Layered configuration loading (files + environment)
//! - Structured logging through tracing, with optional journald output
//! - SQLite pool establishment and driver error translation
//!
//! Collaborators such as the identity lookup are passed in explicitly;
//! nothing in this crate holds global state.

pub mod config;
pub mod error;
pub mod journal;
pub mod persistence;
pub mod user_identity;

pub use config::*;
pub use error::*;
pub use user_identity::{IdentifierAllocator, IdentifierPair, IdentifierResolver, NumericId};

/// Version of the common crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(VERSION.chars().any(|c| c.is_ascii_digit()));
    }
}
