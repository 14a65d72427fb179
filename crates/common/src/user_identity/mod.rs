//! User identity system with UUID + numeric id pairs
//!
//! Every account carries two identifiers:
//! - UUID: random v4 identifier, stable and globally unique
//! - Numeric id: positive integer derived from the UUID, safe for clients
//!   that treat every number as a double
//!
//! The [`IdentifierAllocator`] generates candidates until neither half is
//! present in the backing table; the [`IdentifierResolver`] reads one half
//! back from the other.
//!
//! # Example
//! ```
//! use common::user_identity::{derive, is_valid_uuid};
//! use uuid::Uuid;
//!
//! let text = "123e4567-e89b-42d3-a456-426614174000";
//! assert!(is_valid_uuid(text));
//!
//! let uuid = Uuid::parse_str(text).unwrap();
//! assert_eq!(derive(&uuid).get(), 380_344_639_525_538);
//! ```

pub mod allocator;
pub mod constants;
pub mod derive;
pub mod interfaces;
pub mod memory_store;
pub mod numeric_id;
pub mod pair;
pub mod resolver;
pub mod retry;
pub mod validation;

pub use allocator::{IdentifierAllocator, IdentityConfig};
pub use constants::*;
pub use derive::{derive, uuid_to_id, DerivationStrategy, IdDeriver};
pub use interfaces::*;
pub use memory_store::MemoryIdentityStore;
pub use numeric_id::{NumericId, OutOfRange};
pub use pair::IdentifierPair;
pub use resolver::IdentifierResolver;
pub use retry::{with_budget, with_retry, AttemptError, RetryBudget, RetryError};
pub use validation::{parse_identifier, ParsedIdentifier};
