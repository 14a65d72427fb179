//! # Muscledia User Service
//!
//! Account registration on top of the common identity core. Each account
//! gets a UUID + numeric id pair from the allocator; the `users` table's
//! unique constraints decide any race between concurrent registrations.

pub mod accounts;
pub mod config;
pub mod events;

pub use accounts::{Account, AccountError, AccountService, AccountStore, NewAccount, SqliteAccountStore};
pub use config::UserServiceConfig;
