//! User accounts: records, storage, registration and profile updates

pub mod model;
pub mod repository;
pub mod service;

pub use model::{
    Account, AccountUpdate, NewAccount, UserStatistics, MAX_EMAIL_LENGTH, MAX_USERNAME_LENGTH,
};
pub use repository::{AccountStore, SqliteAccountStore};
pub use service::{AccountError, AccountService};
