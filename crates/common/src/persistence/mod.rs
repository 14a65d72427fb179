//! # Persistence Abstractions
//!
//! Pool establishment and driver error translation shared by every store.

pub mod connection;

pub use connection::*;
