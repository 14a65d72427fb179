//! # Configuration Abstractions
//!
//! Layered configuration loading and the configuration types shared by
//! all Muscledia services.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;
