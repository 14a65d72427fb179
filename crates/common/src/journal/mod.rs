//! Simple journal system using tracing + journald
//!
//! Lightweight structured logging that forwards to systemd's journal when
//! configured and reachable, and falls back to console output otherwise.

pub mod init;
pub mod logging;

pub use init::init_journal_with;
pub use logging::*;
