//! Configuration sections every Muscledia service carries, plus the
//! [`ConfigValidation`] trait used to check a loaded configuration before
//! the service starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigurationError, UserServiceError};

/// Connection pool settings for the account database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:users.db?mode=rwc`
    pub url: String,

    pub max_connections: u32,
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub connect_timeout_secs: u64,

    /// Seconds before an idle connection is closed; `None` keeps it open
    pub idle_timeout_secs: Option<u64>,

    /// Create the schema on startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: Some(600),
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    /// True for `sqlite::memory:` style URLs where every connection sees its own database
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,

    /// "pretty" or "json"
    pub format: String,

    /// Also forward events to systemd-journald when it is reachable
    pub journald: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            journald: false,
        }
    }
}

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Checks a loaded configuration section
pub trait ConfigValidation {
    type Error: UserServiceError;

    /// Reject values the service cannot run with
    fn validate(&self) -> Result<(), Self::Error>;

    /// Accepted but questionable settings, logged at startup
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

fn invalid(key: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl ConfigValidation for DatabaseConfig {
    type Error = ConfigurationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.url.trim().is_empty() {
            return Err(invalid("database.url", &self.url, "must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(invalid("database.max_connections", 0, "must be at least 1"));
        }
        if self.min_connections > self.max_connections {
            return Err(invalid(
                "database.min_connections",
                self.min_connections,
                "must not exceed database.max_connections",
            ));
        }
        Ok(())
    }

    fn warnings(&self) -> Vec<String> {
        if self.is_in_memory() && self.max_connections > 1 {
            vec![format!(
                "In-memory database with {} pooled connections: each connection sees a separate database",
                self.max_connections
            )]
        } else {
            Vec::new()
        }
    }
}

impl ConfigValidation for LoggingConfig {
    type Error = ConfigurationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if LOG_FORMATS.contains(&self.format.as_str()) {
            Ok(())
        } else {
            Err(invalid(
                "logging.format",
                &self.format,
                "expected 'pretty' or 'json'",
            ))
        }
    }
}
