//! # User Service Configuration
//!
//! Layered on the common loader: compiled defaults, then a TOML file, then
//! `MUSCLEDIA_*` environment overrides.

use anyhow::Result;
use common::config::{loader, ConfigValidation, DatabaseConfig, LoggingConfig};
use common::error::ConfigurationError;
use common::user_identity::IdentityConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default topic for account lifecycle events
pub const DEFAULT_EVENTS_TOPIC: &str = "user-events";

/// Default in-process event buffer size
pub const DEFAULT_EVENTS_CHANNEL_CAPACITY: usize = 1024;

/// Database file used when no configuration overrides it
pub const DEFAULT_DATABASE_URL: &str = "sqlite:users.db?mode=rwc";

/// Main user service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserServiceConfig {
    #[serde(default = "default_database")]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database() -> DatabaseConfig {
    DatabaseConfig {
        url: DEFAULT_DATABASE_URL.to_string(),
        ..DatabaseConfig::default()
    }
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            identity: IdentityConfig::default(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// User event publication settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    /// Publish events at all; a no-op publisher is used otherwise
    pub enabled: bool,

    /// Topic stamped on every envelope
    pub topic: String,

    /// Buffered envelopes before publishing starts failing
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topic: DEFAULT_EVENTS_TOPIC.to_string(),
            channel_capacity: DEFAULT_EVENTS_CHANNEL_CAPACITY,
        }
    }
}

impl ConfigValidation for EventsConfig {
    type Error = ConfigurationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.topic.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                key: "events.topic".to_string(),
                value: self.topic.clone(),
                reason: "Event topic cannot be empty".to_string(),
            });
        }

        if self.channel_capacity == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "events.channel_capacity".to_string(),
                value: self.channel_capacity.to_string(),
                reason: "Channel capacity must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl ConfigValidation for UserServiceConfig {
    type Error = ConfigurationError;

    fn validate(&self) -> Result<(), Self::Error> {
        self.database.validate()?;
        self.identity.validate()?;
        self.events.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = self.database.warnings();
        warnings.extend(self.identity.warnings());

        if !self.events.enabled {
            warnings.push("Event publishing is disabled".to_string());
        }

        warnings
    }
}

impl UserServiceConfig {
    /// Load configuration using common loader
    pub fn load() -> Result<Self> {
        Ok(loader::load_config::<Self>()?)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Ok(loader::load_from_file::<Self>(path)?)
    }
}
