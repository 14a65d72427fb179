//! # Configuration Loader
//!
//! Layers, lowest priority first:
//! 1. Compiled defaults (`T::default()`)
//! 2. One TOML file
//! 3. `MUSCLEDIA_*` environment variables
//!
//! Nested keys are separated by a double underscore, so
//! `MUSCLEDIA_IDENTITY__MAX_ATTEMPTS=20` sets `identity.max_attempts`.
//!
//! The file is the first that exists of: an explicit path,
//! `$MUSCLEDIA_CONFIG_PATH`, `./config.toml`, `/etc/muscledia/config.toml`,
//! `~/.config/muscledia/config.toml`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ConfigurationError;

/// Environment variable prefix for Muscledia services
pub const DEFAULT_ENV_PREFIX: &str = "MUSCLEDIA";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "MUSCLEDIA_CONFIG_PATH";

const LOCAL_CONFIG_FILE: &str = "config.toml";

const SYSTEM_CONFIG_FILES: [&str; 2] = [
    "/etc/muscledia/config.toml",
    "~/.config/muscledia/config.toml",
];

/// How [`load_config_with_options`] locates and layers sources
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Skip the search and read this file
    pub config_path: Option<PathBuf>,
    /// Prefix of overriding environment variables, without the trailing `_`
    pub env_prefix: String,
    /// Fail instead of falling back to defaults when the file is missing
    pub require_file: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            require_file: false,
        }
    }
}

impl LoadOptions {
    /// Options that read exactly `path`, which must exist
    pub fn from_file(path: &Path) -> Self {
        Self {
            config_path: Some(path.to_path_buf()),
            require_file: true,
            ..Self::default()
        }
    }
}

/// Load `T` from the default search path and environment
pub fn load_config<T>() -> Result<T, ConfigurationError>
where
    T: Default + Serialize + DeserializeOwned,
{
    load_config_with_options(LoadOptions::default())
}

/// Load `T` from `path` plus environment overrides
pub fn load_from_file<T>(path: &Path) -> Result<T, ConfigurationError>
where
    T: Default + Serialize + DeserializeOwned,
{
    load_config_with_options(LoadOptions::from_file(path))
}

/// Load `T` with explicit options
pub fn load_config_with_options<T>(options: LoadOptions) -> Result<T, ConfigurationError>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    match resolve_config_file(options.config_path)? {
        Some(path) if path.exists() => {
            validate_config_file(&path)?;
            info!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(&path));
        }
        Some(path) if options.require_file => {
            return Err(ConfigurationError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Some(path) => warn!("Configuration file {} not found, using defaults", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }

    figment = figment.merge(
        Env::prefixed(&format!("{}_", options.env_prefix))
            .split("__")
            .ignore(&["CONFIG_PATH"]),
    );

    figment
        .extract()
        .map_err(|err| ConfigurationError::ParseError {
            details: err.to_string(),
        })
}

/// Pick the file to read; `None` when no candidate exists
fn resolve_config_file(explicit: Option<PathBuf>) -> Result<Option<PathBuf>, ConfigurationError> {
    if explicit.is_some() {
        return Ok(explicit);
    }

    if let Ok(from_env) = std::env::var(CONFIG_PATH_ENV) {
        debug!("Using {} = {}", CONFIG_PATH_ENV, from_env);
        return Ok(Some(PathBuf::from(from_env)));
    }

    let cwd = std::env::current_dir().map_err(|e| ConfigurationError::EnvironmentError {
        var: "current_dir".to_string(),
        details: e.to_string(),
    })?;
    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    for candidate in SYSTEM_CONFIG_FILES {
        let path = expand_home(candidate)?;
        if path.exists() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Replace a leading `~` with `$HOME`
fn expand_home(path: &str) -> Result<PathBuf, ConfigurationError> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };

    let home = std::env::var("HOME").map_err(|_| ConfigurationError::EnvironmentError {
        var: "HOME".to_string(),
        details: "HOME environment variable not set".to_string(),
    })?;
    Ok(PathBuf::from(format!("{home}{rest}")))
}

/// Check that `path` exists and is a TOML file
pub fn validate_config_file(path: &Path) -> Result<(), ConfigurationError> {
    if !path.exists() {
        return Err(ConfigurationError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    if extension.eq_ignore_ascii_case("toml") {
        Ok(())
    } else {
        Err(ConfigurationError::ParseError {
            details: format!("Unsupported configuration file format '{extension}' (expected toml)"),
        })
    }
}
