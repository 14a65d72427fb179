//! Journal initialization

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize tracing from a [`LoggingConfig`]
///
/// `RUST_LOG` wins over the configured level. When `journald` is enabled and
/// the socket is reachable, events are forwarded to systemd-journald as well.
pub fn init_journal_with(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let journal_layer = if config.journald {
        tracing_journald::layer().ok()
    } else {
        None
    };
    let has_journal = journal_layer.is_some();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(journal_layer);

    if config.format == "json" {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()?;
    }

    if has_journal {
        info!("Journal initialized with systemd journald");
    } else {
        info!("Journal initialized with console logging");
    }

    Ok(())
}
