//! # Muscledia User Service
//!
//! Command-line front end for account registration and identifier tools.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use common::config::ConfigValidation;
use common::journal::init_journal_with;
use common::user_identity::{is_valid_uuid, DerivationStrategy, IdDeriver};
use user_service::accounts::{AccountService, AccountUpdate, NewAccount, SqliteAccountStore};
use user_service::config::UserServiceConfig;
use user_service::events::{publisher_from_config, EventEnvelope};

#[derive(Parser, Debug)]
#[command(author, version, about = "Muscledia user service - account registration and identifier tools", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "MUSCLEDIA_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the candidate numeric id for a UUID
    Derive {
        uuid: String,

        #[arg(long, default_value_t = DerivationStrategy::Sha256)]
        strategy: DerivationStrategy,
    },
    /// Check whether text is a canonical UUID
    ValidateUuid { text: String },
    /// Allocate identifier pairs not present in the users table
    Allocate {
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Resolve a numeric id or UUID to its account
    Resolve { identifier: String },
    /// Register a new account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        goal_type: Option<String>,

        #[arg(long)]
        avatar_type: Option<String>,
    },
    /// Change profile fields of an account found by numeric id or UUID
    Update {
        identifier: String,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Empty string clears the stored value
        #[arg(long)]
        goal_type: Option<String>,

        /// Empty string clears the stored value
        #[arg(long)]
        avatar_type: Option<String>,
    },
    /// List all accounts, oldest first
    List,
    /// Show user statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Pure commands need neither configuration nor a database.
    match &args.command {
        Commands::Derive { uuid, strategy } => return derive(uuid, *strategy),
        Commands::ValidateUuid { text } => {
            println!("{}", is_valid_uuid(text));
            return Ok(());
        }
        _ => {}
    }

    let config = match &args.config {
        Some(path) => UserServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => UserServiceConfig::load().context("Failed to load configuration")?,
    };

    init_journal_with(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    config.validate().context("Invalid configuration")?;
    for warning in config.warnings() {
        warn!("Configuration warning: {}", warning);
    }

    let store = Arc::new(
        SqliteAccountStore::new(&config.database)
            .await
            .context("Failed to open account store")?,
    );
    let (publisher, receiver) = publisher_from_config(&config.events);
    let forwarder = receiver.map(|receiver| tokio::spawn(forward_events(receiver)));
    let service = AccountService::new(store, &config.identity, publisher);

    match args.command {
        Commands::Allocate { count } => {
            for _ in 0..count {
                let pair = service.allocator().allocate().await?;
                println!("{}", serde_json::to_string(&pair)?);
            }
        }
        Commands::Resolve { identifier } => {
            let account = service.find_by_identifier(&identifier).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Commands::Register {
            username,
            email,
            goal_type,
            avatar_type,
        } => {
            let request = NewAccount {
                username,
                email,
                goal_type,
                initial_avatar_type: avatar_type,
            };
            let account = service.register(request).await?;
            info!("Registered {}", account.identifiers);
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Commands::Update {
            identifier,
            username,
            email,
            goal_type,
            avatar_type,
        } => {
            let current = service.find_by_identifier(&identifier).await?;
            let update = AccountUpdate {
                username,
                email,
                goal_type,
                initial_avatar_type: avatar_type,
            };
            let account = service.update(current.user_id(), update).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Commands::List => {
            let accounts = service.list().await?;
            println!("{}", serde_json::to_string_pretty(&accounts)?);
        }
        Commands::Stats => {
            let stats = service.statistics().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Derive { .. } | Commands::ValidateUuid { .. } => {}
    }

    // Dropping the service closes the channel so the forwarder can finish.
    drop(service);
    if let Some(forwarder) = forwarder {
        forwarder.await.context("Event forwarder panicked")?;
    }

    Ok(())
}

fn derive(uuid: &str, strategy: DerivationStrategy) -> Result<()> {
    let parsed = uuid::Uuid::parse_str(uuid)
        .ok()
        .filter(|_| is_valid_uuid(uuid))
        .with_context(|| format!("Not a canonical UUID: {uuid}"))?;
    println!("{}", IdDeriver::new(strategy).derive(&parsed));
    Ok(())
}

/// Drain queued envelopes to the log until the publisher goes away
async fn forward_events(mut receiver: tokio::sync::mpsc::Receiver<EventEnvelope>) {
    while let Some(envelope) = receiver.recv().await {
        info!(
            topic = %envelope.topic,
            key = %envelope.key,
            payload = %envelope.payload,
            "User event emitted"
        );
    }
}
