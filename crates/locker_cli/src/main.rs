//! Locker sync agent CLI
//!
//! Records package drop-offs on the locker and delivers them to the central
//! server.
//!
//! # Commands
//!
//! - `run` - Sync on a fixed interval until SIGINT/SIGTERM
//! - `sync-once` - Run a single sync pass
//! - `retry-failed` - Reset and re-send records that stopped retrying
//! - `drop-off` - Record a package drop-off
//! - `init-db` - Create (or back up and recreate) the database
//! - `status` - Show record counts and records needing attention

mod commands;
mod settings;

use clap::{Parser, Subcommand};
use settings::Settings;
use tracing_subscriber::EnvFilter;

/// Locker sync agent.
#[derive(Parser)]
#[command(name = "locker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync pending records until interrupted
    Run,

    /// Run one sync pass and print a summary
    SyncOnce,

    /// Reset failed or exhausted records and send them now
    RetryFailed,

    /// Record a package drop-off
    DropOff {
        /// Tracking id (a UUID is generated when omitted)
        tracking_id: Option<String>,
    },

    /// Initialize the database
    InitDb {
        /// Back up the existing database to <db>.bak and start empty
        #[arg(long)]
        reset: bool,
    },

    /// Show record counts and records needing attention
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// List every record instead of only those needing attention
        #[arg(short, long)]
        all: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run => commands::run::run(&cli.settings)?,
        Commands::SyncOnce => commands::sync_once::run(&cli.settings)?,
        Commands::RetryFailed => commands::retry::run(&cli.settings)?,
        Commands::DropOff { tracking_id } => {
            commands::drop_off::run(&cli.settings, tracking_id)?;
        }
        Commands::InitDb { reset } => commands::init_db::run(&cli.settings.db, reset)?,
        Commands::Status { format, all } => {
            commands::status::run(&cli.settings, &format, all)?;
        }
    }

    Ok(())
}
