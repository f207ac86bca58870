//! depot - static media and attachment delivery server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use depot::commands::{self, serve::ServeArgs};
use depot::constants::DEFAULT_RECORD_LIMIT;

#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(version, about = "Serve attachments and seekable media with transfer auditing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Validate configuration and print the effective settings
    Check {
        /// Configuration file (default: ./depot.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print recent transfer records
    Records {
        /// Configuration file used to locate the audit database
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path of the redb audit database
        #[arg(long)]
        audit_db: Option<PathBuf>,

        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECORD_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args).await,
        Commands::Check { config } => commands::check::execute(config.as_deref()),
        Commands::Records {
            config,
            audit_db,
            limit,
        } => commands::records::execute(config.as_deref(), audit_db, limit).await,
    }
}
