//! Mist CLI
//!
//! Command-line tools for Mist data files and deployments.
//!
//! # Commands
//!
//! - `parse-contacts` - Normalize a Google Contacts CSV export
//! - `convert-notes` - Convert a note archive between JSON and XML
//! - `token` - Issue an API token for a user
//! - `check-config` - Validate a server configuration file

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use mist_core::Representation;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mist command-line tools.
#[derive(Parser)]
#[command(name = "mist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output representation.
#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// JSON array
    Json,
    /// XML document
    Xml,
}

impl From<Format> for Representation {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => Representation::Json,
            Format::Xml => Representation::Xml,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a Google Contacts CSV export into Mist contacts and groups
    ParseContacts {
        /// CSV file exported from Google Contacts
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },

    /// Convert a note archive between JSON and XML
    ConvertNotes {
        /// Note archive (.json or .xml)
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "xml")]
        to: Format,
    },

    /// Issue an API token for a user id
    Token {
        /// Server configuration file
        #[arg(short, long, default_value = mist_server::DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// User id (24 hex characters)
        user: String,
    },

    /// Validate a server configuration file
    CheckConfig {
        /// Configuration files to try, first existing wins
        #[arg(default_value = mist_server::DEFAULT_CONFIG_FILE)]
        candidates: Vec<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::ParseContacts { file, format } => {
            commands::parse_contacts::run(&file, format.into())?;
        }
        Commands::ConvertNotes { file, to } => {
            commands::convert_notes::run(&file, to.into())?;
        }
        Commands::Token { config, user } => {
            commands::token::run(&config, &user)?;
        }
        Commands::CheckConfig { candidates } => {
            commands::check_config::run(&candidates)?;
        }
        Commands::Version => {
            println!("Mist CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
