//! apiforge CLI
//!
//! Command-line tools for apiforge publication workflows.
//!
//! # Commands
//!
//! - `analyze` - Derive endpoints and alignment reports from a resource file
//! - `publish` - Run the draft/review/publish workflow against a registry snapshot
//! - `status` - Show registry records and their legal next actions
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// apiforge command-line publication tools.
#[derive(Parser)]
#[command(name = "apiforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive endpoints and alignment reports from a resource file
    Analyze {
        /// Path to the resource-definition file
        #[arg(short, long)]
        file: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Run the draft/review/publish workflow for a resource file
    Publish {
        /// Path to the resource-definition file
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the registry snapshot (created if missing)
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show registry records and their legal next actions
    Status {
        /// Path to the registry snapshot
        #[arg(short, long)]
        registry: PathBuf,

        /// Only show the record for this resource set
        #[arg(short, long)]
        set: Option<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
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
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Analyze { file, format } => {
            commands::analyze::run(&file, &format)?;
        }
        Commands::Publish {
            file,
            registry,
            format,
        } => {
            commands::publish::run(&file, registry.as_deref(), &format)?;
        }
        Commands::Status {
            registry,
            set,
            format,
        } => {
            commands::status::run(&registry, set.as_deref(), &format)?;
        }
        Commands::Version => {
            println!("apiforge CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("apiforge workflow v{}", apiforge_workflow::VERSION);
        }
    }

    Ok(())
}
