//! xmlls CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "xmlls")]
#[command(version)]
#[command(about = "Inspect XML and DTD files with the XML language service", long_about = None)]
struct Cli {
    /// JSON file with `xml` settings, e.g. `{"symbols": {"enabled": false}}`
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the scanner tokens of a file as JSON
    Tokens {
        /// Input file
        file: PathBuf,
    },

    /// Print the document outline as JSON
    Symbols {
        /// Input file
        file: PathBuf,

        /// Flat symbol informations instead of a tree
        #[arg(long)]
        flat: bool,
    },

    /// Print the folding ranges as JSON
    Folding {
        /// Input file
        file: PathBuf,
    },

    /// Report syntax and grammar diagnostics
    Check {
        /// Input file
        file: PathBuf,

        /// Print the diagnostics as JSON instead of source snippets
        #[arg(long)]
        json: bool,
    },

    /// Print the hover at a position as JSON
    Hover {
        /// Input file
        file: PathBuf,

        /// Zero-based line
        #[arg(long)]
        line: u32,

        /// Zero-based UTF-16 character offset in the line
        #[arg(long)]
        character: u32,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so they never mix with the JSON on stdout.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings.as_deref();

    match cli.command {
        Commands::Tokens { file } => commands::tokens::execute(&file),
        Commands::Symbols { file, flat } => commands::symbols::execute(&file, flat, settings),
        Commands::Folding { file } => commands::folding::execute(&file, settings),
        Commands::Check { file, json } => commands::check::execute(&file, json, settings),
        Commands::Hover {
            file,
            line,
            character,
        } => commands::hover::execute(&file, line, character, settings),
    }
}
