//! Curator CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "curator")]
#[command(version)]
#[command(about = "Schema-driven metadata submission linker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link a batch of metadata documents and assign accessions
    Link {
        /// Path configuration file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Input documents
        inputs: Vec<PathBuf>,

        /// Write reassembled set documents into DIR
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Identify the objects and references in a single document
    Inspect {
        /// Path configuration file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Input document
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Link {
            config,
            inputs,
            out_dir,
        } => commands::link::execute(&config, &inputs, out_dir.as_deref()),
        Commands::Inspect { config, input } => commands::inspect::execute(&config, &input),
    }
}
