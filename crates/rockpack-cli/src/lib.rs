//! rockpack - rockspec inspection and linting.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "rockpack")]
#[command(author, version, about = "rockpack - rockspec inspection and linting")]
pub struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize a rockspec and print the result
    Show {
        /// Path to the rockspec file
        file: PathBuf,
        /// Skip schema validation and install-path computation
        #[arg(long)]
        quick: bool,
        /// Print the normalized rockspec as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a rockspec for problems without printing it
    Lint {
        /// Paths to rockspec files
        files: Vec<PathBuf>,
    },
}
