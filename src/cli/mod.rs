//! CLI module for Triad
//!
//! Provides command-line interface parsing for the `triad` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::types::SearchMode;
use crate::utils::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Triad - planner, researchers and writer turning a topic into a cited report
#[derive(Parser, Debug)]
#[command(
    name = "triad",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Triad - multi-agent research pipeline",
    long_about = "Triad - multi-agent research pipeline.\n\n\
                  A planner breaks the topic into assignments, researcher agents search and\n\
                  synthesize each one in parallel, and a writer produces a cited Markdown report.",
    after_help = "EXAMPLES:\n    \
                  triad init                                  # Write a default triad.toml\n    \
                  triad run --topic \"Solar microgrids\"        # Research a topic\n    \
                  triad run --search local --output report.md # Use local documents, save to file\n    \
                  triad models                                # List known model identifiers"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and print the report
    Run {
        /// Research topic (overrides research.topic)
        #[arg(short, long)]
        topic: Option<String>,

        /// Search mode: remote or local (overrides research.search_mode)
        #[arg(short, long)]
        search: Option<SearchMode>,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Write a default triad.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// List known model identifiers per provider
    Models,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
