//! GitOnto CLI - Git activity knowledge graphs
//!
//! A command-line interface for populating a typed knowledge graph from
//! exported git activity records, deriving classification tags and running
//! canned traversal queries over the result.
//!
//! # Usage
//!
//! ```bash
//! # Populate the graph and write a JSON snapshot
//! gitonto populate --data ./data --output graph.json
//!
//! # List merge commits
//! gitonto query merges
//!
//! # Check ontology constraints
//! gitonto validate
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gitonto_config::{ConcurrencyRule, LogFormat};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// GitOnto - Git activity as a typed knowledge graph
#[derive(Parser, Debug)]
#[command(name = "gitonto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Directory containing the dataset batch files
    #[arg(long, short = 'd', global = true, env = "GITONTO_DATA")]
    data: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "GITONTO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Security keywords (comma separated), replacing the configured list
    #[arg(long, global = true, value_delimiter = ',')]
    security_keywords: Option<Vec<String>>,

    /// Concurrency rule (pairwise, simultaneous)
    #[arg(long, global = true, value_parser = parse_concurrency_rule)]
    concurrency_rule: Option<ConcurrencyRule>,
}

/// Parse concurrency rule from string
fn parse_concurrency_rule(s: &str) -> Result<ConcurrencyRule, String> {
    s.parse()
        .map_err(|e: gitonto_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> gitonto_config::ConfigOverrides {
        gitonto_config::ConfigOverrides {
            data_dir: self.data.clone(),
            security_keywords: self.security_keywords.clone(),
            concurrency_rule: self.concurrency_rule,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Populate the graph and write a JSON snapshot
    Populate(commands::populate::PopulateArgs),

    /// Run a canned traversal query
    Query(commands::query::QueryArgs),

    /// Check the populated graph against ontology constraints
    Validate(commands::validate::ValidateArgs),

    /// Show node and edge counts
    Stats(commands::stats::StatsArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn init_tracing(global: &GlobalOptions) -> Result<()> {
    // A broken config file is reported by the command itself
    let logging = commands::load_config(global)
        .map(|c| c.logging)
        .unwrap_or_default();

    let log_level = if global.quiet {
        Level::ERROR
    } else if global.verbose {
        Level::DEBUG
    } else {
        logging.level.parse().unwrap_or(Level::INFO)
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())
        }
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.context("Failed to install tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.global)?;

    match cli.command {
        Commands::Populate(args) => commands::populate::execute(args, cli.global),
        Commands::Query(args) => commands::query::execute(args, cli.global),
        Commands::Validate(args) => commands::validate::execute(args, cli.global),
        Commands::Stats(args) => commands::stats::execute(args, cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global),
    }
}
