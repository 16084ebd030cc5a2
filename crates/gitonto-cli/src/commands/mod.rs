//! CLI command implementations
//!
//! This module contains all GitOnto CLI command implementations.

pub mod config;
pub mod populate;
pub mod query;
pub mod stats;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use gitonto_config::{ConcurrencyRule, ConfigLoader, GitOntoConfig};
use gitonto_core::builder::BuilderConfig;
use gitonto_core::{
    ClassifierConfig, ConcurrencyConfig, DataFiles, Dataset, OverlapRule, Pipeline,
    PipelineConfig, PopulatedGraph, ResolverConfig,
};
use serde::Serialize;

use crate::progress::{finish_spinner, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// The workspace is the current directory; relative config paths resolve against it.
pub fn resolve_workspace() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to get current directory")
}

/// Load configuration with CLI overrides applied.
///
/// An explicit `--config` file replaces the global/local lookup.
pub fn load_config(global: &GlobalOptions) -> Result<GitOntoConfig> {
    let overrides = global.to_config_overrides();

    if let Some(ref config_path) = global.config {
        return ConfigLoader::new()
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    let workspace = resolve_workspace()?;
    ConfigLoader::new()
        .load(&workspace, Some(&overrides))
        .context("Failed to load configuration")
}

/// Batch file names from the `[data]` section.
pub fn data_files(config: &GitOntoConfig) -> DataFiles {
    DataFiles {
        repositories: config.data.repositories.clone(),
        users: config.data.users.clone(),
        branches: config.data.branches.clone(),
        commits: config.data.commits.clone(),
        files: config.data.files.clone(),
        issues: config.data.issues.clone(),
        pull_requests: config.data.pull_requests.clone(),
    }
}

/// Translate file configuration into the core pipeline settings.
pub fn pipeline_config(config: &GitOntoConfig) -> PipelineConfig {
    let rule = match config.concurrency.rule {
        ConcurrencyRule::Pairwise => OverlapRule::PairwiseCount {
            min_pairs: config.concurrency.min_overlapping_pairs,
        },
        ConcurrencyRule::Simultaneous => OverlapRule::Simultaneous,
    };

    PipelineConfig {
        builder: BuilderConfig {
            resolver: ResolverConfig {
                default_branch_names: config.resolver.default_branch_names.clone(),
                head_fallback: config.resolver.head_fallback,
            },
        },
        classifier: ClassifierConfig {
            security_keywords: config.classification.security_keywords.clone(),
        },
        concurrency: ConcurrencyConfig {
            min_repositories: config.concurrency.min_repositories,
            rule,
        },
    }
}

/// Load the dataset named by the configuration.
pub fn load_dataset(config: &GitOntoConfig) -> Result<Dataset> {
    let workspace = resolve_workspace()?;
    let dir = config.data_dir(&workspace);
    Dataset::load_dir(&dir, &data_files(config))
        .with_context(|| format!("Failed to load dataset from {}", dir.display()))
}

/// Load configuration and dataset, then run the full pipeline in memory.
pub fn populate_graph(global: &GlobalOptions) -> Result<(GitOntoConfig, PopulatedGraph)> {
    let config = load_config(global)?;
    let dataset = load_dataset(&config)?;

    let pb = spinner("Populating graph...", global.quiet);
    let graph = Pipeline::new(pipeline_config(&config)).run(&dataset);

    let message = format!(
        "Populated {} nodes and {} edges",
        graph.registry.node_count(),
        graph.registry.edge_count()
    );
    if dataset.malformed.values().sum::<usize>() > 0 {
        finish_spinner_warn(pb, &format!("{} (malformed records skipped)", message));
    } else {
        finish_spinner(pb, &message);
    }

    Ok((config, graph))
}

/// Print rows as pretty JSON or one rendered line per row.
pub fn print_rows<T: Serialize>(
    rows: &[T],
    json: bool,
    render: impl Fn(&T) -> String,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No results.");
    }
    for row in rows {
        println!("{}", render(row));
    }
    Ok(())
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
