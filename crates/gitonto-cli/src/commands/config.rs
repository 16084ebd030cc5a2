//! Config command - View and manage configuration
//!
//! Provides commands for viewing GitOnto configuration:
//! - Show the effective configuration
//! - Get a specific configuration value
//! - Write a default config file (local or global)
//! - Show configuration file paths

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use gitonto_config::{ConfigLoader, GitOntoConfig};
use serde::Serialize;

use super::{load_config, resolve_workspace};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Write a default configuration file
    Init(InitArgs),

    /// Show configuration file paths
    Path(PathArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "concurrency.rule")
    key: String,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create ~/.gitonto/config.toml instead of the workspace file
    #[arg(long)]
    global: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Get(args) => execute_get(args, global),
        ConfigCommand::Init(args) => execute_init(args),
        ConfigCommand::Path(args) => execute_path(args),
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    for (key, value) in flatten_config(&config)? {
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn execute_get(args: GetArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    let value = get_config_value(&config, &args.key)?
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    match value {
        serde_json::Value::String(s) => println!("{}", s),
        other => println!("{}", other),
    }
    Ok(())
}

fn execute_init(args: InitArgs) -> Result<()> {
    let loader = ConfigLoader::new();

    let path = if args.global {
        loader
            .init_global()
            .context("Failed to create global config")?
    } else {
        let workspace = resolve_workspace()?;
        loader
            .init_local(&workspace)
            .context("Failed to create local config")?
    };

    println!("Config file: {}", path.display());
    Ok(())
}

fn execute_path(args: PathArgs) -> Result<()> {
    let workspace_path = resolve_workspace()?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&workspace_path);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().map(|p| p.exists()).unwrap_or(false),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        println!("Configuration Paths");
        println!("===================\n");

        if let Some(ref gp) = paths.global {
            let status = if paths.global_exists {
                "exists"
            } else {
                "not found"
            };
            println!("Global: {} ({})", gp.display(), status);
        } else {
            println!("Global: not available (no home directory)");
        }

        let status = if paths.local_exists {
            "exists"
        } else {
            "not found"
        };
        println!("Local:  {} ({})", paths.local.display(), status);
    }

    Ok(())
}

/// Get a configuration value by dotted key path
fn get_config_value(config: &GitOntoConfig, key: &str) -> Result<Option<serde_json::Value>> {
    let json = serde_json::to_value(config)?;

    let mut current = &json;
    for part in key.split('.') {
        match current.get(part) {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }

    Ok(Some(current.clone()))
}

/// Flatten the configuration into sorted `section.key` pairs
fn flatten_config(config: &GitOntoConfig) -> Result<Vec<(String, serde_json::Value)>> {
    fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, serde_json::Value)>) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(&path, child, out);
                }
            }
            other => out.push((prefix.to_string(), other.clone())),
        }
    }

    let mut values = Vec::new();
    walk("", &serde_json::to_value(config)?, &mut values);
    values.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_value_nested() {
        let config = GitOntoConfig::default();
        let value = get_config_value(&config, "concurrency.rule").unwrap();
        assert_eq!(value, Some(serde_json::json!("pairwise")));

        assert_eq!(get_config_value(&config, "nope.key").unwrap(), None);
    }

    #[test]
    fn test_flatten_config_lists_leaves() {
        let values = flatten_config(&GitOntoConfig::default()).unwrap();
        let keys: Vec<&str> = values.iter().map(|(k, _)| k.as_str()).collect();

        assert!(keys.contains(&"data.data_dir"));
        assert!(keys.contains(&"resolver.head_fallback"));
        assert!(keys.contains(&"classification.security_keywords"));
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }
}
