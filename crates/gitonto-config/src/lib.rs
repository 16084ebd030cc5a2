//! GitOnto Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.gitonto/config.toml`
//! - Local config: `.gitonto/config.toml` (in workspace)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: defaults → global → local → CLI overrides.

mod error;
mod loader;

pub use error::{ConfigError, FileOp};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for GitOnto.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GitOntoConfig {
    /// Input dataset location
    pub data: DataConfig,

    /// Derivation rule settings
    pub classification: ClassificationConfig,

    /// Pull request branch resolution
    pub resolver: ResolverSettings,

    /// Concurrent contributor detection
    pub concurrency: ConcurrencySettings,

    /// Snapshot output
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Dataset directory and per-kind batch file names.
///
/// # Example TOML
///
/// ```toml
/// [data]
/// data_dir = "exports/2024-06"
/// commits = "commit_rows.json"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the batch files
    pub data_dir: PathBuf,
    pub repositories: String,
    pub users: String,
    pub branches: String,
    pub commits: String,
    pub files: String,
    pub issues: String,
    pub pull_requests: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            repositories: "repos.json".to_string(),
            users: "users.json".to_string(),
            branches: "branches.json".to_string(),
            commits: "commits.json".to_string(),
            files: "files.json".to_string(),
            issues: "issues.json".to_string(),
            pull_requests: "pulls.json".to_string(),
        }
    }
}

/// Classification rule settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Keywords that mark a commit message as security related
    pub security_keywords: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            security_keywords: vec!["security".to_string(), "vulnerability".to_string()],
        }
    }
}

/// Branch resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverSettings {
    /// Names treated as a repository's default branch
    pub default_branch_names: Vec<String>,

    /// Resolve an unmatched head branch to any non-default branch
    pub head_fallback: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            default_branch_names: vec!["main".to_string(), "master".to_string()],
            head_fallback: true,
        }
    }
}

/// How overlapping activity intervals qualify a contributor as concurrent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyRule {
    /// At least `min_overlapping_pairs` overlapping interval pairs
    #[default]
    Pairwise,
    /// At least `min_repositories` intervals covering one instant
    Simultaneous,
}

impl std::fmt::Display for ConcurrencyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyRule::Pairwise => write!(f, "pairwise"),
            ConcurrencyRule::Simultaneous => write!(f, "simultaneous"),
        }
    }
}

impl std::str::FromStr for ConcurrencyRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pairwise" => Ok(ConcurrencyRule::Pairwise),
            "simultaneous" => Ok(ConcurrencyRule::Simultaneous),
            _ => Err(ConfigError::invalid_value(
                "concurrency.rule",
                format!("unknown rule '{}', expected 'pairwise' or 'simultaneous'", s),
            )),
        }
    }
}

/// Concurrency detector settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConcurrencySettings {
    /// Distinct repositories a user must have authored in
    pub min_repositories: usize,

    /// Overlap rule
    pub rule: ConcurrencyRule,

    /// Overlapping pairs required by the pairwise rule
    pub min_overlapping_pairs: usize,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            min_repositories: 3,
            rule: ConcurrencyRule::default(),
            min_overlapping_pairs: 3,
        }
    }
}

/// Snapshot output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Where `populate` writes the graph snapshot
    pub snapshot_path: PathBuf,

    /// Pretty-print the snapshot JSON
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("gitonto-graph.json"),
            pretty: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override dataset directory
    pub data_dir: Option<PathBuf>,

    /// Override snapshot output path
    pub snapshot_path: Option<PathBuf>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override security keywords
    pub security_keywords: Option<Vec<String>>,

    /// Override concurrency rule
    pub concurrency_rule: Option<ConcurrencyRule>,
}

impl GitOntoConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.data_dir {
            self.data.data_dir = dir.clone();
        }

        if let Some(ref path) = overrides.snapshot_path {
            self.output.snapshot_path = path.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(ref keywords) = overrides.security_keywords {
            self.classification.security_keywords = keywords.clone();
        }

        if let Some(rule) = overrides.concurrency_rule {
            self.concurrency.rule = rule;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .classification
            .security_keywords
            .iter()
            .all(|k| k.trim().is_empty())
        {
            return Err(ConfigError::validation(
                "classification.security_keywords",
                "must contain at least one keyword",
            ));
        }
        if self
            .resolver
            .default_branch_names
            .iter()
            .all(|n| n.trim().is_empty())
        {
            return Err(ConfigError::validation(
                "resolver.default_branch_names",
                "must contain at least one name",
            ));
        }
        if self.concurrency.min_repositories < 2 {
            return Err(ConfigError::validation(
                "concurrency.min_repositories",
                format!(
                    "must be at least 2, got {}",
                    self.concurrency.min_repositories
                ),
            ));
        }
        if self.concurrency.min_overlapping_pairs == 0 {
            return Err(ConfigError::validation(
                "concurrency.min_overlapping_pairs",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Get the effective dataset directory for a workspace.
    pub fn data_dir(&self, workspace_root: &Path) -> PathBuf {
        resolve_against(workspace_root, &self.data.data_dir)
    }

    /// Get the snapshot output path for a workspace.
    pub fn snapshot_path(&self, workspace_root: &Path) -> PathBuf {
        resolve_against(workspace_root, &self.output.snapshot_path)
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
