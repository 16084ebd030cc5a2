//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.gitonto/config.toml`
//! 2. Local config: `.gitonto/config.toml` (in workspace)
//! 3. CLI overrides
//!
//! Later sources override earlier ones key by key: files are merged as raw
//! TOML tables before decoding, so any key a later file sets wins, even when
//! it restores the built-in default. Keys a file leaves out keep the value
//! from the layer below.

use crate::error::ConfigError;
use crate::{ConfigOverrides, GitOntoConfig};
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".gitonto";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".gitonto";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.gitonto`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config layer, undecoded
    global_config: Option<Table>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.gitonto`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a workspace.
    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a workspace with optional CLI overrides.
    ///
    /// Merges config in order: defaults → global → local → overrides, then
    /// validates the result.
    pub fn load(
        &mut self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<GitOntoConfig, ConfigError> {
        let mut merged = Table::new();

        if let Some(global) = self.global_layer()? {
            merge_tables(&mut merged, global);
        }

        let local_path = self.local_config_path(workspace_root);
        if local_path.exists() {
            debug!("Loading local config from {:?}", local_path);
            merge_tables(&mut merged, read_layer(&local_path)?);
        } else {
            trace!("Local config not found at {:?}", local_path);
        }

        let mut config = decode(merged)?;
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from one explicit file, skipping global and local
    /// lookup. Overrides still apply.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<GitOntoConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = decode(read_layer(path)?)?;
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration, filled with defaults.
    pub fn load_global(&mut self) -> Result<Option<GitOntoConfig>, ConfigError> {
        self.global_layer()?.map(decode).transpose()
    }

    /// Load only the local configuration for a workspace, filled with defaults.
    pub fn load_local(&self, workspace_root: &Path) -> Result<Option<GitOntoConfig>, ConfigError> {
        let local_path = self.local_config_path(workspace_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        read_layer(&local_path).and_then(decode).map(Some)
    }

    fn global_layer(&mut self) -> Result<Option<Table>, ConfigError> {
        if let Some(ref table) = self.global_config {
            return Ok(Some(table.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let table = read_layer(&global_path)?;
        self.global_config = Some(table.clone());

        Ok(Some(table))
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &GitOntoConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Save configuration to the local config file for a workspace.
    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &GitOntoConfig,
    ) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(workspace_root), config)
    }

    /// Create `~/.gitonto/config.toml` with default configuration.
    ///
    /// An existing file is left untouched.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_dir(global_dir)
    }

    /// Create `.gitonto/config.toml` in a workspace with default configuration.
    ///
    /// An existing file is left untouched.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&workspace_root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &GitOntoConfig::default())?;
    }

    Ok(config_path)
}

/// Read one config file as a raw table.
///
/// The table is also decoded once so type errors name the file they came from.
fn read_layer(path: &Path) -> Result<Table, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    let table: Table = toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))?;
    Value::Table(table.clone())
        .try_into::<GitOntoConfig>()
        .map_err(|e| ConfigError::parse_toml(path, e))?;
    Ok(table)
}

fn decode(table: Table) -> Result<GitOntoConfig, ConfigError> {
    Value::Table(table)
        .try_into()
        .map_err(ConfigError::Decode)
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &GitOntoConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge `overlay` into `base`. Nested tables merge recursively; any other
/// value in `overlay` replaces the one in `base`, so keyword lists replace
/// rather than union.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(nested)) => merge_tables(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConcurrencyRule, LogFormat};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".gitonto");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_global(global_dir: &Path, content: &str) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, GitOntoConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [data]
            data_dir = "exports"
            commits = "commit_rows.json"

            [concurrency]
            rule = "simultaneous"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.data.data_dir, PathBuf::from("exports"));
        assert_eq!(config.data.commits, "commit_rows.json");
        assert_eq!(config.data.repositories, "repos.json");
        assert_eq!(config.concurrency.rule, ConcurrencyRule::Simultaneous);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        write_global(
            &global_dir,
            r#"
            [logging]
            level = "debug"

            [classification]
            security_keywords = ["cve", "exploit"]
            "#,
        );

        create_test_config(
            r#"
            [classification]
            security_keywords = ["security"]
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.classification.security_keywords, vec!["security"]);
        // Local file leaves logging alone, so the global level survives
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();
        create_test_config(
            r#"
            [output]
            snapshot_path = "out/local.json"

            [logging]
            level = "warn"
            "#,
            temp.path(),
        );

        let overrides = ConfigOverrides {
            snapshot_path: Some(PathBuf::from("cli.json")),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.output.snapshot_path, PathBuf::from("cli.json"));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        create_test_config(
            r#"
            [concurrency]
            min_repositories = 1
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert_eq!(err.key(), Some("concurrency.min_repositories"));
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config("[concurrency\nrule = ", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        match loader.load(temp.path(), None) {
            Err(ConfigError::ParseToml { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&path, None).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = GitOntoConfig::default();
        config.resolver.head_fallback = false;
        config.logging.level = "warn".to_string();

        loader.save_local(temp.path(), &config).unwrap();
        let loaded = loader.load_local(temp.path()).unwrap().unwrap();

        assert!(!loaded.resolver.head_fallback);
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".gitonto/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: GitOntoConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, GitOntoConfig::default());
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        write_global(&global_dir, "[logging]\nlevel = \"error\"\n");

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let path = loader.init_global().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("error"));
    }

    #[test]
    fn test_local_can_restore_default_over_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        write_global(
            &global_dir,
            r#"
            [resolver]
            head_fallback = false

            [concurrency]
            rule = "simultaneous"
            min_repositories = 4
            "#,
        );
        create_test_config(
            r#"
            [resolver]
            head_fallback = true

            [concurrency]
            rule = "pairwise"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert!(config.resolver.head_fallback);
        assert_eq!(config.concurrency.rule, ConcurrencyRule::Pairwise);
        // Untouched by the local file
        assert_eq!(config.concurrency.min_repositories, 4);
    }

    #[test]
    fn test_merge_tables_recurses_into_sections() {
        let mut base: Table = toml::from_str(
            r#"
            [data]
            data_dir = "a"
            commits = "c.json"

            [classification]
            security_keywords = ["cve", "xss"]
            "#,
        )
        .unwrap();
        let overlay: Table = toml::from_str(
            r#"
            [data]
            data_dir = "b"

            [classification]
            security_keywords = ["auth"]
            "#,
        )
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = decode(base).unwrap();

        assert_eq!(config.data.data_dir, PathBuf::from("b"));
        assert_eq!(config.data.commits, "c.json");
        assert_eq!(config.classification.security_keywords, vec!["auth"]);
    }

    #[test]
    fn test_type_error_names_the_layer() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config(
            r#"
            [concurrency]
            rule = "sometimes"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        match loader.load(temp.path(), None) {
            Err(ConfigError::ParseToml { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        write_global(&global_dir, "[logging]\nlevel = \"debug\"\n");

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
