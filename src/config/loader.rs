//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "config.yaml";

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        let project_dir = std::env::var("PICKLES2_MCP_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("pickles2-mcp")));

        let user_dir = std::env::var("PICKLES2_MCP_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".pickles2-mcp")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Loads and merges configuration tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: Config,
    /// Highest-priority file that contributed to the configuration.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from the process environment.
    ///
    /// `explicit` (from `--config`) wins over `PICKLES2_MCP_CONFIG_PATH`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("PICKLES2_MCP_CONFIG_PATH").ok().map(PathBuf::from));

        let mut loader = match explicit {
            Some(path) => Self::load_file(&path)?,
            None => Self::load_with_paths(&ConfigPaths::discover())?,
        };
        loader.apply_overrides(|key| std::env::var(key).ok());
        Ok(loader)
    }

    /// Load exactly one file on top of the defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: Config::load(path)?,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Merge defaults, project and user tiers. Environment overrides are
    /// not applied here.
    pub fn load_with_paths(paths: &ConfigPaths) -> Result<Self> {
        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for dir in [&paths.project_dir, &paths.user_dir].into_iter().flatten() {
            let file = dir.join(CONFIG_FILE);
            if let Some(value) = read_tier(&file) {
                tiers.push(value);
                config_path = Some(file);
            }
        }

        let config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Apply `PICKLES2_MCP_PHP_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let php = &mut self.config.php;
        if let Some(bin) = lookup("PICKLES2_MCP_PHP_BIN") {
            php.bin = PathBuf::from(bin);
        }
        if let Some(ini) = lookup("PICKLES2_MCP_PHP_INI") {
            php.ini = Some(PathBuf::from(ini));
        }
        if let Some(dir) = lookup("PICKLES2_MCP_PHP_EXTENSION_DIR") {
            php.extension_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Read one tier. Missing files are skipped silently, broken ones with a warning.
fn read_tier(file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!("Skipping unreadable config {}: {}", file.display(), e);
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping invalid config {}: {}", file.display(), e);
            None
        }
    }
}
