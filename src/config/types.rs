//! Configuration types.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub php: PhpConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Load a single configuration file.
    ///
    /// Empty or comment-only files yield the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Option<Config> = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config.unwrap_or_default())
    }
}

/// How the PHP command line is invoked for the entry script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpConfig {
    /// PHP binary (default: `php` from `PATH`).
    #[serde(default = "default_php_bin")]
    pub bin: PathBuf,

    /// php.ini passed with `-c`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ini: Option<PathBuf>,

    /// Extension directory passed with `-d extension_dir=...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_dir: Option<PathBuf>,
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            bin: default_php_bin(),
            ini: None,
            extension_dir: None,
        }
    }
}

fn default_php_bin() -> PathBuf {
    PathBuf::from("php")
}

/// Tool listing overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Replacement descriptions keyed by tool name.
    #[serde(default)]
    pub descriptions: HashMap<String, String>,
}

impl ToolsConfig {
    pub fn get_description(&self, tool_name: &str) -> Option<&str> {
        self.descriptions.get(tool_name).map(String::as_str)
    }
}
