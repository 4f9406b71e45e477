use crate::error::{GitPulseError, Result};
use crate::model::{Category, SCHEMA_VERSION};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "gitpulse.toml";
pub const DEFAULT_BYTES_PER_LINE: u64 = 50;
pub const DEFAULT_HOURLY_THRESHOLD_HOURS: i64 = 48;
pub const DEFAULT_CACHE_DIR: &str = ".gitpulse";

/// Analysis configuration, file values overlaid by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob patterns for paths excluded from every aggregate.
    pub exclude: Vec<String>,
    /// Estimated weight of one added or deleted line, in bytes.
    pub bytes_per_line: u64,
    /// Histories younger than this bucket by hour instead of by day.
    pub hourly_threshold_hours: i64,
    /// File-type label to category overrides, on top of the built-in table.
    pub categories: HashMap<String, Category>,
    pub cache_dir: String,
    pub cache_version: String,
    pub cache_enabled: bool,
    pub max_commits: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            bytes_per_line: DEFAULT_BYTES_PER_LINE,
            hourly_threshold_hours: DEFAULT_HOURLY_THRESHOLD_HOURS,
            categories: HashMap::new(),
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            cache_version: SCHEMA_VERSION.to_string(),
            cache_enabled: true,
            max_commits: None,
        }
    }
}

impl Config {
    /// Load `gitpulse.toml` from the repository root, or an explicit path.
    /// A missing default file yields the defaults; a missing explicit path is
    /// an error.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(GitPulseError::Parse(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let path = repo_root.join(CONFIG_FILE);
                if !path.exists() {
                    debug!("no {CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| GitPulseError::Parse(format!("{}: {e}", path.display())))?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn cache_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.cache_dir)
    }
}
