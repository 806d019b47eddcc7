//! Configuration Management
//!
//! Handles persistent configuration storage for cloudenum.

use crate::cache::DEFAULT_CAPACITY;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_MAX_CONCURRENCY: usize = 10;

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project to scan
    #[serde(default)]
    pub project_id: Option<String>,
    /// Resolved entries kept in the session cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Concurrent enumerations and detail reads
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Resource types to scan, empty for all
    #[serde(default)]
    pub resource_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: None,
            cache_capacity: DEFAULT_CAPACITY,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            resource_types: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudenum").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load configuration from a file; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(crate::gcp::auth::get_default_project)
    }
}
