//! Shelfscope settings
//!
//! User-editable settings persisted as pretty JSON under the config directory:
//! - Table settings (pinned column, column order persistence)
//! - Image resolution settings (backend URL, batching, cache lifetime)
//!
//! Every field has a default, so partial or older files still load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shelfscope_images::{DEFAULT_FALLBACK_BASE, ImageResolverConfig};
use shelfscope_table::DEFAULT_PINNED_KEY;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod settings_file;

pub use settings_file::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShelfscopeSettings {
    pub table: TableSettings,
    pub images: ImageSettings,
}

impl ShelfscopeSettings {
    pub fn settings_path() -> Result<PathBuf> {
        settings_file()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Load from `path`, returning defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")
    }

    /// Like `load_from`, but an unreadable file degrades to defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(path = ?path, "Using default settings: {:#}", err);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Column key kept first in every table
    pub pinned_key: String,
    /// When false, column orders live only for the session
    pub persist_column_order: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            pinned_key: DEFAULT_PINNED_KEY.to_string(),
            persist_column_order: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub api_base_url: String,
    /// Session cookie sent with every image request
    pub session_cookie: Option<String>,
    pub request_timeout_secs: u64,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub ttl_hours: u64,
    pub fallback_base: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            session_cookie: None,
            request_timeout_secs: 30,
            batch_size: 5,
            batch_delay_ms: 1000,
            ttl_hours: 24,
            fallback_base: DEFAULT_FALLBACK_BASE.to_string(),
        }
    }
}

impl ImageSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn to_resolver_config(&self) -> ImageResolverConfig {
        ImageResolverConfig {
            batch_size: self.batch_size.max(1),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            ttl: Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60)),
            fallback_base: self.fallback_base.clone(),
        }
    }
}
