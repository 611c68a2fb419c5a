//! Settings file location

use anyhow::{Context, Result};
use shelfscope_storage::paths;
use std::path::PathBuf;

pub fn settings_file() -> Result<PathBuf> {
    paths::config_dir()
        .map(|p| p.join("settings.json"))
        .context("Could not determine settings file location")
}
