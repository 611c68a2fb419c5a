//! Well-known file locations

use shelfscope_core::{Result, ShelfscopeError};
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "shelfscope";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .ok_or_else(|| ShelfscopeError::Configuration("Could not determine config directory".into()))
        .map(|p| p.join(APP_DIR_NAME))
}

pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .ok_or_else(|| ShelfscopeError::Configuration("Could not determine data directory".into()))
        .map(|p| p.join(APP_DIR_NAME))
}

pub fn store_file() -> Result<PathBuf> {
    data_dir().map(|p| p.join("state.db"))
}

/// Daily-rolled JSON log files live here
pub fn logs_dir() -> Result<PathBuf> {
    data_dir().map(|p| p.join("logs"))
}

pub fn ensure_directories() -> Result<()> {
    for dir in [config_dir()?, data_dir()?, logs_dir()?] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
    }
    Ok(())
}
