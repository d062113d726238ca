// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::process::ProcessDefinition;

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; semantic checks happen in
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
///
/// Trigger references between processes and watched paths are checked later,
/// when the run group is linked.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load, validate and convert to process definitions, resolving relative
/// paths against the directory holding the config file.
pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<ProcessDefinition>> {
    let path = path.as_ref();
    let cfg = load_and_validate(path)?;
    cfg.definitions(&config_root_dir(path))
}

/// Directory relative trigger paths are resolved against.
///
/// A bare file name like `Conductor.toml` resolves against the current
/// working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// `Conductor.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Conductor.toml")
}
