// src/config/validate.rs

use crate::config::model::{ansi_color, ConfigFile, ProcessConfig, RawConfigFile};
use crate::errors::{ConductorError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConductorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.default, raw.process))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_processes(cfg)?;
    validate_defaults(cfg)?;
    for (name, process) in cfg.process.iter() {
        validate_process(name, process)?;
    }
    Ok(())
}

fn ensure_has_processes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.process.is_empty() {
        return Err(ConductorError::ConfigError(
            "config must contain at least one [process.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_defaults(cfg: &RawConfigFile) -> Result<()> {
    let fields = [
        ("timeout_on_exit", &cfg.default.timeout_on_exit),
        ("restart_delay", &cfg.default.restart_delay),
    ];
    for (field, value) in fields {
        if let Some(s) = value {
            parse_duration(s).map_err(|e| {
                ConductorError::ConfigError(format!("[default].{field}: {e}"))
            })?;
        }
    }
    Ok(())
}

fn validate_process(name: &str, process: &ProcessConfig) -> Result<()> {
    let err = |msg: String| ConductorError::ConfigError(format!("process '{name}': {msg}"));

    if name.trim().is_empty() {
        return Err(ConductorError::ConfigError(
            "process names must not be empty".to_string(),
        ));
    }
    if process.command.trim().is_empty() {
        return Err(err("`command` must not be empty".to_string()));
    }

    let durations = [
        ("start_delay", &process.start_delay),
        ("restart_delay", &process.restart_delay),
        ("timeout_on_exit", &process.timeout_on_exit),
    ];
    for (field, value) in durations {
        if let Some(s) = value {
            parse_duration(s).map_err(|e| err(format!("invalid {field}: {e}")))?;
        }
    }

    if let Some(color) = &process.color {
        ansi_color(color).map_err(err)?;
    }

    Ok(())
}
