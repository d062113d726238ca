// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConductorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("process name '{0}' is used more than once in the run group")]
    DuplicateName(String),

    #[error("process '{process}' watches {path:?}, which does not exist")]
    MissingWatchPath { process: String, path: PathBuf },

    #[error("process '{process}' has an {kind} trigger on unknown process '{target}'")]
    UnknownTriggerTarget {
        process: String,
        kind: &'static str,
        target: String,
    },

    #[error("process '{0}' cannot trigger on itself")]
    SelfTrigger(String),

    #[error(
        "process '{process}' has an {kind} trigger on '{target}', but '{target}' restarts \
         and has no single completion event"
    )]
    RestartingTriggerTarget {
        process: String,
        kind: &'static str,
        target: String,
    },

    #[error("process triggers form a cycle involving '{0}'")]
    TriggerCycle(String),

    #[error("process '{process}' has an invalid filter pattern '{pattern}': {reason}")]
    InvalidFilterPattern {
        process: String,
        pattern: String,
        reason: String,
    },

    #[error("failed to spawn process '{process}' (`{command}`): {source}")]
    Spawn {
        process: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process not found: {0}")]
    ProcessNotFound(String),

    #[error("process '{0}' is not running")]
    NotRunning(String),

    #[error("failed to write to stdin of process '{process}': {source}")]
    StdinWrite {
        process: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConductorError {
    /// True for errors raised while linking a run group (nothing was started).
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            ConductorError::DuplicateName(_)
                | ConductorError::MissingWatchPath { .. }
                | ConductorError::UnknownTriggerTarget { .. }
                | ConductorError::SelfTrigger(_)
                | ConductorError::RestartingTriggerTarget { .. }
                | ConductorError::TriggerCycle(_)
                | ConductorError::InvalidFilterPattern { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConductorError>;
