// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate per-process fields (`validate.rs`).
//!
//! Cross-process checks (trigger targets, watched paths) belong to the
//! linker, which sees the complete run group.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_definitions, load_from_path};
pub use model::{
    ConfigFile, DefaultSection, FsTriggerConfig, ProcessConfig, ProcessTriggerConfig,
    RawConfigFile,
};
