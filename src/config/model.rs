// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{ConductorError, Result};
use crate::process::{FsTrigger, ProcessDefinition, ProcessTrigger, DEFAULT_TIMEOUT_ON_EXIT};
use crate::types::{parse_duration, ExitPolicy, RestartAttempts};

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [default]
/// timeout_on_exit = "3s"
/// show_timestamp = true
///
/// [process.api]
/// command = "cargo"
/// args = ["run", "--bin", "api"]
/// color = "green"
/// on_failure = "restart"
/// restart_attempts = 3
///
/// [process.tests]
/// command = "cargo"
/// args = ["test"]
///
/// [process.tests.fs_trigger]
/// watch = ["src"]
/// contain_filters = ["*.rs"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Defaults from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All processes from `[process.<name>]`, keyed by name.
    #[serde(default)]
    pub process: BTreeMap<String, ProcessConfig>,
}

/// Validated configuration. Built via `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub default: DefaultSection,
    pub process: BTreeMap<String, ProcessConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        default: DefaultSection,
        process: BTreeMap<String, ProcessConfig>,
    ) -> Self {
        Self { default, process }
    }

    pub fn processes(&self) -> &BTreeMap<String, ProcessConfig> {
        &self.process
    }

    /// Turn every `[process.<name>]` into a definition. Relative trigger
    /// paths are resolved against `base_dir`.
    pub fn definitions(&self, base_dir: &Path) -> Result<Vec<ProcessDefinition>> {
        self.process
            .iter()
            .map(|(name, p)| p.to_definition(name, &self.default, base_dir))
            .collect()
    }
}

/// `[default]` section: fallbacks for fields a process leaves unset.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub timeout_on_exit: Option<String>,
    #[serde(default)]
    pub restart_delay: Option<String>,
    #[serde(default)]
    pub show_timestamp: Option<bool>,
    #[serde(default)]
    pub display_pid: Option<bool>,
    #[serde(default)]
    pub separate_new_lines: Option<bool>,
}

/// `[process.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    /// Program to execute (looked up on `PATH`).
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Output prefix; defaults to the process name.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Named color for the prefix (`red`, `green`, ... or `none`).
    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub display_pid: Option<bool>,

    #[serde(default)]
    pub show_timestamp: Option<bool>,

    #[serde(default)]
    pub separate_new_lines: Option<bool>,

    #[serde(default)]
    pub silent: bool,

    /// Duration string, e.g. `"2s"`.
    #[serde(default)]
    pub start_delay: Option<String>,

    #[serde(default)]
    pub on_failure: ExitPolicy,

    #[serde(default)]
    pub on_complete: ExitPolicy,

    /// `0` never restarts, `N` restarts up to N times, negative forever.
    #[serde(default)]
    pub restart_attempts: i64,

    #[serde(default)]
    pub restart_delay: Option<String>,

    #[serde(default)]
    pub timeout_on_exit: Option<String>,

    /// Text written once to stdin right after launch.
    #[serde(default)]
    pub start_stream: Option<String>,

    #[serde(default)]
    pub fs_trigger: FsTriggerConfig,

    #[serde(default)]
    pub process_trigger: ProcessTriggerConfig,
}

/// `[process.<name>.fs_trigger]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FsTriggerConfig {
    #[serde(default)]
    pub watch: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub contain_filters: Vec<String>,
}

/// `[process.<name>.process_trigger]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProcessTriggerConfig {
    #[serde(default)]
    pub on_start: Vec<String>,
    #[serde(default)]
    pub on_complete: Vec<String>,
    #[serde(default)]
    pub on_error: Vec<String>,
}

impl ProcessConfig {
    pub fn to_definition(
        &self,
        name: &str,
        defaults: &DefaultSection,
        base_dir: &Path,
    ) -> Result<ProcessDefinition> {
        let duration = |field: &str, value: Option<&String>, fallback: Duration| {
            value
                .map(|s| parse_duration(s))
                .transpose()
                .map(|d| d.unwrap_or(fallback))
                .map_err(|e| {
                    ConductorError::ConfigError(format!("process '{name}': invalid {field}: {e}"))
                })
        };

        let default_timeout = duration(
            "[default].timeout_on_exit",
            defaults.timeout_on_exit.as_ref(),
            DEFAULT_TIMEOUT_ON_EXIT,
        )?;
        let default_restart_delay = duration(
            "[default].restart_delay",
            defaults.restart_delay.as_ref(),
            Duration::ZERO,
        )?;

        let color = match self.color.as_deref() {
            Some(c) => ansi_color(c).map_err(|e| {
                ConductorError::ConfigError(format!("process '{name}': {e}"))
            })?,
            None => None,
        };

        let resolve = |p: &String| -> PathBuf {
            let p = PathBuf::from(p);
            if p.is_absolute() { p } else { base_dir.join(p) }
        };

        let mut def = ProcessDefinition::new(name, self.command.clone());
        def.args = self.args.clone();
        def.prefix = self.prefix.clone().unwrap_or_else(|| name.to_string());
        def.color = color;
        def.display_pid = self.display_pid.or(defaults.display_pid).unwrap_or(false);
        def.show_timestamp = self
            .show_timestamp
            .or(defaults.show_timestamp)
            .unwrap_or(false);
        def.separate_new_lines = self
            .separate_new_lines
            .or(defaults.separate_new_lines)
            .unwrap_or(true);
        def.silent = self.silent;
        def.start_delay = duration("start_delay", self.start_delay.as_ref(), Duration::ZERO)?;
        def.on_failure = self.on_failure;
        def.on_complete = self.on_complete;
        def.restart_attempts = RestartAttempts::from_signed(self.restart_attempts);
        def.restart_delay = duration(
            "restart_delay",
            self.restart_delay.as_ref(),
            default_restart_delay,
        )?;
        def.timeout_on_exit = duration(
            "timeout_on_exit",
            self.timeout_on_exit.as_ref(),
            default_timeout,
        )?;
        def.start_stream = self.start_stream.clone();
        def.fs_trigger = FsTrigger {
            watch: self.fs_trigger.watch.iter().map(resolve).collect(),
            ignore: self.fs_trigger.ignore.iter().map(resolve).collect(),
            contain_filters: self.fs_trigger.contain_filters.iter().cloned().collect(),
        };
        def.process_trigger = ProcessTrigger {
            on_start: self.process_trigger.on_start.iter().cloned().collect(),
            on_complete: self.process_trigger.on_complete.iter().cloned().collect(),
            on_error: self.process_trigger.on_error.iter().cloned().collect(),
        };
        Ok(def)
    }
}

/// Resolve a named color to its ANSI escape. `none` means uncolored.
pub fn ansi_color(name: &str) -> std::result::Result<Option<String>, String> {
    let code = match name.trim().to_lowercase().as_str() {
        "none" | "" => return Ok(None),
        "black" => 30,
        "red" => 31,
        "green" => 32,
        "yellow" => 33,
        "blue" => 34,
        "magenta" => 35,
        "cyan" => 36,
        "white" => 37,
        other => return Err(format!("unknown color '{other}'")),
    };
    Ok(Some(format!("\x1b[{code}m")))
}
