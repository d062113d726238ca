#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use conductor::process::ProcessDefinition;
use conductor::types::{ExitPolicy, RestartAttempts};

/// Builder for `ProcessDefinition` to simplify test setup.
///
/// Commands run through `sh -c`, so tests can write ordinary shell one-liners.
pub struct ProcessDefinitionBuilder {
    def: ProcessDefinition,
}

impl ProcessDefinitionBuilder {
    pub fn new(name: &str, script: &str) -> Self {
        let mut def = ProcessDefinition::new(name, "sh");
        def.args = vec!["-c".to_string(), script.to_string()];
        // Shutdown in tests should never take the production default.
        def.timeout_on_exit = Duration::from_secs(2);
        Self { def }
    }

    /// A raw command without the shell wrapper.
    pub fn command(name: &str, command: &str, args: &[&str]) -> Self {
        let mut def = ProcessDefinition::new(name, command);
        def.args = args.iter().map(|a| a.to_string()).collect();
        Self { def }
    }

    pub fn on_complete(mut self, policy: ExitPolicy) -> Self {
        self.def.on_complete = policy;
        self
    }

    pub fn on_failure(mut self, policy: ExitPolicy) -> Self {
        self.def.on_failure = policy;
        self
    }

    pub fn restart_attempts(mut self, n: i64) -> Self {
        self.def.restart_attempts = RestartAttempts::from_signed(n);
        self
    }

    pub fn restart_delay(mut self, delay: Duration) -> Self {
        self.def.restart_delay = delay;
        self
    }

    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.def.start_delay = delay;
        self
    }

    pub fn timeout_on_exit(mut self, timeout: Duration) -> Self {
        self.def.timeout_on_exit = timeout;
        self
    }

    pub fn start_stream(mut self, text: &str) -> Self {
        self.def.start_stream = Some(text.to_string());
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.def.prefix = prefix.to_string();
        self
    }

    pub fn silent(mut self) -> Self {
        self.def.silent = true;
        self
    }

    pub fn watch(mut self, path: impl Into<PathBuf>) -> Self {
        self.def.fs_trigger.watch.insert(path.into());
        self
    }

    pub fn ignore(mut self, path: impl Into<PathBuf>) -> Self {
        self.def.fs_trigger.ignore.insert(path.into());
        self
    }

    pub fn contain_filter(mut self, pattern: &str) -> Self {
        self.def.fs_trigger.contain_filters.insert(pattern.to_string());
        self
    }

    pub fn on_start_of(mut self, target: &str) -> Self {
        self.def.process_trigger.on_start.insert(target.to_string());
        self
    }

    pub fn on_complete_of(mut self, target: &str) -> Self {
        self.def.process_trigger.on_complete.insert(target.to_string());
        self
    }

    pub fn on_error_of(mut self, target: &str) -> Self {
        self.def.process_trigger.on_error.insert(target.to_string());
        self
    }

    pub fn build(self) -> ProcessDefinition {
        self.def
    }
}
