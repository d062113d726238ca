// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod fs;
pub mod group;
pub mod linker;
pub mod logging;
pub mod output;
pub mod process;
pub mod terminate;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_definitions;
use crate::context::StdinHandle;
use crate::group::{Buzzkill, RunGroup};
use crate::process::ProcessDefinition;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - run group construction and trigger linking
/// - Ctrl-C handling
/// - (optional) stdin forwarding to one process
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let definitions = load_definitions(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&definitions);
    }

    // Linking happens here; a link error means nothing was launched.
    let mut group = RunGroup::new(definitions).context("failed to link run group")?;

    if args.dry_run {
        println!();
        println!("run group linked successfully (dry-run, nothing started)");
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let stdin_target = match args.stdin_to.as_deref() {
        Some(name) => Some(group.stdin(name)?),
        None => None,
    };

    spawn_ctrl_c(group.buzzkill());
    group.start();

    if let Some(handle) = stdin_target {
        spawn_stdin_forwarder(handle);
    }

    group.join().await;

    if let Some(origin) = group.buzzkill_origin() {
        info!(%origin, "run group was buzzkilled");
    }
    for (name, status) in group.summary() {
        info!(process = %name, %status, "final status");
    }

    Ok(())
}

/// Ctrl-C buzzkills the whole group; processes get their graceful stop.
fn spawn_ctrl_c(buzzkill: Buzzkill) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; stopping run group");
        buzzkill.fire("ctrl-c");
    });
}

/// Forward each line typed on our own stdin to `handle`'s process.
fn spawn_stdin_forwarder(handle: StdinHandle) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Err(e) = handle.write(format!("{line}\n")).await {
                        warn!(process = %handle.process(), error = %e, "could not forward stdin line");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
        debug!(process = %handle.process(), "stdin forwarding stopped");
    });
}

/// Print every process definition the way it will be run.
fn print_dry_run(definitions: &[ProcessDefinition]) {
    println!("conductor dry-run");
    println!();
    println!("processes ({}):", definitions.len());
    for def in definitions {
        println!("  - {}", def.name);
        if def.args.is_empty() {
            println!("      command: {}", def.command);
        } else {
            println!("      command: {} {}", def.command, def.args.join(" "));
        }
        if !def.start_delay.is_zero() {
            println!("      start_delay: {:?}", def.start_delay);
        }
        println!(
            "      on_complete: {:?}, on_failure: {:?}, restart_attempts: {:?}",
            def.on_complete, def.on_failure, def.restart_attempts
        );
        if def.silent {
            println!("      silent: true");
        }
        if def.fs_trigger.is_active() {
            println!("      fs_trigger.watch: {:?}", def.fs_trigger.watch);
            if !def.fs_trigger.ignore.is_empty() {
                println!("      fs_trigger.ignore: {:?}", def.fs_trigger.ignore);
            }
            if !def.fs_trigger.contain_filters.is_empty() {
                println!(
                    "      fs_trigger.contain_filters: {:?}",
                    def.fs_trigger.contain_filters
                );
            }
        }
        for (kind, target) in def.process_trigger.edges() {
            println!("      {}: {}", kind.as_str(), target);
        }
    }
}
