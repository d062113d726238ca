// src/linker/mod.rs

//! Trigger linking for a run group.
//!
//! [`link`] validates the whole group (see [`validate`]) and then wires the
//! runtime edges:
//!
//! - one filesystem watch task per process with a non-empty `watch` set
//!   ([`fs_watch`], filtered by [`filter`]),
//! - one listener per (dependent, target) pair of process triggers
//!   ([`process_watch`]).
//!
//! Every wired process starts in `WaitingTrigger` and only launches its
//! command when one of its sources fires.

pub mod filter;
pub mod fs_watch;
pub mod process_watch;
pub mod validate;

use tracing::info;

use crate::context::ExecutionContext;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

pub use filter::WatchFilter;

/// Validate and wire `contexts` against the real filesystem.
pub fn link(contexts: &mut [ExecutionContext]) -> Result<()> {
    link_with_fs(contexts, &RealFileSystem)
}

/// Validate and wire `contexts`, checking watched paths through `fs`.
///
/// Must run inside a Tokio runtime and before any context is started.
pub fn link_with_fs(contexts: &mut [ExecutionContext], fs: &dyn FileSystem) -> Result<()> {
    let plan = validate::build_plan(contexts, fs)?;

    // Installing OS watches can still fail; do all of it before wiring.
    let mut prepared = Vec::with_capacity(plan.fs_watches.len());
    for (idx, filter) in plan.fs_watches {
        prepared.push((idx, fs_watch::prepare(contexts[idx].name(), filter, fs)?));
    }

    let watch_count = prepared.len();
    for (idx, watch) in prepared {
        let ctx = &mut contexts[idx];
        let cancel = ctx.cancellation();
        if let Some(trigger_tx) = ctx.trigger_sender() {
            watch.spawn(trigger_tx, cancel);
        }
    }

    let listener_count = plan.listeners.len();
    for edge in plan.listeners {
        let events = contexts[edge.target].subscribe();
        let target = contexts[edge.target].name().to_string();
        let ctx = &mut contexts[edge.dependent];
        let cancel = ctx.cancellation();
        if let Some(trigger_tx) = ctx.trigger_sender() {
            process_watch::spawn_listener(
                ctx.name().to_string(),
                target,
                edge.kinds,
                events,
                trigger_tx,
                cancel,
            );
        }
    }

    info!(
        processes = contexts.len(),
        file_watches = watch_count,
        process_triggers = listener_count,
        "run group linked"
    );
    Ok(())
}
