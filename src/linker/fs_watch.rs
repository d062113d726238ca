// src/linker/fs_watch.rs

//! Filesystem trigger source, one per watched process.

use std::path::PathBuf;

use anyhow::Context;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::filter::WatchFilter;
use crate::context::TriggerReason;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::group::Cancellation;

/// An installed OS watch whose events are not consumed yet.
///
/// Splitting install from spawn lets the linker fail on any OS watch error
/// before a single task is wired.
pub(crate) struct PreparedFsWatch {
    process: String,
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    filter: WatchFilter,
}

pub(crate) fn prepare(
    process: &str,
    filter: WatchFilter,
    fs: &dyn FileSystem,
) -> Result<PreparedFsWatch> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver is gone once the watch task stopped.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )
    .with_context(|| format!("creating file watcher for process '{process}'"))?;

    for path in filter.watch_paths() {
        let mode = if fs.is_dir(path) {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(path, mode)
            .with_context(|| format!("watching {:?} for process '{process}'", path))?;
    }

    Ok(PreparedFsWatch {
        process: process.to_string(),
        watcher,
        event_rx,
        filter,
    })
}

impl PreparedFsWatch {
    /// Forward matching changes to `trigger_tx` until the group is
    /// cancelled, the context finishes, or the OS watch fails.
    ///
    /// The OS watch is released when the task ends.
    pub(crate) fn spawn(
        self,
        trigger_tx: mpsc::Sender<TriggerReason>,
        mut cancel: Cancellation,
    ) -> JoinHandle<()> {
        let PreparedFsWatch {
            process,
            watcher,
            mut event_rx,
            filter,
        } = self;

        tokio::spawn(async move {
            let paths: Vec<_> = filter.watch_paths().collect();
            info!(process = %process, ?paths, "file watcher started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(process = %process, "file watcher cancelled");
                        break;
                    }
                    _ = trigger_tx.closed() => {
                        debug!(process = %process, "process finished; releasing file watcher");
                        break;
                    }
                    res = event_rx.recv() => match res {
                        Some(Ok(event)) => {
                            let Some(path) = matching_path(&event, &filter) else {
                                continue;
                            };
                            match trigger_tx.try_send(TriggerReason::FileChange(path.clone())) {
                                Ok(()) => debug!(process = %process, ?path, "watch match -> trigger"),
                                Err(TrySendError::Full(_)) => {
                                    debug!(process = %process, ?path, "process busy; dropping file change");
                                }
                                Err(TrySendError::Closed(_)) => break,
                            }
                        }
                        Some(Err(err)) => {
                            warn!(process = %process, error = %err, "file watch error; filesystem trigger disabled");
                            break;
                        }
                        None => break,
                    },
                }
            }

            drop(watcher);
            info!(process = %process, "file watcher stopped");
        })
    }
}

/// First path of `event` that passes the filter, ignoring pure reads.
fn matching_path(event: &Event, filter: &WatchFilter) -> Option<PathBuf> {
    if matches!(event.kind, EventKind::Access(_) | EventKind::Other) {
        return None;
    }
    event.paths.iter().find(|p| filter.includes(p)).cloned()
}
