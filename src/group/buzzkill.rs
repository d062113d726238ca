// src/group/buzzkill.rs

//! Group-wide cancellation broadcast.
//!
//! One [`Buzzkill`] is shared by every context of a run group. Any holder
//! can fire it; every [`Cancellation`] subscribed from it observes the pulse,
//! including subscribers that only start listening after it fired.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Buzzkill {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for Buzzkill {
    fn default() -> Self {
        Self::new()
    }
}

impl Buzzkill {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel every subscriber. `origin` names who asked for it.
    ///
    /// Returns `false` if the group had already been buzzkilled; the first
    /// origin is kept.
    pub fn fire(&self, origin: &str) -> bool {
        let fired = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(origin.to_string());
            true
        });
        if fired {
            info!(origin, "buzzkill: stopping every process in the group");
        }
        fired
    }

    pub fn is_fired(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Who fired the buzzkill, if anyone did.
    pub fn origin(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`Buzzkill`]. Dropping it unsubscribes.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<Option<String>>,
}

impl Cancellation {
    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolves once the group is buzzkilled (immediately if it already
    /// was). Never resolves if every `Buzzkill` handle is gone. Cancel safe.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|v| v.is_some()).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
