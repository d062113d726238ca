// src/group/wait_group.rs

//! Completion counter shared by all contexts of a run group.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct WaitGroup {
    tx: Arc<watch::Sender<usize>>,
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitGroup {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self { tx: Arc::new(tx) }
    }

    /// Register one pending participant. The count drops again when the
    /// returned guard is completed or dropped, whichever comes first.
    pub fn add(&self) -> CompletionGuard {
        self.tx.send_modify(|n| *n += 1);
        CompletionGuard {
            tx: Arc::clone(&self.tx),
            signaled: false,
        }
    }

    pub fn pending(&self) -> usize {
        *self.tx.borrow()
    }

    /// Wait until every registered participant has completed.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// One participant's share of a [`WaitGroup`]. Signals exactly once.
pub struct CompletionGuard {
    tx: Arc<watch::Sender<usize>>,
    signaled: bool,
}

impl fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGuard")
            .field("signaled", &self.signaled)
            .finish()
    }
}

impl CompletionGuard {
    pub fn complete(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if self.signaled {
            return;
        }
        self.signaled = true;
        self.tx.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.signal();
    }
}
