//! Capture-then-attach log for one-shot pushes.
//!
//! A producer may push before any consumer subscribes. `CaptureLog` records
//! every push from the moment it exists; consumers check the log first and
//! only then wait for the next append. Both steps run under the same watch
//! borrow, so a push landing between "check" and "wait" is never missed.

use tokio::sync::watch;

use crate::error::{FrameLinkError, Result};

/// Append-only log. Never pruned.
#[derive(Debug)]
pub struct CaptureLog<T> {
    tx: watch::Sender<Vec<T>>,
}

impl<T> Default for CaptureLog<T> {
    fn default() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { tx }
    }
}

impl<T: Clone> CaptureLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item and wake every waiter.
    pub fn record(&self, item: T) {
        self.tx.send_modify(|log| log.push(item));
    }

    /// First captured item, if any.
    pub fn first(&self) -> Option<T> {
        self.tx.borrow().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.tx.borrow().clone()
    }

    /// Resolve with the first item, waiting only if nothing was captured yet.
    pub async fn wait_first(&self) -> Result<T> {
        let mut rx = self.tx.subscribe();
        let log = rx
            .wait_for(|log| !log.is_empty())
            .await
            .map_err(|_| FrameLinkError::ChannelClosed)?;
        let first = log.first().cloned();
        first.ok_or(FrameLinkError::ChannelClosed)
    }
}
