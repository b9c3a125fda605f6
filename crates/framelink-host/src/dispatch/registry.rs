//! Pending request registry keyed by `messageId`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use framelink_core::protocol::{ActionKind, MessageId, Outcome};

/// One in-flight request awaiting a host decision.
pub(crate) struct PendingEntry {
    pub kind: ActionKind,
    pub tx: oneshot::Sender<Outcome>,
    pub created: Instant,
}

/// Pending request registry:
/// - `message_id -> (kind, resolver, created)`
/// - at most one entry per id; removed exactly once, on settle
/// - optional single "selected" id for human-in-the-loop decisions
#[derive(Default)]
pub struct PendingRegistry {
    entries: DashMap<MessageId, PendingEntry>,
    selected: Mutex<Option<MessageId>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`. Returns `None` if it is already pending.
    pub(crate) fn insert(&self, id: MessageId, kind: ActionKind) -> Option<oneshot::Receiver<Outcome>> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(v) => {
                let (tx, rx) = oneshot::channel();
                v.insert(PendingEntry {
                    kind,
                    tx,
                    created: Instant::now(),
                });
                Some(rx)
            }
        }
    }

    /// Remove and return the entry. Only one caller can ever win this.
    pub(crate) fn take(&self, id: &str) -> Option<PendingEntry> {
        let (id, entry) = self.entries.remove(id)?;
        if let Ok(mut sel) = self.selected.lock() {
            if sel.as_ref() == Some(&id) {
                *sel = None;
            }
        }
        Some(entry)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending ids, oldest first.
    pub fn ids(&self) -> Vec<MessageId> {
        let mut v: Vec<(Instant, MessageId)> = self
            .entries
            .iter()
            .map(|e| (e.value().created, e.key().clone()))
            .collect();
        v.sort();
        v.into_iter().map(|(_, id)| id).collect()
    }

    /// Ids older than `ttl`.
    pub fn expired(&self, ttl: Duration) -> Vec<MessageId> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| now.duration_since(e.value().created) >= ttl)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Select `id` for a decision. Fails if it is not pending or another
    /// pending id is already selected.
    pub fn select(&self, id: &str) -> bool {
        let Ok(mut sel) = self.selected.lock() else {
            return false;
        };
        if !self.entries.contains_key(id) {
            return false;
        }
        match sel.as_ref() {
            Some(cur) if cur.as_str() != id && self.entries.contains_key(cur.as_str()) => false,
            _ => {
                *sel = Some(MessageId::from(id));
                true
            }
        }
    }

    pub fn selected(&self) -> Option<MessageId> {
        self.selected.lock().ok().and_then(|s| s.clone())
    }

    pub fn clear_selection(&self) {
        if let Ok(mut sel) = self.selected.lock() {
            *sel = None;
        }
    }
}
