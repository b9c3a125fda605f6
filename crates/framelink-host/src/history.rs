//! Bounded action history for observability (most recent last).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;

use framelink_core::protocol::{ActionKind, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Resolved,
    Rejected,
    Expired,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Resolved => "resolved",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub message_id: MessageId,
    pub kind: ActionKind,
    pub payload: Value,
    pub status: RecordStatus,
    pub received_at: Instant,
}

pub struct ActionHistory {
    limit: usize,
    records: Mutex<VecDeque<ActionRecord>>,
}

impl ActionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, message_id: MessageId, kind: ActionKind, payload: Value) {
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if records.len() >= self.limit {
            records.pop_front();
        }
        records.push_back(ActionRecord {
            message_id,
            kind,
            payload,
            status: RecordStatus::Pending,
            received_at: Instant::now(),
        });
    }

    pub fn mark(&self, message_id: &str, status: RecordStatus) {
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if let Some(r) = records
            .iter_mut()
            .rev()
            .find(|r| r.message_id.as_str() == message_id)
        {
            r.status = status;
        }
    }

    pub fn snapshot(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bounded_and_marked() {
        let h = ActionHistory::new(2);
        h.record("a".into(), ActionKind::Notify, json!({ "message": "1" }));
        h.record("b".into(), ActionKind::Notify, json!({ "message": "2" }));
        h.record("c".into(), ActionKind::Navigate, json!({ "url": "u" }));
        h.mark("c", RecordStatus::Resolved);
        h.mark("a", RecordStatus::Rejected);

        let snap = h.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].message_id.as_str(), "b");
        assert_eq!(snap[0].status, RecordStatus::Pending);
        assert_eq!(snap[1].status, RecordStatus::Resolved);
    }
}
