//! Host dispatcher: classifies inbound frames, tracks accepted requests
//! until the host settles them, and emits the correlated responses.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use framelink_core::channel::{next_posted, Port, Posted};
use framelink_core::config::HostSection;
use framelink_core::error::{FrameLinkError, Result};
use framelink_core::origin::OriginPolicy;
use framelink_core::protocol::{
    decode_envelope, Action, Message, MessageId, Outcome, SizeReport,
};

use crate::dispatch::registry::PendingRegistry;
use crate::history::{ActionHistory, ActionRecord, RecordStatus};
use crate::obs::HostMetrics;

/// Error text sent when a pending request outlives the configured TTL.
pub const EXPIRED_ERROR: &str = "request expired";

/// Downstream decision maker for accepted actions.
///
/// Implementations must eventually call exactly one of
/// `HostDispatcher::resolve_request` / `reject_request` for the action's id.
/// `on_action` runs on its own task; `on_ready` and `on_resize` run inline on
/// the dispatch loop and must return quickly.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn on_action(&self, host: HostDispatcher, action: PendingAction);

    async fn on_ready(&self, _host: HostDispatcher) {}

    async fn on_resize(&self, _host: HostDispatcher, _size: SizeReport) {}
}

/// An accepted request. `outcome` settles when the host resolves or rejects it.
#[derive(Debug)]
pub struct PendingAction {
    pub message_id: MessageId,
    pub action: Action,
    pub outcome: oneshot::Receiver<Outcome>,
}

/// Why an inbound frame did not reach the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OriginRejected,
    BadEnvelope,
    UnknownType,
    /// A valid message that only the embedded side consumes.
    NotForHost,
    /// Same `messageId` is already pending.
    DuplicateId,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            IgnoreReason::OriginRejected => "origin_rejected",
            IgnoreReason::BadEnvelope => "bad_envelope",
            IgnoreReason::UnknownType => "unknown_type",
            IgnoreReason::NotForHost => "not_for_host",
            IgnoreReason::DuplicateId => "duplicate_id",
        }
    }
}

/// Result of dispatching one inbound frame.
#[derive(Debug)]
pub enum Inbound {
    Ready,
    Resized(SizeReport),
    Action(PendingAction),
    Ignored(IgnoreReason),
}

/// What the host has observed about the embedded frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStatus {
    pub ready: bool,
    pub ready_count: u32,
    pub size: Option<SizeReport>,
}

/// Host-side dispatcher. One per embedded frame; cheap to clone.
#[derive(Clone)]
pub struct HostDispatcher {
    inner: Arc<HostInner>,
}

struct HostInner {
    port: Port,
    policy: OriginPolicy,
    registry: PendingRegistry,
    history: ActionHistory,
    frame: Mutex<FrameStatus>,
    metrics: HostMetrics,
    ttl: Option<Duration>,
}

impl HostDispatcher {
    pub fn new(port: Port, cfg: &HostSection) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(HostInner {
                policy: cfg.origin_policy()?,
                registry: PendingRegistry::new(),
                history: ActionHistory::new(cfg.history_limit),
                frame: Mutex::new(FrameStatus::default()),
                metrics: HostMetrics::default(),
                ttl: cfg.pending_ttl(),
                port,
            }),
        })
    }

    /// Handle one inbound frame.
    pub fn dispatch_incoming(&self, posted: &Posted) -> Inbound {
        let inbound = self.classify(posted);
        let outcome = match &inbound {
            Inbound::Ready => "ready",
            Inbound::Resized(_) => "resized",
            Inbound::Action(_) => "action",
            Inbound::Ignored(reason) => reason.as_str(),
        };
        self.inner.metrics.frames.inc(&[("outcome", outcome)]);
        inbound
    }

    fn classify(&self, posted: &Posted) -> Inbound {
        if !self.inner.policy.allows(&posted.origin) {
            debug!(origin = %posted.origin, "frame from rejected origin dropped");
            return Inbound::Ignored(IgnoreReason::OriginRejected);
        }

        let msg = match decode_envelope(&posted.data).and_then(|env| Message::decode(&env)) {
            Ok(m) => m,
            Err(FrameLinkError::UnknownType(t)) => {
                debug!(msg_type = %t, "unknown message type ignored");
                return Inbound::Ignored(IgnoreReason::UnknownType);
            }
            Err(e) => {
                debug!(error = %e, "undecodable frame ignored");
                return Inbound::Ignored(IgnoreReason::BadEnvelope);
            }
        };

        match msg {
            Message::LifecycleReady => {
                if let Ok(mut f) = self.inner.frame.lock() {
                    f.ready = true;
                    f.ready_count = f.ready_count.saturating_add(1);
                }
                info!("embedded frame ready");
                Inbound::Ready
            }
            Message::SizeChange(size) => {
                if let Ok(mut f) = self.inner.frame.lock() {
                    f.size = Some(size);
                }
                debug!(width = size.width, height = size.height, "embedded frame resized");
                Inbound::Resized(size)
            }
            Message::ActionRequest { message_id, action } => {
                let kind = action.kind();
                let Some(outcome) = self.inner.registry.insert(message_id.clone(), kind) else {
                    warn!(%message_id, %kind, "duplicate request id ignored");
                    return Inbound::Ignored(IgnoreReason::DuplicateId);
                };
                self.inner
                    .history
                    .record(message_id.clone(), kind, action.payload());
                self.inner.metrics.pending.inc(&[]);
                info!(%message_id, %kind, "action request accepted");
                Inbound::Action(PendingAction {
                    message_id,
                    action,
                    outcome,
                })
            }
            Message::ActionResponse { .. } | Message::RenderData(_) => {
                Inbound::Ignored(IgnoreReason::NotForHost)
            }
        }
    }

    /// Resolve a pending request. Unknown or already settled ids are a no-op.
    pub fn resolve_request(&self, message_id: &str, result: Value) -> bool {
        self.settle(message_id, Outcome::Result(result), RecordStatus::Resolved)
    }

    /// Reject a pending request. Unknown or already settled ids are a no-op.
    pub fn reject_request(&self, message_id: &str, error: impl Into<String>) -> bool {
        self.settle(message_id, Outcome::Error(error.into()), RecordStatus::Rejected)
    }

    fn settle(&self, message_id: &str, outcome: Outcome, status: RecordStatus) -> bool {
        let Some(entry) = self.inner.registry.take(message_id) else {
            self.inner.metrics.orphaned.inc(&[("status", status.as_str())]);
            debug!(%message_id, status = status.as_str(), "settle for unknown id ignored");
            return false;
        };
        self.inner.metrics.pending.dec(&[]);

        let response = Message::ActionResponse {
            message_id: MessageId::from(message_id),
            outcome: outcome.clone(),
        };
        if let Err(e) = self.inner.port.post_message(&response) {
            warn!(%message_id, error = %e, "action response not sent");
        }

        // The downstream side may have stopped listening; that is fine.
        let _ = entry.tx.send(outcome);

        self.inner.history.mark(message_id, status);
        self.inner
            .metrics
            .settled
            .inc(&[("kind", entry.kind.as_str()), ("status", status.as_str())]);
        info!(%message_id, kind = %entry.kind, status = status.as_str(), "action settled");
        true
    }

    /// Whether `message_id` still awaits a decision.
    pub fn is_pending(&self, message_id: &str) -> bool {
        self.inner.registry.contains(message_id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Pending ids, oldest first.
    pub fn pending_ids(&self) -> Vec<MessageId> {
        self.inner.registry.ids()
    }

    /// Mark one pending request as the one awaiting human input.
    pub fn select(&self, message_id: &str) -> bool {
        self.inner.registry.select(message_id)
    }

    pub fn selected(&self) -> Option<MessageId> {
        self.inner.registry.selected()
    }

    pub fn clear_selection(&self) {
        self.inner.registry.clear_selection();
    }

    /// Resolve whichever request is currently selected.
    pub fn resolve_selected(&self, result: Value) -> bool {
        match self.selected() {
            Some(id) => self.resolve_request(id.as_str(), result),
            None => false,
        }
    }

    /// Reject every request older than the configured TTL. Returns how many
    /// were expired.
    pub fn expire_stale(&self) -> usize {
        let Some(ttl) = self.inner.ttl else {
            return 0;
        };
        let mut expired = 0;
        for id in self.inner.registry.expired(ttl) {
            let outcome = Outcome::Error(EXPIRED_ERROR.to_string());
            if self.settle(id.as_str(), outcome, RecordStatus::Expired) {
                expired += 1;
            }
        }
        expired
    }

    /// Run `expire_stale` periodically. `None` when expiry is disabled.
    pub fn spawn_expiry_sweeper(&self) -> Option<JoinHandle<()>> {
        let ttl = self.inner.ttl?;
        let every = (ttl / 2).max(Duration::from_millis(250));
        let host = self.clone();
        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let n = host.expire_stale();
                if n > 0 {
                    warn!(expired = n, "pending requests expired");
                }
            }
        }))
    }

    /// Push the one-shot hydration payload to the embedded frame.
    pub fn send_render_data(&self, data: Value) -> Result<()> {
        self.inner.port.post_message(&Message::RenderData(data))?;
        debug!("render data sent");
        Ok(())
    }

    pub fn frame_status(&self) -> FrameStatus {
        self.inner
            .frame
            .lock()
            .map(|f| *f)
            .unwrap_or_default()
    }

    pub fn history(&self) -> Vec<ActionRecord> {
        self.inner.history.snapshot()
    }

    pub fn metrics(&self) -> &HostMetrics {
        &self.inner.metrics
    }

    /// Listen on the channel and feed accepted actions to `handler`, each on
    /// its own task. The listener is attached before this returns.
    pub fn spawn(&self, handler: Arc<dyn ActionHandler>) -> JoinHandle<()> {
        let rx = self.inner.port.subscribe();
        tokio::spawn(self.clone().serve(rx, handler))
    }

    /// Same as `spawn`, on the current task. Runs until the task is dropped.
    pub async fn run(self, handler: Arc<dyn ActionHandler>) {
        let rx = self.inner.port.subscribe();
        self.serve(rx, handler).await;
    }

    async fn serve(self, mut rx: broadcast::Receiver<Posted>, handler: Arc<dyn ActionHandler>) {
        while let Some(posted) = next_posted(&mut rx).await {
            match self.dispatch_incoming(&posted) {
                Inbound::Action(pending) => {
                    let host = self.clone();
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move { handler.on_action(host, pending).await });
                }
                Inbound::Ready => handler.on_ready(self.clone()).await,
                Inbound::Resized(size) => handler.on_resize(self.clone(), size).await,
                Inbound::Ignored(_) => {}
            }
        }
        debug!("host channel closed");
    }
}
