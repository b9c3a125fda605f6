//! Embedded-side client.
//!
//! One client per embedding relationship; no state is shared between
//! instances. The render-data buffer is filled by a capture pump that starts
//! listening as soon as the client is attached, so a host push that races
//! ahead of the consumer is never lost.

use std::future::pending;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use framelink_core::capture::CaptureLog;
use framelink_core::channel::{next_posted, Port, Posted};
use framelink_core::config::EmbedSection;
use framelink_core::error::{FrameLinkError, Result};
use framelink_core::origin::OriginPolicy;
use framelink_core::protocol::{
    decode_envelope, tags, Action, Message, MessageId, Outcome,
};
use framelink_core::validate::Validator;

use crate::layout::Layout;
use crate::options::RequestOptions;

/// Handle to the embedded side of a frame link. Cheap to clone.
#[derive(Clone)]
pub struct EmbeddedClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    parent: Option<Port>,
    parent_policy: OriginPolicy,
    render_data: Arc<CaptureLog<Value>>,
    layout: Arc<dyn Layout>,
    ready_sent: AtomicBool,
    default_timeout: Option<Duration>,
    pump: Option<JoinHandle<()>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl EmbeddedClient {
    /// Attach to the embedding page through `parent`.
    ///
    /// Must be called inside a Tokio runtime: the render-data capture pump is
    /// subscribed synchronously here and then spawned.
    pub fn attach(parent: Port, cfg: &EmbedSection, layout: Arc<dyn Layout>) -> Result<Self> {
        let parent_policy = cfg.origin_policy()?;
        let render_data = Arc::new(CaptureLog::new());

        let rx = parent.subscribe();
        let pump = tokio::spawn(capture_render_data(
            rx,
            parent_policy.clone(),
            Arc::clone(&render_data),
        ));

        debug!(origin = %parent.origin(), "embedded client attached");

        Ok(Self {
            inner: Arc::new(ClientInner {
                parent: Some(parent),
                parent_policy,
                render_data,
                layout,
                ready_sent: AtomicBool::new(false),
                default_timeout: cfg.request_timeout(),
                pump: Some(pump),
            }),
        })
    }

    /// Client running top-level, with no embedding page.
    ///
    /// Requests reject with `NoParent` without sending; lifecycle calls are
    /// skipped.
    pub fn top_level(cfg: &EmbedSection, layout: Arc<dyn Layout>) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(ClientInner {
                parent: None,
                parent_policy: cfg.origin_policy()?,
                render_data: Arc::new(CaptureLog::new()),
                layout,
                ready_sent: AtomicBool::new(false),
                default_timeout: cfg.request_timeout(),
                pump: None,
            }),
        })
    }

    pub fn has_parent(&self) -> bool {
        self.inner.parent.is_some()
    }

    /// Every render-data payload captured so far, in arrival order.
    pub fn render_data_log(&self) -> Vec<Value> {
        self.inner.render_data.snapshot()
    }

    /// Announce readiness (first call only), then report size once layout
    /// has had a turn to settle. Later calls only re-report size.
    pub fn init_lifecycle(&self) {
        let Some(parent) = &self.inner.parent else {
            debug!("no parent frame; lifecycle notifications skipped");
            return;
        };

        if !self.inner.ready_sent.swap(true, Ordering::SeqCst) {
            match parent.post_message(&Message::LifecycleReady) {
                Ok(()) => info!("lifecycle ready sent"),
                Err(e) => warn!(error = %e, "lifecycle ready not sent"),
            }
        }

        let this = self.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            this.report_size();
        });
    }

    /// Send the current content size to the host.
    pub fn report_size(&self) {
        let Some(parent) = &self.inner.parent else {
            return;
        };
        let size = self.inner.layout.content_size();
        match parent.post_message(&Message::SizeChange(size)) {
            Ok(()) => debug!(width = size.width, height = size.height, "size reported"),
            Err(e) => warn!(error = %e, "size report not sent"),
        }
    }

    /// First render-data payload, whether it arrived before or after this call.
    pub async fn await_render_data<V: Validator>(&self, validator: V) -> Result<V::Output> {
        let data = self.inner.render_data.wait_first().await?;
        validator.validate(data).map_err(|e| {
            warn!(error = %e, "invalid render data");
            FrameLinkError::Validation(e)
        })
    }

    /// Send one action request and resolve with its correlated response.
    ///
    /// Pre-send checks and the send itself happen before this returns; the
    /// returned future owns the per-request listener and drops it on every
    /// terminal path.
    pub fn request_action<V: Validator>(
        &self,
        action: Action,
        opts: RequestOptions<V>,
    ) -> BoxFuture<'static, Result<V::Output>> {
        let message_id = MessageId::generate();
        let kind = action.kind();

        if opts.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            debug!(%message_id, %kind, "request aborted before send");
            return future::ready(Err(FrameLinkError::Aborted { before_send: true })).boxed();
        }

        let Some(parent) = self.inner.parent.clone() else {
            info!(%message_id, %kind, payload = %action.payload(), "no parent frame available; request not sent");
            return future::ready(Err(FrameLinkError::NoParent)).boxed();
        };

        // Listener goes up before the request leaves so a fast reply is seen.
        let mut rx = parent.subscribe();
        let msg = Message::ActionRequest {
            message_id: message_id.clone(),
            action,
        };
        if let Err(e) = parent.post_message(&msg) {
            return future::ready(Err(e)).boxed();
        }
        debug!(%message_id, %kind, "action request sent");

        let policy = self.inner.parent_policy.clone();
        let timeout = opts.timeout.or(self.inner.default_timeout);
        let RequestOptions {
            validator, cancel, ..
        } = opts;

        async move {
            let outcome = await_response(&mut rx, &message_id, &policy, cancel, timeout).await;
            drop(rx);

            match outcome {
                Ok(Outcome::Result(value)) => validator.validate(value).map_err(|e| {
                    warn!(%message_id, error = %e, "response failed validation");
                    FrameLinkError::Validation(e)
                }),
                Ok(Outcome::Error(e)) => {
                    debug!(%message_id, error = %e, "host rejected request");
                    Err(FrameLinkError::Remote(e))
                }
                Err(e) => {
                    debug!(%message_id, error = %e, "request settled locally");
                    Err(e)
                }
            }
        }
        .boxed()
    }

    /// Ask the host to run a tool.
    pub fn call_tool<V: Validator>(
        &self,
        tool_name: impl Into<String>,
        params: Value,
        opts: RequestOptions<V>,
    ) -> BoxFuture<'static, Result<V::Output>> {
        self.request_action(
            Action::InvokeOperation {
                tool_name: tool_name.into(),
                params,
            },
            opts,
        )
    }

    /// Submit free text to the agent.
    pub fn send_prompt<V: Validator>(
        &self,
        prompt: impl Into<String>,
        opts: RequestOptions<V>,
    ) -> BoxFuture<'static, Result<V::Output>> {
        self.request_action(
            Action::SubmitText {
                prompt: prompt.into(),
            },
            opts,
        )
    }

    /// Ask the host to open a link.
    pub fn navigate_to_link<V: Validator>(
        &self,
        url: impl Into<String>,
        opts: RequestOptions<V>,
    ) -> BoxFuture<'static, Result<V::Output>> {
        self.request_action(Action::Navigate { url: url.into() }, opts)
    }

    pub fn notify<V: Validator>(
        &self,
        message: impl Into<String>,
        opts: RequestOptions<V>,
    ) -> BoxFuture<'static, Result<V::Output>> {
        self.request_action(
            Action::Notify {
                message: message.into(),
            },
            opts,
        )
    }

    pub fn send_intent<V: Validator>(
        &self,
        intent: impl Into<String>,
        params: Value,
        opts: RequestOptions<V>,
    ) -> BoxFuture<'static, Result<V::Output>> {
        self.request_action(
            Action::Intent {
                intent: intent.into(),
                params,
            },
            opts,
        )
    }
}

/// Wait for the response matching `id`, a cancellation, or the deadline.
async fn await_response(
    rx: &mut broadcast::Receiver<Posted>,
    id: &MessageId,
    policy: &OriginPolicy,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
) -> Result<Outcome> {
    let cancelled = async {
        match &cancel {
            Some(token) => token.cancelled().await,
            None => pending().await,
        }
    };
    let deadline = async {
        match timeout {
            Some(d) => tokio::time::sleep(d).await,
            None => pending().await,
        }
    };
    let after_ms = timeout.map(|d| d.as_millis() as u64).unwrap_or_default();

    tokio::select! {
        biased;
        _ = cancelled => Err(FrameLinkError::Aborted { before_send: false }),
        _ = deadline => Err(FrameLinkError::Timeout { after_ms }),
        r = next_response(rx, id, policy) => r,
    }
}

async fn next_response(
    rx: &mut broadcast::Receiver<Posted>,
    id: &MessageId,
    policy: &OriginPolicy,
) -> Result<Outcome> {
    loop {
        let posted = next_posted(rx).await.ok_or(FrameLinkError::ChannelClosed)?;
        if !policy.allows(&posted.origin) {
            debug!(origin = %posted.origin, "frame from rejected origin ignored");
            continue;
        }

        // Header first: most traffic here is not ours.
        let Ok(env) = decode_envelope(&posted.data) else {
            continue;
        };
        if env.msg_type != tags::ACTION_RESPONSE || env.message_id.as_deref() != Some(id.as_str()) {
            continue;
        }

        match Message::decode(&env) {
            Ok(Message::ActionResponse { outcome, .. }) => return Ok(outcome),
            Ok(other) => {
                debug!(msg_type = other.type_tag(), "unexpected message for response ignored");
            }
            Err(e) => {
                debug!(message_id = %id, error = %e, "undecodable response ignored");
            }
        }
    }
}

/// Capture pump: append every accepted render-data payload to the buffer.
async fn capture_render_data(
    mut rx: broadcast::Receiver<Posted>,
    policy: OriginPolicy,
    log: Arc<CaptureLog<Value>>,
) {
    while let Some(posted) = next_posted(&mut rx).await {
        if !policy.allows(&posted.origin) {
            debug!(origin = %posted.origin, "render data from rejected origin ignored");
            continue;
        }
        let Ok(env) = decode_envelope(&posted.data) else {
            continue;
        };
        if env.msg_type != tags::RENDER_DATA {
            continue;
        }
        match Message::decode(&env) {
            Ok(Message::RenderData(data)) => {
                log.record(data);
                debug!(captured = log.len(), "render data captured");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "malformed render data ignored"),
        }
    }
}
