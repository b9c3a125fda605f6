//! framelink loopback
//!
//! Wires a host dispatcher and an embedded client over an in-process frame
//! channel and drives one full session:
//! - render data push before the client consumes it
//! - lifecycle ready + size report
//! - one action of each kind, settled by a logging handler
//!
//! Usage: `framelink-loopback [config.yaml]` (`RUST_LOG=debug` for frame-level logs).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use framelink_core::channel;
use framelink_core::config::{self, LinkConfig};
use framelink_core::protocol::{Action, SizeReport};
use framelink_core::validate::Unvalidated;
use framelink_core::Result;
use framelink_embed::{EmbeddedClient, FixedLayout, RequestOptions};
use framelink_host::{ActionHandler, HostDispatcher, PendingAction};

/// Resolves tools and links, rejects prompts (no agent attached), and
/// acknowledges notifications and intents.
struct LoopbackHandler;

#[async_trait]
impl ActionHandler for LoopbackHandler {
    async fn on_action(&self, host: HostDispatcher, pending: PendingAction) {
        let id = pending.message_id.as_str();
        match &pending.action {
            Action::InvokeOperation { tool_name, params } => {
                tracing::info!(%tool_name, %params, "tool call");
                host.resolve_request(id, json!({ "success": true, "tool": tool_name }));
            }
            Action::SubmitText { prompt } => {
                tracing::info!(%prompt, "prompt");
                host.reject_request(id, "no agent attached to the loopback host");
            }
            Action::Navigate { url } => {
                tracing::info!(%url, "link");
                host.resolve_request(id, json!({ "opened": url }));
            }
            Action::Notify { message } => {
                tracing::info!(%message, "notification");
                host.resolve_request(id, json!({ "status": "handled" }));
            }
            Action::Intent { intent, params } => {
                tracing::info!(%intent, %params, "intent");
                host.resolve_request(id, json!({ "status": "handled" }));
            }
        }
    }

    async fn on_resize(&self, _host: HostDispatcher, size: SizeReport) {
        tracing::info!(width = size.width, height = size.height, "frame resized");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => config::load_from_file(&path)?,
        None => LinkConfig::default(),
    };

    let (host_port, frame_port) = channel::channel(
        cfg.host.origin.as_str(),
        cfg.embed.origin.as_str(),
        cfg.channel.capacity,
    );

    let host = HostDispatcher::new(host_port, &cfg.host)?;
    let server = host.spawn(Arc::new(LoopbackHandler));
    let sweeper = host.spawn_expiry_sweeper();

    let layout = Arc::new(FixedLayout::new(800, 420));
    let client = EmbeddedClient::attach(frame_port, &cfg.embed, layout)?;

    host.send_render_data(json!({ "entry": { "id": 3, "title": "A" } }))?;
    client.init_lifecycle();

    let data = client.await_render_data(Unvalidated).await?;
    tracing::info!(%data, "render data received");

    let tool = client
        .call_tool("delete_entry", json!({ "id": 7 }), RequestOptions::new())
        .await;
    let prompt = client.send_prompt("summarize my journal", RequestOptions::new()).await;
    let link = client
        .navigate_to_link("https://example.com", RequestOptions::new())
        .await;
    let notify = client.notify("saved", RequestOptions::new()).await;
    let intent = client
        .send_intent("share", json!({ "entryId": 3 }), RequestOptions::new())
        .await;

    for (name, res) in [
        ("tool", tool),
        ("prompt", prompt),
        ("link", link),
        ("notify", notify),
        ("intent", intent),
    ] {
        match res {
            Ok(v) => tracing::info!(action = name, result = %v, "resolved"),
            Err(e) => tracing::warn!(action = name, code = e.code().as_str(), error = %e, "rejected"),
        }
    }

    for r in host.history() {
        tracing::info!(
            message_id = %r.message_id,
            kind = %r.kind,
            status = r.status.as_str(),
            "history"
        );
    }
    tracing::info!(status = ?host.frame_status(), "frame");
    print!("{}", host.metrics().render());

    server.abort();
    if let Some(s) = sweeper {
        s.abort();
    }
    Ok(())
}
