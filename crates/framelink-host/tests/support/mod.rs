//! Shared wiring for host/embedded end-to-end tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use framelink_core::channel::{self, next_posted, Port, Posted};
use framelink_core::config::{self, LinkConfig};
use framelink_core::protocol::decode_envelope;
use framelink_embed::{EmbeddedClient, FixedLayout};
use framelink_host::{HostDispatcher, Inbound, PendingAction};

pub const HOST_ORIGIN: &str = "https://host.test";
pub const FRAME_ORIGIN: &str = "https://frame.test";
pub const EVIL_ORIGIN: &str = "https://evil.test";

pub struct Link {
    pub host: HostDispatcher,
    pub client: EmbeddedClient,
    pub host_port: Port,
    pub frame_port: Port,
    pub layout: Arc<FixedLayout>,
}

/// Both sides only accept each other's origin.
pub fn strict_config(extra_host: &str) -> LinkConfig {
    let yaml = format!(
        r#"
version: 1
channel:
  capacity: 64
host:
  origin: "{HOST_ORIGIN}"
  allowed_frame_origins: ["{FRAME_ORIGIN}"]
{extra_host}
embed:
  origin: "{FRAME_ORIGIN}"
  allowed_parent_origins: ["{HOST_ORIGIN}"]
"#
    );
    config::load_from_str(&yaml).unwrap()
}

pub fn link_with(cfg: LinkConfig) -> Link {
    let (host_port, frame_port) =
        channel::channel(cfg.host.origin.as_str(), cfg.embed.origin.as_str(), cfg.channel.capacity);
    let host = HostDispatcher::new(host_port.clone(), &cfg.host).unwrap();
    let layout = Arc::new(FixedLayout::new(800, 420));
    let client = EmbeddedClient::attach(frame_port.clone(), &cfg.embed, layout.clone()).unwrap();
    Link {
        host,
        client,
        host_port,
        frame_port,
        layout,
    }
}

pub fn link() -> Link {
    link_with(strict_config(""))
}

/// Feed every frame reaching the host through `dispatch_incoming`.
pub fn pump_host(link: &Link) -> mpsc::UnboundedReceiver<Inbound> {
    let mut rx = link.host_port.subscribe();
    let host = link.host.clone();
    let (tx, out) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(p) = next_posted(&mut rx).await {
            if tx.send(host.dispatch_incoming(&p)).is_err() {
                break;
            }
        }
    });
    out
}

pub async fn next_inbound(rx: &mut mpsc::UnboundedReceiver<Inbound>) -> Inbound {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("host saw nothing")
        .expect("host pump stopped")
}

pub async fn next_action(rx: &mut mpsc::UnboundedReceiver<Inbound>) -> PendingAction {
    loop {
        if let Inbound::Action(p) = next_inbound(rx).await {
            return p;
        }
    }
}

/// `type` tags of every frame queued on a raw listener, without waiting.
pub fn drain_types(rx: &mut broadcast::Receiver<Posted>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(p) = rx.try_recv() {
        if let Ok(env) = decode_envelope(&p.data) {
            out.push(env.msg_type);
        }
    }
    out
}

/// Let spawned tasks on the current-thread runtime make progress.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
