//! In-process cross-context channel.
//!
//! Models the platform post-message primitive: untyped, fire-and-forget,
//! broadcast to every listener on the receiving side, and carrying only the
//! sender's origin as metadata. There is no delivery confirmation and no
//! request/response pairing here; that is layered on top by the peers.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::protocol::Message;

/// One delivered frame (the "message event").
#[derive(Debug, Clone)]
pub struct Posted {
    /// Origin of the sending context.
    pub origin: Arc<str>,
    /// Serialized envelope.
    pub data: Bytes,
}

/// One side of a host <-> frame pair.
///
/// Cloning a port yields another handle on the same side; any holder can
/// post or listen, which is also how third parties sharing the channel are
/// modelled.
#[derive(Debug, Clone)]
pub struct Port {
    origin: Arc<str>,
    inbound: broadcast::Sender<Posted>,
    outbound: broadcast::Sender<Posted>,
}

/// Create a connected pair: `(host_port, frame_port)`.
pub fn channel(
    host_origin: impl Into<Arc<str>>,
    frame_origin: impl Into<Arc<str>>,
    capacity: usize,
) -> (Port, Port) {
    let capacity = capacity.max(1);
    let (to_host, _) = broadcast::channel(capacity);
    let (to_frame, _) = broadcast::channel(capacity);

    let host = Port {
        origin: host_origin.into(),
        inbound: to_host.clone(),
        outbound: to_frame.clone(),
    };
    let frame = Port {
        origin: frame_origin.into(),
        inbound: to_frame,
        outbound: to_host,
    };
    (host, frame)
}

impl Port {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Post raw bytes to the other side. Never blocks; silently dropped if
    /// nobody is listening.
    pub fn post(&self, data: Bytes) {
        let _ = self.outbound.send(Posted {
            origin: Arc::clone(&self.origin),
            data,
        });
    }

    /// Encode and post a typed message.
    pub fn post_message(&self, msg: &Message) -> Result<()> {
        let data = msg.encode()?;
        self.post(data);
        Ok(())
    }

    /// Deliver an arbitrary frame to the other side under a chosen origin.
    pub fn inject(&self, origin: &str, data: impl Into<Bytes>) {
        let _ = self.outbound.send(Posted {
            origin: Arc::from(origin),
            data: data.into(),
        });
    }

    /// Attach a listener for frames posted to this side. Dropping the
    /// receiver detaches it.
    pub fn subscribe(&self) -> broadcast::Receiver<Posted> {
        self.inbound.subscribe()
    }

    /// Number of listeners currently attached to this side.
    pub fn listener_count(&self) -> usize {
        self.inbound.receiver_count()
    }
}

/// Next frame for a listener. Lagging listeners skip the overwritten frames
/// and keep going; `None` once every port handle is gone.
pub async fn next_posted(rx: &mut broadcast::Receiver<Posted>) -> Option<Posted> {
    loop {
        match rx.recv().await {
            Ok(p) => return Some(p),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "channel listener lagged; frames dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn frames_cross_sides_with_sender_origin() {
        let (host, frame) = channel("https://host.test", "https://frame.test", 8);
        let mut host_rx = host.subscribe();
        let mut frame_rx = frame.subscribe();

        frame.post_message(&Message::LifecycleReady).unwrap();
        let p = next_posted(&mut host_rx).await.unwrap();
        assert_eq!(&*p.origin, "https://frame.test");
        assert_eq!(Message::decode_frame(&p.data).unwrap(), Message::LifecycleReady);

        host.inject("https://evil.test", &b"{}"[..]);
        let p = next_posted(&mut frame_rx).await.unwrap();
        assert_eq!(&*p.origin, "https://evil.test");
    }

    #[test]
    fn dropping_receiver_detaches() {
        let (host, _frame) = channel("h", "f", 8);
        let rx = host.subscribe();
        assert_eq!(host.listener_count(), 1);
        drop(rx);
        assert_eq!(host.listener_count(), 0);
    }
}
