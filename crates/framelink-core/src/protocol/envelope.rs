//! Wire envelope (JSON).
//!
//! The payload is kept as `RawValue` so it is only parsed once the `type`
//! tag has selected the shape it must have.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{FrameLinkError, Result};

/// Envelope as it arrives on the channel.
///
/// Unknown top-level fields are tolerated: other content sharing the
/// channel may decorate its frames.
#[derive(Debug, Deserialize)]
pub struct WireEnvelope {
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Correlation id, present on action requests and responses only.
    #[serde(default, rename = "messageId")]
    pub message_id: Option<String>,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

/// Decode one frame into an envelope header without touching the payload.
pub fn decode_envelope(data: &[u8]) -> Result<WireEnvelope> {
    serde_json::from_slice(data)
        .map_err(|e| FrameLinkError::BadEnvelope(format!("invalid envelope json: {e}")))
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(rename = "type")]
    msg_type: &'a str,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    message_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

/// Serialize an envelope into frame bytes.
pub(crate) fn encode_envelope(
    msg_type: &str,
    message_id: Option<&str>,
    payload: Option<Value>,
) -> Result<Bytes> {
    let env = OutboundEnvelope {
        msg_type,
        message_id,
        payload,
    };
    serde_json::to_vec(&env)
        .map(Bytes::from)
        .map_err(|e| FrameLinkError::Internal(format!("envelope encode failed: {e}")))
}
