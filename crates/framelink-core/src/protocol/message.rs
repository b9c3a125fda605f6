//! Closed message taxonomy.
//!
//! `Message` is decoded from a `WireEnvelope` at the channel boundary; nothing
//! past that point compares raw `type` strings.

use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{FrameLinkError, Result};
use crate::protocol::envelope::{decode_envelope, encode_envelope, WireEnvelope};

/// `type` tags on the wire.
pub mod tags {
    pub const LIFECYCLE_READY: &str = "ui-lifecycle-iframe-ready";
    pub const SIZE_CHANGE: &str = "ui-size-change";
    pub const RENDER_DATA: &str = "ui-lifecycle-iframe-render-data";
    pub const ACTION_RESPONSE: &str = "ui-message-response";

    pub const TOOL: &str = "tool";
    pub const PROMPT: &str = "prompt";
    pub const LINK: &str = "link";
    pub const NOTIFY: &str = "notify";
    pub const INTENT: &str = "intent";
}

/// Opaque correlation id linking a request to its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Rendered content box of the embedded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    pub height: u32,
    pub width: u32,
}

/// Discriminant of an action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    InvokeOperation,
    SubmitText,
    Navigate,
    Notify,
    Intent,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::InvokeOperation,
        ActionKind::SubmitText,
        ActionKind::Navigate,
        ActionKind::Notify,
        ActionKind::Intent,
    ];

    /// Wire `type` tag.
    pub fn tag(self) -> &'static str {
        match self {
            ActionKind::InvokeOperation => tags::TOOL,
            ActionKind::SubmitText => tags::PROMPT,
            ActionKind::Navigate => tags::LINK,
            ActionKind::Notify => tags::NOTIFY,
            ActionKind::Intent => tags::INTENT,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Human-readable name used in logs and history.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::InvokeOperation => "invoke-operation",
            ActionKind::SubmitText => "submit-text",
            ActionKind::Navigate => "navigate",
            ActionKind::Notify => "notify",
            ActionKind::Intent => "intent",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation the embedded fragment asks the host to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run a named tool with parameters.
    InvokeOperation { tool_name: String, params: Value },
    /// Submit free text to the agent.
    SubmitText { prompt: String },
    /// Open a URL in the host.
    Navigate { url: String },
    /// Informational notice; hosts usually acknowledge it.
    Notify { message: String },
    /// Application-defined intent with parameters.
    Intent { intent: String, params: Value },
}

#[derive(Serialize, Deserialize)]
struct ToolPayload {
    #[serde(rename = "toolName")]
    tool_name: String,
    #[serde(default = "empty_object")]
    params: Value,
}

#[derive(Serialize, Deserialize)]
struct PromptPayload {
    prompt: String,
}

#[derive(Serialize, Deserialize)]
struct LinkPayload {
    url: String,
}

#[derive(Serialize, Deserialize)]
struct NotifyPayload {
    message: String,
}

#[derive(Serialize, Deserialize)]
struct IntentPayload {
    intent: String,
    #[serde(default = "empty_object")]
    params: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::InvokeOperation { .. } => ActionKind::InvokeOperation,
            Action::SubmitText { .. } => ActionKind::SubmitText,
            Action::Navigate { .. } => ActionKind::Navigate,
            Action::Notify { .. } => ActionKind::Notify,
            Action::Intent { .. } => ActionKind::Intent,
        }
    }

    /// Wire payload for this action.
    pub fn payload(&self) -> Value {
        match self {
            Action::InvokeOperation { tool_name, params } => {
                json!({ "toolName": tool_name, "params": params })
            }
            Action::SubmitText { prompt } => json!({ "prompt": prompt }),
            Action::Navigate { url } => json!({ "url": url }),
            Action::Notify { message } => json!({ "message": message }),
            Action::Intent { intent, params } => json!({ "intent": intent, "params": params }),
        }
    }

    fn decode(kind: ActionKind, env: &WireEnvelope) -> Result<Self> {
        let tag = kind.tag();
        Ok(match kind {
            ActionKind::InvokeOperation => {
                let p: ToolPayload = parse_payload(env, tag)?;
                Action::InvokeOperation {
                    tool_name: p.tool_name,
                    params: p.params,
                }
            }
            ActionKind::SubmitText => {
                let p: PromptPayload = parse_payload(env, tag)?;
                Action::SubmitText { prompt: p.prompt }
            }
            ActionKind::Navigate => {
                let p: LinkPayload = parse_payload(env, tag)?;
                Action::Navigate { url: p.url }
            }
            ActionKind::Notify => {
                let p: NotifyPayload = parse_payload(env, tag)?;
                Action::Notify { message: p.message }
            }
            ActionKind::Intent => {
                let p: IntentPayload = parse_payload(env, tag)?;
                Action::Intent {
                    intent: p.intent,
                    params: p.params,
                }
            }
        })
    }
}

/// Settled outcome carried by an action response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(String),
}

#[derive(Deserialize)]
struct ResponsePayload {
    #[serde(default, alias = "response")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct RenderDataPayload {
    #[serde(rename = "renderData")]
    render_data: Value,
}

/// A decoded envelope. One variant per message type.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Embedded fragment finished its first paint.
    LifecycleReady,
    /// Current rendered size of the embedded fragment.
    SizeChange(SizeReport),
    /// Correlated request from the embedded fragment.
    ActionRequest { message_id: MessageId, action: Action },
    /// Host answer to exactly one prior request.
    ActionResponse { message_id: MessageId, outcome: Outcome },
    /// One-shot hydration data pushed by the host.
    RenderData(Value),
}

impl Message {
    /// Decode a raw frame (envelope + payload).
    pub fn decode_frame(data: &[u8]) -> Result<Self> {
        let env = decode_envelope(data)?;
        Self::decode(&env)
    }

    /// Decode a boundary envelope into a typed message.
    pub fn decode(env: &WireEnvelope) -> Result<Self> {
        let tag = env.msg_type.as_str();

        if let Some(kind) = ActionKind::from_tag(tag) {
            let message_id = require_id(env, tag)?;
            let action = Action::decode(kind, env)?;
            return Ok(Message::ActionRequest { message_id, action });
        }

        match tag {
            tags::LIFECYCLE_READY => Ok(Message::LifecycleReady),
            tags::SIZE_CHANGE => Ok(Message::SizeChange(parse_payload(env, tag)?)),
            tags::RENDER_DATA => {
                let p: RenderDataPayload = parse_payload(env, tag)?;
                Ok(Message::RenderData(p.render_data))
            }
            tags::ACTION_RESPONSE => {
                let message_id = require_id(env, tag)?;
                let p: ResponsePayload = parse_payload(env, tag)?;
                let outcome = match p.error {
                    Some(e) if !e.is_empty() => Outcome::Error(e),
                    _ => Outcome::Result(p.result.unwrap_or(Value::Null)),
                };
                Ok(Message::ActionResponse {
                    message_id,
                    outcome,
                })
            }
            other => Err(FrameLinkError::UnknownType(other.to_string())),
        }
    }

    /// Wire `type` tag of this message.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Message::LifecycleReady => tags::LIFECYCLE_READY,
            Message::SizeChange(_) => tags::SIZE_CHANGE,
            Message::ActionRequest { action, .. } => action.kind().tag(),
            Message::ActionResponse { .. } => tags::ACTION_RESPONSE,
            Message::RenderData(_) => tags::RENDER_DATA,
        }
    }

    /// Correlation id for requests and responses; `None` for notifications.
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Message::ActionRequest { message_id, .. }
            | Message::ActionResponse { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    /// Serialize into frame bytes.
    pub fn encode(&self) -> Result<Bytes> {
        let payload = match self {
            Message::LifecycleReady => None,
            Message::SizeChange(size) => Some(json!({ "height": size.height, "width": size.width })),
            Message::ActionRequest { action, .. } => Some(action.payload()),
            Message::ActionResponse { outcome, .. } => Some(match outcome {
                Outcome::Result(v) => json!({ "result": v }),
                Outcome::Error(e) => json!({ "error": e }),
            }),
            Message::RenderData(v) => Some(json!({ "renderData": v })),
        };
        encode_envelope(
            self.type_tag(),
            self.message_id().map(MessageId::as_str),
            payload,
        )
    }
}

fn require_id(env: &WireEnvelope, tag: &str) -> Result<MessageId> {
    match env.message_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(MessageId::from(id)),
        _ => Err(FrameLinkError::BadEnvelope(format!("{tag} requires messageId"))),
    }
}

fn parse_payload<T: DeserializeOwned>(env: &WireEnvelope, tag: &str) -> Result<T> {
    let raw = env
        .payload
        .as_ref()
        .ok_or_else(|| FrameLinkError::BadEnvelope(format!("{tag} requires payload")))?;
    serde_json::from_str(raw.get())
        .map_err(|e| FrameLinkError::BadEnvelope(format!("{tag} invalid payload: {e}")))
}
