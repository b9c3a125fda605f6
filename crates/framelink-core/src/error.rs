//! Shared error type across framelink crates.

use thiserror::Error;

/// Machine-readable error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Running top-level: there is no embedding page to talk to.
    NoParent,
    /// Cancelled by the caller, before or after sending.
    Aborted,
    /// Request deadline elapsed.
    Timeout,
    /// Host answered with `{ error }`.
    RemoteError,
    /// Payload did not match the caller-supplied shape.
    ValidationFailed,
    /// Malformed envelope / payload on the wire.
    BadEnvelope,
    /// Envelope `type` tag is not part of the protocol.
    UnknownType,
    /// Sender origin is not accepted by policy.
    OriginRejected,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Peer side of the channel is gone.
    ChannelClosed,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoParent => "NO_PARENT",
            ErrorCode::Aborted => "ABORTED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::RemoteError => "REMOTE_ERROR",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::BadEnvelope => "BAD_ENVELOPE",
            ErrorCode::UnknownType => "UNKNOWN_TYPE",
            ErrorCode::OriginRejected => "ORIGIN_REJECTED",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::ChannelClosed => "CHANNEL_CLOSED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FrameLinkError>;

/// Unified error type used by the embedded client and the host dispatcher.
#[derive(Debug, Error)]
pub enum FrameLinkError {
    #[error("no parent frame available")]
    NoParent,
    #[error("{}", abort_message(.before_send))]
    Aborted { before_send: bool },
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("{0}")]
    Remote(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("bad envelope: {0}")]
    BadEnvelope(String),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("origin rejected: {0}")]
    OriginRejected(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("channel closed")]
    ChannelClosed,
    #[error("internal: {0}")]
    Internal(String),
}

fn abort_message(before_send: &bool) -> &'static str {
    if *before_send {
        "operation aborted before it began"
    } else {
        "operation aborted"
    }
}

impl FrameLinkError {
    /// Map to a stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            FrameLinkError::NoParent => ErrorCode::NoParent,
            FrameLinkError::Aborted { .. } => ErrorCode::Aborted,
            FrameLinkError::Timeout { .. } => ErrorCode::Timeout,
            FrameLinkError::Remote(_) => ErrorCode::RemoteError,
            FrameLinkError::Validation(_) => ErrorCode::ValidationFailed,
            FrameLinkError::BadEnvelope(_) => ErrorCode::BadEnvelope,
            FrameLinkError::UnknownType(_) => ErrorCode::UnknownType,
            FrameLinkError::OriginRejected(_) => ErrorCode::OriginRejected,
            FrameLinkError::BadConfig(_) => ErrorCode::BadConfig,
            FrameLinkError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            FrameLinkError::ChannelClosed => ErrorCode::ChannelClosed,
            FrameLinkError::Internal(_) => ErrorCode::Internal,
        }
    }
}
