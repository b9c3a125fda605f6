//! Protocol modules (envelope + message taxonomy).
//!
//! Every frame crossing the channel is a JSON envelope
//! `{ type, messageId?, payload? }`:
//! - `envelope`: boundary decode into `WireEnvelope` with a raw, lazily parsed payload.
//! - `message`: the closed `Message` union the rest of the code works with.
//!
//! Decoders are panic-free: malformed or foreign frames surface as
//! `FrameLinkError` and the caller decides whether to ignore them.

pub mod envelope;
pub mod message;

pub use envelope::{decode_envelope, WireEnvelope};
pub use message::{tags, Action, ActionKind, Message, MessageId, Outcome, SizeReport};
