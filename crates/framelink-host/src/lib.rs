//! framelink host library.
//!
//! Runs in the embedding page. Wires the frame channel, origin policy,
//! pending request registry, action history, and metrics into a
//! `HostDispatcher`, and hands every accepted action to a downstream
//! `ActionHandler` that decides its outcome.

pub mod dispatch;
pub mod history;
pub mod obs;

pub use dispatch::{ActionHandler, HostDispatcher, Inbound, PendingAction};
pub use history::{ActionRecord, RecordStatus};
