//! Dispatcher module exports.
//!
//! Re-exports the host dispatcher, the downstream handler trait, and the
//! pending registry so consumers can depend on this module directly.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{
    ActionHandler, FrameStatus, HostDispatcher, IgnoreReason, Inbound, PendingAction,
    EXPIRED_ERROR,
};
pub use registry::PendingRegistry;
