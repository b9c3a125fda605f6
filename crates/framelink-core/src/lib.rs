//! framelink core: transport-agnostic protocol primitives shared by the
//! embedded client and the host dispatcher.
//!
//! This crate defines the wire contract (envelopes and the closed message
//! taxonomy), correlation ids, payload validators, origin policy, the
//! capture-then-attach log, the in-process channel pair, config, and the
//! error surface.
//!
//! # Panic policy
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed or foreign frames surface as `FrameLinkError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod capture;
pub mod channel;
pub mod config;
pub mod error;
pub mod origin;
pub mod protocol;
pub mod validate;

/// Shared error surface.
pub use error::{ErrorCode, FrameLinkError, Result};
