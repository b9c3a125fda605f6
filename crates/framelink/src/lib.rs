//! Top-level facade crate for framelink.
//!
//! Re-exports the core protocol, the embedded client, and the host
//! dispatcher so users can depend on a single crate.

pub mod core {
    pub use framelink_core::*;
}

pub mod embed {
    pub use framelink_embed::*;
}

pub mod host {
    pub use framelink_host::*;
}
