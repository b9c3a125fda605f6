//! framelink embedded client.
//!
//! Runs inside the frame. Gives application code three primitives on top of
//! the unreliable channel: lifecycle notifications (`init_lifecycle`,
//! `report_size`), one-shot render data (`await_render_data`), and
//! correlated actions (`request_action` and its typed wrappers).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod client;
pub mod layout;
pub mod options;

pub use client::EmbeddedClient;
pub use layout::{FixedLayout, Layout};
pub use options::RequestOptions;
