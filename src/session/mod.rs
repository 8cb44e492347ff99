//! Per-browser authentication state.
//!
//! Each signed-in browser owns an [`AuthClient`] (cached session plus an
//! auth-change stream) and a [`context::SessionContext`] observing it. The
//! [`Sessions`] registry keys both by the browser's session cookie.

pub mod client;
pub mod context;
pub mod registry;

pub use client::AuthClient;
pub use registry::{ClientSession, Sessions};
