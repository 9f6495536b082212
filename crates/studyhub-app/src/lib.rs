//! StudyHub desktop app library.
//!
//! Exposes the backend bridge, hooks and components so the binary and the
//! integration tests share one implementation.

pub mod bridge;
pub mod components;
pub mod demo;
pub mod hooks;
pub mod state;

/// App stylesheet, injected into the window head.
pub const STUDYHUB_CSS: &str = include_str!("style.css");
