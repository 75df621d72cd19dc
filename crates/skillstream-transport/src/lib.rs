//! Transport layer for streaming skill execution.
//!
//! Provides:
//! - Wire protocol for SSE frames (JSON payloads)
//! - SSE-over-HTTP transport (feature: sse)
//! - In-process channel transport for tests and offline demos

pub mod channel;
pub mod wire;

#[cfg(feature = "sse")]
pub mod sse;

pub use channel::{ChannelTransport, EventFeed};
pub use wire::{ExecuteRequest, WireEvent};

#[cfg(feature = "sse")]
pub use sse::SseTransport;
