//! Core abstractions for streaming skill execution.
//!
//! This crate provides the fundamental building blocks:
//! - `Skill` / `Category` - Catalog data model
//! - `StreamEvent` - Typed event enum delivered by a skill stream
//! - Catalog and Transport boundary traits

pub mod event;
pub mod skill;
pub mod traits;

pub use event::StreamEvent;
pub use skill::{Category, Skill};
pub use traits::{
    CatalogError, ErrorKind, EventStream, SessionError, SessionId, SessionStatus, SkillCatalog,
    SkillTransport, TransportError,
};
