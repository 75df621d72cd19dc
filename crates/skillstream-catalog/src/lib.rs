//! Skill catalog storage.
//!
//! Provides `MemoryCatalog`, an in-memory implementation of the
//! `SkillCatalog` trait. The skill list is replaced wholesale on refresh;
//! categories are always derived from the current list, never stored.

pub mod memory;

pub use memory::MemoryCatalog;
