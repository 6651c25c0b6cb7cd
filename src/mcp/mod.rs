//! MCP (Model Context Protocol) server entries.
//!
//! Holds the entry types plus the two pure building blocks the store uses
//! before every insert or rename:
//! - `naming`: case-insensitive unique name generation
//! - `duplicates`: new / exact duplicate / similar name classification

pub mod duplicates;
pub mod naming;
mod types;

pub use duplicates::{classify, ComparisonKey, DuplicateCheck, DuplicateStatus};
pub use naming::{base_name, copy_name, name_key, resolve_unique_name, taken_names};
pub use types::*;

pub(crate) use types::normalize_name;
