//! # MCP Manager
//!
//! Local manager for MCP (Model Context Protocol) server configurations.
//!
//! This library provides:
//! - A store of MCP entries with case-insensitive unique names
//! - Duplicate detection and automatic `"name (k)"` disambiguation
//! - Profiles grouping entries, kept consistent when entries are removed
//! - A bounded ring of checksummed backups with restore
//! - Export/import of entries as JSON
//!
//! ## Architecture
//!
//! ```text
//!   callers (CLI, UI, ...)
//!            │
//!            ▼
//!   ┌─────────────────────────────┐       ┌──────────────────┐
//!   │        EntityStore          │──────▶│  Storage         │
//!   │  mutation gate (one change  │ save  │  (JSON files or  │
//!   │  at a time), working copy,  │       │   in-memory)     │
//!   │  commit on successful save  │       └──────────────────┘
//!   └──────┬───────────┬──────────┘
//!          │           │
//!          ▼           ▼
//!   ┌────────────┐ ┌────────────────┐
//!   │ StoreState │ │ BackupManager  │
//!   │ mcps +     │ │ snapshot ring  │
//!   │ profiles   │ └────────────────┘
//!   └────────────┘
//! ```
//!
//! ## Modules
//! - `mcp`: entry types, name resolution and duplicate detection
//! - `profile`: profiles and the membership index
//! - `store`: the mutation engine
//! - `backup`: snapshot ring
//! - `storage`: persistence backends
//! - `transfer`: export format

pub mod backup;
pub mod clock;
pub mod config;
pub mod error;
pub mod mcp;
pub mod profile;
pub mod state;
pub mod storage;
pub mod store;
pub mod transfer;

pub use backup::{Backup, BackupInfo, BackupManager};
pub use clock::{Clock, IdGenerator, RandomIds, SystemClock};
pub use config::{Config, NameConflictPolicy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use mcp::{AddOptions, McpDraft, McpEntry, McpPatch};
pub use profile::{Profile, ProfileIndex, ProfilePatch};
pub use state::StoreState;
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::{
    EntityStore, ImportOutcome, ImportReport, SharedEntityStore, StoreStatus, SyncStatus,
};
pub use transfer::ExportBundle;
