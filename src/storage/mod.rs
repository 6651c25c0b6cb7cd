//! Durable storage for the store.
//!
//! The store treats storage as an opaque blob sink: it hands over the whole
//! state tree (and the backup ring) and only cares whether the write
//! succeeded. Two backends ship with the crate:
//! - [`JsonFileStorage`]: JSON files under `{working_dir}/.mcp-manager/`
//! - [`MemoryStorage`]: in-process, with switchable write failures

mod json;
mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::backup::Backup;
use crate::state::StoreState;

pub use json::JsonFileStorage;
pub use memory::MemoryStorage;

/// Persistence collaborator used by [`crate::EntityStore`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the last saved state, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<StoreState>>;

    /// Replace the saved state.
    async fn save(&self, state: &StoreState) -> Result<()>;

    /// Load the saved snapshot ring (oldest first).
    async fn load_backups(&self) -> Result<Vec<Backup>>;

    /// Replace the saved snapshot ring.
    async fn save_backups(&self, backups: &[Backup]) -> Result<()>;
}
