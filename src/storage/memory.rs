//! In-process storage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Storage;
use crate::backup::Backup;
use crate::state::StoreState;

/// Storage kept in memory. Writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<Option<StoreState>>,
    backups: RwLock<Vec<Backup>>,
    fail_saves: AtomicBool,
    fail_backup_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already saved state.
    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            ..Self::default()
        }
    }

    /// Make every following `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every following `save_backups` fail (or succeed again).
    pub fn set_fail_backup_saves(&self, fail: bool) {
        self.fail_backup_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last successfully saved state.
    pub async fn saved_state(&self) -> Option<StoreState> {
        self.state.read().await.clone()
    }

    pub async fn saved_backups(&self) -> Vec<Backup> {
        self.backups.read().await.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<Option<StoreState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &StoreState) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("Simulated write failure");
        }
        *self.state.write().await = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_backups(&self) -> Result<Vec<Backup>> {
        Ok(self.backups.read().await.clone())
    }

    async fn save_backups(&self, backups: &[Backup]) -> Result<()> {
        if self.fail_backup_saves.load(Ordering::SeqCst) {
            bail!("Simulated backup write failure");
        }
        *self.backups.write().await = backups.to_vec();
        Ok(())
    }
}
