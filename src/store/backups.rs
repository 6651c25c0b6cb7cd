//! Backup operations on the store.

use uuid::Uuid;

use super::{Committer, EntityStore};
use crate::backup::BackupInfo;
use crate::error::{StoreError, StoreResult};

const MANUAL_LABEL: &str = "Manual backup";
const BEFORE_RESTORE_LABEL: &str = "Before restore";

impl EntityStore {
    /// Snapshot listing, newest first.
    pub async fn backups(&self) -> Vec<BackupInfo> {
        self.committed.read().await.backups.list()
    }

    /// Snapshot the current state on demand.
    ///
    /// Runs even when automatic backups are disabled. If the ring cannot be
    /// saved it is left as it was.
    pub async fn create_backup(&self, label: &str) -> StoreResult<BackupInfo> {
        let label = match label.trim() {
            "" => MANUAL_LABEL.to_string(),
            l => l.to_string(),
        };
        let gate = self.gate.clone().lock_owned().await;
        let committer = self.committer();
        self.detached(gate, committer.create_backup(label)).await
    }

    /// Replace the current state with a verified snapshot.
    ///
    /// With automatic backups enabled the state being replaced is captured
    /// first under "Before restore". The restore is all or nothing: if the
    /// restored state cannot be saved, the current state is kept.
    pub async fn restore_backup(&self, id: Uuid) -> StoreResult<()> {
        let gate = self.gate.clone().lock_owned().await;
        let committer = self.committer();
        self.detached(gate, committer.restore_backup(id)).await
    }

    /// Drop a snapshot from the ring.
    pub async fn delete_backup(&self, id: Uuid) -> StoreResult<BackupInfo> {
        let gate = self.gate.clone().lock_owned().await;
        let committer = self.committer();
        self.detached(gate, committer.delete_backup(id)).await
    }
}

impl Committer {
    async fn create_backup(self, label: String) -> StoreResult<BackupInfo> {
        let (state, mut backups) = {
            let committed = self.committed.read().await;
            (committed.state.clone(), committed.backups.clone())
        };

        let info = backups.snapshot(self.ids.next_id(), &label, &state, self.clock.now())?;
        self.storage
            .save_backups(&backups.backups())
            .await
            .map_err(StoreError::persistence)?;

        self.committed.write().await.backups = backups;
        tracing::info!("Created backup '{}' ({})", info.label, info.id);
        Ok(info)
    }

    async fn restore_backup(self, id: Uuid) -> StoreResult<()> {
        let (current, mut backups) = {
            let committed = self.committed.read().await;
            (committed.state.clone(), committed.backups.clone())
        };

        // Read the target before the pre-restore snapshot can evict it.
        let restored = backups.restore(id)?;

        let snapshotted = self.backup_on_change
            && match backups.snapshot(
                self.ids.next_id(),
                BEFORE_RESTORE_LABEL,
                &current,
                self.clock.now(),
            ) {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!("Failed to snapshot state before restore: {}", e);
                    false
                }
            };

        self.persist(&restored).await?;

        let mcp_count = restored.mcps.len();
        {
            let mut committed = self.committed.write().await;
            committed.state = restored;
            committed.backups = backups.clone();
        }
        tracing::info!("Restored backup {} ({} MCPs)", id, mcp_count);

        if snapshotted {
            if let Err(e) = self.storage.save_backups(&backups.backups()).await {
                let err = StoreError::persistence(e);
                tracing::warn!("Failed to save backups after restore: {}", err);
                self.sync.write().await.last_backup_error = Some(err.to_string());
            }
        }
        Ok(())
    }

    async fn delete_backup(self, id: Uuid) -> StoreResult<BackupInfo> {
        let mut backups = self.committed.read().await.backups.clone();
        let removed = backups.remove(id).ok_or(StoreError::BackupNotFound(id))?;
        self.storage
            .save_backups(&backups.backups())
            .await
            .map_err(StoreError::persistence)?;

        self.committed.write().await.backups = backups;
        tracing::info!("Deleted backup '{}' ({})", removed.label, id);
        Ok(BackupInfo::from(&removed))
    }
}
