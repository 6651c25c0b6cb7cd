//! Bounded ring of point-in-time snapshots of the store.
//!
//! Each snapshot is a full, owned copy of the state tree plus a SHA-256
//! checksum of its serialized form. Snapshots are never edited after
//! creation; when the ring is full the oldest one is evicted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::state::StoreState;

/// Default number of snapshots kept.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// A stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the serialized state, hex encoded
    pub checksum: String,
    pub state: StoreState,
}

/// Listing entry for a snapshot (without the state itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub mcp_count: usize,
    pub profile_count: usize,
}

impl From<&Backup> for BackupInfo {
    fn from(b: &Backup) -> Self {
        Self {
            id: b.id,
            label: b.label.clone(),
            created_at: b.created_at,
            mcp_count: b.state.mcps.len(),
            profile_count: b.state.profiles.len(),
        }
    }
}

/// Compute the checksum recorded for a snapshot.
pub fn state_checksum(state: &StoreState) -> StoreResult<String> {
    let bytes = serde_json::to_vec(state)
        .map_err(|e| StoreError::Persistence(format!("Failed to serialize snapshot: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Owner of the snapshot ring.
#[derive(Debug, Clone)]
pub struct BackupManager {
    max_backups: usize,
    /// Oldest first
    backups: VecDeque<Backup>,
}

impl BackupManager {
    pub fn new(max_backups: usize) -> Self {
        Self {
            max_backups: max_backups.max(1),
            backups: VecDeque::new(),
        }
    }

    /// Rebuild the ring from persisted snapshots, trimming to the bound.
    pub fn from_backups(max_backups: usize, mut backups: Vec<Backup>) -> Self {
        backups.sort_by_key(|b| b.created_at);
        let mut manager = Self::new(max_backups);
        manager.backups = backups.into();
        manager.evict();
        manager
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    /// Snapshots oldest first, as persisted.
    pub fn backups(&self) -> Vec<Backup> {
        self.backups.iter().cloned().collect()
    }

    /// Take a snapshot of `state`.
    pub fn snapshot(
        &mut self,
        id: Uuid,
        label: &str,
        state: &StoreState,
        now: DateTime<Utc>,
    ) -> StoreResult<BackupInfo> {
        let backup = Backup {
            id,
            label: label.trim().to_string(),
            created_at: now,
            checksum: state_checksum(state)?,
            state: state.clone(),
        };
        let info = BackupInfo::from(&backup);
        self.backups.push_back(backup);
        let evicted = self.evict();
        if evicted > 0 {
            tracing::debug!("Evicted {} old backup(s)", evicted);
        }
        Ok(info)
    }

    /// Return a verified copy of a snapshot's state.
    pub fn restore(&self, id: Uuid) -> StoreResult<StoreState> {
        let backup = self
            .backups
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::Restore {
                id,
                reason: "backup not found".to_string(),
            })?;

        let checksum = state_checksum(&backup.state)?;
        if checksum != backup.checksum {
            return Err(StoreError::Restore {
                id,
                reason: "checksum mismatch".to_string(),
            });
        }
        backup
            .state
            .validate()
            .map_err(|reason| StoreError::Restore { id, reason })?;

        Ok(backup.state.clone())
    }

    /// Snapshot listing, newest first.
    pub fn list(&self) -> Vec<BackupInfo> {
        self.backups.iter().rev().map(BackupInfo::from).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Backup> {
        self.backups.iter().find(|b| b.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Backup> {
        let pos = self.backups.iter().position(|b| b.id == id)?;
        self.backups.remove(pos)
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.backups.len() > self.max_backups {
            self.backups.pop_front();
            evicted += 1;
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpDraft, McpEntry};
    use chrono::Duration;

    fn state_with(names: &[&str]) -> StoreState {
        StoreState {
            mcps: names
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    McpEntry::from_draft(
                        Uuid::from_u128(i as u128 + 1),
                        n.to_string(),
                        McpDraft::new(*n, "echo"),
                        Utc::now(),
                    )
                })
                .collect(),
            ..StoreState::default()
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::seconds(secs)
    }

    #[test]
    fn test_ring_is_bounded_and_keeps_newest() {
        let mut manager = BackupManager::new(3);
        let state = state_with(&["A"]);
        for i in 0..7u128 {
            manager
                .snapshot(Uuid::from_u128(100 + i), &format!("b{}", i), &state, t(i as i64))
                .unwrap();
            assert!(manager.list().len() <= 3);
            assert_eq!(manager.list()[0].id, Uuid::from_u128(100 + i));
        }
        let labels: Vec<_> = manager.list().into_iter().map(|b| b.label).collect();
        assert_eq!(labels, vec!["b6", "b5", "b4"]);
    }

    #[test]
    fn test_snapshot_is_independent_of_live_state() {
        let mut manager = BackupManager::new(5);
        let mut live = state_with(&["A"]);
        let info = manager
            .snapshot(Uuid::from_u128(100), "before", &live, t(0))
            .unwrap();

        live.mcps[0].name = "Changed".to_string();
        live.mcps.clear();

        let mut restored = manager.restore(info.id).unwrap();
        assert_eq!(restored.mcps.len(), 1);
        assert_eq!(restored.mcps[0].name, "A");

        restored.mcps.clear();
        assert_eq!(manager.restore(info.id).unwrap().mcps.len(), 1);
    }

    #[test]
    fn test_restore_missing_backup() {
        let manager = BackupManager::new(5);
        let err = manager.restore(Uuid::from_u128(42)).unwrap_err();
        assert!(matches!(err, StoreError::Restore { .. }));
    }

    #[test]
    fn test_restore_detects_tampering() {
        let mut manager = BackupManager::new(5);
        let info = manager
            .snapshot(Uuid::from_u128(100), "x", &state_with(&["A"]), t(0))
            .unwrap();

        let mut backups = manager.backups();
        backups[0].state.mcps[0].command = "rm".to_string();
        let tampered = BackupManager::from_backups(5, backups);

        let err = tampered.restore(info.id).unwrap_err();
        assert_eq!(
            err,
            StoreError::Restore {
                id: info.id,
                reason: "checksum mismatch".to_string()
            }
        );
    }

    #[test]
    fn test_restore_rejects_inconsistent_snapshot() {
        let mut manager = BackupManager::new(5);
        let info = manager
            .snapshot(Uuid::from_u128(100), "bad", &state_with(&["A", "a"]), t(0))
            .unwrap();
        assert!(matches!(
            manager.restore(info.id),
            Err(StoreError::Restore { .. })
        ));
    }

    #[test]
    fn test_from_backups_sorts_and_trims() {
        let state = state_with(&[]);
        let mut manager = BackupManager::new(10);
        for i in [3i64, 1, 2, 0] {
            manager
                .snapshot(Uuid::from_u128(i as u128), "x", &state, t(i))
                .unwrap();
        }
        let rebuilt = BackupManager::from_backups(2, manager.backups());
        let ids: Vec<_> = rebuilt.list().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(3), Uuid::from_u128(2)]);
    }

    #[test]
    fn test_remove_backup() {
        let mut manager = BackupManager::new(5);
        let info = manager
            .snapshot(Uuid::from_u128(1), "x", &state_with(&[]), t(0))
            .unwrap();
        assert!(manager.remove(info.id).is_some());
        assert!(manager.is_empty());
        assert!(manager.remove(info.id).is_none());
    }
}
