//! The MCP store: owner of all entries, profiles and backups.
//!
//! Every change runs through one path:
//!
//! 1. wait for the mutation gate (changes are applied one at a time, in
//!    arrival order)
//! 2. apply the change to a working copy of the committed state
//! 3. save the working copy through the [`Storage`] collaborator
//! 4. optionally snapshot it into the backup ring
//! 5. swap the working copy in as the new committed state
//!
//! A failure in steps 2 or 3 drops the working copy, so readers only ever
//! see committed states and a failed save leaves the store exactly as it
//! was before the call.
//!
//! Steps 3 to 5 run on a spawned task that holds the gate. A caller that
//! stops waiting (a timeout, a lost `select!` branch) cannot leave storage
//! ahead of the live state.

mod backups;
mod profiles;
mod transfer;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::backup::BackupManager;
use crate::clock::{Clock, IdGenerator, RandomIds, SystemClock};
use crate::config::{NameConflictPolicy, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::mcp::{
    classify, copy_name, name_key, normalize_name, resolve_unique_name, AddOptions,
    DuplicateStatus, McpDraft, McpEntry, McpPatch,
};
use crate::state::StoreState;
use crate::storage::Storage;

pub use transfer::{ImportOutcome, ImportReport};

/// Outcome of the last persistence attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Set while the most recent save failed
    pub last_save_error: Option<String>,
    /// Set while the most recent automatic backup could not be written
    pub last_backup_error: Option<String>,
}

/// Snapshot of the store's health for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub mcp_count: usize,
    pub profile_count: usize,
    pub backup_count: usize,
    /// A change is currently being applied
    pub mutating: bool,
    pub sync: SyncStatus,
}

#[derive(Debug, Clone)]
struct Committed {
    state: StoreState,
    backups: BackupManager,
}

/// What a change closure produced.
struct Mutation<T> {
    value: T,
    write: bool,
    backup_label: Option<String>,
}

impl<T> Mutation<T> {
    /// Nothing changed; skip the write.
    fn unchanged(value: T) -> Self {
        Self {
            value,
            write: false,
            backup_label: None,
        }
    }

    /// Persist without an automatic backup.
    fn quiet(value: T) -> Self {
        Self {
            value,
            write: true,
            backup_label: None,
        }
    }

    /// Persist and, if enabled, snapshot under `label`.
    fn logged(value: T, label: String) -> Self {
        Self {
            value,
            write: true,
            backup_label: Some(label),
        }
    }
}

/// Store for MCP entries and profiles with persistence and backups.
pub struct EntityStore {
    committed: Arc<RwLock<Committed>>,
    gate: Arc<Mutex<()>>,
    sync: Arc<RwLock<SyncStatus>>,
    storage: Arc<dyn Storage>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl EntityStore {
    /// Open a store with random ids and the system clock.
    pub async fn open(storage: Arc<dyn Storage>, config: StoreConfig) -> StoreResult<Self> {
        Self::open_with(storage, config, Arc::new(RandomIds), Arc::new(SystemClock)).await
    }

    /// Open a store with explicit id and time sources.
    ///
    /// A state that cannot be read is an error; an unreadable backup ring
    /// is logged and replaced by an empty one.
    pub async fn open_with(
        storage: Arc<dyn Storage>,
        config: StoreConfig,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let mut state = storage
            .load()
            .await
            .map_err(StoreError::persistence)?
            .unwrap_or_default();

        let repaired = state.repair(clock.now());
        if repaired > 0 {
            tracing::warn!("Repaired {} inconsistencies in stored MCP data", repaired);
        }

        let saved_backups = match storage.load_backups().await {
            Ok(backups) => backups,
            Err(e) => {
                tracing::warn!("Failed to load backups: {:#}, starting with none", e);
                Vec::new()
            }
        };
        let backups = BackupManager::from_backups(config.max_backups, saved_backups);

        tracing::info!(
            "Loaded {} MCPs, {} profiles, {} backups",
            state.mcps.len(),
            state.profiles.len(),
            backups.len()
        );

        Ok(Self {
            committed: Arc::new(RwLock::new(Committed { state, backups })),
            gate: Arc::new(Mutex::new(())),
            sync: Arc::new(RwLock::new(SyncStatus::default())),
            storage,
            ids,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// All entries in insertion order.
    pub async fn list(&self) -> Vec<McpEntry> {
        self.committed.read().await.state.mcps.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<McpEntry> {
        self.committed.read().await.state.get(id).cloned()
    }

    /// Find an entry by name, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> Option<McpEntry> {
        let key = name_key(name);
        self.committed
            .read()
            .await
            .state
            .mcps
            .iter()
            .find(|m| name_key(&m.name) == key)
            .cloned()
    }

    /// Copy of the whole committed state.
    pub async fn snapshot(&self) -> StoreState {
        self.committed.read().await.state.clone()
    }

    pub async fn status(&self) -> StoreStatus {
        let (mcp_count, profile_count, backup_count) = {
            let committed = self.committed.read().await;
            (
                committed.state.mcps.len(),
                committed.state.profiles.len(),
                committed.backups.len(),
            )
        };
        StoreStatus {
            mcp_count,
            profile_count,
            backup_count,
            mutating: self.gate.try_lock().is_err(),
            sync: self.sync.read().await.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // MCP changes
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a new entry.
    ///
    /// An exact duplicate (same name, command and arguments) fails unless
    /// `options.allow_duplicate` is set. Any name clash is resolved to the
    /// first free `"name (k)"`.
    pub async fn add(&self, draft: McpDraft, options: AddOptions) -> StoreResult<McpEntry> {
        self.mutate(|state| {
            let entry = self.insert_draft(state, draft, options)?;
            let label = format!("Added MCP '{}'", entry.name);
            Ok(Mutation::logged(entry, label))
        })
        .await
    }

    /// Apply a partial update.
    ///
    /// A new name is checked against every other entry; a collision is
    /// resolved according to the configured [`NameConflictPolicy`].
    pub async fn update(&self, id: Uuid, patch: McpPatch) -> StoreResult<McpEntry> {
        self.mutate(|state| {
            let current = state.get(id).ok_or(StoreError::McpNotFound(id))?;
            let mut next = current.clone();

            if let Some(name) = &patch.name {
                let name = normalize_name(name)?;
                if name != current.name {
                    next.name = self.resolve_rename(&name, &state.taken_mcp_names(Some(id)))?;
                }
            }
            if let Some(command) = &patch.command {
                let command = command.trim();
                if command.is_empty() {
                    return Err(StoreError::InvalidInput(
                        "command cannot be empty".to_string(),
                    ));
                }
                next.command = command.to_string();
            }
            if let Some(args) = patch.args {
                next.args = args;
            }
            if let Some(description) = patch.description {
                next.description = description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty());
            }
            if let Some(enabled) = patch.enabled {
                next.enabled = enabled;
            }

            if &next == current {
                return Ok(Mutation::unchanged(next));
            }

            let label = format!("Updated MCP '{}'", next.name);
            if let Some(slot) = state.get_mut(id) {
                *slot = next.clone();
            }
            Ok(Mutation::logged(next, label))
        })
        .await
    }

    /// Enable or disable an entry.
    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<McpEntry> {
        self.update(id, McpPatch::enabled(enabled)).await
    }

    /// Delete an entry and drop it from every profile.
    pub async fn remove(&self, id: Uuid) -> StoreResult<McpEntry> {
        self.mutate(|state| {
            let pos = state
                .mcps
                .iter()
                .position(|m| m.id == id)
                .ok_or(StoreError::McpNotFound(id))?;
            let removed = state.mcps.remove(pos);

            let now = self.clock.now();
            for profile_id in state.profiles.on_entity_removed(id) {
                if let Some(profile) = state.profiles.get_mut(profile_id) {
                    profile.updated_at = now;
                }
            }

            let label = format!("Removed MCP '{}'", removed.name);
            Ok(Mutation::logged(removed, label))
        })
        .await
    }

    /// Copy an entry under a fresh name derived from the source name.
    pub async fn duplicate(&self, id: Uuid) -> StoreResult<McpEntry> {
        self.mutate(|state| {
            let source = state.get(id).ok_or(StoreError::McpNotFound(id))?;
            let mut draft = source.to_draft();
            draft.name = copy_name(&source.name, &state.taken_mcp_names(None), self.clock.now());

            let entry = self.insert_draft(state, draft, AddOptions::allow_duplicate())?;
            let label = format!("Duplicated MCP '{}'", entry.name);
            Ok(Mutation::logged(entry, label))
        })
        .await
    }

    /// Record one invocation of an entry.
    pub async fn record_usage(&self, id: Uuid) -> StoreResult<McpEntry> {
        self.mutate(|state| {
            let now = self.clock.now();
            let entry = state.get_mut(id).ok_or(StoreError::McpNotFound(id))?;
            entry.usage_count = entry.usage_count.saturating_add(1);
            entry.last_used_at = Some(now);
            Ok(Mutation::quiet(entry.clone()))
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `change` against a working copy and commit it if it persists.
    async fn mutate<T, F>(&self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreState) -> StoreResult<Mutation<T>>,
    {
        let gate = self.gate.clone().lock_owned().await;

        let mut working = self.committed.read().await.state.clone();
        let Mutation {
            value,
            write,
            backup_label,
        } = change(&mut working)?;
        if !write {
            return Ok(value);
        }
        debug_assert_eq!(working.validate(), Ok(()));

        let committer = self.committer();
        self.detached(gate, committer.commit(working, backup_label)).await?;
        Ok(value)
    }

    /// Run `work` to completion on its own task while holding `gate`.
    ///
    /// Dropping the returned future does not stop `work`; the next change
    /// waits for it on the gate.
    async fn detached<T, W>(&self, gate: OwnedMutexGuard<()>, work: W) -> StoreResult<T>
    where
        T: Send + 'static,
        W: Future<Output = StoreResult<T>> + Send + 'static,
    {
        tokio::spawn(async move {
            let _gate = gate;
            work.await
        })
        .await
        .map_err(|e| StoreError::Persistence(format!("Commit task failed: {}", e)))?
    }

    fn committer(&self) -> Committer {
        Committer {
            committed: self.committed.clone(),
            sync: self.sync.clone(),
            storage: self.storage.clone(),
            ids: self.ids.clone(),
            clock: self.clock.clone(),
            backup_on_change: self.config.auto_backup,
        }
    }

    /// Validate and insert a draft into `state`.
    fn insert_draft(
        &self,
        state: &mut StoreState,
        draft: McpDraft,
        options: AddOptions,
    ) -> StoreResult<McpEntry> {
        let draft = draft.normalized()?;
        let now = self.clock.now();
        let check = classify(&draft, &state.mcps, options.allow_duplicate, now);

        if let DuplicateStatus::ExactDuplicate { existing_id } = check.status {
            if !options.allow_duplicate {
                return Err(StoreError::Duplicate {
                    name: draft.name,
                    existing_id,
                });
            }
        }

        let name = match check.suggested_name {
            Some(name) => name,
            None => resolve_unique_name(&draft.name, &state.taken_mcp_names(None), now),
        };

        let id = self.fresh_id(|id| state.contains(id))?;
        let entry = McpEntry::from_draft(id, name, draft, now);
        state.mcps.push(entry.clone());
        Ok(entry)
    }

    /// Resolve a rename target under the configured policy.
    fn resolve_rename(
        &self,
        desired: &str,
        taken: &HashSet<String>,
    ) -> StoreResult<String> {
        if !taken.contains(&name_key(desired)) {
            return Ok(desired.to_string());
        }
        match self.config.name_conflicts {
            NameConflictPolicy::AutoRename => {
                Ok(resolve_unique_name(desired, taken, self.clock.now()))
            }
            NameConflictPolicy::Reject => Err(StoreError::NameConflict {
                name: desired.to_string(),
            }),
        }
    }

    /// Draw an id that `in_use` does not already know.
    fn fresh_id(&self, in_use: impl Fn(Uuid) -> bool) -> StoreResult<Uuid> {
        let id = self.ids.next_id();
        if in_use(id) {
            return Err(StoreError::InvalidInput(format!(
                "id generator returned an id already in use: {}",
                id
            )));
        }
        Ok(id)
    }
}

/// The part of the store a detached commit needs.
#[derive(Clone)]
struct Committer {
    committed: Arc<RwLock<Committed>>,
    sync: Arc<RwLock<SyncStatus>>,
    storage: Arc<dyn Storage>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    backup_on_change: bool,
}

impl Committer {
    /// Save `state`, make it live, then snapshot it if `backup_label` is set.
    async fn commit(self, state: StoreState, backup_label: Option<String>) -> StoreResult<()> {
        self.persist(&state).await?;

        let backups = {
            let mut committed = self.committed.write().await;
            committed.state = state.clone();
            committed.backups.clone()
        };

        if let Some(label) = backup_label.filter(|_| self.backup_on_change) {
            if let Some(backups) = self.auto_backup(backups, &label, &state).await {
                self.committed.write().await.backups = backups;
            }
        }
        Ok(())
    }

    /// Save `state`, recording the outcome in the sync status.
    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let result = self.storage.save(state).await;
        let mut sync = self.sync.write().await;
        match result {
            Ok(()) => {
                sync.last_saved_at = Some(self.clock.now());
                sync.last_save_error = None;
                Ok(())
            }
            Err(e) => {
                let err = StoreError::persistence(e);
                tracing::error!("Failed to save MCP store: {}", err);
                sync.last_save_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Snapshot `state` into a copy of the ring and save it.
    ///
    /// The change being backed up is already saved, so a failure here only
    /// gets logged and recorded; the old ring stays in place.
    async fn auto_backup(
        &self,
        mut backups: BackupManager,
        label: &str,
        state: &StoreState,
    ) -> Option<BackupManager> {
        let result = match backups.snapshot(self.ids.next_id(), label, state, self.clock.now()) {
            Ok(_) => self
                .storage
                .save_backups(&backups.backups())
                .await
                .map_err(StoreError::persistence),
            Err(e) => Err(e),
        };

        let mut sync = self.sync.write().await;
        match result {
            Ok(()) => {
                sync.last_backup_error = None;
                Some(backups)
            }
            Err(e) => {
                tracing::warn!("Automatic backup '{}' failed: {}", label, e);
                sync.last_backup_error = Some(e.to_string());
                None
            }
        }
    }
}

/// Shared store wrapped in Arc for concurrent access.
pub type SharedEntityStore = Arc<EntityStore>;
