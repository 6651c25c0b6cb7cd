//! Profile operations on the store.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::{EntityStore, Mutation};
use crate::error::{StoreError, StoreResult};
use crate::mcp::{normalize_name, resolve_unique_name, McpEntry};
use crate::profile::{Profile, ProfilePatch};

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl EntityStore {
    pub async fn profiles(&self) -> Vec<Profile> {
        self.committed.read().await.state.profiles.as_slice().to_vec()
    }

    pub async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        self.committed.read().await.state.profiles.get(id).cloned()
    }

    /// Member ids of a profile, in the order they were added.
    pub async fn members_of(&self, profile_id: Uuid) -> StoreResult<Vec<Uuid>> {
        self.committed
            .read()
            .await
            .state
            .profiles
            .members_of(profile_id)
            .map(<[Uuid]>::to_vec)
            .ok_or(StoreError::ProfileNotFound(profile_id))
    }

    /// Member entries of a profile, in the order they were added.
    pub async fn profile_members(&self, profile_id: Uuid) -> StoreResult<Vec<McpEntry>> {
        let committed = self.committed.read().await;
        let state = &committed.state;
        let members = state
            .profiles
            .members_of(profile_id)
            .ok_or(StoreError::ProfileNotFound(profile_id))?;
        Ok(members
            .iter()
            .filter_map(|id| state.get(*id).cloned())
            .collect())
    }

    /// Ids of the profiles containing an entry. Empty for unknown entries.
    pub async fn profiles_of(&self, mcp_id: Uuid) -> BTreeSet<Uuid> {
        self.committed.read().await.state.profiles.profiles_of(mcp_id)
    }

    /// Create a profile. A taken name is resolved to the first free
    /// `"name (k)"`; every member must exist.
    pub async fn create_profile(
        &self,
        name: &str,
        description: Option<String>,
        members: Vec<Uuid>,
    ) -> StoreResult<Profile> {
        let name = normalize_name(name)?;
        self.mutate(|state| {
            if let Some(missing) = members.iter().find(|id| !state.contains(**id)) {
                return Err(StoreError::McpNotFound(*missing));
            }

            let now = self.clock.now();
            let name = resolve_unique_name(&name, &state.taken_profile_names(None), now);
            let id = self.fresh_id(|id| state.profiles.get(id).is_some())?;
            let mut profile = Profile::new(id, name, now);
            profile.description = clean_description(description);
            for member in members {
                if !profile.contains(member) {
                    profile.mcp_ids.push(member);
                }
            }

            state.profiles.insert(profile.clone());
            let label = format!("Created profile '{}'", profile.name);
            Ok(Mutation::logged(profile, label))
        })
        .await
    }

    /// Rename a profile or change its description.
    pub async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Profile> {
        self.mutate(|state| {
            let current = state
                .profiles
                .get(id)
                .ok_or(StoreError::ProfileNotFound(id))?;
            let mut next = current.clone();

            if let Some(name) = &patch.name {
                let name = normalize_name(name)?;
                if name != current.name {
                    next.name =
                        self.resolve_rename(&name, &state.taken_profile_names(Some(id)))?;
                }
            }
            if let Some(description) = patch.description {
                next.description = clean_description(description);
            }

            if &next == current {
                return Ok(Mutation::unchanged(next));
            }

            next.updated_at = self.clock.now();
            if let Some(slot) = state.profiles.get_mut(id) {
                *slot = next.clone();
            }
            let label = format!("Updated profile '{}'", next.name);
            Ok(Mutation::logged(next, label))
        })
        .await
    }

    /// Delete a profile. Its member entries are left untouched.
    pub async fn delete_profile(&self, id: Uuid) -> StoreResult<Profile> {
        self.mutate(|state| {
            let removed = state
                .profiles
                .on_profile_removed(id)
                .ok_or(StoreError::ProfileNotFound(id))?;
            let label = format!("Deleted profile '{}'", removed.name);
            Ok(Mutation::logged(removed, label))
        })
        .await
    }

    /// Add an entry to a profile. Returns whether membership changed.
    pub async fn add_to_profile(&self, profile_id: Uuid, mcp_id: Uuid) -> StoreResult<bool> {
        self.mutate(|state| {
            if state.profiles.get(profile_id).is_none() {
                return Err(StoreError::ProfileNotFound(profile_id));
            }
            let mcp_name = state
                .get(mcp_id)
                .map(|m| m.name.clone())
                .ok_or(StoreError::McpNotFound(mcp_id))?;

            if state.profiles.add_member(profile_id, mcp_id) != Some(true) {
                return Ok(Mutation::unchanged(false));
            }
            let now = self.clock.now();
            let profile = state
                .profiles
                .get_mut(profile_id)
                .ok_or(StoreError::ProfileNotFound(profile_id))?;
            profile.updated_at = now;

            let label = format!("Added '{}' to profile '{}'", mcp_name, profile.name);
            Ok(Mutation::logged(true, label))
        })
        .await
    }

    /// Remove an entry from a profile. Returns whether membership changed.
    pub async fn remove_from_profile(&self, profile_id: Uuid, mcp_id: Uuid) -> StoreResult<bool> {
        self.mutate(|state| {
            match state.profiles.remove_member(profile_id, mcp_id) {
                None => return Err(StoreError::ProfileNotFound(profile_id)),
                Some(false) => return Ok(Mutation::unchanged(false)),
                Some(true) => {}
            }
            let now = self.clock.now();
            let profile = state
                .profiles
                .get_mut(profile_id)
                .ok_or(StoreError::ProfileNotFound(profile_id))?;
            profile.updated_at = now;

            let label = format!("Removed an MCP from profile '{}'", profile.name);
            Ok(Mutation::logged(true, label))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{default_store, test_store};
    use crate::config::{NameConflictPolicy, StoreConfig};
    use crate::error::StoreError;
    use crate::mcp::{AddOptions, McpDraft};
    use crate::profile::ProfilePatch;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_create_profile_with_members() {
        let (store, _) = default_store().await;
        let a = store
            .add(McpDraft::new("A", "a"), AddOptions::default())
            .await
            .unwrap();
        let b = store
            .add(McpDraft::new("B", "b"), AddOptions::default())
            .await
            .unwrap();

        let profile = store
            .create_profile(" Work ", Some("daily".into()), vec![b.id, a.id, b.id])
            .await
            .unwrap();
        assert_eq!(profile.name, "Work");
        assert_eq!(profile.description.as_deref(), Some("daily"));
        assert_eq!(store.members_of(profile.id).await.unwrap(), vec![b.id, a.id]);

        let members = store.profile_members(profile.id).await.unwrap();
        assert_eq!(members, vec![b.clone(), a.clone()]);
        assert_eq!(store.profiles_of(a.id).await, BTreeSet::from([profile.id]));
    }

    #[tokio::test]
    async fn test_create_profile_with_unknown_member() {
        let (store, _) = default_store().await;
        let err = store
            .create_profile("Work", None, vec![Uuid::from_u128(77)])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::McpNotFound(Uuid::from_u128(77)));
        assert!(store.profiles().await.is_empty());
    }

    #[tokio::test]
    async fn test_profile_names_are_unique() {
        let (store, _) = default_store().await;
        store.create_profile("Work", None, vec![]).await.unwrap();
        let second = store.create_profile("work", None, vec![]).await.unwrap();
        assert_eq!(second.name, "work (1)");
    }

    #[tokio::test]
    async fn test_membership_edits_are_idempotent() {
        let (store, storage) = default_store().await;
        let a = store
            .add(McpDraft::new("A", "a"), AddOptions::default())
            .await
            .unwrap();
        let profile = store.create_profile("Work", None, vec![]).await.unwrap();

        assert!(store.add_to_profile(profile.id, a.id).await.unwrap());
        let saves = storage.save_count();
        assert!(!store.add_to_profile(profile.id, a.id).await.unwrap());
        assert_eq!(store.members_of(profile.id).await.unwrap(), vec![a.id]);
        assert_eq!(storage.save_count(), saves);

        assert!(store.remove_from_profile(profile.id, a.id).await.unwrap());
        assert!(!store.remove_from_profile(profile.id, a.id).await.unwrap());
        assert!(store.members_of(profile.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_membership_edits_check_existence() {
        let (store, _) = default_store().await;
        let a = store
            .add(McpDraft::new("A", "a"), AddOptions::default())
            .await
            .unwrap();
        let profile = store.create_profile("Work", None, vec![]).await.unwrap();
        let missing = Uuid::from_u128(404);

        assert_eq!(
            store.add_to_profile(missing, a.id).await.unwrap_err(),
            StoreError::ProfileNotFound(missing)
        );
        assert_eq!(
            store.add_to_profile(profile.id, missing).await.unwrap_err(),
            StoreError::McpNotFound(missing)
        );
        assert_eq!(
            store.remove_from_profile(missing, a.id).await.unwrap_err(),
            StoreError::ProfileNotFound(missing)
        );
        assert!(store.members_of(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_profile_keeps_entries() {
        let (store, _) = default_store().await;
        let a = store
            .add(McpDraft::new("A", "a"), AddOptions::default())
            .await
            .unwrap();
        let work = store.create_profile("Work", None, vec![a.id]).await.unwrap();
        let home = store.create_profile("Home", None, vec![a.id]).await.unwrap();

        let removed = store.delete_profile(work.id).await.unwrap();
        assert_eq!(removed.id, work.id);
        assert!(store.get(a.id).await.is_some());
        assert_eq!(store.profiles_of(a.id).await, BTreeSet::from([home.id]));
        assert_eq!(
            store.delete_profile(work.id).await.unwrap_err(),
            StoreError::ProfileNotFound(work.id)
        );
    }

    #[tokio::test]
    async fn test_rename_profile() {
        let (store, _) = default_store().await;
        store.create_profile("Work", None, vec![]).await.unwrap();
        let home = store.create_profile("Home", None, vec![]).await.unwrap();

        let renamed = store
            .update_profile(
                home.id,
                ProfilePatch {
                    name: Some("WORK".into()),
                    description: Some(Some("evenings".into())),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "WORK (1)");
        assert_eq!(renamed.description.as_deref(), Some("evenings"));
    }

    #[tokio::test]
    async fn test_rename_profile_rejected_by_policy() {
        let (store, _) = test_store(StoreConfig {
            name_conflicts: NameConflictPolicy::Reject,
            ..StoreConfig::default()
        })
        .await;
        store.create_profile("Work", None, vec![]).await.unwrap();
        let home = store.create_profile("Home", None, vec![]).await.unwrap();

        let err = store
            .update_profile(
                home.id,
                ProfilePatch {
                    name: Some("work".into()),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NameConflict { .. }));
        assert_eq!(store.get_profile(home.id).await.unwrap().name, "Home");
    }
}
