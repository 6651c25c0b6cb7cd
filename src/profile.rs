//! Profiles and the MCP ⟷ profile membership index.
//!
//! A profile references MCP entries by id; it never owns them. Membership
//! lives only inside each [`Profile`], so `members_of` and `profiles_of`
//! are views over the same data and cannot drift apart.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named group of MCP entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Unique among profiles, ignoring case
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member MCP ids in insertion order, without repeats
    #[serde(default)]
    pub mcp_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: Uuid, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            description: None,
            mcp_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, mcp_id: Uuid) -> bool {
        self.mcp_ids.contains(&mcp_id)
    }
}

/// Partial update for a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(default)]
    pub description: Option<Option<String>>,
}

/// The profile collection and its membership edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileIndex {
    profiles: Vec<Profile>,
}

impl ProfileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn as_slice(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn get(&self, profile_id: Uuid) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == profile_id)
    }

    pub(crate) fn get_mut(&mut self, profile_id: Uuid) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id == profile_id)
    }

    pub(crate) fn insert(&mut self, profile: Profile) {
        self.profiles.push(profile);
    }

    /// Add `mcp_id` to a profile. Returns `None` if the profile does not
    /// exist, otherwise whether the membership changed.
    pub fn add_member(&mut self, profile_id: Uuid, mcp_id: Uuid) -> Option<bool> {
        let profile = self.get_mut(profile_id)?;
        if profile.contains(mcp_id) {
            return Some(false);
        }
        profile.mcp_ids.push(mcp_id);
        Some(true)
    }

    /// Remove `mcp_id` from a profile. Returns `None` if the profile does not
    /// exist, otherwise whether the membership changed.
    pub fn remove_member(&mut self, profile_id: Uuid, mcp_id: Uuid) -> Option<bool> {
        let profile = self.get_mut(profile_id)?;
        let before = profile.mcp_ids.len();
        profile.mcp_ids.retain(|id| *id != mcp_id);
        Some(profile.mcp_ids.len() != before)
    }

    /// Drop `mcp_id` from every profile. Returns the ids of profiles that
    /// referenced it.
    pub fn on_entity_removed(&mut self, mcp_id: Uuid) -> Vec<Uuid> {
        let mut touched = Vec::new();
        for profile in &mut self.profiles {
            let before = profile.mcp_ids.len();
            profile.mcp_ids.retain(|id| *id != mcp_id);
            if profile.mcp_ids.len() != before {
                touched.push(profile.id);
            }
        }
        touched
    }

    /// Delete a profile and its membership edges.
    pub fn on_profile_removed(&mut self, profile_id: Uuid) -> Option<Profile> {
        let pos = self.profiles.iter().position(|p| p.id == profile_id)?;
        Some(self.profiles.remove(pos))
    }

    /// Member ids of a profile in insertion order.
    pub fn members_of(&self, profile_id: Uuid) -> Option<&[Uuid]> {
        self.get(profile_id).map(|p| p.mcp_ids.as_slice())
    }

    /// Ids of every profile containing `mcp_id`.
    pub fn profiles_of(&self, mcp_id: Uuid) -> BTreeSet<Uuid> {
        self.profiles
            .iter()
            .filter(|p| p.contains(mcp_id))
            .map(|p| p.id)
            .collect()
    }

    /// Member ids that are not in `known`.
    pub fn dangling<'a>(
        &'a self,
        known: &'a BTreeSet<Uuid>,
    ) -> impl Iterator<Item = (Uuid, Uuid)> + 'a {
        self.profiles.iter().flat_map(move |p| {
            p.mcp_ids
                .iter()
                .filter(move |id| !known.contains(*id))
                .map(move |id| (p.id, *id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn index_with(profile_ids: &[u128]) -> ProfileIndex {
        let mut index = ProfileIndex::new();
        for &p in profile_ids {
            index.insert(Profile::new(id(p), format!("P{}", p), Utc::now()));
        }
        index
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let mut index = index_with(&[100]);
        assert_eq!(index.add_member(id(100), id(1)), Some(true));
        let once = index.clone();
        assert_eq!(index.add_member(id(100), id(1)), Some(false));
        assert_eq!(index, once);
        assert_eq!(index.members_of(id(100)), Some(&[id(1)][..]));
    }

    #[test]
    fn test_remove_member_is_idempotent() {
        let mut index = index_with(&[100]);
        index.add_member(id(100), id(1));
        index.add_member(id(100), id(2));

        assert_eq!(index.remove_member(id(100), id(1)), Some(true));
        let once = index.clone();
        assert_eq!(index.remove_member(id(100), id(1)), Some(false));
        assert_eq!(index, once);
        assert_eq!(index.members_of(id(100)), Some(&[id(2)][..]));
    }

    #[test]
    fn test_edits_on_missing_profile() {
        let mut index = index_with(&[100]);
        assert_eq!(index.add_member(id(999), id(1)), None);
        assert_eq!(index.remove_member(id(999), id(1)), None);
        assert_eq!(index.members_of(id(999)), None);
    }

    #[test]
    fn test_members_keep_insertion_order() {
        let mut index = index_with(&[100]);
        for m in [3, 1, 2] {
            index.add_member(id(100), id(m));
        }
        assert_eq!(index.members_of(id(100)), Some(&[id(3), id(1), id(2)][..]));
    }

    #[test]
    fn test_entity_removal_cascades() {
        let mut index = index_with(&[100, 200, 300]);
        index.add_member(id(100), id(1));
        index.add_member(id(200), id(1));
        index.add_member(id(200), id(2));
        index.add_member(id(300), id(2));

        let touched = index.on_entity_removed(id(1));
        assert_eq!(touched, vec![id(100), id(200)]);
        assert!(index.profiles_of(id(1)).is_empty());
        assert_eq!(index.members_of(id(200)), Some(&[id(2)][..]));
        assert_eq!(index.profiles_of(id(2)).len(), 2);
    }

    #[test]
    fn test_profile_removal_leaves_other_edges() {
        let mut index = index_with(&[100, 200]);
        index.add_member(id(100), id(1));
        index.add_member(id(200), id(1));

        let removed = index.on_profile_removed(id(100)).unwrap();
        assert_eq!(removed.mcp_ids, vec![id(1)]);
        assert_eq!(index.profiles_of(id(1)), BTreeSet::from([id(200)]));
        assert!(index.on_profile_removed(id(100)).is_none());
    }

    #[test]
    fn test_dangling_members() {
        let mut index = index_with(&[100]);
        index.add_member(id(100), id(1));
        index.add_member(id(100), id(2));
        let known = BTreeSet::from([id(1)]);
        let dangling: Vec<_> = index.dangling(&known).collect();
        assert_eq!(dangling, vec![(id(100), id(2))]);
    }
}
