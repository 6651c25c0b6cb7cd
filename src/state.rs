//! The state tree owned by the store: MCP entries plus profiles.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mcp::{name_key, resolve_unique_name, McpEntry};
use crate::profile::{Profile, ProfileIndex};

/// Everything that gets persisted and snapshotted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub mcps: Vec<McpEntry>,
    #[serde(default)]
    pub profiles: ProfileIndex,
}

impl StoreState {
    pub fn get(&self, id: Uuid) -> Option<&McpEntry> {
        self.mcps.iter().find(|m| m.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut McpEntry> {
        self.mcps.iter_mut().find(|m| m.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.mcps.iter().any(|m| m.id == id)
    }

    pub fn mcp_ids(&self) -> BTreeSet<Uuid> {
        self.mcps.iter().map(|m| m.id).collect()
    }

    /// Name keys of every entry except `exclude`.
    pub fn taken_mcp_names(&self, exclude: Option<Uuid>) -> HashSet<String> {
        self.mcps
            .iter()
            .filter(|m| Some(m.id) != exclude)
            .map(|m| name_key(&m.name))
            .collect()
    }

    /// Name keys of every profile except `exclude`.
    pub fn taken_profile_names(&self, exclude: Option<Uuid>) -> HashSet<String> {
        self.profiles
            .iter()
            .filter(|p| Some(p.id) != exclude)
            .map(|p| name_key(&p.name))
            .collect()
    }

    /// Check the invariants every committed state must hold.
    pub fn validate(&self) -> Result<(), String> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for mcp in &self.mcps {
            if !ids.insert(mcp.id) {
                return Err(format!("duplicate MCP id {}", mcp.id));
            }
            if !names.insert(name_key(&mcp.name)) {
                return Err(format!("duplicate MCP name '{}'", mcp.name));
            }
        }

        let mut profile_ids = HashSet::new();
        let mut profile_names = HashSet::new();
        for profile in self.profiles.iter() {
            if !profile_ids.insert(profile.id) {
                return Err(format!("duplicate profile id {}", profile.id));
            }
            if !profile_names.insert(name_key(&profile.name)) {
                return Err(format!("duplicate profile name '{}'", profile.name));
            }
        }

        let known = self.mcp_ids();
        if let Some((profile_id, mcp_id)) = self.profiles.dangling(&known).next() {
            return Err(format!(
                "profile {} references missing MCP {}",
                profile_id, mcp_id
            ));
        }
        Ok(())
    }

    /// Bring loaded data back in line with the invariants.
    ///
    /// Drops repeated ids, renames case-insensitive name clashes, collapses
    /// repeated members and removes dangling membership edges. Returns the
    /// number of fixes applied.
    pub(crate) fn repair(&mut self, now: DateTime<Utc>) -> usize {
        let mut fixes = 0;

        let mut seen = HashSet::new();
        let before = self.mcps.len();
        self.mcps.retain(|m| seen.insert(m.id));
        fixes += before - self.mcps.len();

        let mut taken = HashSet::new();
        for mcp in &mut self.mcps {
            let unique = resolve_unique_name(&mcp.name, &taken, now);
            if unique != mcp.name {
                mcp.name = unique;
                fixes += 1;
            }
            taken.insert(name_key(&mcp.name));
        }

        let mut profiles: Vec<Profile> = self.profiles.iter().cloned().collect();
        let mut seen = HashSet::new();
        let before = profiles.len();
        profiles.retain(|p| seen.insert(p.id));
        fixes += before - profiles.len();

        let mut taken = HashSet::new();
        for profile in &mut profiles {
            let unique = resolve_unique_name(&profile.name, &taken, now);
            if unique != profile.name {
                profile.name = unique;
                fixes += 1;
            }
            taken.insert(name_key(&profile.name));

            let mut members = HashSet::new();
            let before = profile.mcp_ids.len();
            profile.mcp_ids.retain(|id| members.insert(*id));
            fixes += before - profile.mcp_ids.len();
        }
        self.profiles = ProfileIndex::from_profiles(profiles);

        fixes + self.prune_dangling()
    }

    /// Remove membership edges that point at missing entries.
    ///
    /// Returns the number of edges dropped.
    pub(crate) fn prune_dangling(&mut self) -> usize {
        let known = self.mcp_ids();
        let dangling: Vec<Uuid> = self
            .profiles
            .dangling(&known)
            .map(|(_, mcp_id)| mcp_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut dropped = 0;
        for mcp_id in dangling {
            dropped += self.profiles.on_entity_removed(mcp_id).len();
        }
        dropped
    }
}
