//! Runtime configuration.
//!
//! Defaults are overridable through environment variables:
//! - `MCP_MANAGER_DIR` - working directory; data lives in `{dir}/.mcp-manager/`
//! - `MCP_MANAGER_MAX_BACKUPS` - number of snapshots kept (minimum 1)
//! - `MCP_MANAGER_AUTO_BACKUP` - snapshot after every change (`true`/`false`)
//! - `MCP_MANAGER_NAME_CONFLICTS` - `rename` or `reject` on colliding renames

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backup::DEFAULT_MAX_BACKUPS;

/// What a rename does when the new name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameConflictPolicy {
    /// Store the entry under the first free `"name (k)"` variant
    #[default]
    AutoRename,
    /// Fail with a name conflict error
    Reject,
}

impl FromStr for NameConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rename" | "auto_rename" | "auto-rename" => Ok(Self::AutoRename),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown name conflict policy '{}'", other)),
        }
    }
}

/// Store behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub max_backups: usize,
    /// Snapshot after every successful change
    pub auto_backup: bool,
    pub name_conflicts: NameConflictPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_backups: DEFAULT_MAX_BACKUPS,
            auto_backup: true,
            name_conflicts: NameConflictPolicy::AutoRename,
        }
    }
}

/// Process-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub working_dir: PathBuf,
    pub store: StoreConfig,
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let working_dir = env::var("MCP_MANAGER_DIR")
            .map(PathBuf::from)
            .or_else(|_| env::current_dir())
            .unwrap_or_else(|_| PathBuf::from("."));

        let mut store = StoreConfig::default();

        if let Ok(val) = env::var("MCP_MANAGER_MAX_BACKUPS") {
            match val.trim().parse::<usize>() {
                Ok(n) if n >= 1 => store.max_backups = n,
                _ => warn!("Ignoring invalid MCP_MANAGER_MAX_BACKUPS={}", val),
            }
        }

        if let Ok(val) = env::var("MCP_MANAGER_AUTO_BACKUP") {
            match parse_bool(&val) {
                Some(b) => store.auto_backup = b,
                None => warn!("Ignoring invalid MCP_MANAGER_AUTO_BACKUP={}", val),
            }
        }

        if let Ok(val) = env::var("MCP_MANAGER_NAME_CONFLICTS") {
            match val.parse() {
                Ok(policy) => store.name_conflicts = policy,
                Err(e) => warn!("Ignoring MCP_MANAGER_NAME_CONFLICTS: {}", e),
            }
        }

        Self { working_dir, store }
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
