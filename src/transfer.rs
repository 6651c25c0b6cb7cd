//! Export/import format for MCP entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::mcp::{McpDraft, McpEntry};

pub const EXPORT_VERSION: u32 = 1;

/// Portable set of MCP entries.
///
/// Records carry the entry attributes only; profiles and backups are not
/// part of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub mcps: Vec<McpEntry>,
}

impl ExportBundle {
    pub fn new(mcps: Vec<McpEntry>, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at,
            mcps,
        }
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::InvalidInput(format!("Failed to serialize export: {}", e)))
    }

    /// Parse a bundle, rejecting versions this build cannot read.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let bundle: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidInput(format!("Invalid export file: {}", e)))?;
        if bundle.version == 0 || bundle.version > EXPORT_VERSION {
            return Err(StoreError::InvalidInput(format!(
                "Unsupported export version {}",
                bundle.version
            )));
        }
        Ok(bundle)
    }

    /// Drafts for re-inserting the records. Ids, counters and timestamps are
    /// reassigned on import.
    pub fn drafts(&self) -> Vec<McpDraft> {
        self.mcps.iter().map(McpEntry::to_draft).collect()
    }
}
