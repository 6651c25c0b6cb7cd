//! Types for MCP server entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// A stored MCP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpEntry {
    pub id: Uuid,
    /// Display name, unique across entries ignoring case
    pub name: String,
    /// Executable to launch (e.g., "npx")
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Number of recorded invocations
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl McpEntry {
    pub(crate) fn from_draft(id: Uuid, name: String, draft: McpDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            command: draft.command,
            args: draft.args,
            description: draft.description,
            enabled: draft.enabled,
            usage_count: 0,
            last_used_at: None,
            created_at: now,
        }
    }

    /// Copy the user-editable fields into a new draft.
    pub fn to_draft(&self) -> McpDraft {
        McpDraft {
            name: self.name.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
        }
    }
}

/// User-supplied fields for a new entry. Identity, counters and timestamps
/// are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpDraft {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl McpDraft {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            description: None,
            enabled: true,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trim text fields and reject drafts without a name or command.
    pub(crate) fn normalized(mut self) -> StoreResult<Self> {
        self.name = normalize_name(&self.name)?;
        self.command = self.command.trim().to_string();
        if self.command.is_empty() {
            return Err(StoreError::InvalidInput("command cannot be empty".to_string()));
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(self)
    }
}

/// Partial update for an existing entry. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// `Some(None)` clears the description.
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl McpPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.command.is_none()
            && self.args.is_none()
            && self.description.is_none()
            && self.enabled.is_none()
    }
}

/// Options for [`crate::EntityStore::add`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Store an exact duplicate under a disambiguated name instead of failing.
    pub allow_duplicate: bool,
}

impl AddOptions {
    pub fn allow_duplicate() -> Self {
        Self {
            allow_duplicate: true,
        }
    }
}

/// Trim a user-supplied name, rejecting blank names.
pub(crate) fn normalize_name(name: &str) -> StoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput("name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_normalization_trims_fields() {
        let draft = McpDraft::new("  Files  ", " npx ")
            .with_args(["-y", "@mcp/files"])
            .with_description("   ")
            .normalized()
            .unwrap();
        assert_eq!(draft.name, "Files");
        assert_eq!(draft.command, "npx");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn test_draft_rejects_blank_name_and_command() {
        assert!(matches!(
            McpDraft::new("   ", "echo").normalized(),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            McpDraft::new("Echo", "").normalized(),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_entry_deserializes_with_defaults() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "name": "Echo",
            "command": "echo",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let entry: McpEntry = serde_json::from_str(json).unwrap();
        assert!(entry.enabled);
        assert!(entry.args.is_empty());
        assert_eq!(entry.usage_count, 0);
        assert_eq!(entry.last_used_at, None);
    }
}
