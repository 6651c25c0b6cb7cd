//! Error types for the MCP store.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("An MCP with the same name, command and arguments already exists: {name}")]
    Duplicate { name: String, existing_id: Uuid },

    #[error("Name is already in use: {name}")]
    NameConflict { name: String },

    #[error("MCP not found: {0}")]
    McpNotFound(Uuid),

    #[error("Profile not found: {0}")]
    ProfileNotFound(Uuid),

    #[error("Backup not found: {0}")]
    BackupNotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to persist store: {0}")]
    Persistence(String),

    #[error("Cannot restore backup {id}: {reason}")]
    Restore { id: Uuid, reason: String },
}

impl StoreError {
    /// True for the "target does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::McpNotFound(_) | Self::ProfileNotFound(_) | Self::BackupNotFound(_)
        )
    }

    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{:#}", err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
