//! Duplicate detection for incoming MCP entries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::naming::{name_key, resolve_unique_name, taken_names};
use super::types::{McpDraft, McpEntry};

/// Normalized identity of an entry: name, command and argument signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    pub name: String,
    pub command: String,
    /// Arguments in order, each trimmed and lowercased
    pub args: Vec<String>,
}

impl ComparisonKey {
    pub fn new(name: &str, command: &str, args: &[String]) -> Self {
        Self {
            name: name_key(name),
            command: command.trim().to_lowercase(),
            args: args.iter().map(|a| a.trim().to_lowercase()).collect(),
        }
    }

    pub fn of_entry(entry: &McpEntry) -> Self {
        Self::new(&entry.name, &entry.command, &entry.args)
    }

    pub fn of_draft(draft: &McpDraft) -> Self {
        Self::new(&draft.name, &draft.command, &draft.args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    New,
    /// Name, command and arguments all match `existing_id`.
    ExactDuplicate { existing_id: Uuid },
    /// Only the name matches `existing_id`.
    SimilarName { existing_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCheck {
    pub status: DuplicateStatus,
    /// Free name to store the candidate under, when one is needed.
    pub suggested_name: Option<String>,
}

impl DuplicateCheck {
    pub fn is_exact_duplicate(&self) -> bool {
        matches!(self.status, DuplicateStatus::ExactDuplicate { .. })
    }
}

/// Classify `candidate` against `existing`.
///
/// An exact match on any entry wins over a name-only match on another.
/// `force` asks for a suggested name even for exact duplicates.
pub fn classify(
    candidate: &McpDraft,
    existing: &[McpEntry],
    force: bool,
    now: DateTime<Utc>,
) -> DuplicateCheck {
    let key = ComparisonKey::of_draft(candidate);

    let mut similar = None;
    let mut exact = None;
    for entry in existing {
        let other = ComparisonKey::of_entry(entry);
        if other.name != key.name {
            continue;
        }
        if other == key {
            exact = Some(entry.id);
            break;
        }
        if similar.is_none() {
            similar = Some(entry.id);
        }
    }

    let status = match (exact, similar) {
        (Some(existing_id), _) => DuplicateStatus::ExactDuplicate { existing_id },
        (None, Some(existing_id)) => DuplicateStatus::SimilarName { existing_id },
        (None, None) => DuplicateStatus::New,
    };

    let suggested_name = match status {
        DuplicateStatus::New => None,
        DuplicateStatus::ExactDuplicate { .. } if !force => None,
        _ => {
            let taken = taken_names(existing.iter().map(|e| e.name.as_str()));
            Some(resolve_unique_name(&candidate.name, &taken, now))
        }
    };

    DuplicateCheck {
        status,
        suggested_name,
    }
}
