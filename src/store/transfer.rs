//! Bulk import and export.

use super::{EntityStore, Mutation};
use crate::error::{StoreError, StoreResult};
use crate::mcp::{AddOptions, McpDraft, McpEntry};
use crate::transfer::ExportBundle;

/// Result for one record of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Position of the record in the input
    pub index: usize,
    pub outcome: Result<McpEntry, StoreError>,
}

/// Per-record results of a bulk import, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &McpEntry> {
        self.outcomes.iter().filter_map(|o| o.outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (usize, &StoreError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.as_ref().err().map(|e| (o.index, e)))
    }

    pub fn imported_count(&self) -> usize {
        self.succeeded().count()
    }
}

impl EntityStore {
    /// Insert several drafts as one change.
    ///
    /// Each draft goes through the same checks as [`EntityStore::add`] and
    /// sees the records accepted before it. Rejected records are reported
    /// and skipped; accepted ones are saved together, so a failed save
    /// drops the whole batch.
    pub async fn import_many(
        &self,
        drafts: Vec<McpDraft>,
        options: AddOptions,
    ) -> StoreResult<ImportReport> {
        let total = drafts.len();
        let report = self
            .mutate(|state| {
                let outcomes: Vec<ImportOutcome> = drafts
                    .into_iter()
                    .enumerate()
                    .map(|(index, draft)| ImportOutcome {
                        index,
                        outcome: self.insert_draft(state, draft, options),
                    })
                    .collect();
                let report = ImportReport { outcomes };

                let imported = report.imported_count();
                if imported == 0 {
                    return Ok(Mutation::unchanged(report));
                }
                let label = format!("Imported {} MCP(s)", imported);
                Ok(Mutation::logged(report, label))
            })
            .await?;

        tracing::info!(
            "Imported {} of {} MCPs",
            report.imported_count(),
            total
        );
        Ok(report)
    }

    /// All entries in a portable bundle.
    pub async fn export(&self) -> ExportBundle {
        ExportBundle::new(self.list().await, self.clock.now())
    }

    /// Import the records of a bundle. Ids, usage counters and timestamps
    /// are assigned fresh.
    pub async fn import_bundle(
        &self,
        bundle: &ExportBundle,
        options: AddOptions,
    ) -> StoreResult<ImportReport> {
        self.import_many(bundle.drafts(), options).await
    }

    /// Parse an exported JSON document and import it.
    pub async fn import_json(&self, json: &str, options: AddOptions) -> StoreResult<ImportReport> {
        let bundle = ExportBundle::from_json(json)?;
        self.import_bundle(&bundle, options).await
    }
}
