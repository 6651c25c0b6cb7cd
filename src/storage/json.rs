//! JSON file storage.
//!
//! Layout:
//! - `{working_dir}/.mcp-manager/store.json`   MCP entries and profiles
//! - `{working_dir}/.mcp-manager/backups.json` snapshot ring

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use super::Storage;
use crate::backup::Backup;
use crate::state::StoreState;

const DATA_DIR: &str = ".mcp-manager";
const STORE_FILE: &str = "store.json";
const BACKUPS_FILE: &str = "backups.json";

/// Storage backed by pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Store data under `{working_dir}/.mcp-manager/`.
    pub fn new(working_dir: &Path) -> Self {
        Self {
            dir: working_dir.join(DATA_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    pub fn backups_path(&self) -> PathBuf {
        self.dir.join(BACKUPS_FILE)
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    /// Write through a sibling temp file and rename, so readers never see a
    /// partially written file.
    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        tracing::debug!("Saved {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn load(&self) -> Result<Option<StoreState>> {
        Self::read_json(&self.store_path()).await
    }

    async fn save(&self, state: &StoreState) -> Result<()> {
        Self::write_json(&self.store_path(), state).await
    }

    async fn load_backups(&self) -> Result<Vec<Backup>> {
        Ok(Self::read_json::<Vec<Backup>>(&self.backups_path())
            .await?
            .unwrap_or_default())
    }

    async fn save_backups(&self, backups: &[Backup]) -> Result<()> {
        Self::write_json(&self.backups_path(), backups).await
    }
}
