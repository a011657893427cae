//! Manifest Backup Store
//!
//! Append-only record of manifest snapshots under `.pubmend/backups/`,
//! with copy-and-restore operations. The resolution engine's internal
//! transactional snapshot uses the same copy/restore semantics; this store
//! backs the user-facing `backups` and `restore` commands.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Backup errors
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index error: {0}")]
    Index(#[from] serde_json::Error),
    #[error("no backup with id {0}")]
    NotFound(String),
    #[error("{0:?} is outside the project root")]
    OutsideProject(PathBuf),
}

/// One snapshot record. Records are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub original_relative_path: PathBuf,
    pub backup_path: PathBuf,
    pub description: String,
}

/// Append-only backup store rooted in a project.
pub struct BackupStore {
    project_root: PathBuf,
}

impl BackupStore {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn backup_dir(&self) -> PathBuf {
        self.project_root.join(".pubmend").join("backups")
    }

    fn index_file(&self) -> PathBuf {
        self.backup_dir().join("index.json")
    }

    /// Copy `file` (relative to the project root) into the store and
    /// append a record for it.
    pub async fn snapshot(
        &self,
        relative_path: &Path,
        description: &str,
    ) -> Result<BackupRecord, BackupError> {
        if relative_path.is_absolute() {
            return Err(BackupError::OutsideProject(relative_path.to_path_buf()));
        }

        let original = self.project_root.join(relative_path);
        let id = Uuid::new_v4();
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        let backup_dir = self.backup_dir();
        tokio::fs::create_dir_all(&backup_dir).await?;

        let backup_path = backup_dir.join(format!("{}-{}", id, file_name));
        tokio::fs::copy(&original, &backup_path).await?;

        let record = BackupRecord {
            id,
            timestamp: Utc::now(),
            original_relative_path: relative_path.to_path_buf(),
            backup_path,
            description: description.to_string(),
        };

        let mut records = self.list().await?;
        records.push(record.clone());
        self.write_index(&records).await?;

        info!(
            "Backed up {:?} as {} ({})",
            relative_path, record.id, description
        );
        Ok(record)
    }

    /// Restore the file a record points at, byte for byte.
    pub async fn restore_record(&self, record: &BackupRecord) -> Result<(), BackupError> {
        let original = self.project_root.join(&record.original_relative_path);
        tokio::fs::copy(&record.backup_path, &original).await?;
        info!(
            "Restored {:?} from backup {}",
            record.original_relative_path, record.id
        );
        Ok(())
    }

    /// Restore by backup id.
    pub async fn restore(&self, id: Uuid) -> Result<BackupRecord, BackupError> {
        let records = self.list().await?;
        let record = records
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| BackupError::NotFound(id.to_string()))?;
        self.restore_record(&record).await?;
        Ok(record)
    }

    /// All records, oldest first.
    pub async fn list(&self) -> Result<Vec<BackupRecord>, BackupError> {
        let index_file = self.index_file();
        if !index_file.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&index_file).await?;
        let records = serde_json::from_str(&content)?;
        Ok(records)
    }

    async fn write_index(&self, records: &[BackupRecord]) -> Result<(), BackupError> {
        let content = serde_json::to_string_pretty(records)?;
        tokio::fs::write(self.index_file(), content).await?;
        debug!("Backup index updated ({} records)", records.len());
        Ok(())
    }
}
