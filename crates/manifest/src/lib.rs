//! pubmend manifest - pubspec.yaml reading, patching, and backups
//!
//! The engine treats the manifest as an external collaborator: this crate
//! reads it into a structured view, applies line-based format-preserving
//! patches, and keeps an append-only backup store for rollback.

pub mod backup;
pub mod patcher;
pub mod pubspec;

pub use backup::{BackupError, BackupRecord, BackupStore};
pub use patcher::{
    patch_dependency_version, patch_sdk_constraint, set_dependency_version, set_sdk_constraint,
    PatchError,
};
pub use pubspec::{DependencySpec, Pubspec};

use pubmend_core::PubmendError;

/// Manifest reading errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid pubspec: {0}")]
    Invalid(String),
}

impl From<ManifestError> for PubmendError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Io(e) => PubmendError::Io(e),
            other => PubmendError::Manifest(other.to_string()),
        }
    }
}

impl From<PatchError> for PubmendError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::Io(e) => PubmendError::Io(e),
            other => PubmendError::Manifest(other.to_string()),
        }
    }
}

impl From<BackupError> for PubmendError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::Io(e) => PubmendError::Io(e),
            other => PubmendError::Backup(other.to_string()),
        }
    }
}
