//! Version Signal Collection
//!
//! Gathers the three toolchain-version signals a project can carry:
//! the creation version recorded in `.metadata`, the manifest's SDK lower
//! bound (a Dart runtime version), and a `.flutter-version` pin file.
//! Absence of any signal is a legitimate value, not an error; only I/O
//! failures other than "file not found" propagate.

use std::path::Path;

use tracing::{debug, warn};

use pubmend_core::{Result, SemVer, VersionConstraint};
use pubmend_manifest::Pubspec;

/// The collected version signals, strongest first.
///
/// `creation` and `pinned` are Flutter SDK versions; `manifest_min` is the
/// lower bound of the pubspec SDK constraint and therefore a Dart runtime
/// version. The reconciler bridges the two layers.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    pub creation: Option<SemVer>,
    pub manifest_min: Option<SemVer>,
    pub pinned: Option<SemVer>,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.creation.is_none() && self.manifest_min.is_none() && self.pinned.is_none()
    }
}

/// Collect all signals from a project directory.
pub async fn collect(project_root: &Path) -> Result<SignalSet> {
    let signals = SignalSet {
        creation: creation_version(project_root).await?,
        manifest_min: manifest_minimum(project_root).await?,
        pinned: pinned_version(project_root).await?,
    };
    debug!(
        "Collected signals: creation={:?} manifest_min={:?} pinned={:?}",
        signals.creation, signals.manifest_min, signals.pinned
    );
    Ok(signals)
}

/// The Flutter version the project was created with, from the `version:`
/// key of `.metadata`.
async fn creation_version(project_root: &Path) -> Result<Option<SemVer>> {
    let Some(content) = read_optional(&project_root.join(".metadata")).await? else {
        return Ok(None);
    };

    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("version:") {
            match SemVer::parse(rest) {
                Ok(version) => return Ok(Some(version)),
                // A bare `version:` heading with nested keys carries no
                // version on the line itself; keep scanning.
                Err(_) => continue,
            }
        }
    }
    Ok(None)
}

/// The lower bound of the pubspec's `environment: sdk:` constraint.
async fn manifest_minimum(project_root: &Path) -> Result<Option<SemVer>> {
    let Some(content) = read_optional(&project_root.join("pubspec.yaml")).await? else {
        return Ok(None);
    };

    let pubspec = match Pubspec::parse(&content) {
        Ok(p) => p,
        Err(e) => {
            warn!("pubspec.yaml unreadable during signal collection: {}", e);
            return Ok(None);
        }
    };

    let Some(constraint_text) = pubspec.sdk_constraint else {
        return Ok(None);
    };

    match VersionConstraint::parse_min(&constraint_text) {
        Ok(constraint) => Ok(Some(constraint.lower_bound().clone())),
        Err(e) => {
            warn!(
                "Unparseable SDK constraint {:?} in pubspec.yaml: {}",
                constraint_text, e
            );
            Ok(None)
        }
    }
}

/// A locally pinned Flutter version from a `.flutter-version` file.
async fn pinned_version(project_root: &Path) -> Result<Option<SemVer>> {
    let Some(content) = read_optional(&project_root.join(".flutter-version")).await? else {
        return Ok(None);
    };
    Ok(SemVer::parse(content.trim()).ok())
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(dir: &Path, name: &str, content: &str) {
        tokio::fs::write(dir.join(name), content).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_project_has_no_signals() {
        let dir = tempfile::tempdir().unwrap();
        let signals = collect(dir.path()).await.unwrap();
        assert!(signals.is_empty());
    }

    #[tokio::test]
    async fn test_all_three_signals() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            ".metadata",
            "# This file tracks properties of this project.\nversion: 3.16.9\nchannel: stable\n",
        )
        .await;
        write(
            dir.path(),
            "pubspec.yaml",
            "name: app\nenvironment:\n  sdk: \">=3.2.0 <4.0.0\"\n",
        )
        .await;
        write(dir.path(), ".flutter-version", "3.16.9\n").await;

        let signals = collect(dir.path()).await.unwrap();
        assert_eq!(signals.creation, Some(SemVer::new(3, 16, 9)));
        assert_eq!(signals.manifest_min, Some(SemVer::new(3, 2, 0)));
        assert_eq!(signals.pinned, Some(SemVer::new(3, 16, 9)));
    }

    #[tokio::test]
    async fn test_metadata_with_nested_version_block() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            ".metadata",
            "version:\n  revision: abcdef\n  channel: stable\n",
        )
        .await;
        let signals = collect(dir.path()).await.unwrap();
        assert!(signals.creation.is_none());
    }

    #[tokio::test]
    async fn test_pubspec_without_environment() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pubspec.yaml", "name: app\n").await;
        let signals = collect(dir.path()).await.unwrap();
        assert!(signals.manifest_min.is_none());
    }

    #[tokio::test]
    async fn test_garbage_pin_file_is_no_signal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".flutter-version", "whatever\n").await;
        let signals = collect(dir.path()).await.unwrap();
        assert!(signals.pinned.is_none());
    }
}
