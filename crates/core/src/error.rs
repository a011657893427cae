//! Error types for pubmend
//!
//! Centralized error handling using thiserror. Component crates define
//! their own narrow error enums and convert into [`PubmendError`] at the
//! engine boundary.

use thiserror::Error;

use crate::version::VersionError;

/// Main error type for pubmend
#[derive(Error, Debug)]
pub enum PubmendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Version text with no extractable version number. Callers decide
    /// whether missing version info is "no signal" or a hard failure.
    #[error("Malformed version constraint: {0}")]
    MalformedConstraint(String),

    /// The registry could not be reached or returned garbage. Distinct
    /// from "no compatible version exists" and must not be conflated.
    #[error("Package registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// No source offered a toolchain version recommendation.
    #[error("No version signal found for this project")]
    NoVersionSignal,

    /// The null-safety restore found dependencies with no legacy-compatible
    /// release. Never auto-resolved.
    #[error("Manual decision required for: {}", .0.join(", "))]
    ManualDecisionRequired(Vec<String>),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for pubmend operations
pub type Result<T> = std::result::Result<T, PubmendError>;

impl From<VersionError> for PubmendError {
    fn from(err: VersionError) -> Self {
        PubmendError::MalformedConstraint(err.to_string())
    }
}

impl PubmendError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PubmendError::RegistryUnavailable(_) | PubmendError::Timeout(_)
        )
    }

    /// Get a user-friendly error message with remediation hints
    pub fn user_message(&self) -> String {
        match self {
            PubmendError::Io(e) => format!("File operation failed: {}", e),
            PubmendError::RegistryUnavailable(msg) => format!(
                "Could not query the package registry: {}. \
                 Check your connection; no conclusion about package compatibility was drawn.",
                msg
            ),
            PubmendError::NoVersionSignal => "No version signal found. Provide at least one of: \
                 a `version:` entry in .metadata, an `environment: sdk:` constraint in \
                 pubspec.yaml, or a .flutter-version pin file."
                .to_string(),
            PubmendError::ManualDecisionRequired(packages) => format!(
                "These dependencies have no release compatible with the pre-null-safety SDK: {}. \
                 For each one: remove it, replace it, or explicitly accept the SDK upgrade.",
                packages.join(", ")
            ),
            PubmendError::Timeout(msg) => format!("Operation timed out: {}", msg),
            _ => self.to_string(),
        }
    }
}
