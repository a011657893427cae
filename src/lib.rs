//! pubmend - version reconciliation and dependency repair for Flutter projects
//!
//! pubmend reads the version signals a Flutter project carries (creation
//! metadata, manifest SDK constraint, pin file), reconciles them into one
//! recommended SDK version, and repairs dependency conflicts against that
//! version through a transactional detect/resolve/verify cycle that never
//! leaves the manifest worse than it found it.
//!
//! ## Architecture
//!
//! pubmend is organized into specialized crates:
//!
//! - `pubmend-core`: versions, constraints, errors, configuration, and the
//!   Flutter/Dart compatibility table
//! - `pubmend-manifest`: pubspec reading, line-based patching, and backups
//! - `pubmend-registry`: registry client and compatible-version selection
//! - `pubmend-resolver`: signal collection, reconciliation, conflict
//!   parsing, and the resolution orchestrator

pub mod commands;

// Re-export main components for library usage
pub use pubmend_core as core;
pub use pubmend_manifest as manifest;
pub use pubmend_registry as registry;
pub use pubmend_resolver as resolver;

/// Prelude module for convenient imports
pub mod prelude {
    pub use pubmend_core::{EngineConfig, PubmendError, Result, SemVer, VersionConstraint};
    pub use pubmend_manifest::{BackupStore, Pubspec};
    pub use pubmend_registry::{CompatibleVersionFinder, RegistryClient};
    pub use pubmend_resolver::{
        PubGetRunner, ResolutionOrchestrator, ResolutionReport, RunState,
    };
}
