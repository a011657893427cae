//! pubmend core - shared types and the compatibility table
//!
//! This crate provides the leaf types the rest of the engine is built on:
//! semantic versions and constraints, the central error enum, the explicit
//! engine configuration, and the static Flutter/Dart compatibility table.

pub mod config;
pub mod error;
pub mod toolchain;
pub mod version;

pub use config::{DedupePrecedence, EngineConfig};
pub use error::{PubmendError, Result};
pub use toolchain::ToolchainVersionSet;
pub use version::{BareVersion, SemVer, VersionConstraint, VersionError};

/// pubmend version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "pubmend";
