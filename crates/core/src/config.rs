//! Engine Configuration
//!
//! Every component receives an explicit [`EngineConfig`]; nothing reads
//! environment variables or the ambient working directory. The config
//! round-trips to `.pubmend/pubmend.toml` inside the project.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::version::SemVer;

/// Which occurrence wins when two conflicts name the same package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupePrecedence {
    /// Keep the first conflict seen for a package.
    FirstWins,
    /// Keep the last conflict seen for a package (the more specific match
    /// typically appears later in tool output).
    LastWins,
}

impl Default for DedupePrecedence {
    fn default() -> Self {
        DedupePrecedence::LastWins
    }
}

/// Engine configuration, passed into every component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the Flutter project (contains pubspec.yaml).
    pub project_root: PathBuf,
    /// Base URL of the package registry API.
    pub registry_endpoint: String,
    /// Flutter version to resolve against. `None` means "use the
    /// reconciler's recommendation".
    pub active_sdk_version: Option<SemVer>,
    /// External resolution command, argv style.
    pub pub_command: Vec<String>,
    /// Bounded timeout for each external process/network call, in seconds.
    /// Generous by design; a timeout is treated like any other failure.
    pub command_timeout_secs: u64,
    /// Conflict dedupe precedence.
    #[serde(default)]
    pub dedupe_precedence: DedupePrecedence,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            registry_endpoint: "https://pub.dev/api".to_string(),
            active_sdk_version: None,
            pub_command: vec!["flutter".into(), "pub".into(), "get".into()],
            command_timeout_secs: 600,
            dedupe_precedence: DedupePrecedence::default(),
        }
    }
}

impl EngineConfig {
    /// A default configuration rooted at `project_root`.
    pub fn for_project(project_root: PathBuf) -> Self {
        Self {
            project_root,
            ..Self::default()
        }
    }

    /// Path of the config file inside the project.
    pub fn config_file(&self) -> PathBuf {
        self.project_root.join(".pubmend").join("pubmend.toml")
    }

    /// Load configuration for a project, falling back to defaults when no
    /// config file exists. Never writes implicitly.
    pub async fn load(project_root: PathBuf) -> Result<Self> {
        let defaults = Self::for_project(project_root);
        let config_file = defaults.config_file();

        if config_file.exists() {
            debug!("Loading config from {:?}", config_file);
            let contents = tokio::fs::read_to_string(&config_file).await?;
            let mut config: EngineConfig = toml::from_str(&contents)?;
            config.project_root = defaults.project_root;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(defaults)
        }
    }

    /// Save configuration to the project's config file.
    pub async fn save(&self) -> Result<()> {
        let config_file = self.config_file();

        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(&config_file, contents).await?;

        debug!("Config saved to {:?}", config_file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.registry_endpoint, "https://pub.dev/api");
        assert_eq!(config.pub_command, vec!["flutter", "pub", "get"]);
        assert_eq!(config.dedupe_precedence, DedupePrecedence::LastWins);
        assert!(config.active_sdk_version.is_none());
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::for_project(dir.path().to_path_buf());
        config.registry_endpoint = "http://localhost:8080/api".to_string();
        config.active_sdk_version = Some(SemVer::new(3, 16, 9));
        config.save().await.unwrap();

        let loaded = EngineConfig::load(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(loaded.registry_endpoint, "http://localhost:8080/api");
        assert_eq!(loaded.active_sdk_version, Some(SemVer::new(3, 16, 9)));
    }

    #[tokio::test]
    async fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(config.registry_endpoint, "https://pub.dev/api");
        assert!(!config.config_file().exists());
    }
}
