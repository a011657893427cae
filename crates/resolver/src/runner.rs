//! Resolution Command Runner
//!
//! Runs the external resolution command (`flutter pub get` by default)
//! inside the project and captures its combined output for the conflict
//! parser. The trait seam exists so the orchestrator can be driven by
//! scripted output in tests.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use pubmend_core::{EngineConfig, PubmendError, Result};

/// What a resolution command run produced.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the command exited successfully.
    pub success: bool,
    /// stdout and stderr, concatenated in that order. Conflict diagnostics
    /// land on either stream depending on tool version.
    pub combined: String,
}

/// Seam between the orchestrator and the external resolution command.
#[allow(async_fn_in_trait)]
pub trait ResolutionRunner {
    async fn run(&self, project_root: &Path) -> Result<CommandOutput>;
}

/// Real runner that invokes the configured command via the OS.
pub struct PubGetRunner {
    command: Vec<String>,
    timeout: Duration,
}

impl PubGetRunner {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            command: config.pub_command.clone(),
            timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }
}

impl ResolutionRunner for PubGetRunner {
    async fn run(&self, project_root: &Path) -> Result<CommandOutput> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| PubmendError::Config("resolution command is empty".to_string()))?;

        info!("Running {} in {:?}", self.command.join(" "), project_root);

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(args)
                .current_dir(project_root)
                .output(),
        )
        .await
        .map_err(|_| {
            PubmendError::Timeout(format!(
                "{} did not finish within {}s",
                self.command.join(" "),
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| {
            PubmendError::Process(format!("failed to spawn {}: {}", self.command.join(" "), e))
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!(
            "Command exited with {:?} ({} bytes of output)",
            output.status.code(),
            combined.len()
        );

        Ok(CommandOutput {
            success: output.status.success(),
            combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        let runner = PubGetRunner {
            command: vec!["true".to_string()],
            timeout: Duration::from_secs(5),
        };
        let dir = tempfile::tempdir().unwrap();
        let output = runner.run(dir.path()).await.unwrap();
        assert!(output.success);
    }

    #[tokio::test]
    async fn test_failing_command_captures_output() {
        let runner = PubGetRunner {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo oops >&2; exit 1".to_string(),
            ],
            timeout: Duration::from_secs(5),
        };
        let dir = tempfile::tempdir().unwrap();
        let output = runner.run(dir.path()).await.unwrap();
        assert!(!output.success);
        assert!(output.combined.contains("oops"));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_process_error() {
        let runner = PubGetRunner {
            command: vec!["definitely-not-a-real-program".to_string()],
            timeout: Duration::from_secs(5),
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            runner.run(dir.path()).await,
            Err(PubmendError::Process(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = PubGetRunner {
            command: vec!["sleep".to_string(), "5".to_string()],
            timeout: Duration::from_millis(50),
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            runner.run(dir.path()).await,
            Err(PubmendError::Timeout(_))
        ));
    }
}
