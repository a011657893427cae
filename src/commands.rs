//! CLI commands for pubmend
//!
//! Thin wrappers over the engine crates: each command struct carries its
//! options and exposes an async `execute`.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use pubmend_core::{EngineConfig, PubmendError, SemVer};
use pubmend_manifest::{BackupStore, Pubspec};
use pubmend_resolver::{
    plan_update, reconcile, signals, PubGetRunner, ResolutionOrchestrator, RunState,
};

/// Read-only diagnosis: signals, recommendation, and the planned update.
pub struct DoctorCommand {
    pub project_path: PathBuf,
}

impl DoctorCommand {
    pub async fn execute(&self) -> Result<()> {
        let signals = signals::collect(&self.project_path).await?;

        println!("Version signals:");
        println!("  creation (.metadata):        {}", fmt(&signals.creation));
        println!("  manifest minimum (Dart):     {}", fmt(&signals.manifest_min));
        println!("  pin file (.flutter-version): {}", fmt(&signals.pinned));
        println!();

        let analysis = match reconcile(&signals) {
            Ok(analysis) => analysis,
            Err(e @ PubmendError::NoVersionSignal) => {
                println!("{}", e.user_message());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        println!("Recommendation: Flutter {}", analysis.recommended);
        println!("  strategy: {}", analysis.strategy);
        println!("  conflict: {}", if analysis.conflict { "yes" } else { "no" });
        println!("  {}", analysis.reason);

        let manifest = self.project_path.join("pubspec.yaml");
        if manifest.exists() {
            let pubspec = Pubspec::load(&manifest).await?;
            let plan = plan_update(analysis, pubspec.sdk_constraint.as_deref());
            if plan.legacy_restore {
                println!();
                println!(
                    "A resolve run would restore the legacy SDK constraint {:?} \
                     and rehome null-safe dependencies.",
                    plan.sdk_constraint.as_deref().unwrap_or("?")
                );
            }
        }

        Ok(())
    }
}

/// Full orchestrated resolution run.
pub struct ResolveCommand {
    pub project_path: PathBuf,
    pub registry_endpoint: Option<String>,
    pub sdk_version: Option<String>,
}

impl ResolveCommand {
    pub async fn execute(&self) -> Result<()> {
        let mut config = EngineConfig::load(self.project_path.clone()).await?;
        if let Some(endpoint) = &self.registry_endpoint {
            config.registry_endpoint = endpoint.clone();
        }
        if let Some(version) = &self.sdk_version {
            config.active_sdk_version = Some(SemVer::parse(version)?);
        }

        // A durable, user-restorable snapshot on top of the orchestrator's
        // own transactional backup.
        let store = BackupStore::new(self.project_path.clone());
        let record = store
            .snapshot(std::path::Path::new("pubspec.yaml"), "before resolve run")
            .await?;
        info!("Snapshot {} taken before the run", record.id);

        let runner = PubGetRunner::from_config(&config);
        let orchestrator = ResolutionOrchestrator::new(config, runner)?;

        let report = match orchestrator.run().await {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{}", e.user_message());
                return Err(e.into());
            }
        };

        println!("Outcome: {:?}", report.state);
        println!("Resolved against: Flutter {}", report.active_flutter);
        println!("{}", report.message);

        if !report.resolved.is_empty() {
            println!();
            println!("Rewritten:");
            for (package, version) in &report.resolved {
                println!("  {} -> ^{}", package, version);
            }
        }

        if !report.unresolved.is_empty() {
            println!();
            println!("Needs attention:");
            for suggestion in report.suggestions() {
                println!("  {}", suggestion);
            }
        }

        if report.state == RunState::RolledBack {
            anyhow::bail!("no conflict could be resolved; the manifest was restored");
        }
        Ok(())
    }
}

/// List manifest backups.
pub struct BackupsCommand {
    pub project_path: PathBuf,
}

impl BackupsCommand {
    pub async fn execute(&self) -> Result<()> {
        let store = BackupStore::new(self.project_path.clone());
        let records = store.list().await?;

        if records.is_empty() {
            println!("No backups recorded");
            return Ok(());
        }

        println!("Backups (newest last):");
        for record in records {
            println!(
                "  {}  {}  {}  ({})",
                record.id,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.original_relative_path.display(),
                record.description
            );
        }
        Ok(())
    }
}

/// Restore the manifest from a backup by id.
pub struct RestoreCommand {
    pub project_path: PathBuf,
    pub id: String,
}

impl RestoreCommand {
    pub async fn execute(&self) -> Result<()> {
        let id = uuid::Uuid::parse_str(&self.id)
            .map_err(|e| anyhow::anyhow!("invalid backup id {:?}: {}", self.id, e))?;

        let store = BackupStore::new(self.project_path.clone());
        let record = store.restore(id).await?;
        println!(
            "Restored {} from backup {} ({})",
            record.original_relative_path.display(),
            record.id,
            record.description
        );
        Ok(())
    }
}

fn fmt(version: &Option<SemVer>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "absent".to_string(),
    }
}
