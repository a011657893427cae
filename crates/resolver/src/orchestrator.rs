//! Resolution Orchestrator
//!
//! Composes the whole engine into one transactional cycle:
//! backup → detect → resolve → apply → verify, with commit or rollback at
//! the end. The manifest is never left in a worse state than before the
//! run: every exit path either commits a verified (possibly partial)
//! improvement or restores the pre-run bytes.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use pubmend_core::toolchain::dart_runtime_for;
use pubmend_core::{EngineConfig, PubmendError, Result, SemVer, VersionConstraint};
use pubmend_manifest::{patch_dependency_version, patch_sdk_constraint, Pubspec};
use pubmend_registry::{pick, CompatibleVersionFinder, PackageRelease, RegistryClient};

use crate::conflict;
use crate::reconciler::{self, UpdatePlan, VersionAnalysis};
use crate::runner::ResolutionRunner;
use crate::signals;

/// States of a resolution cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    BackedUp,
    Detecting,
    Resolving,
    Verifying,
    Committed,
    RolledBack,
}

/// Why a conflicting package was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Every published release fails the installability filters.
    NoCompatibleVersion,
    /// The registry could not be queried; no compatibility conclusion
    /// was drawn.
    RegistryUnreachable(String),
    /// Transitive dependency; only direct declarations are rewritten.
    NotDirectDependency,
    /// Declared without a plain version constraint (git/path/sdk mapping
    /// or a bare key); the line patcher never rewrites those.
    UnpatchableDeclaration,
}

/// Final report of one resolution run.
#[derive(Debug, Clone)]
pub struct ResolutionReport {
    pub state: RunState,
    pub analysis: VersionAnalysis,
    /// The Flutter version the run resolved against.
    pub active_flutter: SemVer,
    /// Packages rewritten in the manifest, with their new versions.
    pub resolved: Vec<(String, SemVer)>,
    /// Packages left untouched, with the reason.
    pub unresolved: Vec<(String, UnresolvedReason)>,
    pub message: String,
}

impl ResolutionReport {
    /// Next-step suggestions for each unresolved package.
    pub fn suggestions(&self) -> Vec<String> {
        self.unresolved
            .iter()
            .map(|(package, reason)| match reason {
                UnresolvedReason::NoCompatibleVersion => format!(
                    "{}: no published release is installable with Flutter {}; \
                     remove it, replace it, or resolve against a different SDK version",
                    package, self.active_flutter
                ),
                UnresolvedReason::RegistryUnreachable(msg) => format!(
                    "{}: the registry could not be queried ({}); retry once the \
                     network is available",
                    package, msg
                ),
                UnresolvedReason::NotDirectDependency => format!(
                    "{}: transitive dependency; upgrade the direct dependency that \
                     pulls it in, or add a dependency override",
                    package
                ),
                UnresolvedReason::UnpatchableDeclaration => format!(
                    "{}: declared as a git/path/sdk dependency; point the declaration \
                     at a compatible revision manually",
                    package
                ),
            })
            .collect()
    }
}

/// Transactional wrapper around one resolution run's manifest backup.
///
/// Exactly one attempt is active per run; it is the sole owner of the
/// backup artifact, which is discarded on commit and copied back on
/// rollback.
pub struct ResolutionAttempt {
    manifest: PathBuf,
    backup: PathBuf,
}

impl ResolutionAttempt {
    /// Snapshot the manifest into `.pubmend/` before any mutation.
    pub async fn begin(project_root: &Path) -> Result<Self> {
        let manifest = project_root.join("pubspec.yaml");
        let backup_dir = project_root.join(".pubmend");
        tokio::fs::create_dir_all(&backup_dir).await?;

        let backup = backup_dir.join(format!("pubspec.yaml.bak-{}", Uuid::new_v4()));
        tokio::fs::copy(&manifest, &backup).await?;
        debug!("Manifest snapshot at {:?}", backup);

        Ok(Self { manifest, backup })
    }

    /// Discard the backup; the mutated manifest is the new truth.
    pub async fn commit(self) -> Result<()> {
        tokio::fs::remove_file(&self.backup).await?;
        Ok(())
    }

    /// Restore the manifest byte-for-byte and discard the backup.
    pub async fn roll_back(self) -> Result<()> {
        tokio::fs::copy(&self.backup, &self.manifest).await?;
        tokio::fs::remove_file(&self.backup).await?;
        info!("Manifest rolled back from snapshot");
        Ok(())
    }
}

/// The engine's top-level entry point.
pub struct ResolutionOrchestrator<R: ResolutionRunner> {
    config: EngineConfig,
    client: RegistryClient,
    runner: R,
}

impl<R: ResolutionRunner> ResolutionOrchestrator<R> {
    pub fn new(config: EngineConfig, runner: R) -> Result<Self> {
        let client = RegistryClient::new(&config.registry_endpoint, config.command_timeout_secs)?;
        Ok(Self {
            config,
            client,
            runner,
        })
    }

    /// Run one full resolution cycle.
    ///
    /// Fails fast with [`PubmendError::NoVersionSignal`] before touching
    /// the manifest. Once the backup exists, any error path rolls the
    /// manifest back before propagating.
    pub async fn run(&self) -> Result<ResolutionReport> {
        let signals = signals::collect(&self.config.project_root).await?;
        let analysis = reconciler::reconcile(&signals)?;

        let manifest = self.config.project_root.join("pubspec.yaml");
        let pubspec = Pubspec::load(&manifest).await?;
        let plan = reconciler::plan_update(analysis, pubspec.sdk_constraint.as_deref());

        let active_flutter = self
            .config
            .active_sdk_version
            .clone()
            .unwrap_or_else(|| plan.analysis.recommended.clone());
        let finder = CompatibleVersionFinder::new(&self.client, active_flutter)?;

        let attempt = ResolutionAttempt::begin(&self.config.project_root).await?;
        info!(
            "Resolution cycle started for {:?} against Flutter {}",
            pubspec.name,
            finder.active_flutter()
        );

        match self.execute(&plan, &pubspec, &finder, &manifest).await {
            Ok(report) => {
                if report.state == RunState::RolledBack {
                    attempt.roll_back().await?;
                } else {
                    attempt.commit().await?;
                }
                Ok(report)
            }
            Err(e) => {
                warn!("Resolution failed ({}); rolling the manifest back", e);
                // The original failure is what the caller must see; a
                // broken rollback is logged on top, not swapped in.
                if let Err(rollback_err) = attempt.roll_back().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        plan: &UpdatePlan,
        pubspec: &Pubspec,
        finder: &CompatibleVersionFinder<'_>,
        manifest: &Path,
    ) -> Result<ResolutionReport> {
        let report = |state: RunState,
                      resolved: Vec<(String, SemVer)>,
                      unresolved: Vec<(String, UnresolvedReason)>,
                      message: String| ResolutionReport {
            state,
            analysis: plan.analysis.clone(),
            active_flutter: finder.active_flutter().clone(),
            resolved,
            unresolved,
            message,
        };

        if plan.legacy_restore {
            self.restore_legacy(plan, pubspec, manifest).await?;
        }

        debug!("State: Detecting");
        let first = self.runner.run(&self.config.project_root).await?;
        if first.success {
            return Ok(report(
                RunState::Committed,
                Vec::new(),
                Vec::new(),
                "dependency resolution succeeded; no conflicts detected".to_string(),
            ));
        }

        let mut conflicts = conflict::dedupe(
            conflict::parse(&first.combined),
            self.config.dedupe_precedence,
        );
        conflict::annotate(&mut conflicts, pubspec);
        info!("Detected {} conflict(s)", conflicts.len());

        debug!("State: Resolving");
        let mut resolved: Vec<(String, SemVer)> = Vec::new();
        let mut unresolved: Vec<(String, UnresolvedReason)> = Vec::new();

        for c in &conflicts {
            if !c.is_direct_dependency {
                unresolved.push((c.package.clone(), UnresolvedReason::NotDirectDependency));
                continue;
            }
            // Direct but not declared as a plain constraint: nothing to
            // rewrite, so never a reason to abort the run.
            if pubspec.declared_constraint(&c.package).is_none() {
                unresolved.push((c.package.clone(), UnresolvedReason::UnpatchableDeclaration));
                continue;
            }
            match finder.find(&c.package).await {
                Ok(Some(version)) => {
                    patch_dependency_version(manifest, &c.package, &format!("^{}", version))
                        .await?;
                    resolved.push((c.package.clone(), version));
                }
                Ok(None) => {
                    unresolved.push((c.package.clone(), UnresolvedReason::NoCompatibleVersion));
                }
                Err(PubmendError::RegistryUnavailable(msg)) => {
                    warn!("Registry unreachable while resolving {}: {}", c.package, msg);
                    unresolved.push((c.package.clone(), UnresolvedReason::RegistryUnreachable(msg)));
                }
                Err(e) => return Err(e),
            }
        }

        debug!("State: Verifying");
        let second = self.runner.run(&self.config.project_root).await?;

        if second.success {
            let message = if unresolved.is_empty() {
                format!("resolved {} package(s); verification passed", resolved.len())
            } else {
                format!(
                    "resolved {} package(s); verification passed with {} left unresolved",
                    resolved.len(),
                    unresolved.len()
                )
            };
            Ok(report(RunState::Committed, resolved, unresolved, message))
        } else if !resolved.is_empty() {
            warn!(
                "Verification still fails; keeping partial progress ({} package(s) rewritten)",
                resolved.len()
            );
            Ok(report(
                RunState::Committed,
                resolved,
                unresolved,
                "partial: conflicts remain after applying every found resolution".to_string(),
            ))
        } else {
            Ok(report(
                RunState::RolledBack,
                resolved,
                unresolved,
                "no changes applied; manifest restored to its pre-run state".to_string(),
            ))
        }
    }

    /// Apply the null-safety restore path: rewrite the SDK constraint to
    /// the legacy era, then rehome each declared dependency that has no
    /// legacy-compatible release admitted by its current constraint.
    /// Dependencies with no legacy-compatible release at all are surfaced
    /// as a manual decision, never dropped.
    async fn restore_legacy(
        &self,
        plan: &UpdatePlan,
        pubspec: &Pubspec,
        manifest: &Path,
    ) -> Result<()> {
        let recommended = &plan.analysis.recommended;
        let constraint = plan.sdk_constraint.as_deref().ok_or_else(|| {
            PubmendError::Internal("legacy restore planned without a constraint".to_string())
        })?;

        info!(
            "Restoring legacy SDK constraint {:?} for Flutter {}",
            constraint, recommended
        );
        patch_sdk_constraint(manifest, constraint).await?;

        let legacy_dart = dart_runtime_for(recommended).ok_or_else(|| {
            PubmendError::Config(format!(
                "Flutter {} is below the known compatibility table",
                recommended
            ))
        })?;
        let installable = |release: &PackageRelease| {
            pick(std::slice::from_ref(release), &legacy_dart, recommended)
        };

        let mut manual: Vec<String> = Vec::new();
        for (package, declared) in pubspec.all_versioned_dependencies() {
            let releases = self.client.fetch_versions(package).await?;

            let declared_constraint = VersionConstraint::parse_min(declared).ok();
            let already_fine = releases.iter().any(|release| {
                declared_constraint
                    .as_ref()
                    .is_some_and(|c| c.satisfies(&release.version))
                    && installable(release).is_some()
            });
            if already_fine {
                continue;
            }

            match releases.iter().find_map(|release| installable(release)) {
                Some(version) => {
                    patch_dependency_version(manifest, package, &format!("^{}", version)).await?;
                    info!("Rehomed {} to ^{} for the legacy toolchain", package, version);
                }
                None => manual.push(package.to_string()),
            }
        }

        if manual.is_empty() {
            Ok(())
        } else {
            Err(PubmendError::ManualDecisionRequired(manual))
        }
    }
}
