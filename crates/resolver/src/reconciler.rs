//! Version Reconciler
//!
//! Turns the collected version signals into a single recommended Flutter
//! version via an ordered decision table, and plans the manifest update
//! that recommendation implies. The null-safety boundary guard lives in
//! the planning step: a legacy recommendation must never leave the
//! manifest claiming a modern lower bound.

use tracing::{info, warn};

use pubmend_core::toolchain::{
    dart_runtime_for, flutter_line_for_dart, is_legacy_runtime, latest_known_line,
    legacy_sdk_constraint_for,
};
use pubmend_core::{PubmendError, Result, SemVer, VersionConstraint};

use crate::signals::SignalSet;

/// Outcome of reconciling the version signals.
#[derive(Debug, Clone)]
pub struct VersionAnalysis {
    /// The Flutter version the project should be resolved against.
    pub recommended: SemVer,
    /// Whether the signals disagreed (or the decision rests on a weak one).
    pub conflict: bool,
    /// Human-readable explanation naming the signals that decided it.
    pub reason: String,
    /// Which decision-table row fired.
    pub strategy: &'static str,
}

/// Apply the ordered decision table to the collected signals.
///
/// `creation` and `pinned` are Flutter versions; `manifest_min` is a Dart
/// runtime lower bound. Compatibility between creation and manifest is
/// judged at the Dart layer: the creation line's bundled runtime must be
/// at least the manifest's lower bound.
pub fn reconcile(signals: &SignalSet) -> Result<VersionAnalysis> {
    let analysis = match (&signals.creation, &signals.manifest_min) {
        (Some(creation), Some(manifest_min)) => {
            if creation_satisfies(creation, manifest_min) {
                VersionAnalysis {
                    recommended: creation.clone(),
                    conflict: false,
                    reason: format!(
                        "project was created with Flutter {} and the manifest accepts it",
                        creation
                    ),
                    strategy: "keep-creation",
                }
            } else {
                let manifest_line = flutter_line_for_manifest(manifest_min);
                let recommended = if creation.compare_release(&manifest_line)
                    == std::cmp::Ordering::Greater
                {
                    manifest_line.clone()
                } else {
                    creation.clone()
                };
                warn!(
                    "Creation version {} and manifest minimum Dart {} disagree; \
                     preferring the lower candidate {}",
                    creation, manifest_min, recommended
                );
                VersionAnalysis {
                    recommended,
                    conflict: true,
                    reason: format!(
                        "creation version Flutter {} is incompatible with the manifest's \
                         minimum Dart {} (Flutter {} line); preferring the lower candidate \
                         to preserve the original environment",
                        creation, manifest_min, manifest_line
                    ),
                    strategy: "prefer-lower",
                }
            }
        }
        (Some(creation), None) => VersionAnalysis {
            recommended: creation.clone(),
            conflict: false,
            reason: format!(
                "manifest declares no SDK constraint; using creation version Flutter {}",
                creation
            ),
            strategy: "creation-only",
        },
        (None, Some(manifest_min)) => VersionAnalysis {
            recommended: flutter_line_for_manifest(manifest_min),
            conflict: true,
            reason: format!(
                "no creation record; inferring the Flutter line for the manifest's \
                 minimum Dart {}",
                manifest_min
            ),
            strategy: "manifest-only",
        },
        (None, None) => match &signals.pinned {
            Some(pinned) => VersionAnalysis {
                recommended: pinned.clone(),
                conflict: true,
                reason: format!(
                    "only the local pin file offered a version (Flutter {}); \
                     this is the weakest signal",
                    pinned
                ),
                strategy: "pinned-only",
            },
            None => return Err(PubmendError::NoVersionSignal),
        },
    };

    info!(
        "Reconciled to Flutter {} via {} (conflict: {})",
        analysis.recommended, analysis.strategy, analysis.conflict
    );
    Ok(analysis)
}

fn creation_satisfies(creation: &SemVer, manifest_min: &SemVer) -> bool {
    match dart_runtime_for(creation) {
        Some(dart) => dart.compare_release(manifest_min) != std::cmp::Ordering::Less,
        // Below the table there is no runtime information; treat as
        // incompatible so the conflict path decides.
        None => false,
    }
}

/// The lowest Flutter line satisfying a manifest Dart lower bound, capped
/// at the newest line the table knows when the bound is newer than all of
/// them.
fn flutter_line_for_manifest(manifest_min: &SemVer) -> SemVer {
    flutter_line_for_dart(manifest_min).unwrap_or_else(latest_known_line)
}

/// The concrete manifest update a recommendation implies.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub analysis: VersionAnalysis,
    /// New `environment: sdk:` value, when the constraint must change.
    pub sdk_constraint: Option<String>,
    /// True when the plan is a null-safety restore: the SDK constraint is
    /// rewritten to the legacy era and declared dependencies must be
    /// rehomed to legacy-compatible releases.
    pub legacy_restore: bool,
}

/// Plan the manifest update for an analysis, applying the null-safety
/// boundary guard.
///
/// When the recommended Flutter line ships a pre-null-safety Dart runtime
/// but the manifest's current lower bound is at or above the watershed,
/// the straightforward update path is refused: the constraint is rewritten
/// to the legacy-era value for the *recommended* version, and the caller
/// must rehome modern-only dependencies (or surface them for a manual
/// decision).
pub fn plan_update(
    analysis: VersionAnalysis,
    current_sdk_constraint: Option<&str>,
) -> UpdatePlan {
    let recommended_dart = dart_runtime_for(&analysis.recommended);

    let current_min = current_sdk_constraint
        .and_then(|text| VersionConstraint::parse_min(text).ok())
        .map(|c| c.lower_bound().clone());

    if let (Some(dart), Some(current)) = (&recommended_dart, &current_min) {
        if is_legacy_runtime(dart) && !is_legacy_runtime(current) {
            let constraint = legacy_sdk_constraint_for(&analysis.recommended);
            warn!(
                "Manifest lower bound Dart {} is post-null-safety but the recommended \
                 Flutter {} is not; restoring the legacy constraint {:?}",
                current, analysis.recommended, constraint
            );
            return UpdatePlan {
                analysis,
                sdk_constraint: constraint,
                legacy_restore: true,
            };
        }
    }

    UpdatePlan {
        analysis,
        sdk_constraint: None,
        legacy_restore: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemVer {
        SemVer::parse(s).unwrap()
    }

    fn signals(
        creation: Option<&str>,
        manifest_min: Option<&str>,
        pinned: Option<&str>,
    ) -> SignalSet {
        SignalSet {
            creation: creation.map(|s| v(s)),
            manifest_min: manifest_min.map(|s| v(s)),
            pinned: pinned.map(|s| v(s)),
        }
    }

    #[test]
    fn test_creation_compatible_with_manifest() {
        // Flutter 3.16 ships Dart 3.2.0 which satisfies >=3.0.0.
        let analysis = reconcile(&signals(Some("3.16.9"), Some("3.0.0"), None)).unwrap();
        assert_eq!(analysis.recommended, v("3.16.9"));
        assert!(!analysis.conflict);
        assert_eq!(analysis.strategy, "keep-creation");
    }

    #[test]
    fn test_incompatible_pair_prefers_lower() {
        // Flutter 1.22 ships Dart 2.10, below a 3.0.0 manifest minimum.
        let analysis = reconcile(&signals(Some("1.22.0"), Some("3.0.0"), None)).unwrap();
        assert_eq!(analysis.recommended, v("1.22.0"));
        assert!(analysis.conflict);
        assert_eq!(analysis.strategy, "prefer-lower");
        assert!(analysis.reason.contains("1.22.0"));
        assert!(analysis.reason.contains("3.0.0"));
    }

    #[test]
    fn test_incompatible_pair_with_lower_manifest_line() {
        // Creation is newer than every known line, so its runtime mapping
        // cannot satisfy the manifest minimum; the capped manifest line is
        // the lower candidate and wins.
        let analysis = reconcile(&signals(Some("99.0.0"), Some("99.0.0"), None)).unwrap();
        assert_eq!(analysis.recommended, latest_known_line());
        assert!(analysis.conflict);
    }

    #[test]
    fn test_creation_only() {
        let analysis = reconcile(&signals(Some("3.7.0"), None, None)).unwrap();
        assert_eq!(analysis.recommended, v("3.7.0"));
        assert!(!analysis.conflict);
        assert_eq!(analysis.strategy, "creation-only");
    }

    #[test]
    fn test_manifest_only_maps_back_to_flutter_line() {
        let analysis = reconcile(&signals(None, Some("2.17.0"), None)).unwrap();
        assert_eq!(analysis.recommended, v("3.0.0"));
        assert!(analysis.conflict);
        assert_eq!(analysis.strategy, "manifest-only");
    }

    #[test]
    fn test_manifest_only_beyond_table_caps_at_latest() {
        let analysis = reconcile(&signals(None, Some("99.0.0"), None)).unwrap();
        assert_eq!(analysis.recommended, latest_known_line());
    }

    #[test]
    fn test_pinned_only() {
        let analysis = reconcile(&signals(None, None, Some("2.10.5"))).unwrap();
        assert_eq!(analysis.recommended, v("2.10.5"));
        assert!(analysis.conflict);
        assert_eq!(analysis.strategy, "pinned-only");
    }

    #[test]
    fn test_no_signals_at_all() {
        assert!(matches!(
            reconcile(&SignalSet::default()),
            Err(PubmendError::NoVersionSignal)
        ));
    }

    #[test]
    fn test_pinned_ignored_when_stronger_signals_exist() {
        let analysis =
            reconcile(&signals(Some("3.16.9"), Some("3.0.0"), Some("1.22.0"))).unwrap();
        assert_eq!(analysis.recommended, v("3.16.9"));
    }

    #[test]
    fn test_guard_fires_on_legacy_recommendation_with_modern_manifest() {
        let analysis = reconcile(&signals(Some("1.22.0"), Some("3.0.0"), None)).unwrap();
        let plan = plan_update(analysis, Some(">=3.0.0 <4.0.0"));
        assert!(plan.legacy_restore);
        assert_eq!(plan.sdk_constraint.as_deref(), Some(">=2.10.0 <2.12.0"));
    }

    #[test]
    fn test_guard_never_emits_modern_lower_bound_for_legacy_recommendation() {
        let watershed = pubmend_core::toolchain::null_safety_watershed();
        for manifest in [">=2.12.0 <3.0.0", ">=3.0.0 <4.0.0", "^3.2.0"] {
            let analysis =
                reconcile(&signals(Some("1.22.0"), Some("3.0.0"), None)).unwrap();
            let plan = plan_update(analysis, Some(manifest));
            let constraint = plan.sdk_constraint.expect("guard must rewrite");
            let lower = VersionConstraint::parse_min(&constraint)
                .unwrap()
                .lower_bound()
                .clone();
            assert_eq!(
                lower.compare_release(watershed),
                std::cmp::Ordering::Less,
                "constraint {:?} crossed the watershed",
                constraint
            );
        }
    }

    #[test]
    fn test_guard_silent_when_manifest_already_legacy() {
        let analysis = reconcile(&signals(Some("1.22.0"), None, None)).unwrap();
        let plan = plan_update(analysis, Some(">=2.10.0 <2.12.0"));
        assert!(!plan.legacy_restore);
        assert!(plan.sdk_constraint.is_none());
    }

    #[test]
    fn test_guard_silent_for_modern_recommendation() {
        let analysis = reconcile(&signals(Some("3.16.9"), Some("3.0.0"), None)).unwrap();
        let plan = plan_update(analysis, Some(">=3.0.0 <4.0.0"));
        assert!(!plan.legacy_restore);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let input = signals(Some("1.22.0"), Some("3.0.0"), Some("2.0.0"));
        let a = reconcile(&input).unwrap();
        let b = reconcile(&input).unwrap();
        assert_eq!(a.recommended, b.recommended);
        assert_eq!(a.conflict, b.conflict);
        assert_eq!(a.strategy, b.strategy);
    }
}
