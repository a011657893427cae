//! Compatible Version Finder
//!
//! Picks the newest release of a package that is actually installable
//! against the active toolchain. Two filters apply: the release's own SDK
//! constraint, and the versions of toolchain-bundled transitive libraries
//! the active Flutter line ships. The second filter is what constraint
//! checking alone misses: those libraries are pinned independently of the
//! SDK's own version number, so a candidate can pass its SDK check and
//! still fail to resolve.

use tracing::debug;

use pubmend_core::toolchain::{dart_runtime_for, max_provided_version};
use pubmend_core::{PubmendError, Result, SemVer};

use crate::client::{PackageRelease, RegistryClient};

/// Pure selection over an already-fetched, newest-first release list.
pub fn pick(
    releases: &[PackageRelease],
    active_dart: &SemVer,
    active_flutter: &SemVer,
) -> Option<SemVer> {
    releases
        .iter()
        .find(|release| {
            if !sdk_compatible(release, active_dart) {
                debug!(
                    "{} rejected: SDK constraint excludes Dart {}",
                    release.version, active_dart
                );
                return false;
            }
            if let Some(library) = bundled_conflict(release, active_flutter) {
                debug!(
                    "{} rejected: requires {} beyond what the active line ships",
                    release.version, library
                );
                return false;
            }
            true
        })
        .map(|release| release.version.clone())
}

fn sdk_compatible(release: &PackageRelease, active_dart: &SemVer) -> bool {
    match &release.sdk_constraint {
        Some(constraint) => constraint.satisfies(active_dart),
        // No declared constraint is no information, not a rejection.
        None => true,
    }
}

/// The first toolchain-bundled library whose declared constraint exceeds
/// what the active line provides, if any.
fn bundled_conflict<'a>(
    release: &'a PackageRelease,
    active_flutter: &SemVer,
) -> Option<&'a str> {
    release
        .dependencies
        .iter()
        .find(|(name, constraint)| {
            match max_provided_version(name, active_flutter) {
                Some(provided) => !constraint.satisfies(&provided),
                // Not a bundled library; pub can resolve it freely.
                None => false,
            }
        })
        .map(|(name, _)| name.as_str())
}

/// Finder bound to a registry client and an active toolchain.
pub struct CompatibleVersionFinder<'a> {
    client: &'a RegistryClient,
    active_flutter: SemVer,
    active_dart: SemVer,
}

impl<'a> CompatibleVersionFinder<'a> {
    /// Create a finder for the Flutter line containing `active_flutter`.
    pub fn new(client: &'a RegistryClient, active_flutter: SemVer) -> Result<Self> {
        let active_dart = dart_runtime_for(&active_flutter).ok_or_else(|| {
            PubmendError::Config(format!(
                "Flutter {} is below the known compatibility table",
                active_flutter
            ))
        })?;
        Ok(Self {
            client,
            active_flutter,
            active_dart,
        })
    }

    /// The newest installable version of `package`, or `None` when no
    /// published release passes both filters. Registry failure is an
    /// error, not a `None`.
    pub async fn find(&self, package: &str) -> Result<Option<SemVer>> {
        let releases = self.client.fetch_versions(package).await?;
        Ok(pick(&releases, &self.active_dart, &self.active_flutter))
    }

    pub fn active_dart(&self) -> &SemVer {
        &self.active_dart
    }

    pub fn active_flutter(&self) -> &SemVer {
        &self.active_flutter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmend_core::VersionConstraint;
    use std::collections::BTreeMap;

    fn v(s: &str) -> SemVer {
        SemVer::parse(s).unwrap()
    }

    fn release(version: &str, sdk: &str, deps: &[(&str, &str)]) -> PackageRelease {
        PackageRelease {
            version: v(version),
            sdk_constraint: Some(VersionConstraint::parse_min(sdk).unwrap()),
            dependencies: deps
                .iter()
                .map(|(n, c)| (n.to_string(), VersionConstraint::parse_min(c).unwrap()))
                .collect(),
        }
    }

    #[test]
    fn test_pick_newest_sdk_compatible() {
        // Active: Flutter 3.16 line -> Dart 3.2, collection max 1.18.0.
        let releases = vec![
            release("5.0.0", ">=3.5.0 <4.0.0", &[]),
            release("4.1.2", ">=3.0.0 <4.0.0", &[]),
            release("4.0.0", ">=2.12.0 <3.0.0", &[]),
        ];
        assert_eq!(
            pick(&releases, &v("3.2.0"), &v("3.16.9")),
            Some(v("4.1.2"))
        );
    }

    #[test]
    fn test_bundled_library_pin_rejects_candidate() {
        // 4.1.2 passes its own SDK check but wants collection ^1.19.0,
        // while the 3.16 line ships at most 1.18.0.
        let releases = vec![
            release("4.1.2", ">=3.0.0 <4.0.0", &[("collection", "^1.19.0")]),
            release("4.0.2", ">=3.0.0 <4.0.0", &[("collection", "^1.15.0")]),
        ];
        assert_eq!(
            pick(&releases, &v("3.2.0"), &v("3.16.9")),
            Some(v("4.0.2"))
        );
    }

    #[test]
    fn test_non_bundled_dependencies_do_not_filter() {
        let releases = vec![release(
            "2.0.0",
            ">=3.0.0 <4.0.0",
            &[("http", "^99.0.0")],
        )];
        assert_eq!(pick(&releases, &v("3.2.0"), &v("3.16.9")), Some(v("2.0.0")));
    }

    #[test]
    fn test_no_candidate_survives() {
        let releases = vec![
            release("4.1.2", ">=3.3.0 <4.0.0", &[]),
            release("4.1.0", ">=3.0.0 <4.0.0", &[("collection", "^1.19.0")]),
        ];
        assert_eq!(pick(&releases, &v("2.19.0"), &v("3.7.0")), None);
    }

    #[test]
    fn test_missing_sdk_constraint_is_no_information() {
        let releases = vec![PackageRelease {
            version: v("1.0.0"),
            sdk_constraint: None,
            dependencies: BTreeMap::new(),
        }];
        assert_eq!(pick(&releases, &v("2.10.0"), &v("1.22.0")), Some(v("1.0.0")));
    }
}
