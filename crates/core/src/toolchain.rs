//! Flutter release-line compatibility table
//!
//! A Flutter line (major.minor) fixes the Dart runtime it ships, the
//! Gradle/AGP/Kotlin/Java versions its Android tooling expects, and the
//! versions of a handful of transitive libraries pinned by `flutter_test`.
//! The table is static; lookups use nearest-floor semantics so patch
//! releases within a line resolve to the line's bundle.

use once_cell::sync::Lazy;

use crate::version::SemVer;

/// The bundle of mutually compatible toolchain versions for one Flutter
/// release line. Looked up by major.minor; never mutated.
#[derive(Debug, Clone)]
pub struct ToolchainVersionSet {
    /// Anchor version of the Flutter line (patch = 0).
    pub sdk_version: SemVer,
    /// Dart runtime bundled with the line.
    pub dart: SemVer,
    /// Gradle version the line's Android templates expect.
    pub gradle: SemVer,
    /// Android Gradle Plugin version.
    pub android_gradle_plugin: SemVer,
    /// Kotlin plugin version.
    pub kotlin: SemVer,
    /// Java major version required by the Gradle/AGP pair.
    pub java: u32,
    /// minSdkVersion of the line's app template.
    pub min_sdk_platform: u32,
    /// targetSdkVersion of the line's app template.
    pub target_sdk_platform: u32,
    /// compileSdkVersion of the line's app template.
    pub compile_sdk_platform: u32,
}

struct LineEntry {
    line: (u64, u64),
    set: ToolchainVersionSet,
    /// Highest versions of flutter_test-pinned transitive libraries the
    /// line ships. These are pinned independently of the SDK's own version
    /// number, which is why constraint checking alone is not enough.
    bundled: &'static [(&'static str, &'static str)],
}

fn ver(s: &str) -> SemVer {
    SemVer::parse(s).expect("static compatibility table version")
}

#[rustfmt::skip]
fn row(
    line: (u64, u64),
    dart: &str,
    gradle: &str,
    agp: &str,
    kotlin: &str,
    java: u32,
    platforms: (u32, u32, u32),
    bundled: &'static [(&'static str, &'static str)],
) -> LineEntry {
    LineEntry {
        line,
        set: ToolchainVersionSet {
            sdk_version: SemVer::new(line.0, line.1, 0),
            dart: ver(dart),
            gradle: ver(gradle),
            android_gradle_plugin: ver(agp),
            kotlin: ver(kotlin),
            java,
            min_sdk_platform: platforms.0,
            target_sdk_platform: platforms.1,
            compile_sdk_platform: platforms.2,
        },
        bundled,
    }
}

/// Ascending by Flutter line.
static COMPAT_TABLE: Lazy<Vec<LineEntry>> = Lazy::new(|| {
    vec![
        row((1, 17), "2.8.0", "5.6.2", "3.5.0", "1.3.50", 8, (16, 28, 28),
            &[("collection", "1.14.11"), ("meta", "1.1.8"), ("vector_math", "2.0.8")]),
        row((1, 20), "2.9.0", "5.6.2", "3.5.0", "1.3.50", 8, (16, 29, 29),
            &[("collection", "1.14.13"), ("meta", "1.1.8"), ("vector_math", "2.0.8")]),
        row((1, 22), "2.10.0", "5.6.2", "3.5.0", "1.3.50", 8, (16, 29, 29),
            &[("collection", "1.15.0"), ("meta", "1.3.0"), ("vector_math", "2.1.0")]),
        row((2, 0), "2.12.0", "6.7.0", "4.1.0", "1.4.31", 8, (16, 30, 30),
            &[("collection", "1.15.0"), ("meta", "1.3.0"), ("vector_math", "2.1.0")]),
        row((2, 5), "2.14.0", "7.0.2", "4.1.0", "1.5.20", 8, (16, 30, 30),
            &[("collection", "1.15.0"), ("meta", "1.7.0"), ("vector_math", "2.1.0")]),
        row((2, 10), "2.16.0", "7.4.0", "7.0.4", "1.6.10", 11, (16, 31, 31),
            &[("collection", "1.15.0"), ("meta", "1.7.0"), ("vector_math", "2.1.1")]),
        row((3, 0), "2.17.0", "7.4.0", "7.1.2", "1.6.10", 11, (16, 31, 31),
            &[("collection", "1.16.0"), ("meta", "1.7.0"), ("vector_math", "2.1.2"),
              ("material_color_utilities", "0.1.4")]),
        row((3, 3), "2.18.0", "7.5.0", "7.1.2", "1.7.10", 11, (16, 32, 33),
            &[("collection", "1.16.0"), ("meta", "1.8.0"), ("vector_math", "2.1.2"),
              ("material_color_utilities", "0.1.5")]),
        row((3, 7), "2.19.0", "7.5.0", "7.2.0", "1.7.10", 11, (16, 33, 33),
            &[("collection", "1.17.0"), ("meta", "1.8.0"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.2.0")]),
        row((3, 10), "3.0.0", "7.6.3", "7.3.0", "1.7.10", 17, (19, 33, 33),
            &[("collection", "1.17.1"), ("meta", "1.9.1"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.2.0")]),
        row((3, 13), "3.1.0", "8.0.0", "7.4.2", "1.8.10", 17, (19, 33, 34),
            &[("collection", "1.17.2"), ("meta", "1.9.1"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.5.0")]),
        row((3, 16), "3.2.0", "8.3.0", "8.1.0", "1.8.22", 17, (19, 34, 34),
            &[("collection", "1.18.0"), ("meta", "1.10.0"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.8.0")]),
        row((3, 19), "3.3.0", "8.3.0", "8.1.0", "1.8.22", 17, (19, 34, 34),
            &[("collection", "1.18.0"), ("meta", "1.11.0"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.8.0")]),
        row((3, 22), "3.4.0", "8.7.0", "8.3.0", "1.9.24", 17, (21, 34, 34),
            &[("collection", "1.18.0"), ("meta", "1.12.0"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.11.1")]),
        row((3, 24), "3.5.0", "8.9.0", "8.5.0", "1.9.24", 17, (21, 34, 35),
            &[("collection", "1.18.0"), ("meta", "1.15.0"), ("vector_math", "2.1.4"),
              ("material_color_utilities", "0.11.1")]),
    ]
});

/// Dart runtime version at which sound null safety became mandatory.
static WATERSHED: Lazy<SemVer> = Lazy::new(|| SemVer::new(2, 12, 0));

/// The null-safety watershed, in Dart runtime terms.
pub fn null_safety_watershed() -> &'static SemVer {
    &WATERSHED
}

/// Whether a Dart runtime predates the null-safety watershed.
pub fn is_legacy_runtime(dart: &SemVer) -> bool {
    dart.compare_release(&WATERSHED) == std::cmp::Ordering::Less
}

/// Nearest table entry at or below `flutter`, if any.
fn entry_for(flutter: &SemVer) -> Option<&'static LineEntry> {
    COMPAT_TABLE
        .iter()
        .take_while(|e| e.line <= (flutter.major, flutter.minor))
        .last()
}

/// The toolchain bundle for a Flutter version (nearest-floor by line).
pub fn toolchain_for(flutter: &SemVer) -> Option<&'static ToolchainVersionSet> {
    entry_for(flutter).map(|e| &e.set)
}

/// Minimum Dart runtime shipped by the Flutter line containing `flutter`.
pub fn dart_runtime_for(flutter: &SemVer) -> Option<SemVer> {
    entry_for(flutter).map(|e| e.set.dart.clone())
}

/// The lowest Flutter line whose bundled Dart runtime is at least `dart`.
pub fn flutter_line_for_dart(dart: &SemVer) -> Option<SemVer> {
    COMPAT_TABLE
        .iter()
        .find(|e| e.set.dart.compare_release(dart) != std::cmp::Ordering::Less)
        .map(|e| e.set.sdk_version.clone())
}

/// Highest version of a flutter_test-pinned transitive library that the
/// line containing `flutter` ships, or `None` if the library is not one of
/// the pinned set.
pub fn max_provided_version(library: &str, flutter: &SemVer) -> Option<SemVer> {
    entry_for(flutter)?
        .bundled
        .iter()
        .find(|(name, _)| *name == library)
        .map(|(_, version)| ver(version))
}

/// Anchor version of the newest Flutter line the table knows about. Used
/// as a fallback when a Dart constraint is newer than every known line.
pub fn latest_known_line() -> SemVer {
    COMPAT_TABLE
        .last()
        .map(|e| e.set.sdk_version.clone())
        .expect("compatibility table is non-empty")
}

/// The pubspec SDK constraint string for a legacy-era Flutter version:
/// the line's own Dart runtime as lower bound, the watershed as upper.
/// Returns `None` for modern-era versions (no legacy constraint exists).
pub fn legacy_sdk_constraint_for(flutter: &SemVer) -> Option<String> {
    let dart = dart_runtime_for(flutter)?;
    if !is_legacy_runtime(&dart) {
        return None;
    }
    Some(format!(">={} <{}", dart, *WATERSHED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemVer {
        SemVer::parse(s).unwrap()
    }

    #[test]
    fn test_nearest_floor_lookup() {
        // A patch release within a line resolves to the line's bundle.
        let set = toolchain_for(&v("3.16.9")).unwrap();
        assert_eq!(set.sdk_version, v("3.16.0"));
        assert_eq!(set.dart, v("3.2.0"));
        assert_eq!(set.gradle, v("8.3.0"));
        assert_eq!(set.java, 17);

        // A minor between table lines falls back to the previous line.
        let set = toolchain_for(&v("3.18.0")).unwrap();
        assert_eq!(set.sdk_version, v("3.16.0"));

        // Below the whole table there is no information.
        assert!(toolchain_for(&v("0.9.0")).is_none());
    }

    #[test]
    fn test_dart_runtime_mapping() {
        assert_eq!(dart_runtime_for(&v("1.22.6")), Some(v("2.10.0")));
        assert_eq!(dart_runtime_for(&v("2.0.0")), Some(v("2.12.0")));
        assert_eq!(dart_runtime_for(&v("3.10.5")), Some(v("3.0.0")));
    }

    #[test]
    fn test_flutter_line_for_dart() {
        assert_eq!(flutter_line_for_dart(&v("2.12.0")), Some(v("2.0.0")));
        assert_eq!(flutter_line_for_dart(&v("3.0.0")), Some(v("3.10.0")));
        assert_eq!(flutter_line_for_dart(&v("99.0.0")), None);
    }

    #[test]
    fn test_latest_known_line() {
        assert_eq!(latest_known_line(), v("3.24.0"));
    }

    #[test]
    fn test_watershed_classification() {
        assert!(is_legacy_runtime(&v("2.10.0")));
        assert!(is_legacy_runtime(&v("2.11.9")));
        assert!(!is_legacy_runtime(&v("2.12.0")));
        assert!(!is_legacy_runtime(&v("3.0.0")));
    }

    #[test]
    fn test_max_provided_version() {
        assert_eq!(
            max_provided_version("collection", &v("3.16.9")),
            Some(v("1.18.0"))
        );
        assert_eq!(
            max_provided_version("collection", &v("1.22.0")),
            Some(v("1.15.0"))
        );
        assert_eq!(max_provided_version("http", &v("3.16.9")), None);
    }

    #[test]
    fn test_legacy_sdk_constraint() {
        assert_eq!(
            legacy_sdk_constraint_for(&v("1.22.0")).as_deref(),
            Some(">=2.10.0 <2.12.0")
        );
        // Modern lines have no legacy-era constraint.
        assert!(legacy_sdk_constraint_for(&v("3.16.0")).is_none());
    }
}
