//! Conflict Parser
//!
//! Turns the combined stdout+stderr of the external resolution command
//! into structured conflict records. Two shapes are recognized, matched
//! independently over the whole text and unioned in input order:
//!
//! 1. `<pkg> <version> depends on <dep> <constraint>`
//! 2. `<component> from sdk is incompatible with <pkg> <constraint>`
//!
//! The matching patterns live here and nowhere else; callers only see
//! [`DependencyConflict`] values.

use once_cell::sync::Lazy;
use regex::Regex;

use pubmend_core::DedupePrecedence;
use pubmend_manifest::Pubspec;

/// Sentinel required-constraint meaning "the active SDK itself is the
/// blocker, not another package".
pub const SDK_SENTINEL: &str = "sdk";

/// A constraint as it appears in solver output: optional operator, a
/// version, and an optional `<upper` part (`^1.19.0`, `>=1.10.0 <2.0.0`).
const CONSTRAINT: &str = r"[\^>=<]*\d[\d.]*(?:[-+][0-9A-Za-z.]+)?(?:\s*<\s*\d[\d.]*)?";

static DEPENDS_ON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"([a-z_][a-z0-9_]*)\s+(\d[^\s,]*)\s+depends\s+on\s+([a-z_][a-z0-9_]*)\s+({CONSTRAINT})"
    ))
    .expect("depends-on pattern")
});

static SDK_INCOMPATIBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"([a-z_][a-z0-9_]*)\s+from\s+sdk\s+is\s+incompatible\s+with\s+([a-z_][a-z0-9_]*)\s+({CONSTRAINT})"
    ))
    .expect("sdk-incompatible pattern")
});

/// One dependency conflict extracted from tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyConflict {
    /// The package that needs a different version.
    pub package: String,
    /// The version/constraint the package currently resolves to, when the
    /// output states one.
    pub current_constraint: Option<String>,
    /// What the package clashed with (another package, or an SDK-bundled
    /// toolchain component).
    pub conflicting_with: String,
    /// The constraint demanded by the other side, or [`SDK_SENTINEL`].
    pub required_constraint: String,
    /// Filled in lazily from the pubspec; see [`annotate`].
    pub is_direct_dependency: bool,
    /// Packages that the conflict output names as depending on this one.
    pub dependents: Vec<String>,
}

/// Parse conflicts out of combined tool output, preserving input order.
pub fn parse(output: &str) -> Vec<DependencyConflict> {
    let mut found: Vec<(usize, DependencyConflict)> = Vec::new();

    for caps in DEPENDS_ON_RE.captures_iter(output) {
        let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
        found.push((
            offset,
            DependencyConflict {
                package: caps[1].to_string(),
                current_constraint: Some(caps[2].to_string()),
                conflicting_with: caps[3].to_string(),
                // A sentence-final period can ride along with the version.
                required_constraint: caps[4].trim().trim_end_matches('.').to_string(),
                is_direct_dependency: false,
                dependents: Vec::new(),
            },
        ));
    }

    for caps in SDK_INCOMPATIBLE_RE.captures_iter(output) {
        let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
        found.push((
            offset,
            DependencyConflict {
                package: caps[2].to_string(),
                current_constraint: Some(caps[3].trim().trim_end_matches('.').to_string()),
                conflicting_with: caps[1].to_string(),
                required_constraint: SDK_SENTINEL.to_string(),
                is_direct_dependency: false,
                dependents: Vec::new(),
            },
        ));
    }

    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, conflict)| conflict).collect()
}

/// Deduplicate conflicts by package name.
///
/// Which occurrence survives is configurable; the surviving conflict keeps
/// the position of the first occurrence so output stays order-preserving.
pub fn dedupe(
    conflicts: Vec<DependencyConflict>,
    precedence: DedupePrecedence,
) -> Vec<DependencyConflict> {
    let mut out: Vec<DependencyConflict> = Vec::with_capacity(conflicts.len());

    for conflict in conflicts {
        match out.iter_mut().find(|c| c.package == conflict.package) {
            Some(existing) => {
                if precedence == DedupePrecedence::LastWins {
                    *existing = conflict;
                }
            }
            None => out.push(conflict),
        }
    }

    out
}

/// Fill in the lazily computed graph fields: direct-dependency status from
/// the pubspec, and dependents from the conflict set itself (a conflict
/// `A depends on B ...` names A as a dependent of B).
pub fn annotate(conflicts: &mut [DependencyConflict], pubspec: &Pubspec) {
    let edges: Vec<(String, String)> = conflicts
        .iter()
        .filter(|c| c.required_constraint != SDK_SENTINEL)
        .map(|c| (c.package.clone(), c.conflicting_with.clone()))
        .collect();

    for conflict in conflicts.iter_mut() {
        conflict.is_direct_dependency = pubspec.is_direct_dependency(&conflict.package);
        conflict.dependents = edges
            .iter()
            .filter(|(_, target)| *target == conflict.package)
            .map(|(source, _)| source.clone())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_depends_on_shape() {
        let output = "Because http_parser 4.1.2 depends on collection ^1.19.0, \
                      version solving failed.";
        let conflicts = parse(output);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.package, "http_parser");
        assert_eq!(c.current_constraint.as_deref(), Some("4.1.2"));
        assert_eq!(c.conflicting_with, "collection");
        assert_eq!(c.required_constraint, "^1.19.0");
    }

    #[test]
    fn test_parse_sdk_incompatible_shape() {
        let output = "So, because flutter_test from sdk is incompatible with \
                      mockito >=5.0.0, version solving failed.";
        let conflicts = parse(output);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.package, "mockito");
        assert_eq!(c.conflicting_with, "flutter_test");
        assert_eq!(c.required_constraint, SDK_SENTINEL);
        assert_eq!(c.current_constraint.as_deref(), Some(">=5.0.0"));
    }

    #[test]
    fn test_both_shapes_unioned_in_input_order() {
        let output = "\
Because http_parser 4.1.2 depends on collection ^1.19.0, resolution failed.
So, because flutter_test from sdk is incompatible with mockito >=5.0.0, no.
Because provider 6.0.0 depends on meta >=1.12.0, resolution failed.
";
        let conflicts = parse(output);
        let packages: Vec<&str> = conflicts.iter().map(|c| c.package.as_str()).collect();
        assert_eq!(packages, vec!["http_parser", "mockito", "provider"]);
    }

    #[test]
    fn test_range_constraint_survives_parsing() {
        let output = "Because app 1.0.0 depends on meta >=1.10.0 <2.0.0, failed.";
        let conflicts = parse(output);
        assert_eq!(conflicts[0].required_constraint, ">=1.10.0 <2.0.0");
    }

    #[test]
    fn test_no_conflicts_in_clean_output() {
        assert!(parse("Got dependencies!\n").is_empty());
    }

    #[test]
    fn test_dedupe_precedence() {
        let output = "\
Because http_parser 3.0.0 depends on collection ^1.14.0, failed.
Because http_parser 4.1.2 depends on collection ^1.19.0, failed.
";
        let conflicts = parse(output);
        assert_eq!(conflicts.len(), 2);

        let last = dedupe(conflicts.clone(), DedupePrecedence::LastWins);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].current_constraint.as_deref(), Some("4.1.2"));

        let first = dedupe(conflicts, DedupePrecedence::FirstWins);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].current_constraint.as_deref(), Some("3.0.0"));
    }

    #[test]
    fn test_annotate_direct_and_dependents() {
        let pubspec = Pubspec::parse(
            "name: app\ndependencies:\n  http_parser: ^4.0.0\n",
        )
        .unwrap();
        let output = "\
Because http_parser 4.1.2 depends on collection ^1.19.0, failed.
Because collection 1.19.0 depends on meta ^1.15.0, failed.
";
        let mut conflicts = parse(output);
        annotate(&mut conflicts, &pubspec);

        let http_parser = &conflicts[0];
        assert!(http_parser.is_direct_dependency);
        assert!(http_parser.dependents.is_empty());

        let collection = &conflicts[1];
        assert!(!collection.is_direct_dependency);
        assert_eq!(collection.dependents, vec!["http_parser"]);
    }
}
