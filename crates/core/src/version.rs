//! Semantic version values and constraints
//!
//! The leaf of the engine: every other component compares, sorts, and
//! checks versions through the types defined here.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Matches the first version number in arbitrary text: a major component,
/// optional minor/patch, and an optional prerelease suffix. A trailing
/// `+build` suffix is consumed so it is not mistaken for another version,
/// then discarded: build metadata never affects precedence.
static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z][0-9A-Za-z.\-]*))?(?:\+[0-9A-Za-z.\-]+)?")
        .expect("version regex")
});

/// Version parsing errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum VersionError {
    #[error("no version number found in {0:?}")]
    Malformed(String),
}

/// An immutable semantic version value.
///
/// Missing minor/patch components parse as 0. A prerelease suffix is kept
/// verbatim; see [`SemVer::compare_release`] for how comparisons treat it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl SemVer {
    /// Create a release version (no prerelease suffix).
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Extract the first version number from `text`.
    ///
    /// Tolerant by design: `"2.10"`, `"v1.22.0"`, and
    /// `"Flutter 3.16.9 / Dart 3.2.6"` all yield a version (the first one
    /// found). Fails only when no numeric version is present at all.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let caps = VERSION_RE
            .captures(text)
            .ok_or_else(|| VersionError::Malformed(text.to_string()))?;

        let part = |i: usize| -> u64 {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };

        Ok(Self {
            major: part(1),
            minor: part(2),
            patch: part(3),
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    /// Compare by the numeric (major, minor, patch) triple only.
    ///
    /// Prerelease suffixes are ignored, so `1.2.3-beta` compares equal to
    /// `1.2.3`. Constraint checks are defined in these terms; use the `Ord`
    /// impl when prerelease-aware ordering matters (newest-first sorting).
    pub fn compare_release(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }

    /// The first version of the next major line: `1.19.2` -> `2.0.0`.
    pub fn next_major(&self) -> Self {
        Self::new(self.major + 1, 0, 0)
    }

    /// True if this version carries a prerelease suffix.
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }
}

impl Ord for SemVer {
    /// Total order: numeric triple first, then prerelease below the release
    /// of the same triple (`1.2.3-beta < 1.2.3`).
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_release(other)
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

/// How a bare `X.Y.Z` with no operator should be interpreted.
///
/// Call sites must be explicit: a bare version in a pin file means "exactly
/// this", while a bare version in a dependency declaration means "at least
/// this" in pub terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BareVersion {
    Exact,
    Minimum,
}

/// A predicate over [`SemVer`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Exactly this release triple.
    Exact(SemVer),
    /// This version or any newer one.
    AtLeast(SemVer),
    /// Caret range: `^X.Y.Z` means `>=X.Y.Z <(X+1).0.0`. Zero majors are
    /// not special-cased: `^0.4.2` means `>=0.4.2 <1.0.0`.
    Caret(SemVer),
    /// Half-open range `>=min <max`.
    Range { min: SemVer, max: SemVer },
}

impl VersionConstraint {
    /// Parse a constraint, interpreting a bare version per `bare`.
    ///
    /// Never fails on merely unusual input; the only error is text with no
    /// extractable version number.
    pub fn parse(text: &str, bare: BareVersion) -> Result<Self, VersionError> {
        let t = text.trim().trim_matches(|c| c == '"' || c == '\'');

        if let Some(rest) = t.strip_prefix('^') {
            return Ok(Self::Caret(SemVer::parse(rest)?));
        }

        if t.contains(">=") && t.contains('<') {
            let mut versions = VERSION_RE.find_iter(t);
            let min = versions
                .next()
                .ok_or_else(|| VersionError::Malformed(text.to_string()))
                .and_then(|m| SemVer::parse(m.as_str()))?;
            if let Some(m) = versions.next() {
                return Ok(Self::Range {
                    min,
                    max: SemVer::parse(m.as_str())?,
                });
            }
            return Ok(Self::AtLeast(min));
        }

        if t.starts_with(">=") || t.starts_with('>') {
            return Ok(Self::AtLeast(SemVer::parse(t)?));
        }

        let version = SemVer::parse(t)?;
        Ok(match bare {
            BareVersion::Exact => Self::Exact(version),
            BareVersion::Minimum => Self::AtLeast(version),
        })
    }

    /// Parse with bare versions meaning "exactly this".
    pub fn parse_exact(text: &str) -> Result<Self, VersionError> {
        Self::parse(text, BareVersion::Exact)
    }

    /// Parse with bare versions meaning "at least this".
    pub fn parse_min(text: &str) -> Result<Self, VersionError> {
        Self::parse(text, BareVersion::Minimum)
    }

    /// Whether `version` satisfies this constraint.
    ///
    /// Judged on release triples; prerelease suffixes do not affect the
    /// outcome.
    pub fn satisfies(&self, version: &SemVer) -> bool {
        match self {
            Self::Exact(v) => version.compare_release(v) == Ordering::Equal,
            Self::AtLeast(min) => version.compare_release(min) != Ordering::Less,
            Self::Caret(min) => {
                version.compare_release(min) != Ordering::Less
                    && version.compare_release(&min.next_major()) == Ordering::Less
            }
            Self::Range { min, max } => {
                version.compare_release(min) != Ordering::Less
                    && version.compare_release(max) == Ordering::Less
            }
        }
    }

    /// The inclusive lower bound of this constraint.
    pub fn lower_bound(&self) -> &SemVer {
        match self {
            Self::Exact(v) | Self::AtLeast(v) | Self::Caret(v) => v,
            Self::Range { min, .. } => min,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{}", v),
            Self::AtLeast(v) => write!(f, ">={}", v),
            Self::Caret(v) => write!(f, "^{}", v),
            Self::Range { min, max } => write!(f, ">={} <{}", min, max),
        }
    }
}
