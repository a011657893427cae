//! Registry Client
//!
//! Queries a pub.dev-style API for a package's published versions and
//! their own SDK/dependency constraints. Network failure, non-2xx status,
//! and malformed payloads all collapse into [`RegistryError`]; callers
//! must treat that as "no information", never as "no compatible version".

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use pubmend_core::{PubmendError, SemVer, VersionConstraint};

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("registry returned HTTP {0} for {1}")]
    Status(u16, String),
    #[error("malformed registry payload: {0}")]
    Payload(String),
}

impl From<RegistryError> for PubmendError {
    fn from(err: RegistryError) -> Self {
        PubmendError::RegistryUnavailable(err.to_string())
    }
}

/// One published release of a package, as the registry describes it.
#[derive(Debug, Clone)]
pub struct PackageRelease {
    pub version: SemVer,
    /// The release's own Dart SDK constraint, if it declares one.
    pub sdk_constraint: Option<VersionConstraint>,
    /// Plain version constraints the release declares on other packages.
    pub dependencies: BTreeMap<String, VersionConstraint>,
}

#[derive(Deserialize)]
struct PackagePayload {
    versions: Vec<ReleasePayload>,
}

#[derive(Deserialize)]
struct ReleasePayload {
    version: String,
    #[serde(default)]
    pubspec: PubspecPayload,
}

#[derive(Deserialize, Default)]
struct PubspecPayload {
    #[serde(default)]
    environment: Option<EnvironmentPayload>,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct EnvironmentPayload {
    #[serde(default)]
    sdk: Option<String>,
}

/// HTTP client for the package registry, with a per-run response cache.
pub struct RegistryClient {
    http: reqwest::Client,
    endpoint: String,
    cache: Mutex<HashMap<String, Vec<PackageRelease>>>,
}

impl RegistryClient {
    /// Create a client for `endpoint` with a bounded per-request timeout.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch the published releases of `package`, newest first.
    ///
    /// Results are cached for the lifetime of the client, so one
    /// resolution run queries each package at most once.
    pub async fn fetch_versions(&self, package: &str) -> Result<Vec<PackageRelease>, RegistryError> {
        if let Some(hit) = self
            .cache
            .lock()
            .expect("registry cache lock")
            .get(package)
        {
            debug!("Registry cache hit for {}", package);
            return Ok(hit.clone());
        }

        let url = format!("{}/packages/{}", self.endpoint, package);
        debug!("Fetching {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status(status.as_u16(), package.to_string()));
        }

        let body = response.text().await?;
        let releases = parse_package_payload(&body)?;

        self.cache
            .lock()
            .expect("registry cache lock")
            .insert(package.to_string(), releases.clone());

        Ok(releases)
    }
}

/// Parse a registry package payload into releases sorted newest-first.
///
/// Individual versions with unparseable version strings are skipped with a
/// warning; a payload with no parseable version at all is malformed.
pub fn parse_package_payload(body: &str) -> Result<Vec<PackageRelease>, RegistryError> {
    let payload: PackagePayload =
        serde_json::from_str(body).map_err(|e| RegistryError::Payload(e.to_string()))?;

    let mut releases: Vec<PackageRelease> = Vec::with_capacity(payload.versions.len());
    for entry in payload.versions {
        let version = match SemVer::parse(&entry.version) {
            Ok(v) => v,
            Err(_) => {
                warn!("Skipping unparseable version {:?}", entry.version);
                continue;
            }
        };

        let sdk_constraint = entry
            .pubspec
            .environment
            .and_then(|env| env.sdk)
            .and_then(|text| VersionConstraint::parse_min(&text).ok());

        let mut dependencies = BTreeMap::new();
        for (name, value) in entry.pubspec.dependencies.unwrap_or_default() {
            // Git/path dependencies show up as objects; only plain version
            // constraints participate in compatibility checks.
            if let Some(text) = value.as_str() {
                match VersionConstraint::parse_min(text) {
                    Ok(constraint) => {
                        dependencies.insert(name, constraint);
                    }
                    Err(_) => warn!("Skipping unparseable constraint {:?} on {}", text, name),
                }
            }
        }

        releases.push(PackageRelease {
            version,
            sdk_constraint,
            dependencies,
        });
    }

    if releases.is_empty() {
        return Err(RegistryError::Payload(
            "payload contains no parseable versions".to_string(),
        ));
    }

    // Newest first; the Ord impl ranks prereleases below their release.
    releases.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(releases)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "name": "http_parser",
        "versions": [
            {
                "version": "3.1.4",
                "pubspec": {
                    "environment": { "sdk": ">=2.3.0 <3.0.0" },
                    "dependencies": { "collection": "^1.15.0" }
                }
            },
            {
                "version": "4.1.2",
                "pubspec": {
                    "environment": { "sdk": ">=3.3.0 <4.0.0" },
                    "dependencies": { "collection": "^1.19.0" }
                }
            },
            {
                "version": "4.0.0",
                "pubspec": {
                    "environment": { "sdk": ">=2.12.0 <3.0.0" },
                    "dependencies": {
                        "collection": "^1.15.0",
                        "local_dep": { "path": "../local" }
                    }
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_payload_newest_first() {
        let releases = parse_package_payload(PAYLOAD).unwrap();
        let versions: Vec<String> = releases.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["4.1.2", "4.0.0", "3.1.4"]);
    }

    #[test]
    fn test_parse_payload_constraints() {
        let releases = parse_package_payload(PAYLOAD).unwrap();
        let newest = &releases[0];
        assert!(newest
            .sdk_constraint
            .as_ref()
            .unwrap()
            .satisfies(&SemVer::new(3, 4, 0)));
        assert!(newest.dependencies.contains_key("collection"));
        // Non-string dependency values are skipped.
        assert!(!releases[1].dependencies.contains_key("local_dep"));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            parse_package_payload("not json"),
            Err(RegistryError::Payload(_))
        ));
        assert!(matches!(
            parse_package_payload(r#"{"versions": []}"#),
            Err(RegistryError::Payload(_))
        ));
    }

    #[test]
    fn test_missing_environment_tolerated() {
        let body = r#"{"versions": [{"version": "1.0.0", "pubspec": {}}]}"#;
        let releases = parse_package_payload(body).unwrap();
        assert!(releases[0].sdk_constraint.is_none());
    }
}
