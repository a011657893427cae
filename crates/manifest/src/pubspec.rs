//! Pubspec Reader
//!
//! Structured, read-only view of a project's pubspec.yaml: the package
//! name, the SDK constraint, and the declared dependency maps. Mutation
//! goes through the line-based patcher, never through re-serialization.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::ManifestError;

/// How a dependency is declared in the pubspec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySpec {
    /// A plain version constraint string, e.g. `^1.19.0`.
    Version(String),
    /// Declared with no constraint (`http:` with an empty value).
    Any,
    /// A git/path/sdk dependency declared as a nested mapping. The engine
    /// never rewrites these.
    Complex,
}

/// Structured view of a pubspec.yaml.
#[derive(Debug, Clone)]
pub struct Pubspec {
    pub name: String,
    /// Raw `environment: sdk:` constraint string, if declared.
    pub sdk_constraint: Option<String>,
    pub dependencies: BTreeMap<String, DependencySpec>,
    pub dev_dependencies: BTreeMap<String, DependencySpec>,
}

impl Pubspec {
    /// Parse pubspec content.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let doc: Value = serde_yaml::from_str(content)?;
        let root = doc
            .as_mapping()
            .ok_or_else(|| ManifestError::Invalid("pubspec root is not a mapping".into()))?;

        let name = root
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ManifestError::Invalid("pubspec has no name".into()))?
            .to_string();

        let sdk_constraint = root
            .get("environment")
            .and_then(|env| env.get("sdk"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let pubspec = Self {
            name,
            sdk_constraint,
            dependencies: read_dependency_block(root.get("dependencies")),
            dev_dependencies: read_dependency_block(root.get("dev_dependencies")),
        };

        debug!(
            "Parsed pubspec for {}: {} dependencies, {} dev dependencies",
            pubspec.name,
            pubspec.dependencies.len(),
            pubspec.dev_dependencies.len()
        );
        Ok(pubspec)
    }

    /// Load and parse a pubspec.yaml file.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Whether `package` is declared directly (main or dev).
    pub fn is_direct_dependency(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }

    /// The declared constraint string for a direct dependency, if it is a
    /// plain version constraint.
    pub fn declared_constraint(&self, package: &str) -> Option<&str> {
        let spec = self
            .dependencies
            .get(package)
            .or_else(|| self.dev_dependencies.get(package))?;
        match spec {
            DependencySpec::Version(s) => Some(s),
            _ => None,
        }
    }

    /// Direct main dependencies with plain version constraints, in
    /// declaration-independent (sorted) order.
    pub fn versioned_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        versioned_entries(&self.dependencies)
    }

    /// Like [`Pubspec::versioned_dependencies`], but covering both the
    /// main and dev blocks. Dev dependencies constrain resolution just as
    /// hard as main ones.
    pub fn all_versioned_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        versioned_entries(&self.dependencies).chain(versioned_entries(&self.dev_dependencies))
    }
}

fn versioned_entries(
    deps: &BTreeMap<String, DependencySpec>,
) -> impl Iterator<Item = (&str, &str)> {
    deps.iter().filter_map(|(name, spec)| match spec {
        DependencySpec::Version(s) => Some((name.as_str(), s.as_str())),
        _ => None,
    })
}

fn read_dependency_block(block: Option<&Value>) -> BTreeMap<String, DependencySpec> {
    let mut deps = BTreeMap::new();
    let Some(mapping) = block.and_then(Value::as_mapping) else {
        return deps;
    };

    for (key, value) in mapping {
        let Some(name) = key.as_str() else { continue };
        let spec = match value {
            Value::String(s) => DependencySpec::Version(s.clone()),
            Value::Number(n) => DependencySpec::Version(n.to_string()),
            Value::Null => DependencySpec::Any,
            _ => DependencySpec::Complex,
        };
        deps.insert(name.to_string(), spec);
    }
    deps
}
