//! Pubspec Patcher
//!
//! Line-based, format-preserving edits. The engine decides *what* string
//! goes *where* (the SDK constraint line, the line declaring package P);
//! this module rewrites exactly that line and nothing else, keeping
//! comments, indentation, and quoting style intact. All edits are
//! idempotent.

use std::path::Path;

use tracing::info;

/// Patch errors
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no `environment: sdk:` line found")]
    SdkLineNotFound,
    #[error("dependency {0} is not declared in the pubspec")]
    DependencyNotFound(String),
    #[error("dependency {0} is declared as a nested mapping and cannot be line-patched")]
    Unpatchable(String),
}

/// Replace the value of the `environment: sdk:` line with `constraint`.
pub fn set_sdk_constraint(content: &str, constraint: &str) -> Result<String, PatchError> {
    let mut lines: Vec<String> = Vec::with_capacity(content.lines().count());
    let mut in_environment = false;
    let mut patched = false;

    for line in content.lines() {
        if !patched {
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();

            if indent == 0 && !trimmed.is_empty() {
                in_environment = trimmed.starts_with("environment:");
            } else if in_environment && trimmed.starts_with("sdk:") {
                lines.push(rewrite_value(line, constraint));
                patched = true;
                continue;
            }
        }
        lines.push(line.to_string());
    }

    if !patched {
        return Err(PatchError::SdkLineNotFound);
    }

    Ok(join_preserving_trailing_newline(content, lines))
}

/// Replace the constraint of a directly declared dependency.
///
/// Fails with [`PatchError::Unpatchable`] when the dependency is declared
/// as a nested mapping (git/path/sdk dependencies).
pub fn set_dependency_version(
    content: &str,
    package: &str,
    constraint: &str,
) -> Result<String, PatchError> {
    let key = format!("{}:", package);
    let mut lines: Vec<String> = Vec::with_capacity(content.lines().count());
    let mut in_dependencies = false;
    let mut patched = false;

    for line in content.lines() {
        if !patched {
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();

            if indent == 0 && !trimmed.is_empty() {
                in_dependencies = trimmed.starts_with("dependencies:")
                    || trimmed.starts_with("dev_dependencies:");
            } else if in_dependencies
                && (trimmed == key || trimmed.starts_with(&format!("{} ", key)))
            {
                let value = value_part(trimmed, &key);
                if value.is_empty() || value.starts_with('#') {
                    return Err(PatchError::Unpatchable(package.to_string()));
                }
                lines.push(rewrite_value(line, constraint));
                patched = true;
                continue;
            }
        }
        lines.push(line.to_string());
    }

    if !patched {
        return Err(PatchError::DependencyNotFound(package.to_string()));
    }

    Ok(join_preserving_trailing_newline(content, lines))
}

/// File-level wrapper: patch the SDK constraint in place.
pub async fn patch_sdk_constraint(path: &Path, constraint: &str) -> Result<(), PatchError> {
    let content = tokio::fs::read_to_string(path).await?;
    let patched = set_sdk_constraint(&content, constraint)?;
    tokio::fs::write(path, patched).await?;
    info!("Rewrote SDK constraint to {:?} in {:?}", constraint, path);
    Ok(())
}

/// File-level wrapper: patch one dependency's constraint in place.
pub async fn patch_dependency_version(
    path: &Path,
    package: &str,
    constraint: &str,
) -> Result<(), PatchError> {
    let content = tokio::fs::read_to_string(path).await?;
    let patched = set_dependency_version(&content, package, constraint)?;
    tokio::fs::write(path, patched).await?;
    info!("Rewrote {} to {:?} in {:?}", package, constraint, path);
    Ok(())
}

/// The value text after `key:` on a trimmed line, comment excluded.
fn value_part<'a>(trimmed: &'a str, key: &str) -> &'a str {
    trimmed[key.len()..].trim()
}

/// Rewrite the value of a `key: value` line, preserving indentation, the
/// existing quote style, and any trailing comment (with its spacing).
fn rewrite_value(line: &str, new_value: &str) -> String {
    let colon = match line.find(':') {
        Some(i) => i,
        None => return line.to_string(),
    };
    let (head, rest) = line.split_at(colon + 1);
    let rest = rest.trim_start();

    // Existing quote style, if any.
    let quote = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => Some(q),
        _ => None,
    };

    // Where the old value ends; everything after is tail (whitespace plus
    // an optional comment), kept verbatim.
    let value_end = match quote {
        Some(q) => rest[1..].find(q).map(|i| i + 2).unwrap_or(rest.len()),
        None => match rest.find('#') {
            Some(hash) => rest[..hash].trim_end().len(),
            None => rest.trim_end().len(),
        },
    };
    let tail = rest[value_end..].trim_end();

    // YAML needs quoting for values starting with `>` or `<`.
    let needs_quotes = new_value.starts_with('>') || new_value.starts_with('<');
    let rendered = match (quote, needs_quotes) {
        (Some(q), _) => format!("{q}{new_value}{q}"),
        (None, true) => format!("'{new_value}'"),
        (None, false) => new_value.to_string(),
    };

    format!("{head} {rendered}{tail}")
}

fn join_preserving_trailing_newline(original: &str, lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name: shop_app\n\
                          version: 1.0.0+1\n\
                          \n\
                          environment:\n\
                          \x20 sdk: \">=2.12.0 <3.0.0\"  # keep in sync with CI\n\
                          \n\
                          dependencies:\n\
                          \x20 flutter:\n\
                          \x20   sdk: flutter\n\
                          \x20 http: ^0.13.0\n\
                          \x20 provider: ^5.0.0 # state management\n\
                          \n\
                          dev_dependencies:\n\
                          \x20 mockito: ^5.0.0\n";

    #[test]
    fn test_set_sdk_constraint_preserves_format() {
        let patched = set_sdk_constraint(SAMPLE, ">=2.10.0 <2.12.0").unwrap();
        assert!(patched.contains("sdk: \">=2.10.0 <2.12.0\"  # keep in sync with CI"));
        // Nothing else moved.
        assert!(patched.contains("http: ^0.13.0"));
        assert!(patched.starts_with("name: shop_app\n"));
        assert!(patched.ends_with('\n'));
    }

    #[test]
    fn test_sdk_constraint_does_not_touch_flutter_sdk_entry() {
        // The nested `sdk: flutter` under dependencies must not match.
        let patched = set_sdk_constraint(SAMPLE, ">=2.10.0 <2.12.0").unwrap();
        assert!(patched.contains("sdk: flutter"));
    }

    #[test]
    fn test_set_dependency_version() {
        let patched = set_dependency_version(SAMPLE, "http", "^0.12.2").unwrap();
        assert!(patched.contains("http: ^0.12.2"));
        assert!(!patched.contains("http: ^0.13.0"));
    }

    #[test]
    fn test_set_dependency_preserves_trailing_comment() {
        let patched = set_dependency_version(SAMPLE, "provider", "^4.3.2").unwrap();
        assert!(patched.contains("provider: ^4.3.2 # state management"));
    }

    #[test]
    fn test_dev_dependency_patchable() {
        let patched = set_dependency_version(SAMPLE, "mockito", "^4.1.3").unwrap();
        assert!(patched.contains("mockito: ^4.1.3"));
    }

    #[test]
    fn test_unquoted_range_gets_quotes() {
        let content = "environment:\n  sdk: 2.12.0\n";
        let patched = set_sdk_constraint(content, ">=2.10.0 <2.12.0").unwrap();
        assert!(patched.contains("sdk: '>=2.10.0 <2.12.0'"));
    }

    #[test]
    fn test_nested_dependency_is_unpatchable() {
        let err = set_dependency_version(SAMPLE, "flutter", "^1.0.0").unwrap_err();
        assert!(matches!(err, PatchError::Unpatchable(p) if p == "flutter"));
    }

    #[test]
    fn test_missing_dependency() {
        let err = set_dependency_version(SAMPLE, "nope", "^1.0.0").unwrap_err();
        assert!(matches!(err, PatchError::DependencyNotFound(p) if p == "nope"));
    }

    #[test]
    fn test_missing_sdk_line() {
        assert!(matches!(
            set_sdk_constraint("name: x\n", ">=2.0.0"),
            Err(PatchError::SdkLineNotFound)
        ));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let once = set_dependency_version(SAMPLE, "http", "^0.12.2").unwrap();
        let twice = set_dependency_version(&once, "http", "^0.12.2").unwrap();
        assert_eq!(once, twice);
    }
}
