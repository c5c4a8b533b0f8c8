//! Structural validation of a raw rockspec tree.
//!
//! This is a shape check, not semantics: field types, required fields, and
//! the spelling of dependency lists. Cross-field invariants are the
//! normalizer's job.

use crate::value::{Table, Value};
use thiserror::Error;

/// The document failed structural validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TypeCheckError(pub String);

fn err(msg: impl Into<String>) -> TypeCheckError {
    TypeCheckError(msg.into())
}

const KNOWN_TOP_LEVEL: &[&str] = &[
    "format_version",
    "package",
    "version",
    "description",
    "source",
    "build",
    "dependencies",
    "build_dependencies",
    "test_dependencies",
    "external_dependencies",
    "supported_platforms",
    "test",
    "hooks",
];

/// Validate a raw rockspec tree.
///
/// `globals` names extra top-level keys the caller wants admitted without a
/// warning (rockspecs in the wild sometimes carry tool-private fields).
///
/// # Errors
///
/// Returns [`TypeCheckError`] describing the first structural problem found.
pub fn check_rockspec(doc: &Table, globals: Option<&Table>) -> Result<(), TypeCheckError> {
    require_str(doc, "package")?;
    require_str(doc, "version")?;
    optional_str(doc, "format_version")?;

    let source = doc
        .get_table("source")
        .ok_or_else(|| err("source must be a table"))?;
    require_str(source, "url")?;
    for key in ["file", "dir", "module", "tag", "branch", "cvs_module", "cvs_tag"] {
        optional_str(source, key)?;
    }

    if let Some(desc) = doc.get("description") {
        let desc = desc
            .as_table()
            .ok_or_else(|| err("description must be a table"))?;
        for key in ["summary", "detailed", "license", "homepage", "issues_url", "maintainer"] {
            optional_str(desc, key)?;
        }
        if let Some(labels) = desc.get("labels") {
            check_string_list(labels, "description.labels")?;
        }
    }

    if let Some(build) = doc.get("build") {
        let build = build.as_table().ok_or_else(|| err("build must be a table"))?;
        optional_str(build, "type")?;
        if let Some(install) = build.get("install") {
            let install = install
                .as_table()
                .ok_or_else(|| err("build.install must be a table"))?;
            for (category, files) in &install.map {
                if files.as_table().is_none() {
                    return Err(err(format!("build.install.{category} must be a table")));
                }
            }
        }
        if let Some(dirs) = build.get("copy_directories") {
            check_string_list(dirs, "build.copy_directories")?;
        }
    }

    for field in ["dependencies", "build_dependencies", "test_dependencies"] {
        if let Some(deps) = doc.get(field) {
            let deps = deps
                .as_table()
                .ok_or_else(|| err(format!("{field} must be a list of strings")))?;
            for (i, entry) in deps.list.iter().enumerate() {
                if entry.as_str().is_none() {
                    return Err(err(format!(
                        "{field}[{}] must be a string, got {}",
                        i + 1,
                        entry.type_name()
                    )));
                }
            }
            // Named keys: index keys hold entries, `platforms` holds
            // overrides, anything else is a mistake.
            for (key, entry) in &deps.map {
                if key == "platforms" {
                    continue;
                }
                match key.parse::<u64>() {
                    Ok(n) if n >= 1 => {
                        if entry.as_str().is_none() {
                            return Err(err(format!(
                                "{field}[{key}] must be a string, got {}",
                                entry.type_name()
                            )));
                        }
                    }
                    _ => return Err(err(format!("{field} has unexpected key `{key}`"))),
                }
            }
        }
    }

    if let Some(ext) = doc.get("external_dependencies") {
        let ext = ext
            .as_table()
            .ok_or_else(|| err("external_dependencies must be a table"))?;
        for (name, spec) in &ext.map {
            if name == "platforms" {
                continue;
            }
            if spec.as_table().is_none() {
                return Err(err(format!("external_dependencies.{name} must be a table")));
            }
        }
    }

    if let Some(platforms) = doc.get("supported_platforms") {
        check_string_list(platforms, "supported_platforms")?;
    }

    for key in doc.map.keys() {
        let admitted = KNOWN_TOP_LEVEL.contains(&key.as_str())
            || globals.is_some_and(|g| g.get(key).is_some());
        if !admitted {
            tracing::warn!(key, "unknown top-level rockspec field");
        }
    }

    Ok(())
}

fn require_str(table: &Table, key: &str) -> Result<(), TypeCheckError> {
    match table.get(key) {
        Some(Value::Str(_)) => Ok(()),
        Some(other) => Err(err(format!("{key} must be a string, got {}", other.type_name()))),
        None => Err(err(format!("missing required field {key}"))),
    }
}

fn optional_str(table: &Table, key: &str) -> Result<(), TypeCheckError> {
    match table.get(key) {
        None | Some(Value::Str(_)) => Ok(()),
        Some(other) => Err(err(format!("{key} must be a string, got {}", other.type_name()))),
    }
}

fn check_string_list(value: &Value, what: &str) -> Result<(), TypeCheckError> {
    let table = value
        .as_table()
        .ok_or_else(|| err(format!("{what} must be a list of strings")))?;
    for entry in &table.list {
        if entry.as_str().is_none() {
            return Err(err(format!("{what} entries must be strings")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_toml_table;

    fn doc(src: &str) -> Table {
        from_toml_table(src.parse().unwrap()).unwrap()
    }

    const MINIMAL: &str = r#"
        package = "lpeg"
        version = "1.0.2-1"
        [source]
        url = "https://example.com/lpeg-1.0.2.tar.gz"
    "#;

    #[test]
    fn test_minimal_rockspec_passes() {
        assert!(check_rockspec(&doc(MINIMAL), None).is_ok());
    }

    #[test]
    fn test_missing_package_fails() {
        let d = doc(
            r#"
            version = "1.0-1"
            [source]
            url = "https://example.com/x.tar.gz"
            "#,
        );
        let e = check_rockspec(&d, None).unwrap_err();
        assert!(e.0.contains("package"));
    }

    #[test]
    fn test_wrong_type_fails() {
        let d = doc(
            r#"
            package = "x"
            version = 1
            [source]
            url = "https://example.com/x.tar.gz"
            "#,
        );
        let e = check_rockspec(&d, None).unwrap_err();
        assert!(e.0.contains("version"));
    }

    #[test]
    fn test_non_string_dependency_entry_fails() {
        let d = doc(
            r#"
            package = "x"
            version = "1.0-1"
            dependencies = ["lua >= 5.1", 42]
            [source]
            url = "https://example.com/x.tar.gz"
            "#,
        );
        let e = check_rockspec(&d, None).unwrap_err();
        assert!(e.0.contains("dependencies[2]"));
    }

    #[test]
    fn test_source_must_be_table() {
        let d = doc(
            r#"
            package = "x"
            version = "1.0-1"
            source = "https://example.com/x.tar.gz"
            "#,
        );
        assert!(check_rockspec(&d, None).is_err());
    }
}
