//! Dependency constraint strings and their parsed form.
//!
//! A constraint string is the human-readable dependency spelling found in a
//! rockspec: a package name followed by zero or more comma-separated version
//! predicates, e.g. `"lpeg >= 0.12, < 2.0"` or just `"luasocket"`.

use crate::types::PackageName;
use crate::version::{Version, VersionParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Comparison operator in a version predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
    /// `==` (also written as a bare version or `=`)
    #[serde(rename = "==")]
    Eq,
    /// `~=`
    #[serde(rename = "~=")]
    Ne,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `~>`: pessimistic upper bound, same major, at least the given version
    #[serde(rename = "~>")]
    Compat,
}

impl ConstraintOp {
    /// Operator as it appears in a constraint string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "~=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Compat => "~>",
        }
    }
}

/// A single parsed version predicate, e.g. `>= 0.12`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConstraint {
    /// The comparison operator.
    pub op: ConstraintOp,
    /// The version the operator compares against.
    pub version: Version,
}

impl VersionConstraint {
    /// Whether `candidate` satisfies this predicate.
    pub fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            ConstraintOp::Eq => candidate == &self.version,
            ConstraintOp::Ne => candidate != &self.version,
            ConstraintOp::Gt => candidate > &self.version,
            ConstraintOp::Lt => candidate < &self.version,
            ConstraintOp::Ge => candidate >= &self.version,
            ConstraintOp::Le => candidate <= &self.version,
            ConstraintOp::Compat => {
                candidate >= &self.version
                    && candidate.segments().first() == self.version.segments().first()
            }
        }
    }
}

/// A structured dependency: a name plus its version predicates.
///
/// Every entry of a rockspec dependency list ends up as one of these after
/// normalization; a bare name yields an empty predicate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Normalized (lowercase) name of the required package.
    pub name: PackageName,
    /// Version predicates, all of which must hold.
    pub constraints: Vec<VersionConstraint>,
}

impl Dependency {
    /// Whether the given version of the named package satisfies every predicate.
    pub fn matches(&self, candidate: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(candidate))
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, c) in self.constraints.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{} {}", c.op.as_str(), c.version)?;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing a constraint string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyParseError {
    /// The constraint string is empty or whitespace.
    #[error("empty dependency string")]
    Empty,

    /// The package name contains characters outside `[A-Za-z0-9._-]`.
    #[error("invalid package name `{0}`")]
    InvalidName(String),

    /// A predicate has an operator but no version, or an unknown operator.
    #[error("malformed constraint `{0}`")]
    MalformedConstraint(String),

    /// The version part of a predicate failed to parse.
    #[error(transparent)]
    Version(#[from] VersionParseError),
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Parse a constraint string into a [`Dependency`].
///
/// Accepted forms: `"name"`, `"name >= 1.0"`, `"name >= 1.0, < 2.0"`,
/// `"name 1.0"` (bare version means `==`). The name is lowercased.
///
/// # Errors
///
/// Returns [`DependencyParseError`] if the name or any predicate is malformed.
pub fn parse_dependency(input: &str) -> Result<Dependency, DependencyParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DependencyParseError::Empty);
    }

    let (name, rest) = match input.find(char::is_whitespace) {
        Some(i) => (&input[..i], input[i..].trim_start()),
        None => (input, ""),
    };
    if name.is_empty() || !name.chars().all(is_name_char) {
        return Err(DependencyParseError::InvalidName(name.to_string()));
    }

    let mut constraints = Vec::new();
    if !rest.is_empty() {
        for piece in rest.split(',') {
            constraints.push(parse_predicate(piece.trim())?);
        }
    }

    Ok(Dependency {
        name: PackageName::new(name),
        constraints,
    })
}

fn parse_predicate(piece: &str) -> Result<VersionConstraint, DependencyParseError> {
    if piece.is_empty() {
        return Err(DependencyParseError::MalformedConstraint(piece.to_string()));
    }
    let (op, version_str) = if let Some(rest) = piece
        .strip_prefix("==")
        .or_else(|| piece.strip_prefix('='))
    {
        (ConstraintOp::Eq, rest)
    } else if let Some(rest) = piece.strip_prefix("~=") {
        (ConstraintOp::Ne, rest)
    } else if let Some(rest) = piece.strip_prefix("~>") {
        (ConstraintOp::Compat, rest)
    } else if let Some(rest) = piece.strip_prefix(">=") {
        (ConstraintOp::Ge, rest)
    } else if let Some(rest) = piece.strip_prefix("<=") {
        (ConstraintOp::Le, rest)
    } else if let Some(rest) = piece.strip_prefix('>') {
        (ConstraintOp::Gt, rest)
    } else if let Some(rest) = piece.strip_prefix('<') {
        (ConstraintOp::Lt, rest)
    } else if piece.starts_with(|c: char| c.is_ascii_digit()) {
        // Bare version means exact match.
        (ConstraintOp::Eq, piece)
    } else {
        return Err(DependencyParseError::MalformedConstraint(piece.to_string()));
    };

    let version_str = version_str.trim();
    if version_str.is_empty() {
        return Err(DependencyParseError::MalformedConstraint(piece.to_string()));
    }
    Ok(VersionConstraint {
        op,
        version: Version::parse(version_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        let dep = parse_dependency("luasocket").unwrap();
        assert_eq!(dep.name, "luasocket");
        assert!(dep.constraints.is_empty());
    }

    #[test]
    fn test_single_predicate() {
        let dep = parse_dependency("lua >= 5.1").unwrap();
        assert_eq!(dep.name, "lua");
        assert_eq!(dep.constraints.len(), 1);
        assert_eq!(dep.constraints[0].op, ConstraintOp::Ge);
        assert_eq!(dep.constraints[0].version.as_str(), "5.1");
    }

    #[test]
    fn test_multiple_predicates() {
        let dep = parse_dependency("lpeg >= 0.12, < 2.0").unwrap();
        assert_eq!(dep.constraints.len(), 2);
        assert_eq!(dep.constraints[1].op, ConstraintOp::Lt);
    }

    #[test]
    fn test_bare_version_means_eq() {
        let dep = parse_dependency("lpeg 0.12").unwrap();
        assert_eq!(dep.constraints[0].op, ConstraintOp::Eq);
    }

    #[test]
    fn test_name_is_lowercased() {
        let dep = parse_dependency("LPeg >= 0.12").unwrap();
        assert_eq!(dep.name.as_str(), "lpeg");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_dependency("").is_err());
        assert!(parse_dependency("lpeg >=").is_err());
        assert!(parse_dependency("lpeg !! 1.0").is_err());
        assert!(parse_dependency("lp eg/bad >= 1").is_err());
    }

    #[test]
    fn test_matches() {
        let dep = parse_dependency("lua >= 5.1, < 5.4").unwrap();
        assert!(dep.matches(&Version::parse("5.3").unwrap()));
        assert!(!dep.matches(&Version::parse("5.4").unwrap()));
    }

    #[test]
    fn test_eq_operator_ignores_version_spelling() {
        // Exact match compares versions, not their spelling.
        let dep = parse_dependency("lua == 1.0").unwrap();
        assert!(dep.matches(&Version::parse("1.0.0").unwrap()));
        assert!(!dep.matches(&Version::parse("1.0.1").unwrap()));
    }

    #[test]
    fn test_compat_operator() {
        let dep = parse_dependency("foo ~> 2.1").unwrap();
        assert!(dep.matches(&Version::parse("2.5").unwrap()));
        assert!(!dep.matches(&Version::parse("3.0").unwrap()));
        assert!(!dep.matches(&Version::parse("2.0").unwrap()));
    }

    #[test]
    fn test_display_round_trip() {
        let dep = parse_dependency("lpeg >= 0.12, < 2.0").unwrap();
        assert_eq!(dep.to_string(), "lpeg >= 0.12, < 2.0");
    }
}
