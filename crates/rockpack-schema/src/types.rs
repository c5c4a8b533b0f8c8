use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A normalized package name.
///
/// Rock names are case-insensitive in the repository; the canonical form is
/// lowercase, and construction normalizes eagerly so two names never need a
/// case-folding comparison downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for PackageName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// Discriminator for the document kinds this tool normalizes.
///
/// Polymorphic consumers (caches, pretty-printers) switch on this instead of
/// sniffing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A package rockspec.
    Rockspec,
    /// A repository manifest listing available rocks.
    Manifest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lowercased_on_construction() {
        assert_eq!(PackageName::new("MyLib").as_str(), "mylib");
        assert_eq!(PackageName::from("LPeg"), "lpeg");
    }

    #[test]
    fn test_name_eq_is_case_insensitive() {
        assert_eq!(PackageName::new("lpeg"), "LPeg");
    }
}
