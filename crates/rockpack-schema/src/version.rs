use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// A rockspec-style version: dot-separated numeric segments plus an optional
/// `-N` package revision (`2.0.0-1`).
///
/// Ordering compares segments component-wise, padding the shorter sequence
/// with zeros, so `1.0 == 1.0.0` and `1.10 > 1.9`. The revision is compared
/// last. Equality and hashing follow the same padded comparison, never the
/// spelling: `1.0` and `1.0.0` are one version. This is deliberately not
/// semver: rockspec versions like `5.1` or `2.0.0-1` do not parse as semver.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
    revision: u64,
    raw: String,
}

/// Errors that can occur when parsing a version string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The version string is empty.
    #[error("empty version string")]
    Empty,

    /// A dotted segment or the revision is not a decimal number.
    #[error("invalid version segment `{0}` in `{1}`")]
    InvalidSegment(String, String),
}

impl Version {
    /// Parse a version string such as `5.1`, `2.0.0`, or `2.0.0-1`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError`] if the string is empty or any segment is
    /// not a decimal number.
    pub fn parse(s: &str) -> Result<Self, VersionParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let (base, rev) = match s.split_once('-') {
            Some((base, rev)) => (base, Some(rev)),
            None => (s, None),
        };
        let mut segments = Vec::new();
        for seg in base.split('.') {
            let n: u64 = seg
                .parse()
                .map_err(|_| VersionParseError::InvalidSegment(seg.to_string(), s.to_string()))?;
            segments.push(n);
        }
        let revision = match rev {
            Some(r) => r
                .parse()
                .map_err(|_| VersionParseError::InvalidSegment(r.to_string(), s.to_string()))?,
            None => 0,
        };
        Ok(Self {
            segments,
            revision,
            raw: s.to_string(),
        })
    }

    /// The version string exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The dotted numeric segments, without the revision.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// The `-N` package revision, `0` when absent.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Trailing zero segments do not affect ordering, so they must not
        // affect the hash either.
        let mut segments = self.segments.as_slice();
        while let Some((&0, rest)) = segments.split_last() {
            segments = rest;
        }
        segments.hash(state);
        self.revision.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            // Shorter versions are padded with zeros: 1.0 == 1.0.0
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.revision.cmp(&other.revision)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_component_wise_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("5.1") < v("5.4"));
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
        assert!(v("1.0.1") > v("1.0"));
    }

    #[test]
    fn test_equality_matches_ordering() {
        // Different spellings of the same version are equal and hash alike.
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("2.0.0"), v("2.0.0-0"));
        assert_ne!(v("1.0"), v("1.0.1"));

        let mut set = std::collections::HashSet::new();
        set.insert(v("1.0"));
        set.insert(v("1.0.0"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_revision_ordering() {
        assert!(v("2.0.0-2") > v("2.0.0-1"));
        assert!(v("2.0.0-1") > v("2.0.0"));
        assert!(v("2.0.1") > v("2.0.0-9"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("scm").is_err());
    }

    #[test]
    fn test_display_preserves_raw() {
        assert_eq!(v("2.0.0-1").to_string(), "2.0.0-1");
    }
}
