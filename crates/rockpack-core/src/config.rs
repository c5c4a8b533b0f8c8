//! Global configuration consumed by the normalizer.
//!
//! One [`Config`] is built per tool invocation and treated as read-only from
//! then on; normalization borrows it immutably, so normalizing several
//! rockspecs concurrently is safe.

use rockpack_schema::Version;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Newest rockspec format this tool understands.
pub const MAX_FORMAT_VERSION: &str = "3.0";

/// Format assumed when a rockspec declares none.
pub const BASELINE_FORMAT_VERSION: &str = "1.0";

/// Lua version the tool targets.
pub const DEFAULT_LUA_VERSION: &str = "5.4";

/// Global configuration: detected platforms, base path variables, and the
/// format ceiling.
#[derive(Debug, Clone)]
pub struct Config {
    /// Detected platform identifiers, ordered general to specific
    /// (`["unix", "linux"]`). Later entries win when several match a
    /// `platforms` override block.
    pub platforms: Vec<String>,
    /// Base path-variable mapping; the normalizer copies this and overlays
    /// per-package install paths, never mutating it in place.
    pub variables: BTreeMap<String, String>,
    /// Newest rockspec format accepted.
    pub max_format_version: Version,
    /// Rocks considered provided by the runtime itself (at least `lua`);
    /// stored on every normalized rockspec.
    pub rocks_provided: BTreeMap<String, Version>,
    /// Root of the rocks tree that install paths are derived under.
    pub root_dir: PathBuf,
}

impl Config {
    /// Build a configuration for the current machine, rooted at
    /// [`rockpack_home`](crate::paths::rockpack_home).
    pub fn new() -> Self {
        Self::with_root(crate::paths::rockpack_home())
    }

    /// Build a configuration rooted at an explicit rocks tree.
    pub fn with_root(root_dir: PathBuf) -> Self {
        let lua_version = Version::parse(DEFAULT_LUA_VERSION).expect("default Lua version is valid");

        let mut variables = BTreeMap::new();
        variables.insert("LUA_VERSION".to_string(), lua_version.to_string());
        variables.insert("ROCKS_TREE".to_string(), root_dir.display().to_string());
        variables.insert(
            "LUA_INCDIR".to_string(),
            root_dir.join("include").display().to_string(),
        );
        variables.insert(
            "LUA_LIBDIR".to_string(),
            root_dir.join("lib").display().to_string(),
        );

        let mut rocks_provided = BTreeMap::new();
        rocks_provided.insert("lua".to_string(), lua_version);

        Self {
            platforms: detected_platforms(),
            variables,
            max_format_version: Version::parse(MAX_FORMAT_VERSION)
                .expect("max format version is valid"),
            rocks_provided,
            root_dir,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform identifiers for the current machine, general to specific.
pub fn detected_platforms() -> Vec<String> {
    let names: &[&str] = if cfg!(target_os = "linux") {
        &["unix", "linux"]
    } else if cfg!(target_os = "macos") {
        &["unix", "macosx"]
    } else if cfg!(target_os = "freebsd") {
        &["unix", "bsd", "freebsd"]
    } else if cfg!(windows) {
        &["win32", "windows"]
    } else {
        &["unix"]
    };
    names.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platforms_ordered_general_to_specific() {
        let platforms = detected_platforms();
        assert!(!platforms.is_empty());
        // The first entry is always the OS family.
        assert!(platforms[0] == "unix" || platforms[0] == "win32");
    }

    #[test]
    fn test_base_variables_present() {
        let cfg = Config::with_root(PathBuf::from("/opt/rocks"));
        assert_eq!(cfg.variables.get("ROCKS_TREE").map(String::as_str), Some("/opt/rocks"));
        assert!(cfg.variables.contains_key("LUA_VERSION"));
        assert!(cfg.rocks_provided.contains_key("lua"));
    }
}
