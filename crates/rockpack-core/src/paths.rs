//! Install-path layout for rocks inside a rocks tree.

use crate::config::Config;
use dirs::home_dir;
use rockpack_schema::{PackageName, Version};
use std::path::PathBuf;

/// Returns the rocks tree root, or None if the user's home cannot be resolved.
pub fn try_rockpack_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("ROCKPACK_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".rockpack"))
}

/// Returns the canonical rocks tree root (`~/.rockpack`).
///
/// # Panics
///
/// Panics if neither `ROCKPACK_HOME` is set nor the user's home directory can
/// be resolved.
pub fn rockpack_home() -> PathBuf {
    try_rockpack_home().expect("Could not determine home directory. Set ROCKPACK_HOME to override.")
}

/// Install prefix for one rock: `<root>/lib/rocks/<name>/<version>`.
pub fn install_dir(cfg: &Config, name: &PackageName, version: &Version) -> PathBuf {
    cfg.root_dir
        .join("lib")
        .join("rocks")
        .join(name.as_str())
        .join(version.as_str())
}

/// Lua module directory for one rock.
pub fn lua_dir(cfg: &Config, name: &PackageName, version: &Version) -> PathBuf {
    install_dir(cfg, name, version).join("lua")
}

/// Compiled-library directory for one rock.
pub fn lib_dir(cfg: &Config, name: &PackageName, version: &Version) -> PathBuf {
    install_dir(cfg, name, version).join("lib")
}

/// Configuration-file directory for one rock.
pub fn conf_dir(cfg: &Config, name: &PackageName, version: &Version) -> PathBuf {
    install_dir(cfg, name, version).join("conf")
}

/// Executable directory for one rock.
pub fn bin_dir(cfg: &Config, name: &PackageName, version: &Version) -> PathBuf {
    install_dir(cfg, name, version).join("bin")
}

/// Documentation directory for one rock.
pub fn doc_dir(cfg: &Config, name: &PackageName, version: &Version) -> PathBuf {
    install_dir(cfg, name, version).join("doc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_rooted_and_versioned() {
        let cfg = Config::with_root(PathBuf::from("/opt/rocks"));
        let name = PackageName::new("LPeg");
        let version = Version::parse("1.0.2-1").unwrap();
        assert_eq!(
            install_dir(&cfg, &name, &version),
            PathBuf::from("/opt/rocks/lib/rocks/lpeg/1.0.2-1")
        );
        assert_eq!(
            doc_dir(&cfg, &name, &version),
            PathBuf::from("/opt/rocks/lib/rocks/lpeg/1.0.2-1/doc")
        );
    }
}
