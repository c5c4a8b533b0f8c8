//! Rockspec normalization.
//!
//! [`Rockspec::from_doc`] takes a raw, freshly-parsed rockspec tree and turns
//! it into a validated, canonicalized [`Rockspec`]. The pipeline runs in
//! strict order: format gate, structural typecheck, platform override merge,
//! then field canonicalization (name lowercasing, URL splitting, legacy alias
//! migration, dependency parsing, install-path variables). The raw tree is
//! consumed; on any error no `Rockspec` exists, so callers can never observe
//! a half-normalized manifest.

use crate::config::{BASELINE_FORMAT_VERSION, Config};
use crate::typecheck;
use crate::url;
use crate::value::{DepthExceeded, Table, Value, deep_merge, from_toml_table};
use crate::paths;
use rockpack_schema::{Dependency, DependencyParseError, DocumentKind, PackageName, Version};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Build backends shipped with the tool. Any other `build.type` names an
/// external backend plugin and pulls in an implicit build dependency.
pub const BUILTIN_BUILD_TYPES: &[&str] = &["builtin", "make", "cmake", "command", "none"];

/// Prefix of the conventionally-named package implementing an external build
/// backend: `build.type = "foo"` requires `luarocks-build-foo`.
pub const BUILD_BACKEND_PREFIX: &str = "luarocks-build-";

/// Errors that can occur while normalizing a rockspec.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The rockspec declares a format newer than this tool supports.
    #[error("rockspec format {version} is not supported (newer than this tool)")]
    UnsupportedFormat {
        /// The declared format version string.
        version: String,
    },

    /// The document failed structural validation.
    #[error("invalid rockspec: {0}")]
    SchemaInvalid(String),

    /// A dependency constraint string failed to parse.
    #[error("in {field}: bad dependency `{entry}`: {reason}")]
    DependencyParse {
        /// Which dependency list the entry came from.
        field: &'static str,
        /// The offending constraint string, verbatim.
        entry: String,
        /// Why it failed to parse.
        reason: DependencyParseError,
    },

    /// An I/O error occurred while reading a rockspec file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The rockspec file is not valid TOML.
    #[error("parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<typecheck::TypeCheckError> for NormalizeError {
    fn from(e: typecheck::TypeCheckError) -> Self {
        Self::SchemaInvalid(e.0)
    }
}

impl From<DepthExceeded> for NormalizeError {
    fn from(e: DepthExceeded) -> Self {
        Self::SchemaInvalid(e.to_string())
    }
}

/// Normalized `source` section of a rockspec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RockSource {
    /// Source URL as declared.
    pub url: String,
    /// Protocol split from the URL (`https`, `git`, `file`, ...).
    pub protocol: String,
    /// Remainder of the URL after the protocol.
    pub pathname: String,
    /// Archive filename. Defaulted from the URL basename for directly
    /// fetchable protocols; SCM sources without an explicit `file` keep
    /// `None`, and downstream code uses that as a signal.
    pub file: Option<String>,
    /// Unpack directory, explicit or defaulted from `module`.
    pub dir: Option<String>,
    /// Whether `dir` was given explicitly, recorded before the
    /// default-from-`module` fallback.
    pub dir_set: bool,
    /// SCM module to check out.
    pub module: Option<String>,
    /// SCM tag to check out.
    pub tag: Option<String>,
    /// SCM branch to check out.
    pub branch: Option<String>,
}

/// Free-text metadata from the `description` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Description {
    /// One-line summary.
    pub summary: Option<String>,
    /// Longer description.
    pub detailed: Option<String>,
    /// License identifier.
    pub license: Option<String>,
    /// Project homepage URL.
    pub homepage: Option<String>,
    /// Issue tracker URL.
    pub issues_url: Option<String>,
    /// Maintainer contact.
    pub maintainer: Option<String>,
    /// Free-form labels.
    pub labels: Vec<String>,
}

/// One file to install, with an optional explicit target name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallFile {
    /// Path of the file inside the unpacked source.
    pub source: String,
    /// Install name, when the rockspec maps the file to one explicitly.
    pub target: Option<String>,
}

/// Normalized `build` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSpec {
    /// Build backend identifier; one of [`BUILTIN_BUILD_TYPES`] or the name
    /// of an external backend plugin.
    pub build_type: String,
    /// Files to install, keyed by artifact category (`lua`, `lib`, `conf`,
    /// `bin`).
    pub install: BTreeMap<String, Vec<InstallFile>>,
    /// Directories copied verbatim into the install prefix.
    pub copy_directories: Vec<String>,
    /// Backend-specific configuration, kept opaque for the build backend to
    /// interpret.
    pub extra: Table,
}

/// Expected artifacts of one external (non-rock) dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExternalDependency {
    /// Header file the dependency must provide.
    pub header: Option<String>,
    /// Library the dependency must provide.
    pub library: Option<String>,
}

/// A fully normalized rockspec.
///
/// Constructed only by [`Rockspec::from_doc`] / [`Rockspec::from_file`] and
/// immutable afterwards. Invariants: `name` is the lowercase form of
/// `package`; `source.protocol` and `source.pathname` are always populated;
/// dependency lists hold structured constraints only; `variables` is fully
/// populated or absent (quick mode), never partial.
#[derive(Debug, Clone, Serialize)]
pub struct Rockspec {
    kind: DocumentKind,
    /// Package name exactly as declared.
    pub package: String,
    /// Canonical (lowercase) package name.
    pub name: PackageName,
    /// Package version.
    pub version: Version,
    /// Rockspec format this document was written against.
    pub format_version: Version,
    /// Free-text metadata.
    pub description: Description,
    /// Platforms the package declares support for; empty means all.
    pub supported_platforms: Vec<String>,
    /// Normalized source section.
    pub source: RockSource,
    /// Normalized build section, when present.
    pub build: Option<BuildSpec>,
    /// Runtime dependencies, in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Build-time dependencies, in declaration order, plus the implicit
    /// build-backend dependency when one applies.
    pub build_dependencies: Vec<Dependency>,
    /// Test-time dependencies, in declaration order.
    pub test_dependencies: Vec<Dependency>,
    /// Non-rock dependencies, keyed by identifier.
    pub external_dependencies: BTreeMap<String, ExternalDependency>,
    /// Test configuration, platform-merged but otherwise opaque.
    pub test: Option<Table>,
    /// Hook configuration, platform-merged but otherwise opaque.
    pub hooks: Option<Table>,
    /// Install-path variables; `None` in quick mode.
    pub variables: Option<BTreeMap<String, String>>,
    /// Rocks the runtime itself provides, copied from configuration.
    pub rocks_provided: BTreeMap<String, Version>,
    /// Absolute path of the rockspec file this object was built from.
    pub local_abs_filename: PathBuf,
}

impl Rockspec {
    /// Normalize a raw rockspec tree.
    ///
    /// `globals` is passed through to the typechecker as extra admitted
    /// top-level keys. `quick` skips the typecheck and the path-variable
    /// computation, for lightweight read-only inspection.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] and no rockspec on the first failing step.
    pub fn from_doc(
        filename: &Path,
        mut doc: Table,
        globals: Option<&Table>,
        quick: bool,
        config: &Config,
    ) -> Result<Self, NormalizeError> {
        // 1. Format gate.
        let format_version = parse_format_version(&doc, config)?;

        // 2. Structural validation.
        if !quick {
            typecheck::check_rockspec(&doc, globals)?;
        }

        // 3. Platform overrides, each overridable section independently.
        for section in [
            "build",
            "dependencies",
            "build_dependencies",
            "test_dependencies",
            "source",
            "external_dependencies",
            "test",
            "hooks",
        ] {
            if let Some(Value::Table(tbl)) = doc.get_mut(section) {
                platform_overrides(tbl, &config.platforms)?;
            }
        }

        // 4. Canonicalization. Scalar identity first: the rest depends on it.
        let package = take_str(&mut doc, "package")?;
        let name = PackageName::new(&package);
        let version = Version::parse(&take_str(&mut doc, "version")?)
            .map_err(|e| NormalizeError::SchemaInvalid(format!("bad version: {e}")))?;

        let source = parse_source(&mut doc)?;
        let description = parse_description(&mut doc)?;
        let supported_platforms =
            take_string_list(&mut doc, "supported_platforms", "supported_platforms")?;
        let build = parse_build(&mut doc)?;

        let dependencies = convert_dependencies(&mut doc, "dependencies")?;
        let mut build_dependencies = convert_dependencies(&mut doc, "build_dependencies")?;
        let test_dependencies = convert_dependencies(&mut doc, "test_dependencies")?;

        // Implicit build-backend dependency. Must run after the string to
        // structured conversion: the duplicate check compares parsed names.
        if let Some(build) = &build {
            if !BUILTIN_BUILD_TYPES.contains(&build.build_type.as_str()) {
                let backend = PackageName::new(&format!(
                    "{BUILD_BACKEND_PREFIX}{}",
                    build.build_type
                ));
                if !build_dependencies.iter().any(|d| d.name == backend) {
                    tracing::debug!(backend = %backend, "injecting build backend dependency");
                    build_dependencies.push(Dependency {
                        name: backend,
                        constraints: Vec::new(),
                    });
                }
            }
        }

        let external_dependencies = parse_external_dependencies(&mut doc)?;
        let test = take_table(&mut doc, "test");
        let hooks = take_table(&mut doc, "hooks");

        // 5. Install-path variables, last: they need the canonical name.
        let variables = if quick {
            None
        } else {
            Some(configure_paths(config, &name, &version))
        };

        let mut rockspec = Self {
            kind: DocumentKind::Rockspec,
            package,
            name,
            version,
            format_version,
            description,
            supported_platforms,
            source,
            build,
            dependencies,
            build_dependencies,
            test_dependencies,
            external_dependencies,
            test,
            hooks,
            variables,
            rocks_provided: BTreeMap::new(),
            local_abs_filename: filename.to_path_buf(),
        };
        rockspec.rocks_provided = rocks_provided(&rockspec, config);
        Ok(rockspec)
    }

    /// Read a TOML rockspec from disk and normalize it.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Io`] or [`NormalizeError::Toml`] for
    /// read/parse failures, otherwise whatever [`Rockspec::from_doc`] returns.
    pub fn from_file(path: &Path, quick: bool, config: &Config) -> Result<Self, NormalizeError> {
        let content = std::fs::read_to_string(path)?;
        let doc = from_toml_table(content.parse::<toml::Table>()?)?;
        let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self::from_doc(&abs, doc, None, quick, config)
    }

    /// Discriminator identifying this document as a rockspec.
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Whether this rockspec was written against format `version` or newer.
    ///
    /// Unparsable inputs answer `false`.
    pub fn format_is_at_least(&self, version: &str) -> bool {
        Version::parse(version).is_ok_and(|v| self.format_version >= v)
    }
}

fn parse_format_version(doc: &Table, config: &Config) -> Result<Version, NormalizeError> {
    let format_version = match doc.get("format_version") {
        Some(v) => {
            let s = v.as_str().ok_or_else(|| {
                NormalizeError::SchemaInvalid("format_version must be a string".to_string())
            })?;
            Version::parse(s)
                .map_err(|e| NormalizeError::SchemaInvalid(format!("bad format_version: {e}")))?
        }
        // No declaration means the oldest supported format.
        None => Version::parse(BASELINE_FORMAT_VERSION).expect("baseline format version is valid"),
    };
    if format_version > config.max_format_version {
        return Err(NormalizeError::UnsupportedFormat {
            version: format_version.to_string(),
        });
    }
    Ok(format_version)
}

/// Apply the `platforms` override block of one section, then drop it.
///
/// Detected platforms apply in configuration order, each overlaying the
/// previous merge result, so a more specific platform later in the order wins.
fn platform_overrides(section: &mut Table, platforms: &[String]) -> Result<(), DepthExceeded> {
    let Some(Value::Table(mut blocks)) = section.remove("platforms") else {
        return Ok(());
    };
    for platform in platforms {
        if let Some(Value::Table(over)) = blocks.remove(platform.as_str()) {
            deep_merge(section, over)?;
        }
    }
    Ok(())
}

/// Convert one dependency list from constraint strings to structured form.
///
/// An absent list becomes an empty vector so downstream code can always
/// iterate. Sparse index keys left over from an override merge are folded in
/// after the contiguous part, in numeric order; any other named key is an
/// error rather than a silently dropped entry. Conversion is all-or-nothing:
/// the first bad entry aborts with [`NormalizeError::DependencyParse`].
fn convert_dependencies(
    doc: &mut Table,
    field: &'static str,
) -> Result<Vec<Dependency>, NormalizeError> {
    let Some(value) = doc.remove(field) else {
        return Ok(Vec::new());
    };
    let Value::Table(table) = value else {
        return Err(NormalizeError::SchemaInvalid(format!(
            "{field} must be a list of strings"
        )));
    };
    let mut indexed: Vec<(u64, Value)> = Vec::new();
    for (key, entry) in table.map {
        match key.parse::<u64>() {
            Ok(n) if n >= 1 => indexed.push((n, entry)),
            _ => {
                return Err(NormalizeError::SchemaInvalid(format!(
                    "{field} has unexpected key `{key}`"
                )));
            }
        }
    }
    indexed.sort_by_key(|(n, _)| *n);

    let mut out = Vec::with_capacity(table.list.len() + indexed.len());
    for entry in table.list.into_iter().chain(indexed.into_iter().map(|(_, v)| v)) {
        let entry = match entry {
            Value::Str(s) => s,
            other => {
                return Err(NormalizeError::SchemaInvalid(format!(
                    "{field} entries must be strings, got {}",
                    other.type_name()
                )));
            }
        };
        let dep = rockpack_schema::constraint::parse_dependency(&entry).map_err(|reason| {
            NormalizeError::DependencyParse {
                field,
                entry,
                reason,
            }
        })?;
        out.push(dep);
    }
    Ok(out)
}

fn parse_source(doc: &mut Table) -> Result<RockSource, NormalizeError> {
    let Some(Value::Table(mut tbl)) = doc.remove("source") else {
        return Err(NormalizeError::SchemaInvalid(
            "source must be a table".to_string(),
        ));
    };
    let url = match tbl.remove("url") {
        Some(Value::Str(url)) => url,
        _ => {
            return Err(NormalizeError::SchemaInvalid(
                "missing required field source.url".to_string(),
            ));
        }
    };
    let (protocol, pathname) = url::split_url(&url);

    // Legacy aliases take effect only when the new field is unset.
    let module = take_opt_str(&mut tbl, "module").or_else(|| take_opt_str(&mut tbl, "cvs_module"));
    let tag = take_opt_str(&mut tbl, "tag").or_else(|| take_opt_str(&mut tbl, "cvs_tag"));
    let branch = take_opt_str(&mut tbl, "branch");

    let mut file = take_opt_str(&mut tbl, "file");
    if file.is_none() && url::is_basic_protocol(&protocol) {
        // SCM sources deliberately keep file unset; absence is a signal.
        file = Some(url::base_name(&url).to_string());
    }

    let dir = take_opt_str(&mut tbl, "dir");
    let dir_set = dir.is_some();
    let dir = dir.or_else(|| module.clone());

    Ok(RockSource {
        url,
        protocol,
        pathname,
        file,
        dir,
        dir_set,
        module,
        tag,
        branch,
    })
}

fn parse_description(doc: &mut Table) -> Result<Description, NormalizeError> {
    let Some(Value::Table(mut tbl)) = doc.remove("description") else {
        return Ok(Description::default());
    };
    Ok(Description {
        summary: take_opt_str(&mut tbl, "summary"),
        detailed: take_opt_str(&mut tbl, "detailed"),
        license: take_opt_str(&mut tbl, "license"),
        homepage: take_opt_str(&mut tbl, "homepage"),
        issues_url: take_opt_str(&mut tbl, "issues_url"),
        maintainer: take_opt_str(&mut tbl, "maintainer"),
        labels: take_string_list(&mut tbl, "labels", "description.labels")?,
    })
}

fn parse_build(doc: &mut Table) -> Result<Option<BuildSpec>, NormalizeError> {
    let Some(value) = doc.remove("build") else {
        return Ok(None);
    };
    let Value::Table(mut tbl) = value else {
        return Err(NormalizeError::SchemaInvalid(
            "build must be a table".to_string(),
        ));
    };
    let build_type = take_opt_str(&mut tbl, "type").unwrap_or_else(|| "builtin".to_string());

    let mut install = BTreeMap::new();
    if let Some(Value::Table(categories)) = tbl.remove("install") {
        for (category, files) in categories.map {
            let Value::Table(files) = files else {
                return Err(NormalizeError::SchemaInvalid(format!(
                    "build.install.{category} must be a table"
                )));
            };
            let mut entries = Vec::new();
            for file in files.list {
                let Value::Str(source) = file else {
                    return Err(NormalizeError::SchemaInvalid(format!(
                        "build.install.{category} entries must be strings"
                    )));
                };
                entries.push(InstallFile {
                    source,
                    target: None,
                });
            }
            for (target, file) in files.map {
                let Value::Str(source) = file else {
                    return Err(NormalizeError::SchemaInvalid(format!(
                        "build.install.{category}.{target} must be a string"
                    )));
                };
                entries.push(InstallFile {
                    source,
                    target: Some(target),
                });
            }
            install.insert(category, entries);
        }
    }

    let copy_directories = take_string_list(&mut tbl, "copy_directories", "build.copy_directories")?;

    Ok(Some(BuildSpec {
        build_type,
        install,
        copy_directories,
        extra: tbl,
    }))
}

fn parse_external_dependencies(
    doc: &mut Table,
) -> Result<BTreeMap<String, ExternalDependency>, NormalizeError> {
    let Some(value) = doc.remove("external_dependencies") else {
        return Ok(BTreeMap::new());
    };
    let Value::Table(tbl) = value else {
        return Err(NormalizeError::SchemaInvalid(
            "external_dependencies must be a table".to_string(),
        ));
    };
    let mut out = BTreeMap::new();
    for (name, spec) in tbl.map {
        let Value::Table(mut spec) = spec else {
            return Err(NormalizeError::SchemaInvalid(format!(
                "external_dependencies.{name} must be a table"
            )));
        };
        out.insert(
            name,
            ExternalDependency {
                header: take_opt_str(&mut spec, "header"),
                library: take_opt_str(&mut spec, "library"),
            },
        );
    }
    Ok(out)
}

/// Rocks the runtime itself provides when building against this rockspec.
///
/// Derived from configuration, but manifest-sensitive: a rock that is itself
/// one of the provided rocks (building `lua` from source, say) must not be
/// masked by the runtime copy.
pub fn rocks_provided(rockspec: &Rockspec, config: &Config) -> BTreeMap<String, Version> {
    let mut provided = config.rocks_provided.clone();
    provided.remove(rockspec.name.as_str());
    provided
}

/// Copy the base variable mapping and overlay per-package install paths.
fn configure_paths(
    config: &Config,
    name: &PackageName,
    version: &Version,
) -> BTreeMap<String, String> {
    let mut vars = config.variables.clone();
    let entries = [
        ("PREFIX", paths::install_dir(config, name, version)),
        ("LUADIR", paths::lua_dir(config, name, version)),
        ("LIBDIR", paths::lib_dir(config, name, version)),
        ("CONFDIR", paths::conf_dir(config, name, version)),
        ("BINDIR", paths::bin_dir(config, name, version)),
        ("DOCDIR", paths::doc_dir(config, name, version)),
    ];
    for (key, path) in entries {
        vars.insert(key.to_string(), path.display().to_string());
    }
    vars
}

fn take_str(doc: &mut Table, key: &str) -> Result<String, NormalizeError> {
    match doc.remove(key) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(NormalizeError::SchemaInvalid(format!(
            "{key} must be a string, got {}",
            other.type_name()
        ))),
        None => Err(NormalizeError::SchemaInvalid(format!(
            "missing required field {key}"
        ))),
    }
}

fn take_opt_str(tbl: &mut Table, key: &str) -> Option<String> {
    match tbl.remove(key) {
        Some(Value::Str(s)) => Some(s),
        _ => None,
    }
}

fn take_table(doc: &mut Table, key: &str) -> Option<Table> {
    match doc.remove(key) {
        Some(Value::Table(t)) => Some(t),
        _ => None,
    }
}

fn take_string_list(
    tbl: &mut Table,
    key: &str,
    what: &str,
) -> Result<Vec<String>, NormalizeError> {
    let Some(value) = tbl.remove(key) else {
        return Ok(Vec::new());
    };
    let Value::Table(t) = value else {
        return Err(NormalizeError::SchemaInvalid(format!(
            "{what} must be a list of strings"
        )));
    };
    let mut out = Vec::with_capacity(t.list.len());
    for v in t.list {
        match v {
            Value::Str(s) => out.push(s),
            other => {
                return Err(NormalizeError::SchemaInvalid(format!(
                    "{what} entries must be strings, got {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(out)
}
