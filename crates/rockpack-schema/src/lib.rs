//! Shared types for rockpack.
//!
//! Everything downstream crates need to talk about a package without holding
//! a full rockspec: normalized names, rockspec-style versions, and parsed
//! dependency constraints.

pub mod constraint;
pub mod types;
pub mod version;

pub use constraint::{ConstraintOp, Dependency, DependencyParseError, VersionConstraint};
pub use types::{DocumentKind, PackageName};
pub use version::{Version, VersionParseError};
