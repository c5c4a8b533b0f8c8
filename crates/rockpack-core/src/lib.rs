//! Core library for rockpack: the rockspec document model and normalizer.
//!
//! The entry point is [`Rockspec::from_doc`] (or [`Rockspec::from_file`] for
//! TOML rockspecs on disk), which runs the whole normalization pipeline:
//! format gate, structural typecheck, platform override merge, and field
//! canonicalization. Everything else in this crate is a collaborator of that
//! pipeline.

pub mod config;
pub mod paths;
pub mod rockspec;
pub mod typecheck;
pub mod url;
pub mod value;

pub use config::Config;
pub use rockspec::{NormalizeError, Rockspec};
pub use value::{Table, Value};
