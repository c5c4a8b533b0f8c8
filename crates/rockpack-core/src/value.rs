//! Untyped document tree for raw, freshly-parsed rockspecs.
//!
//! The source format allows tables that mix positional entries with named
//! keys (`dependencies = { "lua >= 5.1", platforms = { ... } }`), so a
//! [`Table`] carries both a `list` part and a `map` part. TOML cannot spell a
//! mixed table directly; integer bare keys (`1 = "..."`) land in the list
//! part during conversion instead.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum recursion depth for [`deep_merge`] and TOML conversion.
const MAX_DEPTH: usize = 64;

/// A node in the raw document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string scalar.
    Str(String),
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Int(i64),
    /// A floating-point scalar.
    Float(f64),
    /// A table with positional and named parts.
    Table(Table),
}

/// A table node: an ordered positional part plus a named part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Positional entries, in declaration order.
    pub list: Vec<Value>,
    /// Named entries.
    pub map: BTreeMap<String, Value>,
}

/// The merge recursed past [`MAX_DEPTH`] levels of nesting.
///
/// The source format cannot express cycles, but the merge does not assume
/// well-formed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document nesting exceeds {MAX_DEPTH} levels")]
pub struct DepthExceeded;

impl Value {
    /// The string content, if this node is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The table content, if this node is a table.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable table content, if this node is a table.
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Short name of this node's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::Table(_) => "table",
        }
    }
}

impl Table {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a named entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Look up a named entry mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.map.get_mut(key)
    }

    /// Look up a named string entry.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    /// Look up a named table entry.
    pub fn get_table(&self, key: &str) -> Option<&Table> {
        self.map.get(key).and_then(Value::as_table)
    }

    /// Insert a named entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.map.insert(key.into(), value)
    }

    /// Remove a named entry.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Whether both parts are empty.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty() && self.map.is_empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Self::Table(t)
    }
}

/// Recursively merge `src` into `dst`.
///
/// Named keys: when both sides hold tables the merge recurses, preserving
/// sibling keys of `dst` the override does not mention; otherwise the `src`
/// value replaces the `dst` value outright. Positional entries merge by
/// index under the same rule, with surplus `src` entries appended. A named
/// key spelling an index (`2 = "..."`) merges positionally, so an override
/// can address one element of a base list.
///
/// # Errors
///
/// Returns [`DepthExceeded`] when nesting goes past the depth limit.
pub fn deep_merge(dst: &mut Table, src: Table) -> Result<(), DepthExceeded> {
    merge_at(dst, src, 0)
}

fn merge_at(dst: &mut Table, src: Table, depth: usize) -> Result<(), DepthExceeded> {
    if depth >= MAX_DEPTH {
        return Err(DepthExceeded);
    }
    for (i, v) in src.list.into_iter().enumerate() {
        merge_positional(dst, i, v, depth)?;
    }
    let mut indexed: Vec<(u64, Value)> = Vec::new();
    for (k, v) in src.map {
        match k.parse::<u64>() {
            Ok(n) if n >= 1 => indexed.push((n, v)),
            _ => match (dst.map.get_mut(&k), v) {
                (Some(Value::Table(d)), Value::Table(s)) => merge_at(d, s, depth + 1)?,
                (_, v) => {
                    dst.map.insert(k, v);
                }
            },
        }
    }
    // Index keys apply in numeric order, not string order.
    indexed.sort_by_key(|(n, _)| *n);
    for (n, v) in indexed {
        merge_positional(dst, usize::try_from(n - 1).unwrap_or(usize::MAX), v, depth)?;
    }
    Ok(())
}

fn merge_positional(
    dst: &mut Table,
    index: usize,
    v: Value,
    depth: usize,
) -> Result<(), DepthExceeded> {
    match (dst.list.get_mut(index), v) {
        (Some(Value::Table(d)), Value::Table(s)) => merge_at(d, s, depth + 1)?,
        (Some(slot), v) => *slot = v,
        // Past the end the index collapses to an append; the source format
        // has no way to observe the gap.
        (None, v) => dst.list.push(v),
    }
    Ok(())
}

/// Convert a parsed TOML document into a [`Table`].
///
/// Arrays become the positional part. Table keys that parse as positive
/// integers are placed positionally (sorted by index), which is how a mixed
/// table is spelled in TOML.
///
/// # Errors
///
/// Returns [`DepthExceeded`] when nesting goes past the depth limit.
pub fn from_toml_table(table: toml::Table) -> Result<Table, DepthExceeded> {
    toml_table_at(table, 0)
}

fn toml_value_at(value: toml::Value, depth: usize) -> Result<Value, DepthExceeded> {
    if depth >= MAX_DEPTH {
        return Err(DepthExceeded);
    }
    Ok(match value {
        toml::Value::String(s) => Value::Str(s),
        toml::Value::Integer(n) => Value::Int(n),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::Str(d.to_string()),
        toml::Value::Array(items) => {
            let mut t = Table::new();
            for item in items {
                t.list.push(toml_value_at(item, depth + 1)?);
            }
            Value::Table(t)
        }
        toml::Value::Table(table) => Value::Table(toml_table_at(table, depth + 1)?),
    })
}

fn toml_table_at(table: toml::Table, depth: usize) -> Result<Table, DepthExceeded> {
    if depth >= MAX_DEPTH {
        return Err(DepthExceeded);
    }
    let mut positional: Vec<(u64, String, Value)> = Vec::new();
    let mut out = Table::new();
    for (k, v) in table {
        let v = toml_value_at(v, depth + 1)?;
        match k.parse::<u64>() {
            Ok(n) if n >= 1 => positional.push((n, k, v)),
            _ => {
                out.map.insert(k, v);
            }
        }
    }
    // Contiguous indices starting at 1 form the positional part; anything
    // sparse keeps its index key so a later merge can still address it.
    positional.sort_by_key(|(n, _, _)| *n);
    for (n, k, v) in positional {
        if n == out.list.len() as u64 + 1 {
            out.list.push(v);
        } else {
            out.map.insert(k, v);
        }
    }
    Ok(out)
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Table(t) => t.serialize(serializer),
        }
    }
}

impl Serialize for Table {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.map.is_empty() {
            let mut seq = serializer.serialize_seq(Some(self.list.len()))?;
            for v in &self.list {
                seq.serialize_element(v)?;
            }
            seq.end()
        } else {
            // Mixed tables serialize positional entries under their indices.
            let mut map = serializer.serialize_map(Some(self.list.len() + self.map.len()))?;
            for (i, v) in self.list.iter().enumerate() {
                map.serialize_entry(&(i + 1).to_string(), v)?;
            }
            for (k, v) in &self.map {
                map.serialize_entry(k, v)?;
            }
            map.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Table {
        from_toml_table(toml_src.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_toml_conversion_splits_parts() {
        let t = parse(
            r#"
            deps = ["lua >= 5.1", "lpeg"]
            [build]
            type = "builtin"
            "#,
        );
        let deps = t.get_table("deps").unwrap();
        assert_eq!(deps.list.len(), 2);
        assert_eq!(t.get_table("build").unwrap().get_str("type"), Some("builtin"));
    }

    #[test]
    fn test_integer_keys_become_positional() {
        let t = parse(
            r#"
            [deps]
            1 = "lua >= 5.1"
            2 = "lpeg"
            platforms = {}
            "#,
        );
        let deps = t.get_table("deps").unwrap();
        assert_eq!(deps.list[0].as_str(), Some("lua >= 5.1"));
        assert_eq!(deps.list[1].as_str(), Some("lpeg"));
        assert!(deps.get("platforms").is_some());
    }

    #[test]
    fn test_merge_preserves_unmentioned_siblings() {
        let mut base = parse(
            r#"
            [source]
            url = "https://example.com/a.tar.gz"
            tag = "v1"
            "#,
        );
        let over = parse(
            r#"
            [source]
            tag = "v2"
            "#,
        );
        deep_merge(&mut base, over).unwrap();
        let source = base.get_table("source").unwrap();
        assert_eq!(source.get_str("url"), Some("https://example.com/a.tar.gz"));
        assert_eq!(source.get_str("tag"), Some("v2"));
    }

    #[test]
    fn test_merge_scalar_replaces_table() {
        let mut base = parse("x = { y = 1 }");
        let over = parse("x = \"flat\"");
        deep_merge(&mut base, over).unwrap();
        assert_eq!(base.get_str("x"), Some("flat"));
    }

    #[test]
    fn test_merge_positional_by_index() {
        let mut base = parse("deps = [\"a\", \"b\"]");
        let over = parse(
            r#"
            [deps]
            2 = "c"
            3 = "d"
            "#,
        );
        deep_merge(&mut base, over).unwrap();
        let deps = base.get_table("deps").unwrap();
        let got: Vec<_> = deps.list.iter().filter_map(Value::as_str).collect();
        assert_eq!(got, ["a", "c", "d"]);
    }

    #[test]
    fn test_merge_depth_limit() {
        // Recursion only happens when both sides are tables, so nest both.
        fn chain(levels: usize) -> Table {
            let mut node = Table::new();
            for _ in 0..levels {
                let mut outer = Table::new();
                outer.insert("n", Value::Table(node));
                node = outer;
            }
            node
        }
        let mut base = chain(70);
        let over = chain(70);
        assert_eq!(deep_merge(&mut base, over), Err(DepthExceeded));
    }
}
