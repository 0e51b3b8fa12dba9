//! Descriptions and contexts.
//!
//! A description is the caller-supplied name → value mapping that drives
//! resolution. A context carries ambient defaults and is only consulted by
//! `only` filters. Both keep insertion order so that reports and substitution
//! lookups are reproducible.

use anyhow::{bail, Result};
use indexmap::IndexMap;

use crate::core::Value;

/// Runtime input to a resolution.
pub type Description = IndexMap<String, Value>;

/// Ambient values used by `only` filters.
pub type Context = IndexMap<String, Value>;

/// Build a description from `(name, value)` pairs.
pub fn description<K, V, I>(pairs: I) -> Description
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Parse a `name=value` pair as given on a command line.
///
/// The value is kept as text; coercion to the attribute type happens during
/// binding.
pub fn parse_pair(s: &str) -> Result<(String, Value)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("expected `name=value`, got `{}`", s);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("empty attribute name in `{}`", s);
    }
    Ok((name.to_string(), Value::Text(value.trim().to_string())))
}

/// Render a description as `name=value` pairs, in order.
pub fn render(desc: &Description) -> String {
    desc.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}
