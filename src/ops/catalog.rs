//! TOML catalogs of candidates.
//!
//! A catalog declares reusable partial footprints and the candidates built
//! from them:
//!
//! ```toml
//! [fragment.fruit]
//! attr.colour = { values = ["red", "green", "yellow"] }
//!
//! [[candidate]]
//! name = "apple"
//! tags = ["fruit"]
//! extends = ["fruit"]
//! attr.producer = { default = "Jacques" }
//! only.harvest = { in = [2001, 2007] }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::collector::{Declaration, RegisterError, Registry};
use crate::core::{AccessMode, AttributeDelta, Fragment, OnlyFilter, OnlyRule, Value};

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("failed to read catalog {}", .path.display())]
    #[diagnostic(code(footprints::catalog::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}")]
    #[diagnostic(code(footprints::catalog::parse))]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("`{owner}` extends unknown fragment `{fragment}`")]
    #[diagnostic(
        code(footprints::catalog::unknown_fragment),
        help("declare it as a [fragment.{fragment}] table")
    )]
    UnknownFragment { owner: String, fragment: String },

    #[error("`{owner}`: attribute `{attribute}`: {reason}")]
    #[diagnostic(code(footprints::catalog::invalid_attribute))]
    InvalidAttribute {
        owner: String,
        attribute: String,
        reason: String,
    },

    #[error("`{owner}`: only rule `{rule}`: {reason}")]
    #[diagnostic(
        code(footprints::catalog::invalid_filter),
        help("give exactly one of `in`, `equals`, `before`, `after`, `matches`")
    )]
    InvalidFilter {
        owner: String,
        rule: String,
        reason: String,
    },

    #[error("candidate `{0}` declares no tags")]
    #[diagnostic(code(footprints::catalog::no_tags))]
    NoTags(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Register(#[from] RegisterError),
}

#[derive(Debug, Default, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    fragment: IndexMap<String, RawBody>,

    #[serde(default)]
    candidate: Vec<RawCandidate>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBody {
    #[serde(default)]
    attr: IndexMap<String, RawAttr>,

    #[serde(default)]
    only: IndexMap<String, RawOnly>,

    priority: Option<String>,
    explicit: Option<bool>,
    info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    name: String,

    #[serde(default)]
    tags: Vec<String>,

    #[serde(default)]
    extends: Vec<String>,

    reusable: Option<bool>,

    #[serde(flatten)]
    body: RawBody,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttr {
    #[serde(rename = "type")]
    kind: Option<String>,

    #[serde(default)]
    args: IndexMap<String, toml::Value>,

    optional: Option<bool>,
    default: Option<toml::Value>,
    values: Option<Vec<toml::Value>>,
    outcast: Option<Vec<toml::Value>>,
    remap: Option<IndexMap<String, toml::Value>>,
    alias: Option<Vec<String>>,
    access: Option<String>,
    info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOnly {
    attribute: Option<String>,

    #[serde(rename = "in")]
    within: Option<Vec<toml::Value>>,

    equals: Option<toml::Value>,
    before: Option<toml::Value>,
    after: Option<toml::Value>,
    matches: Option<String>,
}

/// Convert a TOML value into a footprint value. Tables and datetimes are
/// kept as their TOML text.
pub fn convert_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Text(s.clone()),
        toml::Value::Integer(i) => Value::Integer(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(items) => Value::List(items.iter().map(convert_value).collect()),
        toml::Value::Datetime(d) => Value::Text(d.to_string()),
        toml::Value::Table(t) => Value::Text(t.to_string()),
    }
}

/// A candidate declared in a catalog.
#[derive(Debug, Clone)]
pub struct CatalogCandidate {
    pub name: String,
    pub tags: Vec<String>,
    pub extends: Vec<String>,
    pub reusable: bool,
    pub body: Fragment,
}

/// A parsed catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub fragments: IndexMap<String, Fragment>,
    pub candidates: Vec<CatalogCandidate>,
}

impl Catalog {
    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse catalog text. `origin` names the source in errors.
    pub fn parse(content: &str, origin: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(content).map_err(|source| CatalogError::Parse {
            path: origin.to_string(),
            source,
        })?;

        let mut fragments = IndexMap::new();
        for (name, body) in raw.fragment {
            let fragment = convert_body(&format!("fragment.{}", name), body)?;
            fragments.insert(name, fragment);
        }

        let mut candidates = Vec::with_capacity(raw.candidate.len());
        for raw in raw.candidate {
            if raw.tags.is_empty() {
                return Err(CatalogError::NoTags(raw.name));
            }
            for parent in &raw.extends {
                if !fragments.contains_key(parent) {
                    return Err(CatalogError::UnknownFragment {
                        owner: raw.name.clone(),
                        fragment: parent.clone(),
                    });
                }
            }
            let body = convert_body(&raw.name, raw.body)?;
            candidates.push(CatalogCandidate {
                name: raw.name,
                tags: raw.tags,
                extends: raw.extends,
                reusable: raw.reusable.unwrap_or(true),
                body,
            });
        }

        tracing::debug!(
            "parsed catalog {}: {} fragments, {} candidates",
            origin,
            fragments.len(),
            candidates.len()
        );
        Ok(Catalog {
            fragments,
            candidates,
        })
    }

    /// Declarations for every candidate: extended fragments in order, then
    /// the candidate's own body.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.candidates
            .iter()
            .map(|c| {
                let decl = c
                    .tags
                    .iter()
                    .fold(Declaration::new(&c.name), |d, tag| d.tag(tag))
                    .reusable(c.reusable);
                c.extends
                    .iter()
                    .filter_map(|parent| self.fragments.get(parent))
                    .chain(std::iter::once(&c.body))
                    .fold(decl, |d, fragment| d.fragment(fragment.clone()))
            })
            .collect()
    }

    /// Register every candidate into `registry`. Stops at the first
    /// registration failure.
    pub fn register_into(&self, registry: &Registry) -> Result<usize, CatalogError> {
        let declarations = self.declarations();
        let count = declarations.len();
        for decl in declarations {
            registry.declare(decl)?;
        }
        Ok(count)
    }
}

fn convert_body(owner: &str, raw: RawBody) -> Result<Fragment, CatalogError> {
    let mut fragment = Fragment::new();
    for (name, attr) in raw.attr {
        let delta = convert_attr(owner, &name, attr)?;
        fragment = fragment.attr(name, delta);
    }
    for (name, only) in raw.only {
        let rule = convert_only(owner, &name, only)?;
        fragment = fragment.only_named(name, rule);
    }
    if let Some(level) = raw.priority {
        fragment = fragment.priority(level);
    }
    if let Some(explicit) = raw.explicit {
        fragment = fragment.explicit(explicit);
    }
    if let Some(info) = raw.info {
        fragment = fragment.info(info);
    }
    Ok(fragment)
}

fn convert_attr(owner: &str, name: &str, raw: RawAttr) -> Result<AttributeDelta, CatalogError> {
    let mut delta = AttributeDelta::new();
    if let Some(kind) = raw.kind {
        delta = delta.kind(kind);
    }
    for (key, value) in &raw.args {
        delta = delta.arg(key, convert_value(value));
    }
    delta.optional = raw.optional;
    if let Some(default) = &raw.default {
        delta = delta.default_value(convert_value(default));
        if raw.optional == Some(false) {
            return Err(CatalogError::InvalidAttribute {
                owner: owner.to_string(),
                attribute: name.to_string(),
                reason: "a mandatory attribute cannot have a default".to_string(),
            });
        }
    }
    if let Some(values) = &raw.values {
        delta = delta.values(values.iter().map(convert_value));
    }
    if let Some(outcast) = &raw.outcast {
        delta = delta.outcast(outcast.iter().map(convert_value));
    }
    for (from, to) in raw.remap.iter().flatten() {
        delta = delta.remap(from.as_str(), convert_value(to));
    }
    for alias in raw.alias.iter().flatten() {
        delta = delta.alias(alias);
    }
    if let Some(access) = &raw.access {
        let mode: AccessMode = access
            .parse()
            .map_err(|reason| CatalogError::InvalidAttribute {
                owner: owner.to_string(),
                attribute: name.to_string(),
                reason,
            })?;
        delta = delta.access(mode);
    }
    if let Some(info) = raw.info {
        delta = delta.info(info);
    }
    Ok(delta)
}

fn convert_only(owner: &str, name: &str, raw: RawOnly) -> Result<OnlyRule, CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidFilter {
        owner: owner.to_string(),
        rule: name.to_string(),
        reason,
    };

    let mut filters = Vec::new();
    if let Some(values) = &raw.within {
        filters.push(OnlyFilter::is_in(values.iter().map(convert_value)));
    }
    if let Some(value) = &raw.equals {
        filters.push(OnlyFilter::Equals(convert_value(value)));
    }
    if let Some(value) = &raw.before {
        filters.push(OnlyFilter::Before(convert_value(value)));
    }
    if let Some(value) = &raw.after {
        filters.push(OnlyFilter::After(convert_value(value)));
    }
    if let Some(pattern) = &raw.matches {
        filters.push(OnlyFilter::matches(pattern).map_err(|e| invalid(e.to_string()))?);
    }

    let filter = match filters.len() {
        1 => filters.remove(0),
        0 => return Err(invalid("no filter given".to_string())),
        n => return Err(invalid(format!("{} filters given", n))),
    };
    let attribute = raw.attribute.unwrap_or_else(|| name.to_string());
    Ok(OnlyRule::new(attribute, filter))
}
