//! Reverse attribute map: for each attribute name, which candidates of a
//! collector declare it and how.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::collector::entry::RegistryEntry;

/// How one candidate declares one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declarer {
    pub candidate: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alias: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcast: Vec<String>,
}

/// Attribute name (suffixed ` [optional]` for optional declarations) to
/// its declarers, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeMap {
    pub tag: String,
    pub attributes: BTreeMap<String, Vec<Declarer>>,
}

impl AttributeMap {
    /// Build the map over `entries`, restricted to `only` names if given.
    pub fn build(tag: &str, entries: &[RegistryEntry], only: Option<&[String]>) -> Self {
        let mut attributes: BTreeMap<String, Vec<Declarer>> = BTreeMap::new();
        for entry in entries {
            for spec in entry.footprint.attributes() {
                if only.is_some_and(|names| !names.contains(&spec.name)) {
                    continue;
                }
                let key = if spec.optional {
                    format!("{} [optional]", spec.name)
                } else {
                    spec.name.clone()
                };
                attributes.entry(key).or_default().push(Declarer {
                    candidate: entry.name().to_string(),
                    type_name: spec.kind.to_string(),
                    alias: spec.alias.iter().cloned().collect(),
                    values: spec.values.iter().map(|v| v.to_string()).collect(),
                    outcast: spec.outcast.iter().map(|v| v.to_string()).collect(),
                });
            }
        }
        AttributeMap {
            tag: tag.to_string(),
            attributes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl fmt::Display for AttributeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, declarers) in &self.attributes {
            writeln!(f, "{}", name)?;
            for d in declarers {
                write!(f, "  {} ({})", d.candidate, d.type_name)?;
                if !d.alias.is_empty() {
                    write!(f, " alias: {}", d.alias.join(", "))?;
                }
                if !d.values.is_empty() {
                    write!(f, " values: {}", d.values.join(", "))?;
                }
                if !d.outcast.is_empty() {
                    write!(f, " outcast: {}", d.outcast.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
