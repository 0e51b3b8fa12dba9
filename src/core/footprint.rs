//! Footprints and their construction from fragments.
//!
//! A footprint is built by [`merge`]-ing an ordered list of [`Fragment`]s:
//! shared ancestors first, the implementation's own fragment last. Each
//! attribute is merged field by field, so a later fragment that only sets
//! `values` leaves the earlier `type`, `default`, etc. in place.

use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;

use crate::core::attribute::{AttributeDelta, AttributeSpec};
use crate::core::only::{OnlyFilter, OnlyRule};
use crate::core::priority::{self, PriorityLevel};
use crate::core::{Description, Value};

/// Structural problems found while building a footprint.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum FootprintError {
    #[error("attribute `{attribute}` has unknown type `{type_name}`")]
    #[diagnostic(
        code(footprints::footprint::unknown_type),
        help("register the type with `coercion::register` before declaring it")
    )]
    UnknownType { attribute: String, type_name: String },

    #[error("attribute `{attribute}`: {field} entry `{value}` is invalid: {reason}")]
    #[diagnostic(code(footprints::footprint::invalid_constraint))]
    InvalidConstraint {
        attribute: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("attribute `{attribute}`: default `{value}` violates its own constraints: {reason}")]
    #[diagnostic(code(footprints::footprint::invalid_default))]
    InvalidDefault {
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("explicit footprint without any mandatory attribute")]
    #[diagnostic(
        code(footprints::footprint::no_mandatory),
        help("make at least one attribute mandatory, or declare the footprint with explicit = false")
    )]
    NoMandatoryAttribute,

    #[error("unknown priority level `{level}`")]
    #[diagnostic(code(footprints::footprint::unknown_priority))]
    UnknownPriority { level: String },

    #[error("attribute or alias `{name}` collides with collector tag `{tag}`")]
    #[diagnostic(code(footprints::footprint::tag_collision))]
    TagCollision { name: String, tag: String },
}

/// A partial footprint declaration.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub attr: IndexMap<String, AttributeDelta>,
    pub priority: Option<String>,
    pub only: IndexMap<String, OnlyRule>,
    pub explicit: Option<bool>,
    pub info: Option<String>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or refine) an attribute. Repeated calls for the same name
    /// within one fragment merge field by field.
    pub fn attr(mut self, name: impl Into<String>, delta: AttributeDelta) -> Self {
        let name = name.into();
        match self.attr.get_mut(&name) {
            Some(existing) => existing.merge(&delta),
            None => {
                self.attr.insert(name, delta);
            }
        }
        self
    }

    pub fn priority(mut self, level: impl Into<String>) -> Self {
        self.priority = Some(level.into());
        self
    }

    /// Add an `only` rule under its conventional name.
    pub fn only(self, attribute: impl Into<String>, filter: OnlyFilter) -> Self {
        let rule = OnlyRule::new(attribute, filter);
        let name = rule.default_name();
        self.only_named(name, rule)
    }

    /// Add an `only` rule under an explicit name. A later rule with the same
    /// name replaces this one.
    pub fn only_named(mut self, name: impl Into<String>, rule: OnlyRule) -> Self {
        self.only.insert(name.into(), rule);
        self
    }

    pub fn explicit(mut self, explicit: bool) -> Self {
        self.explicit = Some(explicit);
        self
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attr.is_empty()
            && self.priority.is_none()
            && self.only.is_empty()
            && self.explicit.is_none()
            && self.info.is_none()
    }
}

/// The merged attribute rules and selection metadata of one implementation.
#[derive(Debug, Clone)]
pub struct Footprint {
    attr: IndexMap<String, AttributeSpec>,
    priority: PriorityLevel,
    only: IndexMap<String, OnlyRule>,
    explicit: bool,
    info: String,
}

/// Merge fragments in order into a footprint.
pub fn merge<'a, I>(parts: I) -> Result<Footprint, FootprintError>
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut attr: IndexMap<String, AttributeDelta> = IndexMap::new();
    let mut priority = None;
    let mut only = IndexMap::new();
    let mut explicit = true;
    let mut info = None;

    for part in parts {
        for (name, delta) in &part.attr {
            match attr.get_mut(name) {
                Some(existing) => {
                    if let (Some(before), Some(after)) = (&existing.kind, &delta.kind) {
                        if before != after {
                            tracing::warn!(
                                "type of attribute `{}` changes from `{}` to `{}` across fragments",
                                name,
                                before,
                                after
                            );
                        }
                    }
                    existing.merge(delta);
                }
                None => {
                    attr.insert(name.clone(), delta.clone());
                }
            }
        }
        if part.priority.is_some() {
            priority = part.priority.clone();
        }
        for (name, rule) in &part.only {
            only.insert(name.clone(), rule.clone());
        }
        if let Some(e) = part.explicit {
            explicit = e;
        }
        if part.info.is_some() {
            info = part.info.clone();
        }
    }

    let attr = attr
        .into_iter()
        .map(|(name, delta)| AttributeSpec::from_delta(&name, delta).map(|spec| (name, spec)))
        .collect::<Result<IndexMap<_, _>, _>>()?;

    let priority = match priority {
        Some(level) => priority::top()
            .level(&level)
            .map_err(|_| FootprintError::UnknownPriority { level })?,
        None => PriorityLevel::default(),
    };

    let footprint = Footprint {
        attr,
        priority,
        only,
        explicit,
        info: info.unwrap_or_else(|| "Not documented".to_string()),
    };

    if footprint.explicit && footprint.mandatory().next().is_none() {
        return Err(FootprintError::NoMandatoryAttribute);
    }

    Ok(footprint)
}

impl Footprint {
    /// Attribute specs in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attr.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attr.get(name)
    }

    pub fn len(&self) -> usize {
        self.attr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attr.is_empty()
    }

    /// Mandatory attribute names, in declaration order.
    pub fn mandatory(&self) -> impl Iterator<Item = &str> {
        self.attr
            .values()
            .filter(|a| a.is_mandatory())
            .map(|a| a.name.as_str())
    }

    pub fn is_optional(&self, name: &str) -> Option<bool> {
        self.attr.get(name).map(|a| a.optional)
    }

    /// Every name the footprint answers to: attribute names and aliases.
    pub fn all_keys(&self) -> impl Iterator<Item = &str> {
        self.attr.values().flat_map(AttributeSpec::names)
    }

    /// Keys of `desc` that this footprint would consume.
    pub fn track<'d>(&self, desc: &'d Description) -> Vec<&'d str> {
        desc.keys()
            .map(String::as_str)
            .filter(|k| self.all_keys().any(|name| name == *k))
            .collect()
    }

    /// Declared `values` for an attribute (empty when unrestricted or unknown).
    pub fn values_of(&self, name: &str) -> Vec<Value> {
        self.attr
            .get(name)
            .map(|a| a.values.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn outcast_of(&self, name: &str) -> Vec<Value> {
        self.attr
            .get(name)
            .map(|a| a.outcast.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn priority(&self) -> &PriorityLevel {
        &self.priority
    }

    /// Change the priority level after construction.
    pub fn set_priority(&mut self, level: PriorityLevel) {
        self.priority = level;
    }

    pub fn only(&self) -> &IndexMap<String, OnlyRule> {
        &self.only
    }

    pub fn explicit(&self) -> bool {
        self.explicit
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}
