//! Attribute specifications.
//!
//! An [`AttributeSpec`] is the fully merged rule set for one named attribute.
//! Fragments contribute [`AttributeDelta`]s: every field is optional, and a
//! later delta overwrites only the fields it sets. Map-valued fields (`remap`,
//! type arguments) merge key by key; set-valued fields are replaced whole.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::coercion::{TypeArgs, TypeSpec};
use crate::core::footprint::FootprintError;
use crate::core::Value;

/// What a bound object allows on an attribute after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Access {
    #[default]
    ReadOnly,
    ReadWrite,
    ReadWriteDelete,
}

/// Access policy plus storage relation.
///
/// Weak attributes keep a non-owning handle to shared values; reading one
/// whose referent has been released fails instead of returning stale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMode {
    pub access: Access,
    pub weak: bool,
}

impl AccessMode {
    pub const RXX: AccessMode = AccessMode {
        access: Access::ReadOnly,
        weak: false,
    };
    pub const RWX: AccessMode = AccessMode {
        access: Access::ReadWrite,
        weak: false,
    };
    pub const RWD: AccessMode = AccessMode {
        access: Access::ReadWriteDelete,
        weak: false,
    };

    pub fn weak(self) -> Self {
        AccessMode { weak: true, ..self }
    }

    pub fn can_write(&self) -> bool {
        !matches!(self.access, Access::ReadOnly)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self.access, Access::ReadWriteDelete)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.access {
            Access::ReadOnly => "rxx",
            Access::ReadWrite => "rwx",
            Access::ReadWriteDelete => "rwd",
        };
        if self.weak {
            write!(f, "{}-weak", base)
        } else {
            f.write_str(base)
        }
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, weak) = match s.strip_suffix("-weak") {
            Some(base) => (base, true),
            None => (s, false),
        };
        let access = match base {
            "rxx" => Access::ReadOnly,
            "rwx" => Access::ReadWrite,
            "rwd" => Access::ReadWriteDelete,
            _ => return Err(format!("unknown access mode `{}`", s)),
        };
        Ok(AccessMode { access, weak })
    }
}

impl Serialize for AccessMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// The merged rules for one attribute.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: TypeSpec,
    pub optional: bool,
    pub default: Option<Value>,
    pub values: BTreeSet<Value>,
    pub outcast: BTreeSet<Value>,
    pub remap: BTreeMap<Value, Value>,
    pub alias: BTreeSet<String>,
    pub access: AccessMode,
    pub info: Option<String>,
}

impl AttributeSpec {
    /// Build the final spec from a merged delta.
    ///
    /// Constraint values, remap entries and the default are coerced to the
    /// attribute type here, once, and the default is checked against
    /// `values`/`outcast`.
    pub fn from_delta(name: &str, delta: AttributeDelta) -> Result<Self, FootprintError> {
        let mut kind = TypeSpec::new(delta.kind.unwrap_or_else(|| "text".to_string()));
        kind.args = delta.args.unwrap_or_default();
        if !kind.is_known() {
            return Err(FootprintError::UnknownType {
                attribute: name.to_string(),
                type_name: kind.name,
            });
        }

        let coerce = |field: &'static str, v: Value| {
            kind.coerce(&v)
                .map_err(|reason| FootprintError::InvalidConstraint {
                    attribute: name.to_string(),
                    field,
                    value: v.to_string(),
                    reason,
                })
        };

        let values = delta
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|v| coerce("values", v))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let outcast = delta
            .outcast
            .unwrap_or_default()
            .into_iter()
            .map(|v| coerce("outcast", v))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let remap = delta
            .remap
            .unwrap_or_default()
            .into_iter()
            .map(|(from, to)| Ok((coerce("remap", from)?, coerce("remap", to)?)))
            .collect::<Result<BTreeMap<_, _>, FootprintError>>()?;

        // A default holding a substitution reference is resolved at bind
        // time and cannot be coerced up front.
        let default = match delta.default {
            Some(v) if crate::resolver::substitute::has_references(&v) => Some(v),
            Some(v) => Some(coerce("default", v)?),
            None => None,
        };

        let spec = AttributeSpec {
            name: name.to_string(),
            kind,
            optional: delta.optional.unwrap_or(false),
            default,
            values,
            outcast,
            remap,
            alias: delta.alias.unwrap_or_default(),
            access: delta.access.unwrap_or_default(),
            info: delta.info,
        };

        if let Some(default) = spec
            .default
            .as_ref()
            .filter(|d| !crate::resolver::substitute::has_references(d))
        {
            if let Err(reason) = spec.check(default) {
                return Err(FootprintError::InvalidDefault {
                    attribute: spec.name.clone(),
                    value: default.to_string(),
                    reason,
                });
            }
        }

        Ok(spec)
    }

    pub fn is_mandatory(&self) -> bool {
        !self.optional
    }

    /// Apply the remap table (single lookup; unmapped values pass through).
    pub fn remapped(&self, value: Value) -> Value {
        match self.remap.get(&value) {
            Some(target) => target.clone(),
            None => value,
        }
    }

    /// Check an already coerced value against `values` and `outcast`.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if !self.values.is_empty() && !self.values.contains(value) {
            return Err(format!("`{}` is not one of {}", value, list(&self.values)));
        }
        if self.outcast.contains(value) {
            return Err(format!("`{}` is an outcast value", value));
        }
        Ok(())
    }

    /// Names this attribute answers to in a description: itself, then its
    /// aliases in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alias.iter().map(String::as_str))
    }
}

fn list(values: &BTreeSet<Value>) -> String {
    let items: Vec<_> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// A partial attribute declaration contributed by one fragment.
#[derive(Debug, Clone, Default)]
pub struct AttributeDelta {
    pub kind: Option<String>,
    pub args: Option<TypeArgs>,
    pub optional: Option<bool>,
    pub default: Option<Value>,
    pub values: Option<BTreeSet<Value>>,
    pub outcast: Option<BTreeSet<Value>>,
    pub remap: Option<BTreeMap<Value, Value>>,
    pub alias: Option<BTreeSet<String>>,
    pub access: Option<AccessMode>,
    pub info: Option<String>,
}

impl AttributeDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attribute type by registered name.
    pub fn kind(mut self, name: impl Into<String>) -> Self {
        self.kind = Some(name.into());
        self
    }

    /// Add one type argument.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args
            .get_or_insert_with(TypeArgs::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = Some(true);
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.optional = Some(false);
        self
    }

    /// Mark optional with a default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.optional = Some(true);
        self.default = Some(value.into());
        self
    }

    pub fn values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn outcast<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.outcast = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn remap(mut self, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.remap
            .get_or_insert_with(BTreeMap::new)
            .insert(from.into(), to.into());
        self
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias
            .get_or_insert_with(BTreeSet::new)
            .insert(name.into());
        self
    }

    pub fn access(mut self, mode: AccessMode) -> Self {
        self.access = Some(mode);
        self
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Overlay `later` onto `self`, field by field.
    pub fn merge(&mut self, later: &AttributeDelta) {
        if later.kind.is_some() {
            self.kind = later.kind.clone();
        }
        if let Some(args) = &later.args {
            let mine = self.args.get_or_insert_with(TypeArgs::new);
            mine.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if later.optional.is_some() {
            self.optional = later.optional;
        }
        if later.default.is_some() {
            self.default = later.default.clone();
        }
        if later.values.is_some() {
            self.values = later.values.clone();
        }
        if later.outcast.is_some() {
            self.outcast = later.outcast.clone();
        }
        if let Some(remap) = &later.remap {
            let mine = self.remap.get_or_insert_with(BTreeMap::new);
            mine.extend(remap.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if later.alias.is_some() {
            self.alias = later.alias.clone();
        }
        if later.access.is_some() {
            self.access = later.access;
        }
        if later.info.is_some() {
            self.info = later.info.clone();
        }
    }
}
