//! Attribute binding.
//!
//! Binding runs one footprint against one description: locate each
//! attribute's raw value (canonical name or alias), fall back to defaults,
//! expand references, then coerce, remap and check `values`/`outcast`, in
//! that order. Failures are recorded per attribute (first failure only).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{AttributeSpec, Description, Footprint, Value};
use crate::resolver::errors::Rejection;
use crate::resolver::report::AttributeFailure;
use crate::resolver::substitute::{self, has_references, SubstituteError};

/// What to do when a description names an attribute more than once
/// (canonical name plus alias, or two aliases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasPolicy {
    /// Use the canonical name (or the first alias in sorted order) and warn.
    #[default]
    Canonical,
    /// Reject the attribute with `AliasConflict`.
    Reject,
}

/// How absent attributes are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Mandatory attributes must be present; optional ones get defaults.
    Full,
    /// Only attributes present in the description are bound.
    Partial,
}

/// Result of binding one footprint.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    /// Bound values in footprint declaration order.
    pub values: Description,
    /// Canonical names of attributes taken from the description.
    pub consumed: Vec<String>,
    pub failures: Vec<AttributeFailure>,
}

impl Binding {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn score(&self) -> usize {
        self.consumed.len()
    }
}

enum Located<'d> {
    Found(&'d Value),
    Absent,
    Conflict(Vec<String>),
}

fn locate<'d>(spec: &AttributeSpec, desc: &'d Description, policy: AliasPolicy) -> Located<'d> {
    let present: Vec<&str> = spec.names().filter(|n| desc.contains_key(*n)).collect();
    match present.as_slice() {
        [] => Located::Absent,
        [name] => desc.get(*name).map_or(Located::Absent, Located::Found),
        [first, ..] => match policy {
            AliasPolicy::Canonical => {
                tracing::warn!(
                    "description names `{}` several times ({}); using `{}`",
                    spec.name,
                    present.join(", "),
                    first
                );
                desc.get(*first).map_or(Located::Absent, Located::Found)
            }
            AliasPolicy::Reject => {
                Located::Conflict(present.iter().map(|n| n.to_string()).collect())
            }
        },
    }
}

struct Pending {
    index: usize,
    raw: Value,
    from_description: bool,
}

type Outcome = Result<Value, Rejection>;

/// Bind `desc` against `footprint`.
pub fn bind(footprint: &Footprint, desc: &Description, mode: Mode, policy: AliasPolicy) -> Binding {
    let specs: Vec<&AttributeSpec> = footprint.attributes().collect();
    let mut outcome: Vec<Option<Outcome>> = vec![None; specs.len()];
    let mut pending: IndexMap<String, Pending> = IndexMap::new();

    for (index, spec) in specs.iter().enumerate() {
        match locate(spec, desc, policy) {
            Located::Found(raw) => {
                pending.insert(
                    spec.name.clone(),
                    Pending {
                        index,
                        raw: raw.clone(),
                        from_description: true,
                    },
                );
            }
            Located::Conflict(names) => {
                outcome[index] = Some(Err(Rejection::AliasConflict { names }));
            }
            Located::Absent => match (mode, &spec.default) {
                (Mode::Partial, _) => {}
                (Mode::Full, _) if spec.is_mandatory() => {
                    outcome[index] = Some(Err(Rejection::MissingValue));
                }
                (Mode::Full, Some(default)) => {
                    pending.insert(
                        spec.name.clone(),
                        Pending {
                            index,
                            raw: default.clone(),
                            from_description: false,
                        },
                    );
                }
                (Mode::Full, None) => {}
            },
        }
    }

    let deps: IndexMap<String, Vec<String>> = pending
        .iter()
        .map(|(name, p)| {
            let used = p
                .raw
                .as_str()
                .map(|s| substitute::references(s).into_iter().map(|r| r.name).collect())
                .unwrap_or_default();
            (name.clone(), used)
        })
        .collect();
    let plan = substitute::plan(&deps);

    for cycle in &plan.cycles {
        let mut path = cycle.clone();
        if let Some(first) = cycle.first() {
            path.push(first.clone());
        }
        for name in cycle {
            if let Some(p) = pending.get(name) {
                outcome[p.index] = Some(Err(Rejection::SubstitutionCycle { path: path.clone() }));
            }
        }
    }

    let is_key = |name: &str| footprint.all_keys().any(|k| k == name);
    for name in &plan.order {
        let Some(p) = pending.get(name) else { continue };
        let result = {
            let lookup = |reference: &str| -> Option<Value> {
                match specs.iter().position(|s| s.name == reference) {
                    Some(i) => match &outcome[i] {
                        Some(Ok(v)) => Some(v.clone()),
                        _ => None,
                    },
                    None if is_key(reference) => None,
                    None => desc.get(reference).cloned(),
                }
            };
            finish(specs[p.index], p, lookup)
        };
        outcome[p.index] = Some(result);
    }

    let mut binding = Binding::default();
    for (spec, result) in specs.iter().zip(outcome) {
        let from = pending.get(&spec.name);
        match result {
            Some(Ok(value)) => {
                if from.is_some_and(|p| p.from_description) {
                    binding.consumed.push(spec.name.clone());
                }
                binding.values.insert(spec.name.clone(), value);
            }
            Some(Err(reason)) => binding.failures.push(AttributeFailure {
                attribute: spec.name.clone(),
                raw: from
                    .filter(|p| p.from_description)
                    .map(|p| p.raw.to_string()),
                reason,
            }),
            None => {}
        }
    }
    binding
}

fn finish<F>(spec: &AttributeSpec, pending: &Pending, lookup: F) -> Outcome
where
    F: Fn(&str) -> Option<Value>,
{
    let substituted = has_references(&pending.raw);
    let raw = match pending.raw.as_str() {
        Some(text) if substituted => {
            Value::Text(substitute::substitute(text, lookup).map_err(|e| match e {
                SubstituteError::Unresolved { name } => Rejection::UnresolvedReference { reference: name },
                SubstituteError::InvalidFormat {
                    name,
                    format,
                    reason,
                } => Rejection::InvalidFormat {
                    reference: name,
                    format,
                    reason,
                },
            })?)
        }
        _ => pending.raw.clone(),
    };

    // Plain defaults were coerced and checked when the footprint was built.
    if !pending.from_description && !substituted {
        return Ok(raw);
    }

    let value = spec
        .kind
        .coerce(&raw)
        .map_err(|message| Rejection::CoercionFailure {
            type_name: spec.kind.to_string(),
            raw: raw.to_string(),
            message,
        })?;
    let value = spec.remapped(value);

    if !spec.values.is_empty() && !spec.values.contains(&value) {
        return Err(Rejection::NotInValues {
            value: value.to_string(),
            allowed: spec.values.iter().map(|v| v.to_string()).collect(),
        });
    }
    if spec.outcast.contains(&value) {
        return Err(Rejection::OutcastValue {
            value: value.to_string(),
        });
    }
    Ok(value)
}
