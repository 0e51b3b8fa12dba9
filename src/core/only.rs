//! `only` scoping filters.
//!
//! A footprint may restrict itself to some ambient situations: "only when
//! `harvest` is 2001 or 2007", "only after `date` 2020". Filters read the
//! resolution context, never the description.

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::core::coercion::TypeSpec;
use crate::core::{Context, Value, ValueKind};

/// One test applied to a context value.
#[derive(Debug, Clone)]
pub enum OnlyFilter {
    /// The value must be a member of the set.
    In(BTreeSet<Value>),
    /// The value must equal this one.
    Equals(Value),
    /// The value must be ≤ the threshold.
    Before(Value),
    /// The value must be ≥ the threshold.
    After(Value),
    /// The value's text form must match the pattern.
    Matches(Regex),
}

impl OnlyFilter {
    pub fn is_in<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        OnlyFilter::In(values.into_iter().map(Into::into).collect())
    }

    /// Build a pattern filter. The pattern is anchored at the start.
    pub fn matches(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{})", pattern)).map(OnlyFilter::Matches)
    }

    /// Short keyword used in rule names and reports.
    pub fn keyword(&self) -> &'static str {
        match self {
            OnlyFilter::In(_) => "in",
            OnlyFilter::Equals(_) => "equals",
            OnlyFilter::Before(_) => "before",
            OnlyFilter::After(_) => "after",
            OnlyFilter::Matches(_) => "matches",
        }
    }

    /// Test `actual` against this filter. A value that cannot be brought to
    /// the filter's kind is never accepted.
    pub fn accepts(&self, actual: &Value) -> bool {
        match self {
            OnlyFilter::In(set) => set.iter().any(|v| align(actual, v).is_some_and(|a| a == *v)),
            OnlyFilter::Equals(v) => align(actual, v).is_some_and(|a| a == *v),
            OnlyFilter::Before(v) => align(actual, v).is_some_and(|a| a <= *v),
            OnlyFilter::After(v) => align(actual, v).is_some_and(|a| a >= *v),
            OnlyFilter::Matches(re) => re.is_match(&actual.to_string()),
        }
    }
}

impl fmt::Display for OnlyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnlyFilter::In(set) => {
                let items: Vec<_> = set.iter().map(|v| v.to_string()).collect();
                write!(f, "in [{}]", items.join(", "))
            }
            OnlyFilter::Equals(v) => write!(f, "== {}", v),
            OnlyFilter::Before(v) => write!(f, "<= {}", v),
            OnlyFilter::After(v) => write!(f, ">= {}", v),
            OnlyFilter::Matches(re) => write!(f, "~ /{}/", re.as_str()),
        }
    }
}

impl Serialize for OnlyFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Bring a context value to the kind of the value it is compared with, so
/// that `"2007"` from a config file compares equal to `2007`.
fn align(actual: &Value, reference: &Value) -> Option<Value> {
    if actual.kind() == reference.kind() {
        return Some(actual.clone());
    }
    let target = match reference.kind() {
        ValueKind::Bool => "boolean",
        ValueKind::Integer => "integer",
        ValueKind::Float => "float",
        ValueKind::Version => "version",
        ValueKind::Text => "text",
        ValueKind::List => "list",
    };
    TypeSpec::new(target).coerce(actual).ok()
}

/// A named filter over one context attribute.
#[derive(Debug, Clone, Serialize)]
pub struct OnlyRule {
    pub attribute: String,
    pub filter: OnlyFilter,
}

/// Why an `only` rule rejected a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnlyOutcome {
    MissingContext,
    Rejected { actual: String },
}

impl OnlyRule {
    pub fn new(attribute: impl Into<String>, filter: OnlyFilter) -> Self {
        OnlyRule {
            attribute: attribute.into(),
            filter,
        }
    }

    /// The conventional rule name: the attribute name for set/equality/pattern
    /// filters, `before_<attr>` / `after_<attr>` for bounds.
    pub fn default_name(&self) -> String {
        match self.filter {
            OnlyFilter::Before(_) => format!("before_{}", self.attribute),
            OnlyFilter::After(_) => format!("after_{}", self.attribute),
            _ => self.attribute.clone(),
        }
    }

    /// Evaluate against the context.
    pub fn evaluate(&self, context: &Context) -> Result<(), OnlyOutcome> {
        let actual = context
            .get(&self.attribute)
            .ok_or(OnlyOutcome::MissingContext)?;
        if self.filter.accepts(actual) {
            Ok(())
        } else {
            Err(OnlyOutcome::Rejected {
                actual: actual.to_string(),
            })
        }
    }
}
