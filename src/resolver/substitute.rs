//! Cross-attribute references.
//!
//! A raw text value may refer to other attributes: `[name]` inserts the
//! value bound to `name`, `[name#fallback]` inserts `fallback` when `name`
//! has no value, and `[name%fmt]` formats the value with a width spec such
//! as `03`, `>8` or `.2`. References are resolved in dependency order; the
//! order is computed once per binding with a petgraph graph.

use std::sync::LazyLock;

use indexmap::IndexMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;

use crate::core::Value;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\w+)(?:#(\w+))?(?:%([^\]]+))?\]").expect("valid reference pattern")
});

static FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(.)?([<>^]))?(0)?(\d+)?(?:\.(\d+))?([dsf])?$")
        .expect("valid format pattern")
});

/// One `[...]` reference found in a text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub fallback: Option<String>,
    pub format: Option<String>,
}

/// Why a text value could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstituteError {
    Unresolved { name: String },
    InvalidFormat { name: String, format: String, reason: String },
}

/// All references in `text`, left to right.
pub fn references(text: &str) -> Vec<Reference> {
    REFERENCE
        .captures_iter(text)
        .map(|caps| Reference {
            name: caps[1].to_string(),
            fallback: caps.get(2).map(|m| m.as_str().to_string()),
            format: caps.get(3).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Whether `value` is text holding at least one reference.
pub fn has_references(value: &Value) -> bool {
    value.as_str().is_some_and(|s| REFERENCE.is_match(s))
}

/// Expand every reference in `text` with `lookup`.
pub fn substitute<F>(text: &str, lookup: F) -> Result<String, SubstituteError>
where
    F: Fn(&str) -> Option<Value>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in REFERENCE.captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&text[last..whole.start]);
        last = whole.end;

        let name = &caps[1];
        let piece = match (lookup(name), caps.get(2)) {
            (Some(value), _) => match caps.get(3) {
                Some(fmt) => format_value(&value, fmt.as_str()).map_err(|reason| {
                    SubstituteError::InvalidFormat {
                        name: name.to_string(),
                        format: fmt.as_str().to_string(),
                        reason,
                    }
                })?,
                None => value.to_string(),
            },
            (None, Some(fallback)) => fallback.as_str().to_string(),
            (None, None) => {
                return Err(SubstituteError::Unresolved {
                    name: name.to_string(),
                })
            }
        };
        out.push_str(&piece);
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Format a value with a `[[fill]align][0][width][.precision][type]` spec.
pub fn format_value(value: &Value, spec: &str) -> Result<String, String> {
    let caps = FORMAT
        .captures(spec)
        .ok_or_else(|| format!("unsupported format `{}`", spec))?;
    let fill = caps.get(1).and_then(|m| m.as_str().chars().next());
    let align = caps.get(2).map(|m| m.as_str());
    let zero = caps.get(3).is_some();
    let width: usize = caps.get(4).map_or(Ok(0), |m| m.as_str().parse::<usize>()).map_err(|e| e.to_string())?;
    let precision: Option<usize> = caps
        .get(5)
        .map(|m| m.as_str().parse::<usize>())
        .transpose()
        .map_err(|e| e.to_string())?;
    let numeric = value.as_f64().is_some();

    match caps.get(6).map(|m| m.as_str()) {
        Some("d") if value.as_i64().is_none() => {
            return Err(format!("`{}` is not an integer", value))
        }
        Some("f") if !numeric => return Err(format!("`{}` is not a number", value)),
        _ => {}
    }

    let body = match (precision, value.as_f64()) {
        (Some(p), Some(x)) => format!("{:.*}", p, x),
        (Some(p), None) => value.to_string().chars().take(p).collect(),
        (None, _) => value.to_string(),
    };

    let len = body.chars().count();
    if len >= width {
        return Ok(body);
    }
    let pad = width - len;

    if zero && align.is_none() && numeric {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", body.as_str()),
        };
        return Ok(format!("{}{}{}", sign, "0".repeat(pad), digits));
    }

    let fill = fill.unwrap_or(if zero { '0' } else { ' ' }).to_string();
    let align = align.unwrap_or(if numeric { ">" } else { "<" });
    Ok(match align {
        "<" => format!("{}{}", body, fill.repeat(pad)),
        ">" => format!("{}{}", fill.repeat(pad), body),
        _ => {
            let left = pad / 2;
            format!("{}{}{}", fill.repeat(left), body, fill.repeat(pad - left))
        }
    })
}

/// Evaluation plan for a set of inter-dependent names.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// Names in an order where every name comes after the names it uses.
    pub order: Vec<String>,
    /// Reference cycles, each listed in declaration order.
    pub cycles: Vec<Vec<String>>,
}

/// Order `deps` (name → names it refers to) for evaluation.
///
/// Only edges between keys of `deps` count; references to other names are
/// resolved from elsewhere and impose no ordering.
pub fn plan(deps: &IndexMap<String, Vec<String>>) -> Plan {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..deps.len()).map(|i| graph.add_node(i)).collect();
    for (i, used) in deps.values().enumerate() {
        for name in used {
            if let Some(j) = deps.get_index_of(name) {
                graph.update_edge(nodes[j], nodes[i], ());
            }
        }
    }

    let mut cyclic = vec![false; deps.len()];
    let mut cycles = Vec::new();
    for scc in tarjan_scc(&graph) {
        let looped = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if !looped {
            continue;
        }
        let mut members: Vec<usize> = scc.iter().map(|n| graph[*n]).collect();
        members.sort_unstable();
        for &m in &members {
            cyclic[m] = true;
        }
        cycles.push(members);
    }
    cycles.sort();

    graph.retain_nodes(|g, n| !cyclic[g[n]]);
    let order = match toposort(&graph, None) {
        Ok(sorted) => sorted.into_iter().map(|n| graph[n]).collect(),
        Err(_) => Vec::new(),
    };

    let name = |i: usize| deps.get_index(i).map(|(k, _)| k.clone()).unwrap_or_default();
    Plan {
        order: order.into_iter().map(name).collect(),
        cycles: cycles
            .into_iter()
            .map(|c| c.into_iter().map(name).collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_references_parsed() {
        let refs = references("run_[member%03]_[suffix#x]");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "member");
        assert_eq!(refs[0].format.as_deref(), Some("03"));
        assert_eq!(refs[1].fallback.as_deref(), Some("x"));
        assert!(has_references(&Value::from("[a]")));
        assert!(!has_references(&Value::from("plain")));
        assert!(!has_references(&Value::from(3)));
    }

    #[test]
    fn test_substitute_with_fallback_and_format() {
        let lookup = |name: &str| match name {
            "member" => Some(Value::from(7)),
            _ => None,
        };
        assert_eq!(
            substitute("m[member%03]-[other#none]", lookup),
            Ok("m007-none".to_string())
        );
        assert_eq!(
            substitute("[other]", lookup),
            Err(SubstituteError::Unresolved {
                name: "other".into()
            })
        );
    }

    #[test]
    fn test_format_specs() {
        assert_eq!(format_value(&Value::from(-5), "04").unwrap(), "-005");
        assert_eq!(format_value(&Value::from("ab"), ">4").unwrap(), "  ab");
        assert_eq!(format_value(&Value::from("ab"), "*^6").unwrap(), "**ab**");
        assert_eq!(format_value(&Value::from(1.5), ".2f").unwrap(), "1.50");
        assert!(format_value(&Value::from("ab"), "d").is_err());
        assert!(format_value(&Value::from(1), "!!").is_err());
    }

    #[test]
    fn test_plan_orders_dependencies() {
        let plan = plan(&deps(&[("path", &["dir", "file"]), ("dir", &["root"]), ("file", &[])]));
        assert!(plan.cycles.is_empty());
        let pos = |n: &str| plan.order.iter().position(|x| x == n).unwrap();
        assert!(pos("dir") < pos("path"));
        assert!(pos("file") < pos("path"));
    }

    #[test]
    fn test_plan_reports_cycles() {
        let plan = plan(&deps(&[("a", &["b"]), ("b", &["a"]), ("c", &["c"]), ("d", &[])]));
        assert_eq!(plan.cycles, vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]);
        assert_eq!(plan.order, vec!["d".to_string()]);
    }
}
