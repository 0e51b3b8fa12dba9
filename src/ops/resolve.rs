//! Resolution operations behind the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::collector::{BoundObject, LoadError, Registry};
use crate::core::{Context, Description};
use crate::ops::catalog::Catalog;
use crate::resolver::{AmbiguityPolicy, Report};
use crate::util::Config;

/// Build a registry from a catalog file under `config`.
///
/// The configured priority levels replace the process-wide set before any
/// footprint is merged.
pub fn open_registry(catalog: &Path, config: &Config) -> Result<Registry> {
    config.apply_priorities();

    let registry = Registry::new();
    registry.set_options(config.resolve_options());

    let count = Catalog::load(catalog)?
        .register_into(&registry)
        .with_context(|| format!("failed to register candidates from {}", catalog.display()))?;
    tracing::debug!("registered {} candidates from {}", count, catalog.display());
    Ok(registry)
}

/// One resolution query.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub tag: String,
    pub description: Description,
    pub context: Context,
}

impl ResolveRequest {
    pub fn new(tag: impl Into<String>) -> Self {
        ResolveRequest {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: Description) -> Self {
        self.description = description;
        self
    }

    /// Layer `context` over the current context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context.extend(context);
        self
    }
}

/// Result of [`resolve`]: the report and whether the caller should treat
/// it as a failure.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub report: Report,
    pub failed: bool,
}

/// Rank the candidates of `request.tag` without constructing anything.
///
/// A resolution fails when nothing matches, or when it is ambiguous and
/// the registry's ambiguity policy is `error`.
pub fn resolve(registry: &Registry, request: &ResolveRequest) -> ResolveOutcome {
    let collector = registry.collector(&request.tag);
    let resolution = collector.resolve(&request.description, &request.context);
    let report = resolution.report(&request.tag, &request.description);
    let failed = !report.is_match()
        || (report.ambiguous && collector.options().ambiguity == AmbiguityPolicy::Error);
    ResolveOutcome { report, failed }
}

/// Resolve and hand out an object, reusing a live one when possible.
pub fn instantiate(registry: &Registry, request: &ResolveRequest) -> Result<Arc<BoundObject>, LoadError> {
    registry.reuse_or_create(&request.tag, &request.description, &request.context)
}

/// One row of `fp entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub name: String,
    pub priority: String,
    pub explicit: bool,
    pub reusable: bool,
    pub mandatory: Vec<String>,
    pub optional: Vec<String>,
    pub info: String,
}

/// Summaries of the entries registered under `tag`, in declaration order.
pub fn entries(registry: &Registry, tag: &str) -> Vec<EntrySummary> {
    registry
        .entries(tag)
        .iter()
        .map(|e| {
            let fp = &e.footprint;
            EntrySummary {
                name: e.name().to_string(),
                priority: fp.priority().to_string(),
                explicit: fp.explicit(),
                reusable: e.implementation.reusable(),
                mandatory: fp.mandatory().map(String::from).collect(),
                optional: fp
                    .attributes()
                    .filter(|a| a.optional)
                    .map(|a| a.name.clone())
                    .collect(),
                info: fp.info().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::description;
    use crate::test_support::fruit_registry;

    #[test]
    fn test_resolve_outcome() {
        let registry = fruit_registry();
        let request = ResolveRequest::new("fruit").with_description(description([("colour", "red")]));
        let outcome = resolve(&registry, &request);
        assert!(!outcome.failed);
        assert_eq!(outcome.report.winner(), Some("apple"));

        let request = ResolveRequest::new("fruit").with_description(description([("colour", "blue")]));
        let outcome = resolve(&registry, &request);
        assert!(outcome.failed);
        assert_eq!(outcome.report.rejected.len(), 3);
    }

    #[test]
    fn test_unknown_tag_fails() {
        let registry = fruit_registry();
        let outcome = resolve(&registry, &ResolveRequest::new("vegetable"));
        assert!(outcome.failed);
        assert!(outcome.report.rejected.is_empty());
    }

    #[test]
    fn test_instantiate_reuses() {
        let registry = fruit_registry();
        let yellow = ResolveRequest::new("fruit").with_description(description([("colour", "yellow")]));
        let first = instantiate(&registry, &yellow).unwrap();
        let second = instantiate(&registry, &ResolveRequest::new("fruit")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_entry_summaries() {
        let registry = fruit_registry();
        let rows = entries(&registry, "fruit");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "apple");
        assert_eq!(rows[0].mandatory, vec!["colour"]);
        assert_eq!(rows[0].optional, vec!["producer"]);
        assert_eq!(rows[2].priority, "TOOLBOX");
        assert!(entries(&registry, "vegetable").is_empty());
    }

    #[test]
    fn test_request_context_layers() {
        let request = ResolveRequest::new("fruit")
            .with_context(description([("harvest", 2007), ("region", 1)]))
            .with_context(description([("harvest", 2014)]));
        assert_eq!(request.context["harvest"], crate::core::Value::from(2014));
        assert_eq!(request.context.len(), 2);
    }
}
