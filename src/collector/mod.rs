//! Collectors: per-tag catalogues of implementations and live instances.
//!
//! A [`Registry`] owns one [`Collector`] per capability tag. Registration
//! merges an implementation's fragments into a footprint once and adds an
//! entry under each of its tags. Entries are never removed.

pub mod attrmap;
pub mod cache;
pub mod entry;
pub mod object;

pub use attrmap::AttributeMap;
pub use cache::InstanceCache;
pub use entry::{Declaration, RegistryEntry, Resolvable};
pub use object::{AccessError, BoundObject, Payload, Record};

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use miette::Diagnostic;
use parking_lot::RwLock;
use thiserror::Error;

use crate::collector::object::detach_weak;
use crate::core::priority::{self, PriorityError};
use crate::core::{merge, Context, Description, Footprint, FootprintError, Value};
use crate::resolver::{
    AmbiguityPolicy, CandidateReport, Matched, Ranked, Report, Resolution, ResolveOptions, Resolver,
};

/// Registration failure: the candidate never becomes eligible.
#[derive(Debug, Error, Diagnostic)]
#[error("cannot register `{candidate}`")]
#[diagnostic(code(footprints::register))]
pub struct RegisterError {
    pub candidate: String,
    #[source]
    #[diagnostic_source]
    pub source: FootprintError,
}

/// Why a collector could not hand out an object.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no `{tag}` candidate matches the description")]
    NoMatch { tag: String, report: Report },

    #[error("ambiguous `{tag}` resolution between {}", .candidates.join(", "))]
    Ambiguous {
        tag: String,
        candidates: Vec<String>,
        report: Report,
    },

    #[error("failed to construct `{candidate}`")]
    Construction {
        candidate: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LoadError {
    /// The resolution report behind this error, if any.
    pub fn report(&self) -> Option<&Report> {
        match self {
            LoadError::NoMatch { report, .. } | LoadError::Ambiguous { report, .. } => Some(report),
            LoadError::Construction { .. } => None,
        }
    }
}

/// The catalogue of one capability tag.
pub struct Collector {
    tag: String,
    entries: RwLock<Vec<RegistryEntry>>,
    cache: InstanceCache,
    last: RwLock<Option<Report>>,
    options: RwLock<ResolveOptions>,
}

impl Collector {
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_options(tag, ResolveOptions::default())
    }

    pub fn with_options(tag: impl Into<String>, options: ResolveOptions) -> Self {
        Collector {
            tag: tag.into(),
            entries: RwLock::new(Vec::new()),
            cache: InstanceCache::new(),
            last: RwLock::new(None),
            options: RwLock::new(options),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn options(&self) -> ResolveOptions {
        *self.options.read()
    }

    pub fn set_options(&self, options: ResolveOptions) {
        *self.options.write() = options;
    }

    /// Add an entry unless one with the same implementation name exists.
    fn insert(&self, entry: RegistryEntry) {
        let mut entries = self.entries.write();
        match entries.iter().find(|e| e.name() == entry.name()) {
            Some(existing) if Arc::ptr_eq(&existing.implementation, &entry.implementation) => {
                tracing::debug!("`{}` already registered under `{}`", entry.name(), self.tag);
            }
            Some(_) => {
                tracing::warn!(
                    "another `{}` is already registered under `{}`; keeping the first one",
                    entry.name(),
                    self.tag
                );
            }
            None => {
                tracing::debug!("registered `{}` under `{}`", entry.name(), self.tag);
                entries.push(entry);
            }
        }
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.read().iter().find(|e| e.name() == name).cloned()
    }

    fn resolve_in(&self, entries: &[RegistryEntry], desc: &Description, context: &Context) -> Resolution {
        tracing::debug!("resolving `{}` among {} candidates", self.tag, entries.len());
        let resolution = Resolver::new(self.options()).resolve(entries, desc, context);
        *self.last.write() = Some(resolution.report(&self.tag, desc));
        resolution
    }

    /// Rank this collector's entries against `desc`.
    pub fn resolve(&self, desc: &Description, context: &Context) -> Resolution {
        let entries = self.entries();
        self.resolve_in(&entries, desc, context)
    }

    fn select(&self, resolution: Resolution, desc: &Description) -> Result<Matched, LoadError> {
        let report = resolution.report(&self.tag, desc);
        let matched = match resolution {
            Resolution::Match(matched) => matched,
            Resolution::NoMatch(_) => {
                return Err(LoadError::NoMatch {
                    tag: self.tag.clone(),
                    report,
                })
            }
        };
        if matched.is_ambiguous() && self.options().ambiguity == AmbiguityPolicy::Error {
            return Err(LoadError::Ambiguous {
                tag: self.tag.clone(),
                candidates: matched.tied().into_iter().map(String::from).collect(),
                report,
            });
        }
        Ok(matched)
    }

    fn construct(&self, entries: &[RegistryEntry], winner: &Ranked) -> Result<Arc<BoundObject>, LoadError> {
        let entry = &entries[winner.index];
        let payload = entry
            .implementation
            .construct(&detach_weak(&entry.footprint, &winner.bound))
            .map_err(|e| LoadError::Construction {
                candidate: winner.candidate.clone(),
                source: e.into(),
            })?;
        let object = Arc::new(BoundObject::new(
            entry.name(),
            &self.tag,
            entry.seq,
            entry.implementation.reusable(),
            entry.footprint.clone(),
            winner.bound.clone(),
            payload,
        ));
        self.cache.push(&object);
        tracing::debug!("constructed `{}` for `{}`", entry.name(), self.tag);
        Ok(object)
    }

    /// Resolve and always construct a new object.
    pub fn load(&self, desc: &Description, context: &Context) -> Result<Arc<BoundObject>, LoadError> {
        let entries = self.entries();
        let resolution = self.resolve_in(&entries, desc, context);
        let matched = self.select(resolution, desc)?;
        self.construct(&entries, matched.winner())
    }

    /// Resolve, then hand out a compatible live instance of the winner if
    /// there is one, constructing otherwise.
    ///
    /// When nothing resolves, the first reusable live instance that `desc`
    /// describes (see [`BoundObject::compatible_with`]) is returned instead.
    /// That fallback does not re-check `only` rules: an instance built under
    /// one context is handed out under any other.
    pub fn reuse_or_create(&self, desc: &Description, context: &Context) -> Result<Arc<BoundObject>, LoadError> {
        let entries = self.entries();
        let resolution = self.resolve_in(&entries, desc, context);

        if let Resolution::NoMatch(_) = resolution {
            let policy = self.options().alias_policy;
            if let Some(object) = self
                .instances()
                .into_iter()
                .find(|o| o.reusable() && o.compatible_with(desc, policy))
            {
                tracing::debug!("reusing `{}` for an unresolved `{}` description", object.implementation(), self.tag);
                return Ok(object);
            }
        }

        let matched = self.select(resolution, desc)?;
        let winner = matched.winner();
        let wanted = winner.consumed_values();
        if let Some(object) = self
            .instances()
            .into_iter()
            .find(|o| o.reusable() && o.implementation() == winner.candidate && o.matches(&wanted))
        {
            tracing::debug!("reusing `{}` for `{}`", object.implementation(), self.tag);
            return Ok(object);
        }
        self.construct(&entries, winner)
    }

    /// Live objects built by this collector, in construction order.
    pub fn instances(&self) -> Vec<Arc<BoundObject>> {
        self.cache.live()
    }

    /// Live objects whose stored values equal all of `attrs`.
    pub fn grep(&self, attrs: &Description) -> Vec<Arc<BoundObject>> {
        self.instances()
            .into_iter()
            .filter(|o| o.matches(attrs))
            .collect()
    }

    /// Entries at or above priority `level`.
    pub fn filter_level(&self, level: &str) -> Result<Vec<RegistryEntry>, PriorityError> {
        let min = priority::top().level(level)?;
        let min = min.rank();
        Ok(self
            .entries()
            .into_iter()
            .filter(|e| e.footprint.priority().rank() >= min)
            .collect())
    }

    /// Entries strictly below priority `level`.
    pub fn filter_below(&self, level: &str) -> Result<Vec<RegistryEntry>, PriorityError> {
        let max = priority::top().level(level)?;
        let max = max.rank();
        Ok(self
            .entries()
            .into_iter()
            .filter(|e| e.footprint.priority().rank() < max)
            .collect())
    }

    /// Union of the declared `values` of `attribute` across entries.
    pub fn values_of(&self, attribute: &str) -> BTreeSet<Value> {
        self.entries
            .read()
            .iter()
            .flat_map(|e| e.footprint.values_of(attribute))
            .collect()
    }

    pub fn attribute_map(&self, only: Option<&[String]>) -> AttributeMap {
        AttributeMap::build(&self.tag, &self.entries.read(), only)
    }

    /// Report of the most recent resolution on this collector.
    pub fn last_report(&self) -> Option<Report> {
        self.last.read().clone()
    }

    /// Why `candidate` lost the most recent resolution, if it was rejected.
    pub fn why_not(&self, candidate: &str) -> Option<CandidateReport> {
        self.last
            .read()
            .as_ref()
            .and_then(|r| r.why_not(candidate).cloned())
    }

    /// Load a new object described by `object`'s attributes updated with
    /// `extra`.
    pub fn clone_with(
        &self,
        object: &BoundObject,
        extra: &Description,
        context: &Context,
    ) -> Result<Arc<BoundObject>, LoadError> {
        let mut desc = object.attributes();
        for (k, v) in extra {
            desc.insert(k.clone(), v.clone());
        }
        self.load(&desc, context)
    }
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// All collectors of a process (or of a test).
pub struct Registry {
    collectors: RwLock<IndexMap<String, Arc<Collector>>>,
    options: RwLock<ResolveOptions>,
    seq: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            collectors: RwLock::new(IndexMap::new()),
            options: RwLock::new(ResolveOptions::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Set options for existing and future collectors.
    pub fn set_options(&self, options: ResolveOptions) {
        *self.options.write() = options;
        for collector in self.collectors.read().values() {
            collector.set_options(options);
        }
    }

    /// The collector for `tag`, created on first use.
    pub fn collector(&self, tag: &str) -> Arc<Collector> {
        if let Some(c) = self.collectors.read().get(tag) {
            return c.clone();
        }
        let options = *self.options.read();
        self.collectors
            .write()
            .entry(tag.to_string())
            .or_insert_with(|| Arc::new(Collector::with_options(tag, options)))
            .clone()
    }

    pub fn get(&self, tag: &str) -> Option<Arc<Collector>> {
        self.collectors.read().get(tag).cloned()
    }

    /// Tags in creation order.
    pub fn tags(&self) -> Vec<String> {
        self.collectors.read().keys().cloned().collect()
    }

    /// Merge `implementation`'s fragments and register it under `tags`.
    pub fn register<S: AsRef<str>>(&self, implementation: Arc<dyn Resolvable>, tags: &[S]) -> Result<(), RegisterError> {
        let footprint = merge(&implementation.fragments()).map_err(|source| RegisterError {
            candidate: implementation.name().to_string(),
            source,
        })?;
        self.register_footprint(implementation, footprint, tags)
    }

    /// Register `implementation` with an already merged footprint.
    pub fn register_footprint<S: AsRef<str>>(
        &self,
        implementation: Arc<dyn Resolvable>,
        footprint: Footprint,
        tags: &[S],
    ) -> Result<(), RegisterError> {
        let fail = |source| RegisterError {
            candidate: implementation.name().to_string(),
            source,
        };
        for tag in tags {
            let tag = tag.as_ref();
            if let Some(name) = footprint.all_keys().find(|k| *k == tag) {
                return Err(fail(FootprintError::TagCollision {
                    name: name.to_string(),
                    tag: tag.to_string(),
                }));
            }
        }
        if tags.is_empty() {
            tracing::warn!("`{}` declared without any tag", implementation.name());
        }

        let entry = RegistryEntry {
            implementation: implementation.clone(),
            footprint: Arc::new(footprint),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        for tag in tags {
            self.collector(tag.as_ref()).insert(entry.clone());
        }
        Ok(())
    }

    /// Register a declaration under its own tags.
    pub fn declare(&self, declaration: Declaration) -> Result<(), RegisterError> {
        let tags = declaration.tags().to_vec();
        self.register(Arc::new(declaration), tags.as_slice())
    }

    pub fn entries(&self, tag: &str) -> Vec<RegistryEntry> {
        self.get(tag).map(|c| c.entries()).unwrap_or_default()
    }

    pub fn resolve(&self, tag: &str, desc: &Description, context: &Context) -> Resolution {
        self.collector(tag).resolve(desc, context)
    }

    pub fn load(&self, tag: &str, desc: &Description, context: &Context) -> Result<Arc<BoundObject>, LoadError> {
        self.collector(tag).load(desc, context)
    }

    pub fn reuse_or_create(
        &self,
        tag: &str,
        desc: &Description,
        context: &Context,
    ) -> Result<Arc<BoundObject>, LoadError> {
        self.collector(tag).reuse_or_create(desc, context)
    }

    pub fn instances(&self, tag: &str) -> Vec<Arc<BoundObject>> {
        self.get(tag).map(|c| c.instances()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{description, AccessMode, AttributeDelta, Fragment};
    use crate::test_support::{apple, fruit_registry, pear};

    #[test]
    fn test_entries_keep_declaration_order() {
        let registry = fruit_registry();
        let names: Vec<_> = registry
            .entries("fruit")
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["apple", "pear", "wild"]);
        assert!(registry.entries("vegetable").is_empty());
    }

    #[test]
    fn test_registration_is_idempotent() {
        let registry = Registry::new();
        let shared: Arc<dyn Resolvable> = Arc::new(apple());
        registry.register(shared.clone(), &["fruit"]).unwrap();
        registry.register(shared, &["fruit"]).unwrap();
        registry.declare(apple()).unwrap();
        assert_eq!(registry.entries("fruit").len(), 1);
    }

    #[test]
    fn test_invalid_footprint_never_registers() {
        let registry = Registry::new();
        let bare = Declaration::new("bare")
            .tag("fruit")
            .fragment(Fragment::new().attr("producer", AttributeDelta::new().default_value("Jacques")));
        let err = registry.declare(bare.clone()).unwrap_err();
        assert_eq!(err.source, FootprintError::NoMandatoryAttribute);
        assert!(registry.entries("fruit").is_empty());

        registry.declare(bare.explicit(false)).unwrap();
        let obj = registry.load("fruit", &Description::new(), &Context::new()).unwrap();
        assert_eq!(obj.get("producer").unwrap(), Some(Value::from("Jacques")));
    }

    #[test]
    fn test_tag_collision() {
        let registry = Registry::new();
        let decl = Declaration::new("odd")
            .tag("colour")
            .fragment(Fragment::new().attr("colour", AttributeDelta::new()));
        let err = registry.declare(decl).unwrap_err();
        assert!(matches!(err.source, FootprintError::TagCollision { .. }));
    }

    #[test]
    fn test_multiple_tags_share_one_entry() {
        let registry = Registry::new();
        registry.declare(pear().tag("dessert")).unwrap();
        assert_eq!(registry.entries("fruit")[0].seq, registry.entries("dessert")[0].seq);
    }

    #[test]
    fn test_last_report_and_why_not() {
        let registry = fruit_registry();
        let fruit = registry.collector("fruit");
        fruit.resolve(&description([("colour", "red")]), &Context::new());
        let report = fruit.last_report().unwrap();
        assert_eq!(report.winner(), Some("apple"));
        let why = fruit.why_not("pear").unwrap();
        assert!(why.attributes.iter().any(|f| f.attribute == "colour"));
        assert!(fruit.why_not("apple").is_none());
    }

    #[test]
    fn test_values_of_and_attribute_map() {
        let registry = fruit_registry();
        let fruit = registry.collector("fruit");
        let colours: Vec<_> = fruit.values_of("colour").into_iter().map(|v| v.to_string()).collect();
        assert_eq!(colours, vec!["green", "red", "yellow"]);

        let map = fruit.attribute_map(None);
        assert!(map.attributes.contains_key("colour"));
        assert!(map.attributes.contains_key("producer [optional]"));
        let only = fruit.attribute_map(Some(&["origin".to_string()]));
        assert_eq!(only.attributes.len(), 1);
        assert!(only.to_string().contains("outcast: Ireland, Scotland"));
    }

    #[test]
    fn test_filter_levels() {
        let registry = fruit_registry();
        let fruit = registry.collector("fruit");
        let high: Vec<_> = fruit
            .filter_level("toolbox")
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(high, vec!["wild"]);
        assert_eq!(fruit.filter_below("toolbox").unwrap().len(), 2);
        assert!(fruit.filter_level("nope").is_err());
    }

    #[test]
    fn test_loaded_weak_attribute_is_released() {
        let registry = Registry::new();
        registry
            .declare(
                Declaration::new("hamper").tag("basket").fragment(
                    Fragment::new()
                        .attr("size", AttributeDelta::new())
                        .attr("basket", AttributeDelta::new().kind("shared").access(AccessMode::RXX.weak())),
                ),
            )
            .unwrap();
        let wicker = Arc::new(Value::from("wicker"));
        let desc = description([("size", Value::from("large")), ("basket", Value::Shared(wicker.clone()))]);

        let obj = registry.load("basket", &desc, &Context::new()).unwrap();
        assert_eq!(obj.get("basket").unwrap(), Some(Value::from("wicker")));
        assert_eq!(obj.payload::<Record>().unwrap().attributes["basket"], Value::from("wicker"));

        drop(desc);
        drop(wicker);
        assert_eq!(
            obj.get("basket"),
            Err(AccessError::ReleasedReference("basket".into()))
        );
        assert_eq!(obj.get("size").unwrap(), Some(Value::from("large")));
    }

    #[test]
    fn test_registration_is_serialized_with_resolution() {
        let registry = Arc::new(Registry::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        registry
                            .declare(
                                Declaration::new(format!("plum{}_{}", t, i))
                                    .tag("plum")
                                    .fragment(Fragment::new().attr("colour", AttributeDelta::new())),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let desc = description([("colour", "purple")]);
                    for _ in 0..25 {
                        let seen = registry.entries("plum").len();
                        let resolution = registry.resolve("plum", &desc, &Context::new());
                        assert!(resolution.ranked().len() >= seen);
                        if let Ok(obj) = registry.reuse_or_create("plum", &desc, &Context::new()) {
                            assert!(obj.implementation().starts_with("plum"));
                        }
                        let _ = registry.instances("plum");
                    }
                })
            })
            .collect();
        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let entries = registry.entries("plum");
        assert_eq!(entries.len(), 100);
        let seqs: BTreeSet<_> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs.len(), 100);
    }

    #[test]
    fn test_load_always_constructs() {
        let registry = fruit_registry();
        let desc = description([("colour", "red")]);
        let a = registry.load("fruit", &desc, &Context::new()).unwrap();
        let b = registry.load("fruit", &desc, &Context::new()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.instances("fruit").len(), 2);
        let record = a.payload::<Record>().unwrap();
        assert_eq!(record.name, "apple");
    }

    #[test]
    fn test_failed_resolution_leaves_cache_alone() {
        let registry = fruit_registry();
        let err = registry
            .reuse_or_create("fruit", &description([("colour", "blue")]), &Context::new())
            .unwrap_err();
        assert!(matches!(err, LoadError::NoMatch { .. }));
        assert_eq!(err.report().map(|r| r.rejected.len()), Some(3));
        assert!(registry.instances("fruit").is_empty());
    }

    #[test]
    fn test_grep_and_clone_with() {
        let registry = fruit_registry();
        let ctx = Context::new();
        let red = registry.load("fruit", &description([("colour", "red")]), &ctx).unwrap();
        let _yellow = registry.load("fruit", &description([("colour", "yellow")]), &ctx).unwrap();
        let fruit = registry.collector("fruit");

        let found = fruit.grep(&description([("colour", "red")]));
        assert_eq!(found.len(), 1);
        assert!(Arc::ptr_eq(&found[0], &red));

        let twin = fruit.clone_with(&red, &description([("producer", "Marcel")]), &ctx).unwrap();
        assert_eq!(twin.get("colour").unwrap(), Some(Value::from("red")));
        assert_eq!(twin.get("producer").unwrap(), Some(Value::from("Marcel")));
    }

    #[test]
    fn test_ambiguity_policy() {
        let registry = Registry::new();
        registry.declare(Declaration::new("a").tag("t").fragment(Fragment::new().attr("x", AttributeDelta::new()))).unwrap();
        registry.declare(Declaration::new("b").tag("t").fragment(Fragment::new().attr("x", AttributeDelta::new()))).unwrap();
        let desc = description([("x", "1")]);

        let obj = registry.load("t", &desc, &Context::new()).unwrap();
        assert_eq!(obj.implementation(), "a");

        registry.set_options(ResolveOptions {
            ambiguity: AmbiguityPolicy::Error,
            ..ResolveOptions::default()
        });
        let err = registry.load("t", &desc, &Context::new()).unwrap_err();
        assert!(matches!(err, LoadError::Ambiguous { ref candidates, .. } if candidates == &["a", "b"]));
    }

    #[test]
    fn test_global_registry_is_shared() {
        Registry::global()
            .declare(
                Declaration::new("global_plum")
                    .tag("collector_global")
                    .fragment(Fragment::new().attr("x", AttributeDelta::new())),
            )
            .unwrap();
        let collector = Registry::global().get("collector_global").unwrap();
        assert_eq!(collector.len(), 1);
        assert!(Registry::global().tags().contains(&"collector_global".to_string()));
    }
}
