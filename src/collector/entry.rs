//! Resolvable implementations and registry entries.

use std::fmt;
use std::sync::Arc;

use crate::collector::object::{Payload, Record};
use crate::core::{Description, Footprint, Fragment};
use crate::resolver::Candidate;

/// An implementation that can be registered and constructed.
///
/// The footprint is declared, never inferred: [`fragments`] returns the
/// partial footprints to merge, ancestors first and the implementation's
/// own fragment last.
///
/// [`fragments`]: Resolvable::fragments
pub trait Resolvable: Send + Sync {
    /// Unique implementation name within a collector.
    fn name(&self) -> &str;

    fn fragments(&self) -> Vec<Fragment>;

    /// Whether existing instances may be handed out again.
    fn reusable(&self) -> bool {
        true
    }

    /// Build an instance from the bound attribute values.
    fn construct(&self, attributes: &Description) -> anyhow::Result<Payload>;
}

type Factory = Arc<dyn Fn(&Description) -> anyhow::Result<Payload> + Send + Sync>;

/// Builder-style [`Resolvable`].
#[derive(Clone)]
pub struct Declaration {
    name: String,
    tags: Vec<String>,
    fragments: Vec<Fragment>,
    explicit: Option<bool>,
    reusable: bool,
    factory: Option<Factory>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Declaration {
            name: name.into(),
            tags: Vec::new(),
            fragments: Vec::new(),
            explicit: None,
            reusable: true,
            factory: None,
        }
    }

    /// Add a collector tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Append a fragment. Fragments merge in the order they are added.
    pub fn fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Override `explicit` after every fragment.
    pub fn explicit(mut self, explicit: bool) -> Self {
        self.explicit = Some(explicit);
        self
    }

    pub fn reusable(mut self, reusable: bool) -> Self {
        self.reusable = reusable;
        self
    }

    /// Construct payloads with `factory` instead of a [`Record`].
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Description) -> anyhow::Result<Payload> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Resolvable for Declaration {
    fn name(&self) -> &str {
        &self.name
    }

    fn fragments(&self) -> Vec<Fragment> {
        let mut fragments = self.fragments.clone();
        if let Some(explicit) = self.explicit {
            fragments.push(Fragment::new().explicit(explicit));
        }
        fragments
    }

    fn reusable(&self) -> bool {
        self.reusable
    }

    fn construct(&self, attributes: &Description) -> anyhow::Result<Payload> {
        match &self.factory {
            Some(factory) => factory(attributes),
            None => Ok(Box::new(Record {
                name: self.name.clone(),
                attributes: attributes.clone(),
            })),
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("fragments", &self.fragments.len())
            .field("reusable", &self.reusable)
            .finish()
    }
}

/// One implementation registered under one tag.
#[derive(Clone)]
pub struct RegistryEntry {
    pub implementation: Arc<dyn Resolvable>,
    pub footprint: Arc<Footprint>,
    /// Registration order, shared by all tags of one registration.
    pub seq: u64,
}

impl RegistryEntry {
    pub fn name(&self) -> &str {
        self.implementation.name()
    }
}

impl Candidate for RegistryEntry {
    fn name(&self) -> &str {
        self.implementation.name()
    }

    fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name())
            .field("priority", self.footprint.priority())
            .field("seq", &self.seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{description, merge, AttributeDelta};

    #[test]
    fn test_explicit_override_merges_last() {
        let decl = Declaration::new("bare")
            .fragment(Fragment::new().attr("producer", AttributeDelta::new().default_value("Jacques")))
            .explicit(false);
        let fragments = decl.fragments();
        assert_eq!(fragments.len(), 2);
        assert!(merge(&fragments).is_ok());
    }

    #[test]
    fn test_default_payload_is_record() {
        let decl = Declaration::new("apple");
        let payload = decl.construct(&description([("colour", "red")])).unwrap();
        let record = payload.downcast_ref::<Record>().unwrap();
        assert_eq!(record.name, "apple");
        assert_eq!(record.attributes["colour"], crate::core::Value::from("red"));
    }

    #[test]
    fn test_custom_factory() {
        let decl = Declaration::new("counter").factory(|attrs| Ok(Box::new(attrs.len()) as Payload));
        let payload = decl.construct(&description([("a", 1), ("b", 2)])).unwrap();
        assert_eq!(payload.downcast_ref::<usize>(), Some(&2));
    }
}
