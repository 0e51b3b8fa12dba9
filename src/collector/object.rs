//! Bound objects.
//!
//! A [`BoundObject`] is a constructed implementation plus the attribute
//! values it was resolved with. Attribute access after construction follows
//! each attribute's access mode; weak attributes keep a non-owning handle.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use miette::Diagnostic;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use crate::core::{AttributeSpec, Description, Footprint, Value};
use crate::resolver::{bind, AliasPolicy, Mode};

/// Opaque instance built by an implementation.
pub type Payload = Box<dyn Any + Send + Sync>;

/// Errors raised by attribute access on a bound object.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("attribute `{0}` is read-only")]
    #[diagnostic(code(footprints::access::read_only))]
    ReadOnly(String),

    #[error("attribute `{0}` cannot be deleted")]
    #[diagnostic(code(footprints::access::not_deletable))]
    NotDeletable(String),

    #[error("no attribute `{0}` in this footprint")]
    #[diagnostic(code(footprints::access::unknown_attribute))]
    UnknownAttribute(String),

    #[error("cannot set `{attribute}`: {reason}")]
    #[diagnostic(code(footprints::access::rejected))]
    Rejected { attribute: String, reason: String },

    #[error("the value held by weak attribute `{0}` has been released")]
    #[diagnostic(
        code(footprints::access::released_reference),
        help("keep the shared value alive for as long as the object reads it")
    )]
    ReleasedReference(String),
}

enum Slot {
    Owned(Value),
    Weak(Weak<Value>),
    Unset,
}

impl Slot {
    fn store(spec: &AttributeSpec, value: Value) -> Slot {
        match value {
            Value::Shared(arc) if spec.access.weak => Slot::Weak(Arc::downgrade(&arc)),
            other => Slot::Owned(other),
        }
    }
}

/// A constructed implementation and its attribute values.
pub struct BoundObject {
    implementation: String,
    tag: String,
    seq: u64,
    reusable: bool,
    footprint: Arc<Footprint>,
    slots: RwLock<IndexMap<String, Slot>>,
    payload: Payload,
}

impl BoundObject {
    pub(crate) fn new(
        implementation: &str,
        tag: &str,
        seq: u64,
        reusable: bool,
        footprint: Arc<Footprint>,
        bound: Description,
        payload: Payload,
    ) -> Self {
        let slots = footprint
            .attributes()
            .map(|spec| {
                let slot = match bound.get(&spec.name) {
                    Some(v) => Slot::store(spec, v.clone()),
                    None => Slot::Unset,
                };
                (spec.name.clone(), slot)
            })
            .collect();
        BoundObject {
            implementation: implementation.to_string(),
            tag: tag.to_string(),
            seq,
            reusable,
            footprint,
            slots: RwLock::new(slots),
            payload,
        }
    }

    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// The collector tag this object was resolved under.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Sequence number of the registry entry that built this object.
    pub fn entry_seq(&self) -> u64 {
        self.seq
    }

    pub fn reusable(&self) -> bool {
        self.reusable
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// The constructed instance, if it is a `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    fn spec(&self, name: &str) -> Result<&AttributeSpec, AccessError> {
        self.footprint
            .attribute(name)
            .ok_or_else(|| AccessError::UnknownAttribute(name.to_string()))
    }

    /// Read an attribute. Unset (deleted or never bound) attributes read as
    /// `None`.
    pub fn get(&self, name: &str) -> Result<Option<Value>, AccessError> {
        self.spec(name)?;
        let slots = self.slots.read();
        match slots.get(name) {
            Some(Slot::Owned(v)) => Ok(Some(v.clone())),
            Some(Slot::Weak(handle)) => handle
                .upgrade()
                .map(|arc| Some(Value::Shared(arc)))
                .ok_or_else(|| AccessError::ReleasedReference(name.to_string())),
            Some(Slot::Unset) | None => Ok(None),
        }
    }

    /// Replace an attribute value. The new value goes through the
    /// attribute's type coercion and `values`/`outcast` checks.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let spec = self.spec(name)?;
        if !spec.access.can_write() {
            return Err(AccessError::ReadOnly(name.to_string()));
        }
        let value = spec.kind.coerce(&value.into()).map_err(|reason| AccessError::Rejected {
            attribute: name.to_string(),
            reason,
        })?;
        spec.check(&value).map_err(|reason| AccessError::Rejected {
            attribute: name.to_string(),
            reason,
        })?;
        self.slots
            .write()
            .insert(name.to_string(), Slot::store(spec, value));
        Ok(())
    }

    /// Unset an attribute.
    pub fn delete(&self, name: &str) -> Result<(), AccessError> {
        let spec = self.spec(name)?;
        if !spec.access.can_delete() {
            return Err(AccessError::NotDeletable(name.to_string()));
        }
        self.slots.write().insert(name.to_string(), Slot::Unset);
        Ok(())
    }

    /// Current readable values, in footprint order. Unset attributes and
    /// released weak references are left out.
    pub fn attributes(&self) -> Description {
        let slots = self.slots.read();
        slots
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Owned(v) => Some((name.clone(), v.clone())),
                Slot::Weak(handle) => handle.upgrade().map(|arc| (name.clone(), Value::Shared(arc))),
                Slot::Unset => None,
            })
            .collect()
    }

    /// Whether every value in `values` equals the stored one.
    pub fn matches(&self, values: &Description) -> bool {
        values
            .iter()
            .all(|(name, want)| matches!(self.get(name), Ok(Some(have)) if have == *want))
    }

    /// Whether `desc` describes this object: every attribute `desc` names
    /// must bind and equal the stored value. Absent attributes are ignored.
    pub fn compatible_with(&self, desc: &Description, policy: AliasPolicy) -> bool {
        let binding = bind(&self.footprint, desc, Mode::Partial, policy);
        binding.is_complete() && self.matches(&binding.values)
    }
}

impl fmt::Debug for BoundObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundObject")
            .field("implementation", &self.implementation)
            .field("tag", &self.tag)
            .field("attributes", &self.attributes())
            .finish()
    }
}

/// Values handed to an implementation's constructor. Weak attributes are
/// peeled so the payload never holds a strong handle to their referent.
pub(crate) fn detach_weak(footprint: &Footprint, bound: &Description) -> Description {
    bound
        .iter()
        .map(|(name, value)| match footprint.attribute(name) {
            Some(spec) if spec.access.weak => (name.clone(), value.peel().clone()),
            _ => (name.clone(), value.clone()),
        })
        .collect()
}

/// Payload built for declarations without a factory: the bound values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub name: String,
    pub attributes: Description,
}
