//! footprints - declarative capability resolution
//!
//! Implementations declare a footprint: the attributes they accept, with
//! types, allowed values, defaults and aliases. Given a capability tag and
//! a runtime description, the registry picks the best implementation and
//! binds the description onto it, reporting why every other candidate
//! was rejected.

pub mod collector;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Shared fruit fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::collector::{BoundObject, Collector, Declaration, LoadError, Registry, Resolvable};
pub use crate::core::{description, Context, Description, Footprint, FootprintError, Fragment, Value};
pub use crate::resolver::{resolve, Report, Resolution};
