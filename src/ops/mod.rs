//! High-level operations.
//!
//! This module contains the implementation of `fp` commands.

pub mod catalog;
pub mod resolve;

pub use catalog::{convert_value, Catalog, CatalogCandidate, CatalogError};
pub use resolve::{entries, instantiate, open_registry, resolve, EntrySummary, ResolveOutcome, ResolveRequest};
