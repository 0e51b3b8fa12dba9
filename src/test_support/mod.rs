//! Test utilities for footprints unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::fruit_registry;
//!
//! #[test]
//! fn test_example() {
//!     let registry = fruit_registry();
//!     let apple = registry.load("fruit", &description([("colour", "red")]), &Context::new());
//! }
//! ```

pub mod fixtures;

use std::path::PathBuf;

use tempfile::TempDir;

use crate::collector::Registry;

// Re-export fixtures for convenience
pub use fixtures::*;

/// A fresh registry holding apple, pear and wild under `fruit`.
pub fn fruit_registry() -> Registry {
    let registry = Registry::new();
    for decl in [apple(), pear(), wild()] {
        registry.declare(decl).expect("fruit fixture registers");
    }
    registry
}

/// Write `content` as `catalog.toml` in a fresh temp dir.
///
/// The returned `TempDir` must be kept alive while the path is used.
pub fn write_catalog(content: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("temp dir");
    let path = tmp.path().join("catalog.toml");
    std::fs::write(&path, content).expect("write catalog");
    (tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::open_registry;
    use crate::util::Config;

    #[test]
    fn test_catalog_matches_builders() {
        let (_tmp, path) = write_catalog(ORCHARD_CATALOG);
        let from_catalog = open_registry(&path, &Config::default()).unwrap();
        let built = fruit_registry();

        let a = from_catalog.entries("fruit");
        let b = built.entries("fruit");
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.name(), y.name());
            assert_eq!(x.footprint.priority(), y.footprint.priority());
            assert_eq!(x.footprint.info(), y.footprint.info());
            assert_eq!(x.implementation.reusable(), y.implementation.reusable());
            let xs: Vec<_> = x.footprint.attributes().map(|s| s.name.clone()).collect();
            let ys: Vec<_> = y.footprint.attributes().map(|s| s.name.clone()).collect();
            assert_eq!(xs, ys);
        }
    }
}
