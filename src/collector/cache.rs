//! Instance cache.
//!
//! Tracks constructed objects without owning them: entries are weak and are
//! pruned whenever the cache is read or grows.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::collector::object::BoundObject;

#[derive(Default)]
pub struct InstanceCache {
    items: Mutex<Vec<Weak<BoundObject>>>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, object: &Arc<BoundObject>) {
        let mut items = self.items.lock();
        items.retain(|weak| weak.strong_count() > 0);
        items.push(Arc::downgrade(object));
    }

    /// Live objects in construction order.
    pub fn live(&self) -> Vec<Arc<BoundObject>> {
        let mut items = self.items.lock();
        let mut live = Vec::with_capacity(items.len());
        items.retain(|weak| match weak.upgrade() {
            Some(object) => {
                live.push(object);
                true
            }
            None => false,
        });
        live
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
