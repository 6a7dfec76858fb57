//! Capability-indexed element storage.

use std::rc::Rc;

use indexmap::IndexMap;
use skein_core::{Capability, ElementKey};

use crate::element::ElementHandle;

/// Keyed storage of simulation elements, bucketed by capability tag.
///
/// An element is inserted into the bucket of every capability it declares,
/// so a kind-lineage query is a single-bucket lookup: the `RESOURCE`
/// bucket holds every element declaring the resource capability, a user
/// kind bucket holds just that kind. Within a bucket, iteration follows
/// insertion order; re-registering an existing key overwrites the entry in
/// place.
#[derive(Default)]
pub struct ElementRegistry {
    buckets: IndexMap<Capability, IndexMap<ElementKey, ElementHandle>>,
}

impl ElementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element` under every capability it declares.
    pub fn register(&mut self, element: ElementHandle) {
        let (key, capabilities) = {
            let el = element.borrow();
            (el.key().clone(), el.capabilities().to_vec())
        };
        for capability in capabilities {
            self.buckets
                .entry(capability)
                .or_default()
                .insert(key.clone(), Rc::clone(&element));
        }
    }

    /// Look up one element by capability bucket and key.
    pub fn get_by_key(&self, capability: Capability, key: &ElementKey) -> Option<ElementHandle> {
        self.buckets
            .get(&capability)?
            .get(key)
            .map(Rc::clone)
    }

    /// All elements in a capability bucket, in insertion order.
    pub fn get_by_capability(&self, capability: Capability) -> Vec<ElementHandle> {
        self.buckets
            .get(&capability)
            .map(|bucket| bucket.values().map(Rc::clone).collect())
            .unwrap_or_default()
    }

    /// Number of elements in a capability bucket.
    pub fn count(&self, capability: Capability) -> usize {
        self.buckets.get(&capability).map_or(0, IndexMap::len)
    }
}
