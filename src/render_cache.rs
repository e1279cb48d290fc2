//! Small most-recently-used cache keyed by lattice node identity.
//!
//! Entries live in a fixed-capacity ring ordered from oldest to newest.
//! A hit near the old end is moved to the newest slot; an insert evicts
//! the oldest entry. Keys compare by node, never by descriptor, so two
//! distinct types that share a descriptor never alias.

use std::sync::Mutex;

use crate::type_lattice::{CompositeType, SurfaceType};

/// Hits within this many slots of the newest end are not promoted.
const PROMOTE_DISTANCE: usize = 4;

struct Entry<T> {
    src: SurfaceType,
    comp: CompositeType,
    dst: SurfaceType,
    value: T,
}

impl<T> Entry<T> {
    #[inline]
    fn matches(&self, src: &SurfaceType, comp: &CompositeType, dst: &SurfaceType) -> bool {
        self.src == *src && self.comp == *comp && self.dst == *dst
    }
}

/// Identity-keyed MRU cache. All operations lock an internal mutex.
pub struct RenderCache<T> {
    capacity: usize,
    entries: Mutex<Vec<Entry<T>>>,
}

impl<T: Clone> RenderCache<T> {
    /// A cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, src: &SurfaceType, comp: &CompositeType, dst: &SurfaceType) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let i = entries.iter().rposition(|e| e.matches(src, comp, dst))?;
        let value = entries[i].value.clone();
        if i + PROMOTE_DISTANCE < entries.len() {
            let e = entries.remove(i);
            entries.push(e);
        }
        Some(value)
    }

    /// Insert as the newest entry, evicting the oldest when full. A key
    /// already present is replaced.
    pub fn put(&self, src: &SurfaceType, comp: &CompositeType, dst: &SurfaceType, value: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(i) = entries.iter().position(|e| e.matches(src, comp, dst)) {
            entries.remove(i);
        } else if entries.len() == self.capacity {
            entries.remove(0);
        }
        entries.push(Entry {
            src: src.clone(),
            comp: comp.clone(),
            dst: dst.clone(),
            value,
        });
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl<T> std::fmt::Debug for RenderCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("RenderCache")
            .field("capacity", &self.capacity)
            .field("len", &len)
            .finish()
    }
}
