//! Small least-recently-used cache of smoothed volume copies.

use std::collections::VecDeque;
use std::sync::Arc;

/// Fixed-capacity LRU keyed by a quantized smoothing scale.
///
/// The front holds the most recently used entry; inserting past capacity
/// evicts the back.
#[derive(Debug)]
pub(crate) struct SmoothingCache<T> {
    capacity: usize,
    entries: VecDeque<(u32, Arc<T>)>,
}

impl<T> SmoothingCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Look up `key`, marking it as most recently used.
    pub fn get(&mut self, key: u32) -> Option<Arc<T>> {
        let position = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(position)?;
        let value = entry.1.clone();
        self.entries.push_front(entry);
        Some(value)
    }

    pub fn insert(&mut self, key: u32, value: Arc<T>) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push_front((key, value));
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn contains(&self, key: u32) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_order() {
        let mut cache = SmoothingCache::new(2);
        cache.insert(1, Arc::new("one"));
        cache.insert(2, Arc::new("two"));
        // touch 1 so that 2 becomes the oldest
        assert_eq!(cache.get(1).as_deref(), Some(&"one"));
        cache.insert(3, Arc::new("three"));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut cache = SmoothingCache::new(5);
        cache.insert(7, Arc::new(1));
        cache.insert(7, Arc::new(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(7).as_deref(), Some(&2));
        assert!(cache.get(8).is_none());
    }
}
