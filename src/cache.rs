//! Fixed capacity least-recently-used store.
//!
//! Entries live in a [`Slab`] and are threaded on an intrusive doubly linked list
//! ordered by recency, so lookup, promotion and eviction are all O(1).

use crate::octree::{Node, NodePath};
use slab::Slab;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache of decoded nodes shared by every query generation.
pub type NodeCache = LruCache<NodePath, Arc<Node>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub capacity: usize,
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f64 / self.capacity as f64
        }
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    /// towards the most recently used end
    prev: Option<usize>,
    /// towards the least recently used end
    next: Option<usize>,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: NonZeroUsize,
    lookup: HashMap<K, usize>,
    entries: Slab<Entry<K, V>>,
    /// most recently used
    front: Option<usize>,
    /// least recently used
    back: Option<usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            lookup: HashMap::new(),
            entries: Slab::new(),
            front: None,
            back: None,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look `key` up and mark it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&index) = self.lookup.get(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        self.move_to_front(index);
        Some(&self.entries[index].value)
    }

    /// Look `key` up without touching its recency or the statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup.get(key).map(|&index| &self.entries[index].value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup.contains_key(key)
    }

    /// Insert or replace `key`, making it most recently used.
    ///
    /// Returns the entry evicted to stay within capacity, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&index) = self.lookup.get(&key) {
            self.entries[index].value = value;
            self.move_to_front(index);
            return None;
        }

        let index = self.entries.insert(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.lookup.insert(key, index);
        self.push_front(index);

        let mut evicted = None;
        while self.entries.len() > self.capacity.get() {
            evicted = self.pop_back();
        }
        evicted
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.lookup.remove(key)?;
        self.unlink(index);
        Some(self.entries.remove(index).value)
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
        self.entries.clear();
        self.front = None;
        self.back = None;
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        std::iter::successors(self.front, |&index| self.entries[index].next)
            .map(|index| &self.entries[index].key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity(),
            len: self.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn pop_back(&mut self) -> Option<(K, V)> {
        let index = self.back?;
        self.unlink(index);
        let entry = self.entries.remove(index);
        self.lookup.remove(&entry.key);
        self.evictions += 1;
        Some((entry.key, entry.value))
    }

    fn move_to_front(&mut self, index: usize) {
        if self.front == Some(index) {
            return;
        }
        self.unlink(index);
        self.push_front(index);
    }

    fn push_front(&mut self, index: usize) {
        let old_front = self.front;
        {
            let entry = &mut self.entries[index];
            entry.prev = None;
            entry.next = old_front;
        }
        match old_front {
            Some(front) => self.entries[front].prev = Some(index),
            None => self.back = Some(index),
        }
        self.front = Some(index);
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let entry = &mut self.entries[index];
            (entry.prev.take(), entry.next.take())
        };
        match prev {
            Some(prev) => self.entries[prev].next = next,
            None => self.front = next,
        }
        match next {
            Some(next) => self.entries[next].prev = prev,
            None => self.back = prev,
        }
    }
}
