//! Single-threaded LRU core.
//!
//! Entries live in a slot arena addressed by stable indices; the recency list
//! is threaded through the slots with `prev`/`next` indices instead of
//! pointers, so recency updates and eviction are O(1) without `unsafe`.
//!
//! ```text
//!   index: HashMap<String, usize>
//!
//!   head ──► [slot 2] ◄──► [slot 0] ◄──► [slot 1] ◄── tail
//!             MRU                          LRU
//! ```
//!
//! Each touch also stamps the entry with a strictly increasing sequence
//! number, so the recency order is a total order with no ties.

use std::collections::HashMap;

/// One cached response.
#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
    /// Logical recency marker; larger is more recent.
    last_access: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Result of an insert.
#[derive(Debug, PartialEq, Eq)]
pub enum Insert {
    /// The key was new and there was room.
    Added,
    /// The key existed; its value was replaced.
    Replaced,
    /// The key was new and the least recently used key was evicted for it.
    Evicted(String),
}

/// Capacity-bounded recency list. Not thread-safe; see [`super::Cache`].
#[derive(Debug)]
pub struct LruCore<V> {
    capacity: usize,
    index: HashMap<String, usize>,
    slots: Vec<Entry<V>>,
    head: Option<usize>,
    tail: Option<usize>,
    clock: u64,
}

impl<V: Clone> LruCore<V> {
    /// Create an empty core. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a key and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let slot = *self.index.get(key)?;
        self.touch(slot);
        Some(self.slots[slot].value.clone())
    }

    /// Insert or replace a value, evicting the LRU entry when full.
    pub fn insert(&mut self, key: String, value: V) -> Insert {
        if let Some(&slot) = self.index.get(&key) {
            self.slots[slot].value = value;
            self.touch(slot);
            return Insert::Replaced;
        }

        let stamp = self.tick();

        if self.index.len() < self.capacity {
            let slot = self.slots.len();
            self.slots.push(Entry {
                key: key.clone(),
                value,
                last_access: stamp,
                prev: None,
                next: None,
            });
            self.index.insert(key, slot);
            self.push_front(slot);
            return Insert::Added;
        }

        // Full: reuse the tail slot for the new entry.
        let Some(slot) = self.tail else {
            unreachable!("a full cache always has a tail");
        };
        self.unlink(slot);
        let entry = &mut self.slots[slot];
        let evicted = std::mem::replace(&mut entry.key, key.clone());
        entry.value = value;
        entry.last_access = stamp;
        self.index.remove(&evicted);
        self.index.insert(key, slot);
        self.push_front(slot);
        Insert::Evicted(evicted)
    }

    /// Keys ordered from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            keys.push(self.slots[slot].key.clone());
            cursor = self.slots[slot].next;
        }
        keys
    }

    /// Recency stamp of a key, without touching it.
    pub fn last_access(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&slot| self.slots[slot].last_access)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, slot: usize) {
        self.slots[slot].last_access = self.tick();
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[slot].prev = None;
        self.slots[slot].next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
