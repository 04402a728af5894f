//! Chained hash table keyed by owned strings.
//!
//! Buckets are a power-of-two `Vec` of small entry vectors, so the bucket index is
//! `djb2(key) & (capacity - 1)`. The table doubles and rehashes every live entry
//! before an insert would push the load factor past 0.75.
//!
//! Allocation failure is not reported as an error: like every `Vec` growth in the
//! process, it aborts. A corpus that does not fit in memory cannot be indexed.
//!
//! Nothing in here is synchronized. Callers that share a table across threads wrap
//! it in a lock for mutation and only hand out shared references once it is frozen.

use std::fmt;

pub const DEFAULT_CAPACITY: usize = 256;
/// Bucket count given to an unallocated table on its first insert.
pub const MIN_CAPACITY: usize = 16;
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

/// djb2 over raw bytes: `hash = hash * 33 + byte`, seeded with 5381.
#[inline]
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(5381u64, |h, &b| (h << 5).wrapping_add(h).wrapping_add(b as u64))
}

#[derive(Clone)]
struct Entry<V> {
    key: Box<str>,
    hash: u64,
    value: V,
}

/// String-keyed table with at most one entry per byte-exact key.
#[derive(Clone)]
pub struct StrTable<V> {
    buckets: Vec<Vec<Entry<V>>>,
    len: usize,
}

/// Term to weight map. Holds raw counts or TF-IDF weights depending on the
/// build phase that last touched it.
pub type TermMap = StrTable<f64>;

impl<V> Default for StrTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StrTable<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` is rounded up to a power of two (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.max(1).next_power_of_two();
        let mut buckets = Vec::with_capacity(cap);
        buckets.resize_with(cap, Vec::new);
        Self { buckets, len: 0 }
    }

    /// A table with no buckets at all. Per-document maps start like this so that
    /// empty documents cost nothing; the first insert allocates `MIN_CAPACITY`.
    pub fn unallocated() -> Self {
        Self { buckets: Vec::new(), len: 0 }
    }

    /// Number of buckets. Zero for an unallocated table.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn slot(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn find(&self, key: &str, hash: u64) -> Option<&Entry<V>> {
        if self.buckets.is_empty() {
            return None;
        }
        self.buckets[self.slot(hash)]
            .iter()
            .find(|e| e.hash == hash && e.key.as_bytes() == key.as_bytes())
    }

    fn find_mut(&mut self, key: &str, hash: u64) -> Option<&mut Entry<V>> {
        if self.buckets.is_empty() {
            return None;
        }
        let slot = self.slot(hash);
        self.buckets[slot]
            .iter_mut()
            .find(|e| e.hash == hash && e.key.as_bytes() == key.as_bytes())
    }

    fn grow_if_needed(&mut self) {
        if self.buckets.is_empty() {
            self.rehash(MIN_CAPACITY);
        } else if (self.len + 1) * MAX_LOAD_DEN > self.buckets.len() * MAX_LOAD_NUM {
            self.rehash(self.buckets.len() << 1);
        }
    }

    fn rehash(&mut self, new_cap: usize) {
        debug_assert!(new_cap.is_power_of_two());
        let mut buckets: Vec<Vec<Entry<V>>> = Vec::with_capacity(new_cap);
        buckets.resize_with(new_cap, Vec::new);
        for entry in self.buckets.drain(..).flatten() {
            let slot = (entry.hash as usize) & (new_cap - 1);
            buckets[slot].push(entry);
        }
        self.buckets = buckets;
    }

    fn insert_new(&mut self, key: &str, hash: u64, value: V) -> &mut V {
        self.grow_if_needed();
        let slot = self.slot(hash);
        let bucket = &mut self.buckets[slot];
        bucket.push(Entry { key: key.into(), hash, value });
        self.len += 1;
        let last = bucket.len() - 1;
        &mut bucket[last].value
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.find(key, djb2(key.as_bytes())).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.find_mut(key, djb2(key.as_bytes())).map(|e| &mut e.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `value` unless `key` is already present. First write wins.
    /// Returns `true` when a new entry was created.
    pub fn set_if_absent(&mut self, key: &str, value: V) -> bool {
        let hash = djb2(key.as_bytes());
        if self.find(key, hash).is_some() {
            return false;
        }
        self.insert_new(key, hash, value);
        true
    }

    /// Overwrites the value for `key`, inserting it if needed.
    pub fn set(&mut self, key: &str, value: V) {
        let hash = djb2(key.as_bytes());
        match self.find_mut(key, hash) {
            Some(e) => e.value = value,
            None => {
                self.insert_new(key, hash, value);
            }
        }
    }

    /// Returns the value for `key`, inserting `init()` first if absent.
    pub fn get_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let hash = djb2(key.as_bytes());
        if !self.buckets.is_empty() {
            let slot = self.slot(hash);
            if let Some(pos) = self.buckets[slot]
                .iter()
                .position(|e| e.hash == hash && e.key.as_bytes() == key.as_bytes())
            {
                return &mut self.buckets[slot][pos].value;
            }
        }
        self.insert_new(key, hash, init())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.buckets.iter().flatten().map(|e| &*e.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.buckets.iter().flatten().map(|e| (&*e.key, &e.value))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.buckets.iter_mut().flatten().map(|e| &mut e.value)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> + '_ {
        self.buckets
            .iter_mut()
            .flatten()
            .map(|e| (&*e.key, &mut e.value))
    }
}

impl<V: Clone> StrTable<V> {
    /// Idempotent union: keys already in `self` keep their value.
    pub fn merge_ignore(&mut self, src: &StrTable<V>) {
        for (key, value) in src.iter() {
            self.set_if_absent(key, value.clone());
        }
    }
}

impl StrTable<f64> {
    /// `value += delta`, inserting `delta` for a new key.
    pub fn increment(&mut self, key: &str, delta: f64) {
        *self.get_or_insert_with(key, || 0.0) += delta;
    }

    /// Additive union: shared keys have their values summed.
    pub fn merge_add(&mut self, src: &TermMap) {
        for (key, value) in src.iter() {
            self.increment(key, *value);
        }
    }

    /// Euclidean norm of the stored values.
    pub fn norm(&self) -> f64 {
        self.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }
}

impl<V: fmt::Debug> fmt::Debug for StrTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_matches_reference_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 5381 * 33 + 97);
    }

    #[test]
    fn first_write_wins_for_set_if_absent() {
        let mut m = TermMap::new();
        assert!(m.set_if_absent("cat", 1.0));
        assert!(!m.set_if_absent("cat", 9.0));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("cat"), Some(&1.0));
    }

    #[test]
    fn increment_accumulates() {
        let mut m = TermMap::new();
        m.increment("dog", 1.0);
        m.increment("dog", 1.0);
        m.increment("dog", 0.5);
        assert_eq!(m.get("dog"), Some(&2.5));
    }

    #[test]
    fn get_distinguishes_missing_from_zero() {
        let mut m = TermMap::new();
        m.set("zero", 0.0);
        assert_eq!(m.get("zero"), Some(&0.0));
        assert_eq!(m.get("absent"), None);
    }

    #[test]
    fn merge_add_sums_shared_keys() {
        let mut a = TermMap::new();
        a.set("x", 2.0);
        a.set("only_a", 1.0);
        let mut b = TermMap::new();
        b.set("x", 3.0);
        b.set("only_b", 4.0);
        a.merge_add(&b);
        assert_eq!(a.get("x"), Some(&5.0));
        assert_eq!(a.get("only_a"), Some(&1.0));
        assert_eq!(a.get("only_b"), Some(&4.0));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn merge_ignore_keeps_existing_values() {
        let mut a = TermMap::new();
        a.set("x", 2.0);
        let mut b = TermMap::new();
        b.set("x", 3.0);
        b.set("y", 7.0);
        a.merge_ignore(&b);
        assert_eq!(a.get("x"), Some(&2.0));
        assert_eq!(a.get("y"), Some(&7.0));
    }

    #[test]
    fn resizes_keep_every_entry() {
        let mut m = TermMap::with_capacity(16);
        let n = 1000;
        for i in 0..n {
            m.set(&format!("term{i}"), i as f64);
        }
        assert!(m.capacity() >= 16 << 3, "expected at least three doublings");
        assert!(m.capacity().is_power_of_two());
        assert_eq!(m.len(), n);
        assert_eq!(m.keys().count(), n);
        for i in 0..n {
            let k = format!("term{i}");
            assert!(m.contains(&k));
            assert_eq!(m.get(&k), Some(&(i as f64)));
        }
        assert!(!m.contains("never-inserted"));
    }

    #[test]
    fn load_factor_stays_bounded() {
        let mut m = TermMap::with_capacity(4);
        for i in 0..100 {
            m.increment(&i.to_string(), 1.0);
            assert!(m.len() * 4 <= m.capacity() * 3);
        }
    }

    #[test]
    fn keys_are_byte_exact() {
        let mut m = TermMap::new();
        m.increment("Cat", 1.0);
        m.increment("cat", 1.0);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn unallocated_table_allocates_on_first_insert() {
        let mut m = TermMap::unallocated();
        assert_eq!(m.capacity(), 0);
        assert!(!m.contains("x"));
        assert_eq!(m.keys().count(), 0);
        m.increment("x", 1.0);
        assert_eq!(m.capacity(), MIN_CAPACITY);
        assert_eq!(m.get("x"), Some(&1.0));
    }

    #[test]
    fn norm_of_empty_map_is_zero() {
        assert_eq!(TermMap::new().norm(), 0.0);
    }
}
