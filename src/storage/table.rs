//! Bucketed Hash Table
//!
//! The storage layout behind [`ExpiringMap`](crate::ExpiringMap): an array of
//! buckets, each an insertion-ordered `Vec` of entries. A key lives in the
//! bucket `hash(key) % bucket_count`; collisions are resolved by scanning the
//! bucket linearly, which stays cheap because the table doubles whenever the
//! load factor is exceeded.
//!
//! ```text
//! buckets[0] ─> [ (k3, v, t) ]
//! buckets[1] ─> [ ]
//! buckets[2] ─> [ (k1, v, t), (k9, v, t) ]
//!   ...
//! buckets[n] ─> [ (k4, v, t) ]
//! ```
//!
//! Nothing in here locks. The table is always accessed through the single
//! mutex owned by the map, and every method assumes that lock is held.

use super::entry::Entry;
use std::borrow::Borrow;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::mem;
use std::time::{Duration, Instant};
use tracing::trace;

type Bucket<K, V> = Vec<Entry<K, V>>;

/// Cumulative operation counters, updated under the table lock.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub puts: u64,
    pub gets: u64,
    pub hits: u64,
    pub removes: u64,
    pub expired: u64,
    pub resizes: u64,
}

/// Fixed-size bucket array that doubles when it gets too full.
#[derive(Debug)]
pub(crate) struct BucketTable<K, V> {
    buckets: Vec<Bucket<K, V>>,

    /// Number of stored entries, expired-but-unswept ones included
    len: usize,

    load_factor: f64,

    pub counters: Counters,
}

fn empty_buckets<K, V>(count: usize) -> Vec<Bucket<K, V>> {
    (0..count).map(|_| Vec::new()).collect()
}

impl<K, V> BucketTable<K, V> {
    pub fn new(initial_buckets: usize, load_factor: f64) -> Self {
        Self {
            buckets: empty_buckets(initial_buckets.max(1)),
            len: 0,
            load_factor,
            counters: Counters::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl<K, V> BucketTable<K, V>
where
    K: Hash + Eq,
{
    /// Determines which bucket a key belongs to under `bucket_count` buckets.
    #[inline]
    fn bucket_index<Q>(key: &Q, bucket_count: usize) -> usize
    where
        Q: Hash + ?Sized,
    {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % bucket_count
    }

    #[inline]
    fn index_of<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        Self::bucket_index(key, self.buckets.len())
    }

    /// Position of `key` inside bucket `index`, expired or not.
    #[inline]
    fn position<Q>(&self, index: usize, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.buckets[index]
            .iter()
            .position(|entry| entry.key.borrow() == key)
    }

    /// Inserts or refreshes `key`.
    ///
    /// Returns `true` if a new entry was created. An existing entry keeps its
    /// slot and has its value and deadline overwritten.
    pub fn insert(&mut self, key: K, value: V, now: Instant, ttl: Duration) -> bool {
        self.counters.puts += 1;

        let index = self.index_of(&key);
        if let Some(pos) = self.position(index, &key) {
            self.buckets[index][pos].refresh(value, now, ttl);
            return false;
        }

        self.buckets[index].push(Entry::new(key, value, now, ttl));
        self.len += 1;

        if self.len as f64 > self.load_factor * self.buckets.len() as f64 {
            self.resize();
        }

        true
    }

    /// Finds the live entry for `key`.
    ///
    /// This implements "lazy expiry": an entry found past its deadline is
    /// dropped on the spot and reported as missing.
    pub fn live_entry<Q>(&mut self, key: &Q, now: Instant) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.index_of(key);
        let pos = self.position(index, key)?;

        if self.buckets[index][pos].is_expired_at(now) {
            self.buckets[index].remove(pos);
            self.len -= 1;
            self.counters.expired += 1;
            return None;
        }

        Some(&self.buckets[index][pos])
    }

    /// Removes `key`, expired or not.
    ///
    /// Returns the removed entry. The entry count only moves when something
    /// was actually removed.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counters.removes += 1;

        let index = self.index_of(key);
        let pos = self.position(index, key)?;
        let entry = self.buckets[index].remove(pos);
        self.len -= 1;
        Some(entry)
    }

    /// Drops every entry whose deadline is at or before `now`.
    ///
    /// Returns the number of entries removed. Never resizes.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;

        for bucket in &mut self.buckets {
            let before = bucket.len();
            bucket.retain(|entry| !entry.is_expired_at(now));
            removed += before - bucket.len();
        }

        self.len -= removed;
        self.counters.expired += removed as u64;
        removed
    }

    /// Drops every entry. The bucket count is kept.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Doubles the bucket count and redistributes every entry.
    ///
    /// Entries are moved as-is: deadlines are not recomputed and expired
    /// entries are not filtered out.
    fn resize(&mut self) {
        let new_count = self.buckets.len() * 2;
        let old = mem::replace(&mut self.buckets, empty_buckets(new_count));

        for entry in old.into_iter().flatten() {
            let index = Self::bucket_index(&entry.key, new_count);
            self.buckets[index].push(entry);
        }

        self.counters.resizes += 1;
        trace!(buckets = new_count, entries = self.len, "Table resized");
    }

    #[cfg(test)]
    fn peek<Q>(&self, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.index_of(key);
        self.position(index, key).map(|pos| &self.buckets[index][pos])
    }

    /// Asserts the structural invariants of the table.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut total = 0;
        for (i, bucket) in self.buckets.iter().enumerate() {
            for (pos, entry) in bucket.iter().enumerate() {
                assert_eq!(self.index_of(&entry.key), i, "entry in wrong bucket");
                assert!(
                    !bucket[pos + 1..].iter().any(|other| other.key == entry.key),
                    "duplicate key in bucket {}",
                    i
                );
            }
            total += bucket.len();
        }
        assert_eq!(total, self.len, "entry count out of sync");
    }
}
