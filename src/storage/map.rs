//! Thread-Safe Expiring Map
//!
//! This module implements [`ExpiringMap`], a concurrent key-value map where
//! every entry carries its own time-to-live.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: The whole table (buckets, entry count, counters) sits
//!    behind a single `Mutex`. Every operation, resize and sweep included,
//!    runs under it, so all operations are linearizable.
//! 2. **Lazy Expiry**: Reads check the deadline and drop expired entries.
//! 3. **Active Expiry**: A [`Reclaimer`] sweeps the table periodically so
//!    write-once keys do not leak.
//! 4. **Monotonic Clock**: Deadlines are `Instant`s, immune to wall-clock
//!    adjustments.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ caller 1 │ │ caller 2 │ │ caller N │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      │            │            │
//!      ▼            ▼            ▼
//! ┌─────────────────────────────────────┐      ┌──────────────┐
//! │        Mutex<BucketTable>           │◄─────│  Reclaimer   │
//! │  [b0] [b1] [b2] ... [bN]  len       │ Weak │  (own thread)│
//! └─────────────────────────────────────┘      └──────────────┘
//! ```

use super::entry::ttl_from_millis;
use super::reclaimer::{Reclaimer, Sweep};
use super::table::BucketTable;
use crate::config::MapConfig;
use crate::error::Result;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// State shared between the map handle and the reclaimer.
struct Shared<K, V> {
    table: Mutex<BucketTable<K, V>>,
}

impl<K, V> Shared<K, V> {
    /// Acquires the table lock.
    ///
    /// The lock can only be poisoned by a panic inside a caller's
    /// `Hash`/`Eq`/`Clone` impl. The guard is recovered instead of spreading
    /// that panic to every other thread.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, BucketTable<K, V>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Sweep for Shared<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Send + 'static,
{
    fn sweep(&self) -> usize {
        let mut table = self.lock();
        table.purge_expired(Instant::now())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// A concurrent map whose entries expire individually.
///
/// Share it across threads by wrapping it in an `Arc`. All operations are
/// thread-safe and none of them fail.
///
/// # Example
///
/// ```
/// use expiremap::ExpiringMap;
/// use std::time::Duration;
///
/// let map = ExpiringMap::new().unwrap();
///
/// map.put("session", "token123", Duration::from_secs(60));
/// assert_eq!(map.get("session"), Some("token123"));
///
/// // Zero and negative millisecond ttls store an already-expired entry
/// map.put_millis("stale", "gone", -1);
/// assert_eq!(map.get("stale"), None);
/// ```
pub struct ExpiringMap<K, V> {
    shared: Arc<Shared<K, V>>,
    reclaimer: Option<Reclaimer>,
}

impl<K, V> std::fmt::Debug for ExpiringMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.shared.lock();
        f.debug_struct("ExpiringMap")
            .field("len", &table.len())
            .field("buckets", &table.bucket_count())
            .field("reclaimer", &self.reclaimer.is_some())
            .finish()
    }
}

impl<K, V> ExpiringMap<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Send + 'static,
{
    /// Creates a map with 16 buckets, a 0.75 load factor and a background
    /// sweep every second.
    pub fn new() -> Result<Self> {
        Self::with_config(MapConfig::default())
    }

    /// Creates a map with custom configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is out of range or the reclaimer thread
    /// cannot be spawned.
    pub fn with_config(config: MapConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            table: Mutex::new(BucketTable::new(
                config.initial_buckets,
                config.load_factor,
            )),
        });

        let reclaimer = if config.reclaimer {
            let weak: Weak<Shared<K, V>> = Arc::downgrade(&shared);
            Some(Reclaimer::start(weak, config.sweep_period)?)
        } else {
            None
        };

        Ok(Self { shared, reclaimer })
    }

    /// Stores `value` under `key` for `ttl`.
    ///
    /// If the key already exists its value and deadline are overwritten;
    /// this does not count as a new entry. A zero `ttl` stores an entry that
    /// is already expired.
    pub fn put(&self, key: K, value: V, ttl: Duration) {
        let mut table = self.shared.lock();
        table.insert(key, value, Instant::now(), ttl);
    }

    /// Stores `value` under `key` for `ttl_ms` milliseconds.
    ///
    /// Zero or negative values store an entry that is already expired: it is
    /// dropped by the next read or sweep.
    pub fn put_millis(&self, key: K, value: V, ttl_ms: i64) {
        self.put(key, value, ttl_from_millis(ttl_ms));
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry found here is removed on the spot.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let mut table = self.shared.lock();
        table.counters.gets += 1;

        let value = table
            .live_entry(key, Instant::now())
            .map(|entry| entry.value.clone());
        if value.is_some() {
            table.counters.hits += 1;
        }
        value
    }

    /// Checks if a live entry exists for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut table = self.shared.lock();
        table.live_entry(key, Instant::now()).is_some()
    }

    /// Returns how long the entry for `key` has left to live.
    pub fn ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut table = self.shared.lock();
        let now = Instant::now();
        table.live_entry(key, now).map(|entry| entry.remaining_at(now))
    }

    /// Removes the entry for `key`, expired or not.
    ///
    /// Returns the value if the entry was still live. Removing a missing key
    /// is a no-op.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut table = self.shared.lock();
        let now = Instant::now();
        table
            .remove(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value)
    }

    /// Returns the number of stored entries.
    ///
    /// Entries that have expired but were not yet read or swept are
    /// included.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.shared.lock().bucket_count()
    }

    /// Sweeps the table on the calling thread.
    ///
    /// This is what the reclaimer does on every tick.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were removed.
    pub fn purge_expired(&self) -> usize {
        self.shared.sweep()
    }

    /// Removes every entry. The bucket count is kept.
    pub fn clear(&self) {
        self.shared.lock().clear();
    }

    /// Returns map statistics.
    pub fn stats(&self) -> MapStats {
        let table = self.shared.lock();
        let counters = table.counters;

        MapStats {
            entries: table.len(),
            buckets: table.bucket_count(),
            puts: counters.puts,
            gets: counters.gets,
            hits: counters.hits,
            removes: counters.removes,
            expired: counters.expired,
            resizes: counters.resizes,
        }
    }

    /// Returns the background reclaimer, if one was started.
    pub fn reclaimer(&self) -> Option<&Reclaimer> {
        self.reclaimer.as_ref()
    }
}

/// Map statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapStats {
    /// Number of entries currently stored
    pub entries: usize,
    /// Number of buckets
    pub buckets: usize,
    /// Total put operations
    pub puts: u64,
    /// Total get operations
    pub gets: u64,
    /// Gets that found a live entry
    pub hits: u64,
    /// Total remove operations
    pub removes: u64,
    /// Entries dropped because they expired (lazily or by a sweep)
    pub expired: u64,
    /// Number of times the table doubled
    pub resizes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tokio_test::{assert_err, assert_ok};

    fn manual_map() -> ExpiringMap<String, String> {
        ExpiringMap::with_config(MapConfig::default().without_reclaimer()).unwrap()
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn test_put_and_get() {
        let map = manual_map();

        map.put(s("key"), s("value"), Duration::from_secs(60));
        assert_eq!(map.get("key"), Some(s("value")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let map = manual_map();
        assert_eq!(map.get("nonexistent"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_expiry_scenario() {
        let map = manual_map();

        map.put_millis(s("k"), s("v"), 500);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(map.get("k"), Some(s("v")));

        thread::sleep(Duration::from_millis(500));
        assert_eq!(map.get("k"), None);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_expiry_without_sweep() {
        let map = manual_map();

        map.put(s("key"), s("value"), Duration::from_millis(50));
        assert!(map.contains_key("key"));

        thread::sleep(Duration::from_millis(100));

        // Still stored until something looks at it
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("key"), None);
        assert_eq!(map.len(), 0);
        assert_eq!(map.stats().expired, 1);
    }

    #[test]
    fn test_zero_and_negative_ttl() {
        let map = manual_map();

        map.put(s("zero"), s("v"), Duration::ZERO);
        map.put_millis(s("negative"), s("v"), -1000);
        assert_eq!(map.len(), 2);

        assert_eq!(map.get("zero"), None);
        assert_eq!(map.purge_expired(), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn test_overwrite() {
        let map = manual_map();

        map.put(s("key"), s("v1"), Duration::from_millis(50));
        let len = map.len();
        map.put(s("key"), s("v2"), Duration::from_secs(60));

        assert_eq!(map.get("key"), Some(s("v2")));
        assert_eq!(map.len(), len);

        // The refreshed deadline applies, not the original one
        thread::sleep(Duration::from_millis(100));
        assert_eq!(map.get("key"), Some(s("v2")));
    }

    #[test]
    fn test_overwrite_revives_expired_entry() {
        let map = manual_map();

        map.put(s("key"), s("old"), Duration::ZERO);
        map.put(s("key"), s("new"), Duration::from_secs(60));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("key"), Some(s("new")));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let map = manual_map();

        map.put(s("key"), s("value"), Duration::from_secs(60));
        map.put(s("other"), s("value"), Duration::from_secs(60));

        assert_eq!(map.remove("key"), Some(s("value")));
        assert_eq!(map.remove("key"), None);
        assert_eq!(map.remove("never-existed"), None);

        assert_eq!(map.get("key"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_expired_returns_none() {
        let map = manual_map();

        map.put(s("key"), s("value"), Duration::ZERO);
        assert_eq!(map.remove("key"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_ttl() {
        let map = manual_map();

        map.put(s("key"), s("value"), Duration::from_secs(100));
        let ttl = map.ttl("key").unwrap();
        assert!(ttl > Duration::from_secs(99) && ttl <= Duration::from_secs(100));

        assert_eq!(map.ttl("missing"), None);

        map.put(s("expired"), s("value"), Duration::ZERO);
        assert_eq!(map.ttl("expired"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_resize_preserves_contents() {
        let map = manual_map();
        assert_eq!(map.bucket_count(), 16);

        for i in 0..1000 {
            map.put(format!("key{}", i), format!("value{}", i), Duration::from_secs(60));
        }

        assert_eq!(map.len(), 1000);
        assert!(map.bucket_count() >= 1024);
        for i in 0..1000 {
            assert_eq!(map.get(&format!("key{}", i)), Some(format!("value{}", i)));
        }
        map.shared.lock().check_invariants();
    }

    #[test]
    fn test_resize_keeps_deadlines() {
        let map = manual_map();

        map.put(s("short"), s("v"), Duration::from_millis(100));
        for i in 0..100 {
            map.put(format!("key{}", i), s("v"), Duration::from_secs(60));
        }
        assert!(map.stats().resizes > 0);

        // Rehashing must not have extended the short-lived entry
        thread::sleep(Duration::from_millis(150));
        assert_eq!(map.get("short"), None);
    }

    #[test]
    fn test_purge_expired() {
        let map = manual_map();

        for i in 0..10 {
            map.put(format!("short{}", i), s("v"), Duration::from_millis(20));
        }
        map.put(s("persistent"), s("v"), Duration::from_secs(60));
        assert_eq!(map.len(), 11);

        thread::sleep(Duration::from_millis(50));

        assert_eq!(map.purge_expired(), 10);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("persistent"));
    }

    #[test]
    fn test_clear() {
        let map = manual_map();

        for i in 0..50 {
            map.put(format!("key{}", i), s("v"), Duration::from_secs(60));
        }
        let buckets = map.bucket_count();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map.get("key1"), None);
    }

    #[test]
    fn test_stats() {
        let map = manual_map();

        map.put(s("a"), s("1"), Duration::from_secs(60));
        map.put(s("a"), s("2"), Duration::from_secs(60));
        map.get("a");
        map.get("b");
        map.remove("a");

        let stats = map.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.buckets, 16);
        assert_eq!(stats.puts, 2);
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.removes, 1);
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.resizes, 0);
    }

    #[test]
    fn test_optional_keys() {
        let map: ExpiringMap<Option<u32>, &str> =
            ExpiringMap::with_config(MapConfig::default().without_reclaimer()).unwrap();

        map.put(None, "absent", Duration::from_secs(60));
        map.put(Some(1u32), "one", Duration::from_secs(60));

        assert_eq!(map.get(&None::<u32>), Some("absent"));
        assert_eq!(map.get(&Some(1u32)), Some("one"));
    }

    #[test]
    fn test_invalid_config() {
        assert_err!(ExpiringMap::<String, String>::with_config(
            MapConfig::default().with_initial_buckets(0)
        ));
        assert_err!(ExpiringMap::<String, String>::with_config(
            MapConfig::default().with_load_factor(-0.5)
        ));
    }

    #[test]
    fn test_concurrent_access() {
        let map = Arc::new(manual_map());
        let mut handles = vec![];

        // Spawn multiple writers on disjoint keys
        for i in 0..10 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    map.put(key.clone(), format!("{}", j), Duration::from_secs(60));
                    assert_eq!(map.get(&key), Some(format!("{}", j)));
                }
                for j in (0..100).step_by(2) {
                    map.remove(&format!("key-{}-{}", i, j));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len(), 500);
        map.shared.lock().check_invariants();
    }

    #[test]
    fn test_concurrent_put_same_key() {
        let map = Arc::new(manual_map());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for i in 0..200 {
                        map.put(s("shared"), format!("{}-{}", t, i), Duration::from_secs(60));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len(), 1);
        assert!(map.get("shared").is_some());
    }

    #[test]
    fn test_reclaimer_removes_unread_entries() {
        let config = MapConfig::default().with_sweep_period(Duration::from_millis(20));
        let map: ExpiringMap<String, String> = assert_ok!(ExpiringMap::with_config(config));
        assert!(map.reclaimer().is_some());

        for i in 0..10 {
            map.put(format!("key{}", i), s("v"), Duration::from_millis(30));
        }
        map.put(s("persistent"), s("v"), Duration::from_secs(60));
        assert_eq!(map.len(), 11);

        thread::sleep(Duration::from_millis(200));

        // Nobody read the short-lived keys, yet they are gone
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("persistent"));
    }

    #[test]
    fn test_reclaimer_trigger() {
        let map: ExpiringMap<String, String> = ExpiringMap::new().unwrap();
        let reclaimer = map.reclaimer().unwrap();
        assert_eq!(reclaimer.period(), Duration::from_secs(1));

        map.put(s("key"), s("v"), Duration::ZERO);
        reclaimer.trigger();

        for _ in 0..100 {
            if map.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_reclaimer_survives_huge_sweep_period() {
        let config = MapConfig::default().with_sweep_period(Duration::MAX);
        let map: ExpiringMap<String, String> = assert_ok!(ExpiringMap::with_config(config));
        let reclaimer = map.reclaimer().unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(reclaimer.is_running());

        map.put(s("key"), s("v"), Duration::ZERO);
        reclaimer.trigger();

        for _ in 0..100 {
            if map.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_reclaimer_stops_on_drop() {
        let map: ExpiringMap<String, String> = ExpiringMap::new().unwrap();
        let weak = Arc::downgrade(&map.shared);

        drop(map);

        // The reclaimer only held a weak reference and has been joined
        assert!(weak.upgrade().is_none());
    }
}
