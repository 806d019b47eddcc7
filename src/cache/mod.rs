//! Repository cache
//!
//! Bounded memoization shared by every repository of a scan session, with
//! per-key mutual exclusion so that concurrent requests for the same listing
//! reach the provider only once.
//!
//! # Protocol
//!
//! - [`Cache::get`] never blocks and only reports resolved values.
//! - [`Cache::get_and_lock`] returns [`Lookup::Hit`] when the key is resolved.
//!   Otherwise it waits for the key's lock and re-checks: the caller either
//!   sees the value stored by the previous holder, or receives
//!   [`Lookup::Miss`] with a [`KeyGuard`] and becomes the producer.
//! - The producer stores the result with [`KeyGuard::put`]. Dropping the
//!   guard unlocks the key, on every path (`?`, panic, cancelled future).
//!   A guard dropped without `put` leaves the key absent, so failures are
//!   never cached.
//!
//! # Example
//!
//! ```ignore
//! let key = CacheKey::<Vec<String>>::new("ListAllBuckets");
//! let buckets = match cache.get_and_lock(&key).await {
//!     Lookup::Hit(buckets) => buckets,
//!     Lookup::Miss(guard) => {
//!         let buckets = fetch_buckets().await?;
//!         guard.put(buckets.clone());
//!         buckets
//!     }
//! };
//! ```

mod key;

pub use key::CacheKey;

use lru::LruCache;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as KeyLock, OwnedMutexGuard};

/// Default number of resolved entries kept per session
pub const DEFAULT_CAPACITY: usize = 100;

type Value = Arc<dyn Any + Send + Sync>;

/// Internal identity of a key: its name and the type of value it caches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Slot {
    name: String,
    type_id: TypeId,
}

impl Slot {
    fn of<T: 'static>(key: &CacheKey<T>) -> Self {
        Self {
            name: key.as_str().to_string(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Cache usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Result of [`Cache::get_and_lock`]
pub enum Lookup<'a, T> {
    /// The key is resolved
    Hit(T),
    /// The key is absent and the caller now holds its lock
    Miss(KeyGuard<'a, T>),
}

/// Exclusive hold on an unresolved key, released on drop
pub struct KeyGuard<'a, T> {
    cache: &'a Cache,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
    _value: PhantomData<fn(T)>,
}

impl<T: Send + Sync + 'static> KeyGuard<'_, T> {
    /// Store the resolved value for the held key
    pub fn put(&self, value: T) {
        self.cache.store(&self.slot, Arc::new(value));
    }

    /// Name of the held key
    pub fn key(&self) -> &str {
        &self.slot.name
    }

    /// Release the key explicitly; same as dropping the guard
    pub fn unlock(self) {}
}

impl<T> Drop for KeyGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            self.cache.release(guard);
        }
    }
}

/// Bounded, coalescing memoization store
pub struct Cache {
    entries: Mutex<LruCache<Slot, Value>>,
    locks: Mutex<HashMap<Slot, Arc<KeyLock<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Cache {
    /// Create a cache holding at most `capacity` resolved entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            locks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Resolved value for `key`, if any. Never waits on in-flight producers.
    pub fn get<T>(&self, key: &CacheKey<T>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = self.lookup(&Slot::of(key));
        self.record(key, value.is_some());
        value
    }

    /// Resolved value for `key`, or the exclusive right to produce it.
    ///
    /// Waits while another caller holds the key. The wait is unbounded;
    /// wrap the whole operation in `tokio::time::timeout` to impose a
    /// deadline, cancellation releases the key like any other exit path.
    pub async fn get_and_lock<T>(&self, key: &CacheKey<T>) -> Lookup<'_, T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot = Slot::of(key);
        if let Some(value) = self.lookup::<T>(&slot) {
            self.record(key, true);
            return Lookup::Hit(value);
        }

        let key_lock = lock(&self.locks).entry(slot.clone()).or_default().clone();
        let guard = key_lock.lock_owned().await;

        if let Some(value) = self.lookup::<T>(&slot) {
            self.release(guard);
            self.record(key, true);
            return Lookup::Hit(value);
        }

        self.record(key, false);
        Lookup::Miss(KeyGuard {
            cache: self,
            slot,
            guard: Some(guard),
            _value: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        lock(&self.entries).cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = lock(&self.entries);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }

    fn lookup<T>(&self, slot: &Slot) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = lock(&self.entries).get(slot).cloned()?;
        value.downcast_ref::<T>().cloned()
    }

    fn store(&self, slot: &Slot, value: Value) {
        let evicted = lock(&self.entries).push(slot.clone(), value);
        if let Some((evicted, _)) = evicted {
            if &evicted != slot {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache full, evicted {}", evicted.name);
            }
        }
    }

    fn release(&self, guard: OwnedMutexGuard<()>) {
        let mut locks = lock(&self.locks);
        drop(guard);
        // Waiters clone the lock under `locks`, so a count of one means the
        // map holds the only reference. Records left by cancelled waiters
        // are swept here too.
        locks.retain(|_, key_lock| Arc::strong_count(key_lock) > 1);
    }

    fn record<T>(&self, key: &CacheKey<T>, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Cache hit: {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Cache miss: {}", key);
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
