//! Thread-Safe Key-Value Store
//!
//! This module implements the store behind restkv: a concurrent map from
//! key bytes to value bytes. Values never expire and nothing is persisted;
//! the store lives exactly as long as the process that created it.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: The key space is split across shards, each with its own lock.
//! 2. **RwLock**: Concurrent readers on a shard, exclusive writers.
//! 3. **Absence is a value**: `get` returns `Option`, a missing key is not an error.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key always hashes to the same shard, so every operation on a key is
//! serialized by that shard's lock and a `put` is never observed half-applied.

use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of shards in the store.
const NUM_SHARDS: usize = 64;

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    entries: RwLock<HashMap<Bytes, Bytes>>,
}

impl Shard {
    // The map is only touched by single insert/remove/lookup calls, so a
    // panic elsewhere can never leave it half-updated. Recover from poison.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Bytes>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Bytes>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The authoritative holder of all key/value state.
///
/// Wrap it in an `Arc` and hand a clone to every request handler; all
/// operations take `&self` and are safe to call from any thread.
///
/// # Example
///
/// ```
/// use restkv::storage::Store;
/// use bytes::Bytes;
///
/// let store = Store::new();
///
/// store.put(Bytes::from("name"), Bytes::from("newvalue"));
/// assert_eq!(store.get(b"name"), Some(Bytes::from("newvalue")));
///
/// store.delete(b"name");
/// assert_eq!(store.get(b"name"), None);
/// ```
pub struct Store {
    shards: Vec<Shard>,

    /// Number of live keys
    key_count: AtomicU64,

    /// Total GET operations
    get_count: AtomicU64,

    /// Total PUT operations
    put_count: AtomicU64,

    /// Total DELETE operations
    del_count: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Inserts or overwrites the value for `key`.
    ///
    /// Never fails. Returns `true` if the key was new, `false` if an
    /// existing value was replaced.
    pub fn put(&self, key: Bytes, value: Bytes) -> bool {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let is_new = self.shard(&key).write().insert(key, value).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }

        is_new
    }

    /// Returns the current value for `key`, or `None` if there is no entry.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        // Bytes clones are a refcount bump, the lock is released before returning.
        self.shard(key).read().get(key).cloned()
    }

    /// Removes the entry for `key` if present.
    ///
    /// Deleting an absent key is a no-op. Returns whether an entry was removed.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let removed = self.shard(key).write().remove(key).is_some();
        if removed {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
        }

        removed
    }

    /// Returns the number of keys in the store.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total PUT operations
    pub put_ops: u64,
    /// Total DELETE operations
    pub del_ops: u64,
}
