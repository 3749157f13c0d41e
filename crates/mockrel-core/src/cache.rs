//! Per-instance association store keyed by identity
//!
//! Provides [`WeakIdentityCache`], which associates a value with an owner
//! `Arc` without keeping the owner alive. Entries whose owner has been
//! dropped are tombstones: lookups treat them as absent, and they are only
//! physically removed by [`WeakIdentityCache::compact`].
//!
//! A tombstone's `Weak` keeps the owner's allocation reserved, so no new
//! owner can take over its identity before `compact` removes the slot. Until
//! then each tombstone also pins its stored value; a relation accessor's
//! cache lives as long as the patch that installed it.

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Identity of a shared object (its allocation address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(usize);

impl IdentityKey {
    /// Identity of the object behind `value`
    #[inline]
    #[must_use]
    pub fn of<T>(value: &Arc<T>) -> Self {
        Self(Arc::as_ptr(value) as usize)
    }
}

struct Entry<K, V> {
    owner: Weak<K>,
    value: V,
}

impl<K, V> Entry<K, V> {
    fn new(owner: &Arc<K>, value: V) -> Self {
        Self {
            owner: Arc::downgrade(owner),
            value,
        }
    }

    fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

/// Association store keyed by owner identity, holding owners weakly
///
/// Two distinct owners never share an entry, even when they compare equal.
/// There is no size bound and no eviction.
pub struct WeakIdentityCache<K, V> {
    entries: DashMap<IdentityKey, Entry<K, V>>,
}

impl<K, V: Clone> WeakIdentityCache<K, V> {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Value stored for `owner`
    #[inline]
    #[must_use]
    pub fn get(&self, owner: &Arc<K>) -> Option<V> {
        self.lookup(IdentityKey::of(owner))
    }

    /// Value stored under `key`, if its owner is still alive
    #[must_use]
    pub fn lookup(&self, key: IdentityKey) -> Option<V> {
        let entry = self.entries.get(&key)?;
        if !entry.is_live() {
            tracing::trace!(?key, "identity cache hit a dead owner");
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store `value` for `owner`, replacing any previous value
    pub fn set(&self, owner: &Arc<K>, value: V) {
        self.entries
            .insert(IdentityKey::of(owner), Entry::new(owner, value));
    }

    /// Value stored for `owner`, or the result of `make` stored in its place
    ///
    /// `make` runs while the entry is locked and must not touch this cache.
    ///
    /// # Errors
    /// Returns the error of `make`; nothing is stored in that case
    pub fn get_or_try_insert_with<E, F>(&self, owner: &Arc<K>, make: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.entries.entry(IdentityKey::of(owner)) {
            // `owner` is alive, so a slot under its identity is its own
            MapEntry::Occupied(occupied) => Ok(occupied.get().value.clone()),
            MapEntry::Vacant(vacant) => {
                let value = make()?;
                vacant.insert(Entry::new(owner, value.clone()));
                Ok(value)
            }
        }
    }

    /// Number of stored slots, tombstones included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no slot is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries whose owner is alive
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_live()).count()
    }

    /// Physically remove tombstones, returning how many were removed
    pub fn compact(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        before - self.entries.len()
    }
}

impl<K, V: Clone> Default for WeakIdentityCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: Clone> fmt::Debug for WeakIdentityCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakIdentityCache")
            .field("slots", &self.len())
            .field("live", &self.live_len())
            .finish()
    }
}
