//! Shared cache handle + RAII lease.
//!
//! A [`Lease`] holds one acquisition and releases it when dropped, so every
//! exit path gives the resource back. Dropping the lease never panics: if the
//! cache is borrowed at that moment (a disposer or factory reaching back into
//! the cache), the release is skipped and logged.

use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;

use respool_core::config::CacheConfig;
use respool_core::handle::Pooled;

use crate::cache::ResourceCache;
use crate::entry::EntryId;
use crate::error::Result;
use crate::tracking::CacheStats;

/// Cloneable, single-threaded handle to a [`ResourceCache`].
pub struct SharedCache<K: Eq + Hash, R: Pooled> {
    inner: Rc<RefCell<ResourceCache<K, R>>>,
}

impl<K: Eq + Hash, R: Pooled> Clone for SharedCache<K, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash, R: Pooled> SharedCache<K, R> {
    pub fn new(cache: ResourceCache<K, R>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(cache)),
        }
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self::new(ResourceCache::with_config(config))
    }

    /// Run `f` against the underlying cache.
    pub fn with<T>(&self, f: impl FnOnce(&mut ResourceCache<K, R>) -> T) -> T {
        f(&mut self.inner.borrow_mut())
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.borrow().stats()
    }

    /// Tear the cache down now. Leases still alive become inert: their drop
    /// releases nothing. Returns the number of entries disposed.
    pub fn close(&self) -> usize {
        self.inner.borrow_mut().teardown()
    }
}

impl<K, R> SharedCache<K, R>
where
    K: Eq + Hash + Clone + Debug,
    R: Pooled,
{
    /// Acquire `key` and wrap the acquisition in a [`Lease`].
    pub fn lease<F, D>(&self, key: K, factory: F, disposer: D) -> Result<Lease<K, R>>
    where
        F: FnOnce() -> R,
        D: FnOnce(R) + 'static,
    {
        let mut cache = self.inner.borrow_mut();
        let resource = cache.acquire(key, factory, disposer)?;
        let entry = cache.entry_of(&resource);
        drop(cache);
        Ok(self.wrap(resource, entry))
    }

    /// Lease a key that must already be indexed.
    pub fn lease_existing(&self, key: &K) -> Result<Lease<K, R>> {
        let mut cache = self.inner.borrow_mut();
        let resource = cache.acquire_existing(key)?;
        let entry = cache.entry_of(&resource);
        drop(cache);
        Ok(self.wrap(resource, entry))
    }

    fn wrap(&self, resource: R, entry: Option<EntryId>) -> Lease<K, R> {
        Lease {
            cache: Rc::clone(&self.inner),
            resource,
            entry,
        }
    }
}

/// RAII guard for one acquisition.
///
/// The lease remembers the versioned slot its entry lived in, not the key or
/// the resource id. A lease that outlives a teardown or eviction therefore
/// cannot decrement a newer entry, even one reusing the same key or the same
/// integer handle.
pub struct Lease<K: Eq + Hash, R: Pooled> {
    cache: Rc<RefCell<ResourceCache<K, R>>>,
    resource: R,
    entry: Option<EntryId>,
}

impl<K: Eq + Hash, R: Pooled> Lease<K, R> {
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Release now and report whether the cache accepted it.
    pub fn release(mut self) -> bool {
        self.give_back()
    }

    fn give_back(&mut self) -> bool {
        let Some(id) = self.entry.take() else {
            return false;
        };
        match self.cache.try_borrow_mut() {
            Ok(mut cache) => cache.release_entry(id),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    resource = ?self.resource.pool_id(),
                    "cache busy while dropping a lease; release skipped"
                );
                false
            }
        }
    }
}

impl<K: Eq + Hash, R: Pooled> Deref for Lease<K, R> {
    type Target = R;
    fn deref(&self) -> &R {
        self.resource()
    }
}

impl<K: Eq + Hash, R: Pooled> Drop for Lease<K, R> {
    fn drop(&mut self) {
        self.give_back();
    }
}
