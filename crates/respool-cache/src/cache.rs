//! Keyed resource cache with reference counting and a FIFO grace buffer.
//!
//! Every entry is reachable from two indices: by key (acquire, release by key)
//! and by resource identity (release by instance). An entry whose reference
//! count drops to zero is parked at the tail of the grace buffer; acquiring
//! its key again rescues it. Whenever a release pushes the buffer past its
//! capacity, the oldest parked entries are evicted and disposed.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use slotmap::SlotMap;

use respool_core::config::CacheConfig;
use respool_core::handle::Pooled;

use crate::entry::{Disposer, EntryId, TrackingEntry};
use crate::error::{Error, Result};
use crate::grace::GraceQueue;
use crate::tracking::{CacheStats, PeakTracker};

pub struct ResourceCache<K: Eq + Hash, R: Pooled> {
    entries: SlotMap<EntryId, TrackingEntry<K, R>>,
    by_key: HashMap<K, EntryId>,
    by_resource: HashMap<R::Id, EntryId>,
    grace: GraceQueue,
    grace_capacity: usize,
    tag: String,
    stats: CacheStats,
    peak: PeakTracker,
}

impl<K: Eq + Hash, R: Pooled> ResourceCache<K, R> {
    /// Cache with the default grace capacity (20).
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_grace_capacity(grace_capacity: usize) -> Self {
        Self::with_config(&CacheConfig::with_grace_capacity(grace_capacity))
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_key: HashMap::new(),
            by_resource: HashMap::new(),
            grace: GraceQueue::new(),
            grace_capacity: config.grace_capacity,
            tag: config.tag.clone(),
            stats: CacheStats::default(),
            peak: PeakTracker::new(),
        }
    }

    pub fn grace_capacity(&self) -> usize {
        self.grace_capacity
    }

    /// Change the grace capacity. A smaller value is not applied to the
    /// current buffer; it takes effect at the next release that parks an entry.
    pub fn set_grace_capacity(&mut self, grace_capacity: usize) {
        self.grace_capacity = grace_capacity;
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Number of indexed entries, live and grace-buffered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with at least one outstanding acquisition.
    pub fn live_len(&self) -> usize {
        self.entries.len() - self.grace.len()
    }

    pub fn grace_len(&self) -> usize {
        self.grace.len()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.by_key.contains_key(key)
    }

    /// Reference count of the entry under `key`, if indexed.
    pub fn ref_count<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key).map(|e| e.ref_count)
    }

    /// Whether the entry under `key` is sitting in the grace buffer.
    pub fn is_graced<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key).is_some_and(|e| e.link.queued)
    }

    /// Keys in the grace buffer, oldest release first.
    pub fn grace_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.grace
            .iter(&self.entries)
            .filter_map(|id| self.entries.get(id).map(|e| &e.key))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            peak_entries: self.peak.peak(),
            ..self.stats
        }
    }

    /// Release one acquisition of `key`.
    ///
    /// Returns false, changing nothing, if the key is unknown or its entry is
    /// already at zero.
    pub fn release<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.by_key.get(key).copied() {
            Some(id) => self.decrement(id),
            None => self.reject_release(),
        }
    }

    /// Release one acquisition of the entry owning `resource`.
    pub fn release_resource(&mut self, resource: &R) -> bool {
        match self.by_resource.get(&resource.pool_id()).copied() {
            Some(id) => self.decrement(id),
            None => self.reject_release(),
        }
    }

    /// Slot currently owning `resource`.
    pub(crate) fn entry_of(&self, resource: &R) -> Option<EntryId> {
        self.by_resource.get(&resource.pool_id()).copied()
    }

    /// Release one acquisition of a specific slot generation. A key from a
    /// torn-down or evicted entry no longer resolves, so this is a rejected
    /// no-op even if the slot or the resource id has been reused since.
    pub(crate) fn release_entry(&mut self, id: EntryId) -> bool {
        self.decrement(id)
    }

    /// Dispose every entry and leave the cache empty.
    ///
    /// The grace buffer goes first, oldest first, then every live entry
    /// regardless of its reference count. Returns the number of entries
    /// disposed.
    pub fn close(mut self) -> usize {
        self.teardown()
    }

    /// Cross-check both indices against the arena and the grace queue.
    pub fn check_invariants(&self) -> respool_core::Result<()> {
        use respool_core::Error::Invariant;

        if self.by_key.len() != self.entries.len() || self.by_resource.len() != self.entries.len() {
            return Err(Invariant(format!(
                "index sizes diverge: by_key={} by_resource={} entries={}",
                self.by_key.len(),
                self.by_resource.len(),
                self.entries.len()
            )));
        }

        let mut queued = 0;
        for (id, entry) in &self.entries {
            if self.by_key.get(&entry.key) != Some(&id) {
                return Err(Invariant(format!("entry {id:?} missing from key index")));
            }
            if self.by_resource.get(&entry.resource.pool_id()) != Some(&id) {
                return Err(Invariant(format!("entry {id:?} missing from resource index")));
            }
            if entry.link.queued != (entry.ref_count == 0) {
                return Err(Invariant(format!(
                    "entry {id:?} has ref_count {} but queued={}",
                    entry.ref_count, entry.link.queued
                )));
            }
            if entry.link.queued {
                queued += 1;
            }
        }

        let mut walked = 0;
        let mut prev = None;
        for id in self.grace.iter(&self.entries) {
            let link = self.entries[id].link;
            if !link.queued || link.prev != prev {
                return Err(Invariant(format!("grace queue link broken at {id:?}")));
            }
            prev = Some(id);
            walked += 1;
            if walked > self.entries.len() {
                return Err(Invariant("grace queue has a cycle".into()));
            }
        }
        if walked != queued || walked != self.grace.len() {
            return Err(Invariant(format!(
                "grace queue length {} but walked {walked} and {queued} entries are queued",
                self.grace.len()
            )));
        }

        Ok(())
    }

    fn lookup<Q>(&self, key: &Q) -> Option<&TrackingEntry<K, R>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.by_key.get(key).and_then(|&id| self.entries.get(id))
    }

    /// Bump the reference count of an indexed key, rescuing it from the
    /// grace buffer when it sits there.
    fn reuse<Q>(&mut self, key: &Q) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.by_key.get(key)?;
        let rescued = self.grace.remove(&mut self.entries, id);
        let entry = self.entries.get_mut(id)?;
        if rescued {
            entry.ref_count = 1;
            self.stats.rescues += 1;
        } else {
            entry.ref_count += 1;
            self.stats.hits += 1;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            tag = %self.tag,
            entry = ?id,
            rescued,
            ref_count = entry.ref_count,
            "reused pooled resource"
        );
        Some(entry.resource.clone())
    }

    fn decrement(&mut self, id: EntryId) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return self.reject_release();
        };
        if entry.ref_count == 0 {
            return self.reject_release();
        }

        entry.ref_count -= 1;
        self.stats.releases += 1;
        if entry.ref_count == 0 {
            self.grace.push_back(&mut self.entries, id);
            #[cfg(feature = "tracing")]
            tracing::trace!(
                tag = %self.tag,
                entry = ?id,
                grace_len = self.grace.len(),
                "parked in grace buffer"
            );
            self.sweep();
        }
        true
    }

    fn reject_release(&mut self) -> bool {
        self.stats.rejected_releases += 1;
        false
    }

    /// Evict from the head until the grace buffer fits its capacity.
    fn sweep(&mut self) {
        while self.grace.len() > self.grace_capacity {
            let Some(id) = self.grace.pop_front(&mut self.entries) else {
                break;
            };
            if let Some(entry) = self.unlink(id) {
                self.stats.evictions += 1;
                #[cfg(feature = "tracing")]
                tracing::trace!(tag = %self.tag, entry = ?id, "evicted from grace buffer");
                entry.dispose();
            }
        }
    }

    /// Drop `id` from the grace queue, the arena, and both indices.
    fn unlink(&mut self, id: EntryId) -> Option<TrackingEntry<K, R>> {
        self.grace.remove(&mut self.entries, id);
        let entry = self.entries.remove(id)?;
        self.by_key.remove(&entry.key);
        self.by_resource.remove(&entry.resource.pool_id());
        Some(entry)
    }

    pub(crate) fn teardown(&mut self) -> usize {
        let mut disposed = 0;

        while let Some(id) = self.grace.pop_front(&mut self.entries) {
            if let Some(entry) = self.unlink(id) {
                disposed += 1;
                entry.dispose();
            }
        }

        let live: Vec<EntryId> = self.entries.keys().collect();
        for id in live {
            if let Some(entry) = self.unlink(id) {
                disposed += 1;
                entry.dispose();
            }
        }

        self.by_key.clear();
        self.by_resource.clear();
        self.stats.teardown_disposals += disposed as u64;

        #[cfg(feature = "tracing")]
        {
            if disposed > 0 {
                tracing::debug!(tag = %self.tag, disposed, "resource cache torn down");
            }
        }

        disposed
    }
}

impl<K, R> ResourceCache<K, R>
where
    K: Eq + Hash + Clone + Debug,
    R: Pooled,
{
    /// Acquire the resource under `key`, creating it with `factory` if the key
    /// is not indexed.
    ///
    /// `disposer` is bound to the entry only when it is created here; for an
    /// existing key both callbacks are dropped without being called.
    pub fn acquire<F, D>(&mut self, key: K, factory: F, disposer: D) -> Result<R>
    where
        F: FnOnce() -> R,
        D: FnOnce(R) + 'static,
    {
        if let Some(resource) = self.reuse(&key) {
            return Ok(resource);
        }
        let resource = factory();
        self.insert(key, resource, Some(Box::new(disposer)))
    }

    /// Like [`acquire`](Self::acquire) with a fallible factory. A factory
    /// error leaves the cache untouched.
    pub fn try_acquire<F, E, D>(&mut self, key: K, factory: F, disposer: D) -> Result<R>
    where
        F: FnOnce() -> std::result::Result<R, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        D: FnOnce(R) + 'static,
    {
        if let Some(resource) = self.reuse(&key) {
            return Ok(resource);
        }
        let resource = factory().map_err(|e| Error::Factory(e.into()))?;
        self.insert(key, resource, Some(Box::new(disposer)))
    }

    /// Acquire without a disposer. A resource created here is simply dropped
    /// when evicted, and a warning is logged at creation.
    pub fn acquire_undisposed<F>(&mut self, key: K, factory: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        if let Some(resource) = self.reuse(&key) {
            return Ok(resource);
        }
        let resource = factory();
        self.insert(key, resource, None)
    }

    /// Acquire a key that must already be indexed (live or grace-buffered).
    pub fn acquire_existing<Q>(&mut self, key: &Q) -> Result<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.reuse(key)
            .ok_or(Error::InvalidArgument("no factory supplied for an unseen key"))
    }

    fn insert(&mut self, key: K, resource: R, disposer: Option<Disposer<R>>) -> Result<R> {
        let rid = resource.pool_id();
        if let Some(&other) = self.by_resource.get(&rid) {
            let existing = self
                .entries
                .get(other)
                .map(|e| format!("{:?}", e.key))
                .unwrap_or_default();
            return Err(Error::DuplicateResource {
                key: format!("{key:?}"),
                existing,
            });
        }

        #[cfg(feature = "tracing")]
        {
            if disposer.is_none() {
                tracing::warn!(
                    tag = %self.tag,
                    key = ?key,
                    "resource cached without a disposer; eviction will only drop it"
                );
            }
        }

        let handle = resource.clone();
        let id = self
            .entries
            .insert(TrackingEntry::new(key.clone(), resource, disposer));
        self.by_key.insert(key, id);
        self.by_resource.insert(rid, id);
        self.stats.created += 1;
        self.peak.record(self.entries.len());

        #[cfg(feature = "tracing")]
        tracing::trace!(
            tag = %self.tag,
            entry = ?id,
            entries = self.entries.len(),
            "created pooled resource"
        );

        Ok(handle)
    }
}

impl<K: Eq + Hash, R: Pooled> Default for ResourceCache<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, R: Pooled> Drop for ResourceCache<K, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
