//! Tracking entries: one per pooled key.

use slotmap::new_key_type;

new_key_type! {
    /// Slot of a tracking entry inside the cache arena.
    pub struct EntryId;
}

/// Callback that destroys a resource once it leaves the cache for good.
pub type Disposer<R> = Box<dyn FnOnce(R)>;

/// Position of an entry in the grace queue. `queued == false` means the
/// entry is live and both links are `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GraceLink {
    pub(crate) prev: Option<EntryId>,
    pub(crate) next: Option<EntryId>,
    pub(crate) queued: bool,
}

/// Binds a key to its resource, reference count, and disposer.
pub(crate) struct TrackingEntry<K, R> {
    pub(crate) key: K,
    pub(crate) resource: R,
    pub(crate) ref_count: usize,
    pub(crate) disposer: Option<Disposer<R>>,
    pub(crate) link: GraceLink,
}

impl<K, R> TrackingEntry<K, R> {
    pub(crate) fn new(key: K, resource: R, disposer: Option<Disposer<R>>) -> Self {
        Self {
            key,
            resource,
            ref_count: 1,
            disposer,
            link: GraceLink::default(),
        }
    }

    /// Hand the resource to its disposer. Entries created without one just
    /// drop the resource.
    pub(crate) fn dispose(self) {
        if let Some(disposer) = self.disposer {
            disposer(self.resource);
        }
    }
}
