//! FIFO grace buffer threaded through the entry arena.
//!
//! Entries carry their own `prev`/`next` links, so pushing to the tail,
//! popping the head and rescuing an arbitrary entry are all O(1) without
//! scanning or unsafe pointers.

use slotmap::SlotMap;

use crate::entry::{EntryId, TrackingEntry};

#[derive(Debug, Default)]
pub(crate) struct GraceQueue {
    head: Option<EntryId>,
    tail: Option<EntryId>,
    len: usize,
}

impl GraceQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Append `id` at the tail. The entry must not be queued already.
    pub(crate) fn push_back<K, R>(
        &mut self,
        entries: &mut SlotMap<EntryId, TrackingEntry<K, R>>,
        id: EntryId,
    ) {
        debug_assert!(!entries[id].link.queued, "entry queued twice");

        let old_tail = self.tail;
        {
            let link = &mut entries[id].link;
            link.prev = old_tail;
            link.next = None;
            link.queued = true;
        }
        match old_tail {
            Some(t) => entries[t].link.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Unlink `id` from anywhere in the queue. Returns false if it was not queued.
    pub(crate) fn remove<K, R>(
        &mut self,
        entries: &mut SlotMap<EntryId, TrackingEntry<K, R>>,
        id: EntryId,
    ) -> bool {
        let link = match entries.get(id) {
            Some(e) if e.link.queued => e.link,
            _ => return false,
        };

        match link.prev {
            Some(p) => entries[p].link.next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(n) => entries[n].link.prev = link.prev,
            None => self.tail = link.prev,
        }

        entries[id].link = Default::default();
        self.len -= 1;
        true
    }

    /// Unlink and return the oldest entry.
    pub(crate) fn pop_front<K, R>(
        &mut self,
        entries: &mut SlotMap<EntryId, TrackingEntry<K, R>>,
    ) -> Option<EntryId> {
        let id = self.head?;
        self.remove(entries, id).then_some(id)
    }

    /// Walk the queue from oldest to newest.
    pub(crate) fn iter<'a, K, R>(
        &self,
        entries: &'a SlotMap<EntryId, TrackingEntry<K, R>>,
    ) -> impl Iterator<Item = EntryId> + 'a {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = entries.get(id).and_then(|e| e.link.next);
            Some(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(n: usize) -> (SlotMap<EntryId, TrackingEntry<usize, usize>>, Vec<EntryId>) {
        let mut entries = SlotMap::with_key();
        let ids = (0..n)
            .map(|i| entries.insert(TrackingEntry::new(i, i, None)))
            .collect();
        (entries, ids)
    }

    fn order(
        q: &GraceQueue,
        entries: &SlotMap<EntryId, TrackingEntry<usize, usize>>,
    ) -> Vec<usize> {
        q.iter(entries).map(|id| entries[id].key).collect()
    }

    #[test]
    fn fifo_order() {
        let (mut entries, ids) = arena(3);
        let mut q = GraceQueue::new();
        for &id in &ids {
            q.push_back(&mut entries, id);
        }
        assert_eq!(order(&q, &entries), vec![0, 1, 2]);
        assert_eq!(q.pop_front(&mut entries), Some(ids[0]));
        assert_eq!(q.pop_front(&mut entries), Some(ids[1]));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn remove_from_middle_head_and_tail() {
        let (mut entries, ids) = arena(4);
        let mut q = GraceQueue::new();
        for &id in &ids {
            q.push_back(&mut entries, id);
        }

        assert!(q.remove(&mut entries, ids[1]));
        assert_eq!(order(&q, &entries), vec![0, 2, 3]);
        assert!(q.remove(&mut entries, ids[0]));
        assert!(q.remove(&mut entries, ids[3]));
        assert_eq!(order(&q, &entries), vec![2]);
        assert_eq!(q.iter(&entries).next(), Some(ids[2]));

        // Not queued anymore.
        assert!(!q.remove(&mut entries, ids[1]));
        assert!(!entries[ids[1]].link.queued);
    }

    #[test]
    fn requeue_after_removal_goes_to_tail() {
        let (mut entries, ids) = arena(3);
        let mut q = GraceQueue::new();
        for &id in &ids {
            q.push_back(&mut entries, id);
        }
        q.remove(&mut entries, ids[0]);
        q.push_back(&mut entries, ids[0]);
        assert_eq!(order(&q, &entries), vec![1, 2, 0]);
    }

    #[test]
    fn empty_queue_pops_nothing() {
        let (mut entries, _) = arena(0);
        let mut q = GraceQueue::new();
        assert_eq!(q.pop_front(&mut entries), None);
        assert_eq!(q.len(), 0);
    }
}
