//! Shared cache + RAII lease tests

use respool_cache::{ResourceCache, SharedCache};
use std::cell::RefCell;
use std::rc::Rc;

type Buffer = Rc<Vec<u8>>;

fn recorder() -> Rc<RefCell<Vec<usize>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn lease_buffer(
    shared: &SharedCache<usize, Buffer>,
    key: usize,
    log: &Rc<RefCell<Vec<usize>>>,
) -> respool_cache::Lease<usize, Buffer> {
    let sink = Rc::clone(log);
    shared
        .lease(
            key,
            || Rc::new(vec![0u8; key]),
            move |b: Buffer| sink.borrow_mut().push(b.len()),
        )
        .expect("Lease failed")
}

#[test]
fn test_leases_share_and_release_on_scope_exit() {
    let log = recorder();
    let shared = SharedCache::new(ResourceCache::with_grace_capacity(1));

    {
        let a = lease_buffer(&shared, 16, &log);
        let b = lease_buffer(&shared, 16, &log);
        assert!(Rc::ptr_eq(a.resource(), b.resource()));
        assert_eq!(shared.with(|c| c.ref_count(&16usize)), Some(2));
        // both leases drop here
    }

    assert!(shared.with(|c| c.is_graced(&16usize)));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_lease_released_on_early_return() {
    fn uses_buffer(
        shared: &SharedCache<usize, Buffer>,
        log: &Rc<RefCell<Vec<usize>>>,
    ) -> Option<usize> {
        let lease = lease_buffer(shared, 8, log);
        if lease.len() == 8 {
            return None;
        }
        Some(lease.len())
    }

    let log = recorder();
    let shared = SharedCache::new(ResourceCache::with_grace_capacity(0));
    assert_eq!(uses_buffer(&shared, &log), None);

    // Capacity 0: the early-return release evicted it immediately
    assert_eq!(*log.borrow(), vec![8]);
    assert!(shared.with(|c| c.is_empty()));
}

#[test]
fn test_dropping_last_handle_tears_down() {
    let log = recorder();
    {
        let shared = SharedCache::new(ResourceCache::new());
        let _kept = lease_buffer(&shared, 4, &log);
        let parked = lease_buffer(&shared, 2, &log);
        drop(parked);
        // `_kept` drops before `shared`; the cache itself goes with the last Rc
    }
    let mut disposed = log.borrow().clone();
    disposed.sort();
    assert_eq!(disposed, vec![2, 4]);
}

#[test]
fn test_clones_see_the_same_cache() {
    let log = recorder();
    let shared = SharedCache::new(ResourceCache::new());
    let other = shared.clone();

    let _lease = lease_buffer(&shared, 3, &log);
    assert!(other.with(|c| c.contains_key(&3usize)));
    assert_eq!(other.stats().created, 1);
}
