//! Property tests: random acquire/release traces against a reference model

use proptest::prelude::*;
use respool_cache::ResourceCache;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Op {
    Acquire(u8),
    Release(u8),
    ReleaseInstance(u8),
    SetCapacity(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8).prop_map(Op::Acquire),
        3 => (0u8..8).prop_map(Op::Release),
        1 => (0u8..8).prop_map(Op::ReleaseInstance),
        1 => (0usize..5).prop_map(Op::SetCapacity),
    ]
}

/// Slow but obviously-correct model of the cache.
#[derive(Default)]
struct Model {
    refs: HashMap<u8, usize>,
    grace: VecDeque<u8>,
    capacity: usize,
    disposed: Vec<u8>,
}

impl Model {
    fn acquire(&mut self, k: u8) -> bool {
        match self.refs.get_mut(&k) {
            Some(rc) => {
                if *rc == 0 {
                    self.grace.retain(|&g| g != k);
                }
                *rc += 1;
                false
            }
            None => {
                self.refs.insert(k, 1);
                true
            }
        }
    }

    fn release(&mut self, k: u8) -> bool {
        match self.refs.get_mut(&k) {
            Some(rc) if *rc > 0 => {
                *rc -= 1;
                if *rc == 0 {
                    self.grace.push_back(k);
                    while self.grace.len() > self.capacity {
                        if let Some(old) = self.grace.pop_front() {
                            self.refs.remove(&old);
                            self.disposed.push(old);
                        }
                    }
                }
                true
            }
            _ => false,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For any trace, the cache agrees with the model on factory calls,
    /// release results, disposal order and grace-buffer contents, and the
    /// two indices stay in bijection.
    #[test]
    fn prop_cache_matches_model(
        capacity in 0usize..5,
        ops in prop::collection::vec(arb_op(), 0..200),
    ) {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut cache: ResourceCache<u8, Rc<u8>> = ResourceCache::with_grace_capacity(capacity);
        let mut model = Model { capacity, ..Default::default() };
        let mut handles: HashMap<u8, Rc<u8>> = HashMap::new();
        let mut created_total = 0usize;

        for op in ops {
            match op {
                Op::Acquire(k) => {
                    let mut created = false;
                    let sink = Rc::clone(&disposed);
                    let factory = || {
                        created = true;
                        Rc::new(k)
                    };
                    let r = cache
                        .acquire(k, factory, move |r: Rc<u8>| sink.borrow_mut().push(*r))
                        .unwrap();
                    prop_assert_eq!(created, model.acquire(k));
                    if created {
                        created_total += 1;
                    }
                    if let Some(prev) = handles.get(&k) {
                        if !created {
                            prop_assert!(Rc::ptr_eq(prev, &r));
                        }
                    }
                    handles.insert(k, r);
                }
                Op::Release(k) => {
                    prop_assert_eq!(cache.release(&k), model.release(k));
                }
                Op::ReleaseInstance(k) => {
                    let expected = model.release(k);
                    let got = match handles.get(&k) {
                        Some(h) => cache.release_resource(h),
                        None => false,
                    };
                    prop_assert_eq!(got, expected);
                }
                Op::SetCapacity(c) => {
                    cache.set_grace_capacity(c);
                    model.capacity = c;
                }
            }

            prop_assert!(cache.check_invariants().is_ok());
            prop_assert_eq!(cache.len(), model.refs.len());
            prop_assert_eq!(&*disposed.borrow(), &model.disposed);
            let grace: Vec<u8> = cache.grace_keys().copied().collect();
            let expected: Vec<u8> = model.grace.iter().copied().collect();
            prop_assert_eq!(grace, expected);
        }

        let remaining = cache.len();
        let before = disposed.borrow().len();
        prop_assert_eq!(cache.close(), remaining);
        prop_assert_eq!(disposed.borrow().len(), before + remaining);

        // Every created entry was disposed exactly once.
        prop_assert_eq!(disposed.borrow().len(), created_total);
    }

    /// Releasing N+1 distinct keys with capacity N disposes exactly the first.
    #[test]
    fn prop_overflow_disposes_earliest(n in 0usize..16) {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut cache: ResourceCache<usize, Rc<usize>> = ResourceCache::with_grace_capacity(n);
        for k in 0..=n {
            let sink = Rc::clone(&disposed);
            cache
                .acquire(k, || Rc::new(k), move |r: Rc<usize>| sink.borrow_mut().push(*r))
                .unwrap();
        }
        for k in 0..=n {
            prop_assert!(cache.release(&k));
        }
        prop_assert_eq!(&*disposed.borrow(), &vec![0usize]);
        prop_assert_eq!(cache.grace_len(), n);
    }
}
