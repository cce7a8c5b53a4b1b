//! Drive a [`ResourceCache`] through a script with synthetic resources.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use respool_cache::{CacheStats, ResourceCache};
use respool_core::config::CacheConfig;

use crate::script::{Script, Step};

/// Stand-in for an expensive resource. `generation` counts how many times the
/// factory has run for this key.
#[derive(Debug)]
pub struct Synthetic {
    pub key: String,
    pub generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created { key: String, generation: u32 },
    Hit { key: String, generation: u32 },
    Rescued { key: String, generation: u32 },
    Released { key: String },
    Rejected { key: String },
    Failed { key: String, reason: String },
    Disposed { key: String, generation: u32 },
    CapacityChanged { capacity: usize },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Created { key, generation } => write!(f, "created  {key} (gen {generation})"),
            Event::Hit { key, generation } => write!(f, "hit      {key} (gen {generation})"),
            Event::Rescued { key, generation } => write!(f, "rescued  {key} (gen {generation})"),
            Event::Released { key } => write!(f, "released {key}"),
            Event::Rejected { key } => write!(f, "rejected {key} (unknown or already released)"),
            Event::Failed { key, reason } => write!(f, "failed   {key}: {reason}"),
            Event::Disposed { key, generation } => write!(f, "disposed {key} (gen {generation})"),
            Event::CapacityChanged { capacity } => write!(f, "capacity -> {capacity}"),
        }
    }
}

#[derive(Debug)]
pub struct ReplayReport {
    pub events: Vec<Event>,
    /// Statistics just before teardown.
    pub stats: CacheStats,
    /// Grace buffer contents just before teardown, oldest first.
    pub grace: Vec<String>,
    /// Entries still acquired just before teardown.
    pub live: usize,
    /// Entries disposed by the final teardown.
    pub teardown_disposed: usize,
}

fn reused(key: &str, resource: &Synthetic, rescued: bool) -> Event {
    let (key, generation) = (key.to_string(), resource.generation);
    if rescued {
        Event::Rescued { key, generation }
    } else {
        Event::Hit { key, generation }
    }
}

pub fn replay(script: &Script, config: &CacheConfig) -> ReplayReport {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut generations: std::collections::HashMap<String, u32> = Default::default();
    let mut cache: ResourceCache<String, Rc<Synthetic>> = ResourceCache::with_config(config);

    for step in &script.steps {
        match step {
            Step::Acquire { key } => {
                let generation = generations.get(key).copied().unwrap_or(0) + 1;
                let created = Cell::new(false);
                let rescues = cache.stats().rescues;
                let sink = Rc::clone(&events);
                let result = cache.acquire(
                    key.clone(),
                    || {
                        created.set(true);
                        Rc::new(Synthetic {
                            key: key.clone(),
                            generation,
                        })
                    },
                    move |r: Rc<Synthetic>| {
                        sink.borrow_mut().push(Event::Disposed {
                            key: r.key.clone(),
                            generation: r.generation,
                        })
                    },
                );
                let event = match result {
                    Ok(r) if created.get() => {
                        generations.insert(key.clone(), generation);
                        Event::Created {
                            key: key.clone(),
                            generation: r.generation,
                        }
                    }
                    Ok(r) => reused(key, &r, cache.stats().rescues > rescues),
                    Err(e) => Event::Failed {
                        key: key.clone(),
                        reason: e.to_string(),
                    },
                };
                events.borrow_mut().push(event);
            }
            Step::AcquireExisting { key } => {
                let rescues = cache.stats().rescues;
                let event = match cache.acquire_existing(key.as_str()) {
                    Ok(r) => reused(key, &r, cache.stats().rescues > rescues),
                    Err(e) => Event::Failed {
                        key: key.clone(),
                        reason: e.to_string(),
                    },
                };
                events.borrow_mut().push(event);
            }
            Step::Release { key } => {
                // Push before releasing so a disposal triggered by this
                // release is logged after it.
                let idx = events.borrow().len();
                events.borrow_mut().push(Event::Released { key: key.clone() });
                if !cache.release(key.as_str()) {
                    events.borrow_mut()[idx] = Event::Rejected { key: key.clone() };
                }
            }
            Step::SetCapacity { capacity } => {
                cache.set_grace_capacity(*capacity);
                events
                    .borrow_mut()
                    .push(Event::CapacityChanged { capacity: *capacity });
            }
            Step::Close => break,
        }
    }

    let stats = cache.stats();
    let grace = cache.grace_keys().cloned().collect();
    let live = cache.live_len();
    let teardown_disposed = cache.close();

    let events = events.borrow().clone();
    ReplayReport {
        events,
        stats,
        grace,
        live,
        teardown_disposed,
    }
}
