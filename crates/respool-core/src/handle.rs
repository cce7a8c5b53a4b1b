//! Resource identity used by the cache's reverse index.
//!
//! The cache hands out clones of the pooled handle and later accepts a handle
//! back in `release_resource`. To find the tracking entry from a handle alone
//! the resource must expose a stable identity. Shared pointers are identified
//! by address, plain integer handles (GPU object names, descriptors) by value.

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

/// A resource that can be pooled by the cache.
///
/// `pool_id` must return the same value for every clone of one resource and
/// distinct values for distinct live resources.
pub trait Pooled: Clone {
    type Id: Eq + Hash + Clone + Debug;

    fn pool_id(&self) -> Self::Id;
}

impl<T: ?Sized> Pooled for Rc<T> {
    type Id = usize;

    fn pool_id(&self) -> usize {
        Rc::as_ptr(self) as *const () as usize
    }
}

impl<T: ?Sized> Pooled for Arc<T> {
    type Id = usize;

    fn pool_id(&self) -> usize {
        Arc::as_ptr(self) as *const () as usize
    }
}

macro_rules! pooled_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Pooled for $ty {
                type Id = $ty;

                fn pool_id(&self) -> $ty {
                    *self
                }
            }
        )*
    };
}

pooled_by_value!(u16, u32, u64, usize, i32, i64);
