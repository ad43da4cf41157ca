//! A shareable value that doesn't hold a lock across reads.
//!
//! This is an `Arc<RwLock<T>>` with exactly two operations: replace the
//! value (write lock) and get a clone of it (read lock, released before the
//! clone is returned to the caller). Used for the rule store: `T` is
//! `Arc<StoreData>`, so `get()` is a refcount bump, not a deep copy — the
//! live snapshot a dispatch reads is immutable for the duration of that
//! dispatch even if a reload publishes a new one concurrently (§4.D, §5).

use std::fmt;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct Changeable<T>(Arc<RwLock<T>>);

impl<T> Changeable<T>
where
    T: Clone + Send,
{
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Replace the value with a new one. This is the sole write path; the
    /// dispatcher's coarse lock must be held by the caller while publishing
    /// (§4.D) — this type only guarantees the swap itself is atomic.
    pub fn replace(&self, new: T) {
        *self.0.write().expect("changeable lock poisoned") = new;
    }

    /// Get a clone of the current value without holding the lock past this
    /// call.
    pub fn get(&self) -> T {
        self.0.read().expect("changeable lock poisoned").clone()
    }
}

impl<T> fmt::Debug for Changeable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changeable").finish_non_exhaustive()
    }
}
