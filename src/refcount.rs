//! Per-entry reference counter.
//!
//! Counts live `Resource` handles. Interior mutability lets handles adjust
//! the count through a shared borrow of the entry table, so a handle can be
//! dropped while other code reads the table.

use core::cell::Cell;
use core::marker::PhantomData;

/// Single-threaded reference counter for entries.
#[derive(Debug, Default)]
pub struct RefCount {
    count: Cell<usize>,
    // !Send + !Sync like Rc
    _nosend: PhantomData<*mut ()>,
}

impl RefCount {
    pub fn new(initial: usize) -> Self {
        Self {
            count: Cell::new(initial),
            _nosend: PhantomData,
        }
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.count.get()
    }

    #[inline]
    pub fn increment(&self) {
        let n = self.count.get().wrapping_add(1);
        self.count.set(n);
        if n == 0 {
            // Follow Rc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
    }

    #[inline]
    pub fn decrement(&self) {
        let c = self.count.get();
        assert!(c > 0, "RefCount underflow");
        self.count.set(c - 1);
    }
}
