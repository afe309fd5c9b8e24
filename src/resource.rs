//! Resource: per-consumer handle to one (manager, key) pair.
//!
//! A handle caches the payload and state it saw last, together with the
//! manager's change counter at that moment. Every observation first runs
//! `acquire`, which re-reads the entry only if the counter advanced; a
//! `Final` snapshot is never re-read.

use crate::entry_table::EntryId;
use crate::error::{ResourceError, Result};
use crate::key::ResourceKey;
use crate::manager::Shared;
use crate::state::ResourceState;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;
use tracing::trace;

/// Handle to a resource managed by a [`ResourceManager`](crate::ResourceManager).
///
/// Each live handle holds one reference on its entry: `clone` adds one,
/// dropping releases it, moving transfers it. A default-constructed handle
/// is bound to no manager, holds no reference and reports `Final` with no
/// data.
pub struct Resource<T> {
    manager: Option<Rc<Shared<T>>>,
    id: EntryId,
    key: ResourceKey,
    last_check: u64,
    state: ResourceState,
    data: Option<Rc<T>>,
}

impl<T> Resource<T> {
    /// Wrap a reference already counted by the manager and synchronize.
    pub(crate) fn bound(manager: Rc<Shared<T>>, id: EntryId, key: ResourceKey) -> Self {
        let mut r = Self {
            manager: Some(manager),
            id,
            key,
            last_check: 0,
            state: ResourceState::NotLoaded,
            data: None,
        };
        r.sync();
        r
    }

    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Whether the handle is bound to a manager.
    pub fn is_bound(&self) -> bool {
        self.manager.is_some()
    }

    /// Change-counter value at the last synchronization.
    pub fn last_check(&self) -> u64 {
        self.last_check
    }

    pub fn state(&mut self) -> ResourceState {
        self.acquire();
        self.state
    }

    /// Whether a payload (real or fallback) can be accessed.
    pub fn is_available(&mut self) -> bool {
        self.acquire();
        self.data.is_some()
    }

    /// Current payload, or `Unavailable` when there is neither data nor a
    /// fallback.
    pub fn try_data(&mut self) -> Result<&T> {
        self.acquire();
        match &self.data {
            Some(data) => Ok(&**data),
            None => Err(ResourceError::Unavailable { key: self.key }),
        }
    }

    /// Current payload.
    ///
    /// # Panics
    /// If the resource is not available. Check [`is_available`](Self::is_available)
    /// or [`state`](Self::state) first, or use [`try_data`](Self::try_data).
    pub fn data(&mut self) -> &T {
        let key = self.key;
        match self.try_data() {
            Ok(data) => data,
            Err(_) => panic!("Resource: accessing not loaded data with key {}", key),
        }
    }

    /// Shared pointer to the current payload; stays valid after the entry
    /// is replaced.
    pub fn data_rc(&mut self) -> Option<Rc<T>> {
        self.acquire();
        self.data.clone()
    }

    fn acquire(&mut self) {
        // Final data never changes again.
        if self.state == ResourceState::Final {
            return;
        }
        let now = match &self.manager {
            Some(manager) => manager.last_change(),
            None => return,
        };
        // Nothing changed anywhere in the manager since the last check.
        if now <= self.last_check {
            return;
        }
        self.sync();
    }

    fn sync(&mut self) {
        let Some(manager) = &self.manager else {
            return;
        };
        let (data, state) = manager.snapshot(self.id);
        let now = manager.last_change();
        trace!(manager = %manager.label(), key = %self.key, from = self.last_check, to = now, state = %state, "resource resynchronized");
        self.last_check = now;
        self.state = state;
        self.data = data;
    }
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            manager: None,
            id: EntryId::default(),
            key: ResourceKey::default(),
            last_check: 0,
            state: ResourceState::Final,
            data: None,
        }
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        if let Some(manager) = &self.manager {
            manager.increment_reference_count(self.id);
        }
        Self {
            manager: self.manager.clone(),
            id: self.id,
            key: self.key,
            last_check: self.last_check,
            state: self.state,
            data: self.data.clone(),
        }
    }

    /// Assignment from another handle. The new entry is counted before the
    /// old one is released, so neither count passes through zero when both
    /// handles refer to the same entry.
    fn clone_from(&mut self, source: &Self) {
        if let Some(manager) = &source.manager {
            manager.increment_reference_count(source.id);
        }
        if let Some(manager) = &self.manager {
            manager.decrement_reference_count(self.id);
        }
        self.manager = source.manager.clone();
        self.id = source.id;
        self.key = source.key;
        self.last_check = source.last_check;
        self.state = source.state;
        self.data = source.data.clone();
    }
}

impl<T> Drop for Resource<T> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.take() {
            manager.decrement_reference_count(self.id);
        }
    }
}

impl<T> PartialEq for Resource<T> {
    fn eq(&self, other: &Self) -> bool {
        let same_manager = match (&self.manager, &other.manager) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_manager && self.key == other.key
    }
}

impl<T> Eq for Resource<T> {}

impl<T> Hash for Resource<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let owner = self
            .manager
            .as_ref()
            .map(|m| Rc::as_ptr(m) as usize)
            .unwrap_or(0);
        owner.hash(state);
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("last_check", &self.last_check)
            .field("bound", &self.is_bound())
            .finish()
    }
}
