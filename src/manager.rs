//! ResourceManager: owns the entry table, the shared fallback and the
//! change counter; mints `Resource` handles.

use crate::config::ManagerConfig;
use crate::entry_table::{EntryId, EntryTable};
use crate::error::{ResourceError, Result};
use crate::key::ResourceKey;
use crate::resource::Resource;
use crate::state::{observed_state, EntryState, ResourceDataState, ResourcePolicy, ResourceState};
use core::cell::{Cell, RefCell};
use core::fmt;
use std::borrow::Cow;
use std::rc::Rc;
use tracing::{debug, warn};

/// State shared between a manager and every handle it minted.
pub(crate) struct Shared<T> {
    label: Cow<'static, str>,
    table: RefCell<EntryTable<T>>,
    last_change: Cell<u64>,
    fallback: RefCell<Option<Rc<T>>>,
    // Set once the manager is dropped; entries are gone from then on.
    closed: Cell<bool>,
}

impl<T> Shared<T> {
    #[inline]
    pub(crate) fn last_change(&self) -> u64 {
        self.last_change.get()
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn increment_reference_count(&self, id: EntryId) {
        let table = self.table.borrow();
        match table.get(id) {
            Some(entry) => entry.refcount.increment(),
            None => debug_assert!(self.closed.get(), "handle refers to a missing entry"),
        }
    }

    /// Never removes the entry; removal happens only in `free()`.
    pub(crate) fn decrement_reference_count(&self, id: EntryId) {
        let table = self.table.borrow();
        match table.get(id) {
            Some(entry) => entry.refcount.decrement(),
            None => debug_assert!(self.closed.get(), "handle refers to a missing entry"),
        }
    }

    /// Current payload and observed state of an entry, with the fallback
    /// substituted when the entry has no data.
    pub(crate) fn snapshot(&self, id: EntryId) -> (Option<Rc<T>>, ResourceState) {
        let table = self.table.borrow();
        let (data, base) = match table.get(id) {
            Some(entry) => (entry.data.clone(), entry.state),
            None => (None, EntryState::NotLoaded),
        };
        self.resolve(data, base)
    }

    fn resolve(&self, data: Option<Rc<T>>, base: EntryState) -> (Option<Rc<T>>, ResourceState) {
        if data.is_some() {
            let state = observed_state(base, true, false);
            return (data, state);
        }
        let fallback = self.fallback.borrow().clone();
        let state = observed_state(base, false, fallback.is_some());
        (fallback, state)
    }

    fn bump(&self) -> u64 {
        let n = self.last_change.get() + 1;
        self.last_change.set(n);
        n
    }
}

/// Keyed, reference-counted cache of resources of one payload type.
///
/// Single-threaded: the manager and every handle derived from it are
/// `!Send`/`!Sync`. Loading is driven by the caller through `set`,
/// `mark_loading` and `mark_not_found`; the manager never blocks or
/// performs I/O.
pub struct ResourceManager<T> {
    shared: Rc<Shared<T>>,
}

impl<T> ResourceManager<T> {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                label: config.label,
                table: RefCell::new(EntryTable::with_capacity(config.capacity)),
                last_change: Cell::new(0),
                fallback: RefCell::new(None),
                closed: Cell::new(false),
            }),
        }
    }

    pub fn label(&self) -> &str {
        self.shared.label()
    }

    /// Change counter; advances once per successful mutation of any entry
    /// or of the fallback.
    pub fn last_change(&self) -> u64 {
        self.shared.last_change()
    }

    pub fn len(&self) -> usize {
        self.shared.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.table.borrow().is_empty()
    }

    pub fn contains(&self, key: impl Into<ResourceKey>) -> bool {
        self.shared.table.borrow().contains_key(key.into())
    }

    /// Keys of all entries currently in the table.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.shared.table.borrow().iter().map(|(_, e)| e.key).collect()
    }

    /// Handle to the resource named by `key`.
    ///
    /// Creates an empty `NotLoaded` entry if none exists. The returned handle
    /// holds one reference and is synchronized with the current state.
    pub fn get(&self, key: impl Into<ResourceKey>) -> Resource<T> {
        let key = key.into();
        let id = {
            let mut table = self.shared.table.borrow_mut();
            let (id, entry) = table.find_or_insert(key);
            entry.refcount.increment();
            id
        };
        Resource::bound(self.shared.clone(), id, key)
    }

    /// Install `data` in `state` for `key`, keeping the entry's policy.
    ///
    /// `data` must be present iff `state` is `Mutable` or `Final`. Fails
    /// without side effects if the entry is already `Final`.
    pub fn set(
        &mut self,
        key: impl Into<ResourceKey>,
        data: Option<T>,
        state: ResourceDataState,
    ) -> Result<()> {
        self.install(key.into(), data, state, None)
    }

    /// Like [`set`](Self::set), also replacing the entry's policy.
    pub fn set_with_policy(
        &mut self,
        key: impl Into<ResourceKey>,
        data: Option<T>,
        state: ResourceDataState,
        policy: ResourcePolicy,
    ) -> Result<()> {
        self.install(key.into(), data, state, Some(policy))
    }

    /// Record that a producer started loading `key`. Drops any current data.
    pub fn mark_loading(&mut self, key: impl Into<ResourceKey>) -> Result<()> {
        self.transition(key.into(), None, EntryState::Loading, None)
    }

    /// Record that `key` could not be loaded; also cancels a pending load.
    pub fn mark_not_found(&mut self, key: impl Into<ResourceKey>) -> Result<()> {
        self.install(key.into(), None, ResourceDataState::NotFound, None)
    }

    fn install(
        &mut self,
        key: ResourceKey,
        data: Option<T>,
        state: ResourceDataState,
        policy: Option<ResourcePolicy>,
    ) -> Result<()> {
        if state.requires_data() != data.is_some() {
            warn!(manager = %self.label(), key = %key, state = %state, "rejected set: data/state mismatch");
            return Err(ResourceError::DataMismatch { key, state });
        }
        self.transition(key, data.map(Rc::new), state.into(), policy)
    }

    fn transition(
        &mut self,
        key: ResourceKey,
        data: Option<Rc<T>>,
        state: EntryState,
        policy: Option<ResourcePolicy>,
    ) -> Result<()> {
        let previous = {
            let mut table = self.shared.table.borrow_mut();
            let (_, entry) = table.find_or_insert(key);
            if entry.state == EntryState::Final {
                warn!(manager = %self.shared.label(), key = %key, requested = %state, "rejected change of final resource");
                return Err(ResourceError::InvalidState {
                    key,
                    state: entry.state,
                });
            }
            entry.state = state;
            if let Some(policy) = policy {
                entry.policy = policy;
            }
            core::mem::replace(&mut entry.data, data)
        };
        // Advance only after the new data is in place.
        let change = self.shared.bump();
        debug!(manager = %self.label(), key = %key, state = %state, change, "resource updated");
        // Released outside the table borrow; the payload's Drop may release handles.
        drop(previous);
        Ok(())
    }

    /// Install or replace the payload substituted for entries without data.
    pub fn set_fallback(&mut self, data: T) {
        self.replace_fallback(Some(Rc::new(data)));
    }

    pub fn clear_fallback(&mut self) {
        self.replace_fallback(None);
    }

    fn replace_fallback(&mut self, data: Option<Rc<T>>) {
        let present = data.is_some();
        let previous = self.shared.fallback.replace(data);
        let change = self.shared.bump();
        debug!(manager = %self.label(), present, change, "fallback updated");
        drop(previous);
    }

    pub fn fallback(&self) -> Option<Rc<T>> {
        self.shared.fallback.borrow().clone()
    }

    /// State of `key` as a handle would observe it, including fallback
    /// substitution. Absent keys report `NotLoaded` (or its fallback variant).
    pub fn state(&self, key: impl Into<ResourceKey>) -> ResourceState {
        let (data, base) = {
            let table = self.shared.table.borrow();
            match table.entry(key.into()) {
                Some(entry) => (entry.data.is_some(), entry.state),
                None => (false, EntryState::NotLoaded),
            }
        };
        let has_fallback = self.shared.fallback.borrow().is_some();
        observed_state(base, data, has_fallback)
    }

    /// Number of live handles for `key`; zero for absent keys.
    pub fn reference_count(&self, key: impl Into<ResourceKey>) -> usize {
        self.shared
            .table
            .borrow()
            .entry(key.into())
            .map(|e| e.refcount.get())
            .unwrap_or(0)
    }

    /// Policy of the entry for `key`, if it exists.
    pub fn policy(&self, key: impl Into<ResourceKey>) -> Option<ResourcePolicy> {
        self.shared.table.borrow().entry(key.into()).map(|e| e.policy)
    }

    /// Remove every entry with no live handles that is neither `Final` nor
    /// `Resident`. Returns the number of removed entries.
    ///
    /// Never called implicitly; invoke it at a controlled point such as once
    /// per frame.
    pub fn free(&mut self) -> usize {
        let removed = self.shared.table.borrow_mut().sweep();
        let n = removed.len();
        if n > 0 {
            debug!(manager = %self.label(), removed = n, remaining = self.len(), "freed unused resources");
        }
        drop(removed);
        n
    }
}

impl<T> Default for ResourceManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases every entry and the fallback. Handles that outlive the manager
/// keep a `Final` snapshot; any other handle resynchronizes to `NotLoaded`.
impl<T> Drop for ResourceManager<T> {
    fn drop(&mut self) {
        self.shared.closed.set(true);
        let change = self.shared.bump();
        let fallback = self.shared.fallback.take();
        let mut released = 0;
        // Dropping a payload may release handles it holds; repeat until
        // nothing is left.
        loop {
            let drained = self.shared.table.borrow_mut().drain();
            if drained.is_empty() {
                break;
            }
            released += drained.len();
            drop(drained);
        }
        debug!(manager = %self.label(), released, change, "manager dropped");
        drop(fallback);
    }
}

impl<T> fmt::Debug for ResourceManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("label", &self.label())
            .field("len", &self.len())
            .field("last_change", &self.last_change())
            .field("has_fallback", &self.shared.fallback.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceDataState::{Final, Mutable, NotFound};

    #[test]
    fn get_creates_not_loaded_entry() {
        let m: ResourceManager<i32> = ResourceManager::new();
        assert!(!m.contains("a"));
        let r = m.get("a");
        assert!(m.contains("a"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.state("a"), ResourceState::NotLoaded);
        assert_eq!(m.reference_count("a"), 1);
        assert_eq!(m.last_change(), 0, "get does not count as a change");
        drop(r);
        assert_eq!(m.reference_count("a"), 0);
        assert!(m.contains("a"), "entries are only removed by free()");
    }

    #[test]
    fn set_creates_entry_and_bumps_counter_once() {
        let mut m = ResourceManager::new();
        m.set("a", Some(1), Mutable).unwrap();
        assert_eq!(m.last_change(), 1);
        assert_eq!(m.state("a"), ResourceState::Mutable);
        assert_eq!(m.reference_count("a"), 0);
        m.set("a", Some(2), Mutable).unwrap();
        assert_eq!(m.last_change(), 2);
    }

    #[test]
    fn final_rejects_every_mutation_without_bumping() {
        let mut m = ResourceManager::new();
        m.set("a", Some(1), Final).unwrap();
        let before = m.last_change();

        let err = m.set("a", Some(2), Mutable).unwrap_err();
        assert_eq!(
            err,
            ResourceError::InvalidState {
                key: ResourceKey::new("a"),
                state: EntryState::Final
            }
        );
        assert!(m.set("a", Some(3), Final).is_err());
        assert!(m.mark_loading("a").is_err());
        assert!(m.mark_not_found("a").is_err());
        assert!(m
            .set_with_policy("a", Some(4), Mutable, ResourcePolicy::Resident)
            .is_err());

        assert_eq!(m.last_change(), before);
        assert_eq!(m.state("a"), ResourceState::Final);
        assert_eq!(*m.get("a").data(), 1);
        assert_eq!(m.policy("a"), Some(ResourcePolicy::Manual));
    }

    #[test]
    fn data_must_match_state() {
        let mut m: ResourceManager<i32> = ResourceManager::new();
        assert!(matches!(
            m.set("a", None, Mutable),
            Err(ResourceError::DataMismatch { state: Mutable, .. })
        ));
        assert!(matches!(
            m.set("a", None, Final),
            Err(ResourceError::DataMismatch { .. })
        ));
        assert!(matches!(
            m.set("a", Some(1), NotFound),
            Err(ResourceError::DataMismatch { .. })
        ));
        assert_eq!(m.last_change(), 0);
        assert!(!m.contains("a"));
    }

    #[test]
    fn loading_transitions() {
        let mut m = ResourceManager::new();
        let _r = m.get("tex");
        m.mark_loading("tex").unwrap();
        assert_eq!(m.state("tex"), ResourceState::Loading);
        m.set("tex", Some(5), Mutable).unwrap();
        assert_eq!(m.state("tex"), ResourceState::Mutable);

        // Reload drops the old data until the new one arrives.
        m.mark_loading("tex").unwrap();
        assert_eq!(m.state("tex"), ResourceState::Loading);
        m.mark_not_found("tex").unwrap();
        assert_eq!(m.state("tex"), ResourceState::NotFound);

        // Retrying after NotFound is allowed.
        m.set("tex", Some(6), Final).unwrap();
        assert_eq!(m.state("tex"), ResourceState::Final);
        assert_eq!(m.last_change(), 5);
    }

    #[test]
    fn state_applies_fallback_substitution() {
        let mut m = ResourceManager::new();
        m.set_fallback(0);
        assert_eq!(m.state("missing"), ResourceState::NotLoadedFallback);
        m.mark_loading("l").unwrap();
        assert_eq!(m.state("l"), ResourceState::LoadingFallback);
        m.mark_not_found("n").unwrap();
        assert_eq!(m.state("n"), ResourceState::NotFoundFallback);
        m.set("d", Some(1), Mutable).unwrap();
        assert_eq!(m.state("d"), ResourceState::Mutable);

        m.clear_fallback();
        assert_eq!(m.state("n"), ResourceState::NotFound);
        assert!(m.fallback().is_none());
    }

    #[test]
    fn fallback_changes_bump_counter() {
        let mut m = ResourceManager::new();
        m.set_fallback(1);
        m.set_fallback(2);
        m.clear_fallback();
        assert_eq!(m.last_change(), 3);
    }

    #[test]
    fn free_sweeps_only_unreferenced_non_final_non_resident() {
        let mut m = ResourceManager::new();
        let held = m.get("held");
        m.set("mutable", Some(1), Mutable).unwrap();
        m.set("final", Some(2), Final).unwrap();
        m.set_with_policy("resident", Some(3), Mutable, ResourcePolicy::Resident)
            .unwrap();
        m.mark_not_found("missing").unwrap();
        drop(m.get("touched"));

        assert_eq!(m.free(), 3);
        assert!(m.contains("held"));
        assert!(m.contains("final"));
        assert!(m.contains("resident"));
        assert!(!m.contains("mutable"));
        assert!(!m.contains("missing"));
        assert!(!m.contains("touched"));
        assert_eq!(m.free(), 0);
        drop(held);
        assert_eq!(m.free(), 1);
    }

    #[test]
    fn set_keeps_policy_unless_given() {
        let mut m = ResourceManager::new();
        m.set_with_policy("a", Some(1), Mutable, ResourcePolicy::Resident)
            .unwrap();
        m.set("a", Some(2), Mutable).unwrap();
        assert_eq!(m.policy("a"), Some(ResourcePolicy::Resident));
        assert_eq!(m.policy("b"), None);
    }

    #[test]
    fn config_label_and_capacity() {
        let m: ResourceManager<u8> =
            ResourceManager::with_config(ManagerConfig::default().with_label("shaders").with_capacity(8));
        assert_eq!(m.label(), "shaders");
        assert!(m.is_empty());
        let dbg = format!("{:?}", m);
        assert!(dbg.contains("shaders"));
    }

    #[test]
    fn keys_lists_entries() {
        let mut m = ResourceManager::new();
        m.set("a", Some(1), Mutable).unwrap();
        let _b = m.get("b");
        let mut keys = m.keys();
        keys.sort();
        let mut expected = vec![ResourceKey::new("a"), ResourceKey::new("b")];
        expected.sort();
        assert_eq!(keys, expected);
    }
}
