//! EntryTable: structural layer mapping resource keys to entries with
//! stable slot ids.
//!
//! Entries live in a generational `SlotMap`; a `HashTable` indexes them by
//! key. The key is already a hash, so indexing uses its value directly and
//! never calls a hasher.

use crate::key::ResourceKey;
use crate::refcount::RefCount;
use crate::state::{EntryState, ResourcePolicy};
use hashbrown::HashTable;
use slotmap::{new_key_type, SlotMap};
use std::rc::Rc;

new_key_type! {
    /// Stable id of an entry slot. Valid for as long as the entry exists.
    pub struct EntryId;
}

/// Manager-owned record for one key.
#[derive(Debug)]
pub struct Entry<T> {
    pub key: ResourceKey,
    pub data: Option<Rc<T>>,
    pub state: EntryState,
    pub policy: ResourcePolicy,
    pub refcount: RefCount,
}

impl<T> Entry<T> {
    fn new(key: ResourceKey) -> Self {
        Self {
            key,
            data: None,
            state: EntryState::NotLoaded,
            policy: ResourcePolicy::Manual,
            refcount: RefCount::new(0),
        }
    }

    /// Whether `free()` may remove this entry.
    pub fn is_sweepable(&self) -> bool {
        self.refcount.get() == 0
            && self.state != EntryState::Final
            && self.policy != ResourcePolicy::Resident
    }
}

pub struct EntryTable<T> {
    index: HashTable<EntryId>,
    slots: SlotMap<EntryId, Entry<T>>,
}

impl<T> Default for EntryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntryTable<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn find(&self, key: ResourceKey) -> Option<EntryId> {
        self.index
            .find(key.value(), |&id| {
                self.slots.get(id).map(|e| e.key == key).unwrap_or(false)
            })
            .copied()
    }

    pub fn contains_key(&self, key: ResourceKey) -> bool {
        self.find(key).is_some()
    }

    /// Entry for `key`, creating an empty `NotLoaded` one if absent.
    pub fn find_or_insert(&mut self, key: ResourceKey) -> (EntryId, &mut Entry<T>) {
        let id = match self.index.entry(
            key.value(),
            |&id| self.slots.get(id).map(|e| e.key == key).unwrap_or(false),
            |&id| self.slots.get(id).map(|e| e.key.value()).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(o) => *o.get(),
            hashbrown::hash_table::Entry::Vacant(v) => {
                let id = self.slots.insert(Entry::new(key));
                let _ = v.insert(id);
                id
            }
        };
        (id, &mut self.slots[id])
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry<T>> {
        self.slots.get(id)
    }

    pub fn entry(&self, key: ResourceKey) -> Option<&Entry<T>> {
        self.find(key).and_then(|id| self.slots.get(id))
    }

    pub fn remove(&mut self, id: EntryId) -> Option<Entry<T>> {
        let entry = self.slots.remove(id)?;

        // Unlink from index
        if let Ok(occupied) = self.index.find_entry(entry.key.value(), |&kk| kk == id) {
            occupied.remove();
        }

        Some(entry)
    }

    /// Unlink every sweepable entry and hand the removed entries back so
    /// the caller controls when their payloads are dropped.
    pub fn sweep(&mut self) -> Vec<Entry<T>> {
        let doomed: Vec<EntryId> = self
            .slots
            .iter()
            .filter(|(_, e)| e.is_sweepable())
            .map(|(id, _)| id)
            .collect();
        doomed.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Unlink every entry, handing them back like [`sweep`](Self::sweep).
    pub fn drain(&mut self) -> Vec<Entry<T>> {
        self.index.clear();
        self.slots.drain().map(|(_, entry)| entry).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Entry<T>)> {
        self.slots.iter()
    }
}
