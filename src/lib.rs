//! resource-cache: a single-threaded, key-addressed, reference-counted
//! cache of shared resources (textures, shaders, meshes, fonts) with
//! handles that cheaply detect when the resource they point at changed.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: let many consumers hold "the resource named K" while a producer
//!   loads, replaces, seals or substitutes a fallback for it, and let each
//!   consumer notice changes without a map lookup on every access.
//! - Layers:
//!   - EntryTable<T>: structural storage. Entries live in a generational
//!     slot map indexed by `ResourceKey`; slot ids stay valid for as long
//!     as the entry exists.
//!   - ResourceManager<T>: owns the table, the shared fallback and a
//!     monotonically increasing change counter. All mutation goes through
//!     it (`set`, `mark_loading`, `mark_not_found`, `set_fallback`, `free`).
//!   - Resource<T>: per-consumer handle. Holds one reference on its entry,
//!     caches the slot id and a snapshot `(data, state, last_check)`.
//!   - ResourceRegistry: one manager per payload type.
//!
//! Acquisition
//! - Every observation of a handle runs `acquire`:
//!   1. a `Final` snapshot is returned as is, forever;
//!   2. if the change counter is not above `last_check`, the snapshot is
//!      returned as is;
//!   3. otherwise the entry is re-read through the cached slot id, the
//!      counter is recorded and the fallback is substituted when the entry
//!      has no data (`Loading -> LoadingFallback`, `NotFound ->
//!      NotFoundFallback`, otherwise `NotLoadedFallback`).
//! - The counter advances strictly after new data is installed, so a `set`
//!   is visible to every handle's next acquisition and never before it.
//!
//! Reference counting
//! - `get` and `Clone` increment, `Drop` decrements, moves transfer.
//!   `clone_from` increments the new entry before releasing the old one.
//! - Counts never remove entries. `free()` sweeps entries with no handles
//!   that are neither `Final` nor `Resident`; callers run it at a
//!   controlled point (e.g. once per frame).
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by construction (`Rc`, `Cell`).
//!   Multi-threaded use needs one external lock around the manager and all
//!   of its handles.
//! - No I/O and no blocking; `Loading` only records that some producer
//!   started. Cancel a load with `mark_not_found`.
//! - Payloads are stored as `Rc<T>`. A handle's snapshot stays valid until
//!   its next acquisition even if the entry was replaced meanwhile.
//! - Payloads removed by the manager are dropped after its internal borrow
//!   is released, so a payload's `Drop` may release handles of the same
//!   manager.
//! - Dropping the manager drains every entry and the fallback. Handles that
//!   outlive it keep a `Final` snapshot and otherwise report `NotLoaded`.
//!
//! Overflow semantics
//! - Reference-count overflow aborts, matching `Rc`.
//!
//! Notes and non-goals
//! - Key collisions are not detected; two names with the same hash share
//!   one entry.
//! - No eviction beyond `free()`, no persistence, no async loading.

mod config;
mod entry_table;
mod entry_table_proptest;
mod error;
mod key;
mod manager;
mod refcount;
mod registry;
mod resource;
mod state;

// Public surface
pub use config::ManagerConfig;
pub use error::{ResourceError, Result};
pub use key::ResourceKey;
pub use manager::ResourceManager;
pub use registry::ResourceRegistry;
pub use resource::Resource;
pub use state::{observed_state, EntryState, ResourceDataState, ResourcePolicy, ResourceState};
