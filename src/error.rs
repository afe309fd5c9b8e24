use crate::key::ResourceKey;
use crate::state::{EntryState, ResourceDataState};
use thiserror::Error;

/// Usage errors reported by the manager and by handles.
///
/// Domain states such as `NotFound` or `Loading` are never errors; they are
/// reported through [`ResourceState`](crate::ResourceState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The entry is `Final` and cannot change anymore.
    #[error("cannot change already final resource {key} (state {state})")]
    InvalidState { key: ResourceKey, state: EntryState },

    /// Data must be present iff the installed state is `Mutable` or `Final`.
    #[error("resource {key}: data should be present if and only if the state is Mutable or Final (got {state})")]
    DataMismatch {
        key: ResourceKey,
        state: ResourceDataState,
    },

    /// A payload was accessed through a handle that has none.
    #[error("accessing not loaded data with key {key}")]
    Unavailable { key: ResourceKey },
}

pub type Result<T> = std::result::Result<T, ResourceError>;
