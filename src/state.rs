//! Resource states as stored by the manager and as observed by handles.

use core::fmt;

/// State observed through a [`Resource`](crate::Resource) or
/// [`ResourceManager::state`](crate::ResourceManager::state).
///
/// The `*Fallback` variants are never stored; they are derived at read
/// time when an entry has no data and a fallback is registered.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResourceState {
    /// Not loaded and no fallback is available.
    NotLoaded,
    /// Not loaded; the fallback is used instead.
    NotLoadedFallback,
    /// Loading and no fallback is available.
    Loading,
    /// Loading; the fallback is used instead.
    LoadingFallback,
    /// Not found and no fallback is available.
    NotFound,
    /// Not found; the fallback is used instead.
    NotFoundFallback,
    /// Loaded, but the manager may replace it at any time.
    Mutable,
    /// Loaded and never changed by the manager again.
    Final,
}

impl ResourceState {
    /// Whether the state carries the fallback payload.
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            ResourceState::NotLoadedFallback
                | ResourceState::LoadingFallback
                | ResourceState::NotFoundFallback
        )
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::NotLoaded => "NotLoaded",
            ResourceState::NotLoadedFallback => "NotLoadedFallback",
            ResourceState::Loading => "Loading",
            ResourceState::LoadingFallback => "LoadingFallback",
            ResourceState::NotFound => "NotFound",
            ResourceState::NotFoundFallback => "NotFoundFallback",
            ResourceState::Mutable => "Mutable",
            ResourceState::Final => "Final",
        };
        f.write_str(s)
    }
}

/// State a producer may install with [`ResourceManager::set`](crate::ResourceManager::set).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResourceDataState {
    /// Loading failed or was cancelled; carries no data.
    NotFound,
    /// Loaded; may be replaced later.
    Mutable,
    /// Loaded; sealed forever.
    Final,
}

impl ResourceDataState {
    /// Whether data must accompany this state.
    pub fn requires_data(self) -> bool {
        !matches!(self, ResourceDataState::NotFound)
    }
}

impl fmt::Display for ResourceDataState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&EntryState::from(*self), f)
    }
}

/// Base state stored in an entry.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum EntryState {
    #[default]
    NotLoaded,
    Loading,
    NotFound,
    Mutable,
    Final,
}

impl From<ResourceDataState> for EntryState {
    fn from(s: ResourceDataState) -> Self {
        match s {
            ResourceDataState::NotFound => EntryState::NotFound,
            ResourceDataState::Mutable => EntryState::Mutable,
            ResourceDataState::Final => EntryState::Final,
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryState::NotLoaded => "NotLoaded",
            EntryState::Loading => "Loading",
            EntryState::NotFound => "NotFound",
            EntryState::Mutable => "Mutable",
            EntryState::Final => "Final",
        };
        f.write_str(s)
    }
}

/// Whether [`ResourceManager::free`](crate::ResourceManager::free) may
/// sweep an unreferenced entry.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ResourcePolicy {
    /// Swept by `free()` once no handle references it.
    #[default]
    Manual,
    /// Kept until the manager is dropped.
    Resident,
}

/// Map a stored state to the observed one.
///
/// Pure function of the base state, whether the entry has data and
/// whether a fallback is registered.
pub fn observed_state(base: EntryState, has_data: bool, has_fallback: bool) -> ResourceState {
    if has_data {
        return match base {
            EntryState::Final => ResourceState::Final,
            _ => ResourceState::Mutable,
        };
    }
    if has_fallback {
        return match base {
            EntryState::Loading => ResourceState::LoadingFallback,
            EntryState::NotFound => ResourceState::NotFoundFallback,
            _ => ResourceState::NotLoadedFallback,
        };
    }
    match base {
        EntryState::Loading => ResourceState::Loading,
        EntryState::NotFound => ResourceState::NotFound,
        _ => ResourceState::NotLoaded,
    }
}
