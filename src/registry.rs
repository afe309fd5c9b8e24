//! ResourceRegistry: one `ResourceManager<T>` per payload type.

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::key::ResourceKey;
use crate::manager::ResourceManager;
use crate::resource::Resource;
use crate::state::{ResourceDataState, ResourceState};
use core::any::{type_name, Any, TypeId};
use core::fmt;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// Type-erased view of a manager, enough to sweep and report on it.
trait ErasedManager {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn free(&mut self) -> usize;
    fn len(&self) -> usize;
    fn label(&self) -> &str;
}

impl<T: 'static> ErasedManager for ResourceManager<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn free(&mut self) -> usize {
        ResourceManager::free(self)
    }
    fn len(&self) -> usize {
        ResourceManager::len(self)
    }
    fn label(&self) -> &str {
        ResourceManager::label(self)
    }
}

/// Collection of resource managers keyed by payload type.
///
/// Managers are created on first use with their type name as label, or
/// explicitly through [`register`](Self::register).
#[derive(Default)]
pub struct ResourceRegistry {
    managers: FxHashMap<TypeId, Box<dyn ErasedManager>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the manager for `T` with `config`. An existing manager is
    /// kept as is.
    pub fn register<T: 'static>(&mut self, config: ManagerConfig) -> &mut ResourceManager<T> {
        let id = TypeId::of::<T>();
        if self.managers.contains_key(&id) {
            warn!(ty = type_name::<T>(), "manager already registered, keeping existing");
        } else {
            debug!(ty = type_name::<T>(), label = %config.label, "registered manager");
            self.managers
                .insert(id, Box::new(ResourceManager::<T>::with_config(config)));
        }
        self.manager_mut::<T>()
    }

    pub fn manager<T: 'static>(&self) -> Option<&ResourceManager<T>> {
        self.managers
            .get(&TypeId::of::<T>())
            .and_then(|m| m.as_any().downcast_ref::<ResourceManager<T>>())
    }

    /// Manager for `T`, created on demand.
    pub fn manager_mut<T: 'static>(&mut self) -> &mut ResourceManager<T> {
        let slot = self.managers.entry(TypeId::of::<T>()).or_insert_with(|| {
            Box::new(ResourceManager::<T>::with_config(
                ManagerConfig::default().with_label(type_name::<T>()),
            ))
        });
        match slot.as_any_mut().downcast_mut::<ResourceManager<T>>() {
            Some(m) => m,
            None => unreachable!("manager stored under the TypeId of another type"),
        }
    }

    pub fn get<T: 'static>(&mut self, key: impl Into<ResourceKey>) -> Resource<T> {
        self.manager_mut::<T>().get(key)
    }

    pub fn set<T: 'static>(
        &mut self,
        key: impl Into<ResourceKey>,
        data: Option<T>,
        state: ResourceDataState,
    ) -> Result<()> {
        self.manager_mut::<T>().set(key, data, state)
    }

    pub fn set_fallback<T: 'static>(&mut self, data: T) {
        self.manager_mut::<T>().set_fallback(data);
    }

    pub fn state<T: 'static>(&self, key: impl Into<ResourceKey>) -> ResourceState {
        match self.manager::<T>() {
            Some(m) => m.state(key),
            None => ResourceState::NotLoaded,
        }
    }

    pub fn reference_count<T: 'static>(&self, key: impl Into<ResourceKey>) -> usize {
        self.manager::<T>()
            .map(|m| m.reference_count(key))
            .unwrap_or(0)
    }

    /// Sweep every manager; returns the total number of removed entries.
    pub fn free(&mut self) -> usize {
        self.managers.values_mut().map(|m| m.free()).sum()
    }

    /// Number of entries across all managers.
    pub fn len(&self) -> usize {
        self.managers.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of payload types with a manager.
    pub fn type_count(&self) -> usize {
        self.managers.len()
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<&str> = self.managers.values().map(|m| m.label()).collect();
        labels.sort_unstable();
        f.debug_struct("ResourceRegistry")
            .field("managers", &labels)
            .finish()
    }
}
