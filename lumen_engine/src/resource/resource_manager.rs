/// Resource manager - lazily loaded, shared resources keyed by (type, id)
///
/// Each resource type has at most one loader. `load` resolves the id against
/// the search paths (first match wins), parses the JSON description and hands
/// it to the loader. Every (type, id) is loaded at most once: concurrent
/// callers wait for the in-flight load, later callers get the cached handle
/// or the cached failure.
///
/// The loader runs without the table lock held, so loaders may themselves
/// call back into the manager for other resources.

use std::any::{Any, TypeId};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::resource::handle::ResourceHandle;

new_key_type! {
    /// Key of a slot in the manager's resource arena
    pub struct ResourceSlotKey;
}

type AnyResource = Arc<dyn Any + Send + Sync>;
type LoaderFn = Box<dyn Fn(&LoadRequest) -> Result<AnyResource> + Send + Sync>;

/// Everything a loader gets to build one resource
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Identifier being loaded (relative path of the description)
    pub id: String,
    /// Resolved path of the description file
    pub path: PathBuf,
    /// Directory holding the description; data files are relative to it
    pub directory: PathBuf,
    /// Parsed description
    pub description: serde_json::Value,
}

/// Externally visible state of a (type, id)
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed(Error),
}

#[derive(Clone)]
enum SlotState {
    Loading,
    Loaded(AnyResource),
    Failed(Error),
}

struct ResourceSlot {
    id: Arc<str>,
    state: SlotState,
}

#[derive(Default)]
struct ResourceTable {
    slots: SlotMap<ResourceSlotKey, ResourceSlot>,
    index: FxHashMap<(TypeId, String), ResourceSlotKey>,
}

impl ResourceTable {
    fn slot(&self, type_id: TypeId, id: &str) -> Option<&ResourceSlot> {
        let key = self.index.get(&(type_id, id.to_string()))?;
        self.slots.get(*key)
    }

    fn insert(&mut self, type_id: TypeId, id: &str, state: SlotState) -> (ResourceSlotKey, Arc<str>) {
        let shared_id: Arc<str> = Arc::from(id);
        let key = self.slots.insert(ResourceSlot {
            id: shared_id.clone(),
            state,
        });
        self.index.insert((type_id, id.to_string()), key);
        (key, shared_id)
    }
}

pub struct ResourceManager {
    search_paths: Vec<PathBuf>,
    loaders: FxHashMap<TypeId, LoaderFn>,
    table: Mutex<ResourceTable>,
    /// Signalled whenever a slot leaves the Loading state
    load_finished: Condvar,
}

impl ResourceManager {
    /// Create an empty manager (no search paths, no loaders)
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            loaders: FxHashMap::default(),
            table: Mutex::new(ResourceTable::default()),
            load_finished: Condvar::new(),
        }
    }

    // The table is only mutated in short sections that cannot panic, so a
    // poisoned lock still guards consistent data.
    fn lock_table(&self) -> MutexGuard<'_, ResourceTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== SEARCH PATHS =====

    /// Append a directory to the search paths (no I/O)
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First search path holding `id` as a file
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|directory| directory.join(id))
            .find(|candidate| candidate.is_file())
    }

    // ===== LOADERS =====

    /// Register the loader for resource type `T`
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `T` already has a loader.
    pub fn register_loader<T, F>(&mut self, loader: F) -> Result<()>
    where
        T: Any + Send + Sync,
        F: Fn(&LoadRequest) -> Result<T> + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        if self.loaders.contains_key(&type_id) {
            crate::engine_bail!(
                "lumen::ResourceManager",
                Error::AlreadyExists(format!("loader for {}", std::any::type_name::<T>()))
            );
        }
        self.loaders.insert(
            type_id,
            Box::new(move |request| loader(request).map(|resource| Arc::new(resource) as AnyResource)),
        );
        Ok(())
    }

    pub fn has_loader<T: Any>(&self) -> bool {
        self.loaders.contains_key(&TypeId::of::<T>())
    }

    // ===== LOADING =====

    /// Get `id` as a `T`, loading it on first request
    ///
    /// # Errors
    ///
    /// - `NotFound` when `T` has no loader or no search path holds `id`
    /// - `Io` / `InvalidAsset` when the description cannot be read or parsed
    /// - whatever the loader returned
    ///
    /// A failure is cached: later calls return it again until `remove`.
    pub fn load<T: Any + Send + Sync>(&self, id: &str) -> Result<ResourceHandle<T>> {
        let type_id = TypeId::of::<T>();

        let (slot_key, shared_id) = {
            let mut table = self.lock_table();
            loop {
                match table.slot(type_id, id).map(|slot| (slot.id.clone(), slot.state.clone())) {
                    Some((shared_id, SlotState::Loaded(resource))) => {
                        return downcast(shared_id, resource);
                    }
                    Some((_, SlotState::Failed(error))) => return Err(error),
                    Some((_, SlotState::Loading)) => {
                        table = self
                            .load_finished
                            .wait(table)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    None => break table.insert(type_id, id, SlotState::Loading),
                }
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_loader::<T>(id)))
            .unwrap_or_else(|_| {
                Err(Error::InvalidResource(format!("loader for '{}' panicked", id)))
            });

        {
            let mut table = self.lock_table();
            if let Some(slot) = table.slots.get_mut(slot_key) {
                slot.state = match &outcome {
                    Ok(resource) => SlotState::Loaded(resource.clone()),
                    Err(error) => SlotState::Failed(error.clone()),
                };
            }
        }
        self.load_finished.notify_all();

        match outcome {
            Ok(resource) => {
                crate::engine_debug!(
                    "lumen::ResourceManager",
                    "Loaded {} '{}'",
                    std::any::type_name::<T>(),
                    id
                );
                downcast(shared_id, resource)
            }
            Err(error) => {
                crate::engine_error!("lumen::ResourceManager", "Failed to load '{}': {}", id, error);
                Err(error)
            }
        }
    }

    fn run_loader<T: Any>(&self, id: &str) -> Result<AnyResource> {
        let loader = self.loaders.get(&TypeId::of::<T>()).ok_or_else(|| {
            Error::NotFound(format!(
                "no loader registered for {} (loading '{}')",
                std::any::type_name::<T>(),
                id
            ))
        })?;
        let path = self.resolve(id).ok_or_else(|| {
            Error::NotFound(format!("'{}' in search paths {:?}", id, self.search_paths))
        })?;
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let description = serde_json::from_str(&content)
            .map_err(|e| Error::invalid_asset(id, "description", e.to_string()))?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        loader(&LoadRequest {
            id: id.to_string(),
            path,
            directory,
            description,
        })
    }

    /// Insert an already built resource under `id`
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `id` is present for `T` in any state (a failed or
    /// in-flight load counts as present).
    pub fn register_resource<T: Any + Send + Sync>(&self, id: &str, resource: T) -> Result<ResourceHandle<T>> {
        let type_id = TypeId::of::<T>();
        let resource = Arc::new(resource);
        let mut table = self.lock_table();
        if table.slot(type_id, id).is_some() {
            crate::engine_bail!(
                "lumen::ResourceManager",
                Error::AlreadyExists(format!("{} '{}'", std::any::type_name::<T>(), id))
            );
        }
        let (_, shared_id) = table.insert(type_id, id, SlotState::Loaded(resource.clone()));
        Ok(ResourceHandle::new(shared_id, resource))
    }

    // ===== QUERIES =====

    /// Loaded resource, without triggering a load
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Option<ResourceHandle<T>> {
        let table = self.lock_table();
        match table.slot(TypeId::of::<T>(), id) {
            Some(ResourceSlot { id, state: SlotState::Loaded(resource) }) => {
                downcast(id.clone(), resource.clone()).ok()
            }
            _ => None,
        }
    }

    pub fn status<T: Any>(&self, id: &str) -> ResourceStatus {
        let table = self.lock_table();
        match table.slot(TypeId::of::<T>(), id).map(|slot| &slot.state) {
            None => ResourceStatus::Unloaded,
            Some(SlotState::Loading) => ResourceStatus::Loading,
            Some(SlotState::Loaded(_)) => ResourceStatus::Loaded,
            Some(SlotState::Failed(error)) => ResourceStatus::Failed(error.clone()),
        }
    }

    /// True if `id` is present for `T` in any state
    pub fn contains<T: Any>(&self, id: &str) -> bool {
        self.lock_table().slot(TypeId::of::<T>(), id).is_some()
    }

    /// Number of entries, whatever their state
    pub fn len(&self) -> usize {
        self.lock_table().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ===== REMOVAL =====

    /// Forget `id` so the next `load` starts over
    ///
    /// Outstanding handles stay valid. Returns false when nothing was removed
    /// (absent, or a load is still in flight).
    pub fn remove<T: Any>(&self, id: &str) -> bool {
        let mut table = self.lock_table();
        let index_key = (TypeId::of::<T>(), id.to_string());
        let Some(&key) = table.index.get(&index_key) else {
            return false;
        };
        if matches!(table.slots.get(key).map(|slot| &slot.state), Some(SlotState::Loading)) {
            return false;
        }
        table.index.remove(&index_key);
        table.slots.remove(key);
        true
    }

    /// Drop loaded resources no handle references any more
    ///
    /// Call between frames. Failed entries are kept. Returns the number of
    /// dropped entries.
    pub fn collect_unused(&self) -> usize {
        let mut table = self.lock_table();
        let unused: Vec<ResourceSlotKey> = table
            .slots
            .iter()
            .filter(|(_, slot)| {
                matches!(&slot.state, SlotState::Loaded(resource) if Arc::strong_count(resource) == 1)
            })
            .map(|(key, _)| key)
            .collect();
        let table = &mut *table;
        for key in &unused {
            table.slots.remove(*key);
        }
        let slots = &table.slots;
        table.index.retain(|_, key| slots.contains_key(*key));
        if !unused.is_empty() {
            crate::engine_debug!("lumen::ResourceManager", "Collected {} unused resources", unused.len());
        }
        unused.len()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Any + Send + Sync>(id: Arc<str>, resource: AnyResource) -> Result<ResourceHandle<T>> {
    let resource = resource.downcast::<T>().map_err(|_| {
        Error::InvalidResource(format!("'{}' is not a {}", id, std::any::type_name::<T>()))
    })?;
    Ok(ResourceHandle::new(id, resource))
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
