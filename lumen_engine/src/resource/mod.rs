//! Resource management module
//!
//! Per-scope registry of shared resources, loaded lazily from JSON
//! descriptions found on a list of search paths.

mod handle;
mod resource_manager;

pub use handle::ResourceHandle;
pub use resource_manager::{
    ResourceManager, ResourceStatus, ResourceSlotKey, LoadRequest,
};
