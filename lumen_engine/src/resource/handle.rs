/// Shared handle to a managed resource
///
/// A handle keeps its resource alive on its own: removing the entry from the
/// manager (or collecting it) only drops the manager's reference.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub struct ResourceHandle<T: ?Sized> {
    id: Arc<str>,
    resource: Arc<T>,
}

impl<T: ?Sized> ResourceHandle<T> {
    pub(crate) fn new(id: Arc<str>, resource: Arc<T>) -> Self {
        Self { id, resource }
    }

    /// Identifier the resource was loaded or registered under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when both handles point at the same instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }

    /// Number of live references, the manager's included
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }

    /// The underlying shared pointer
    pub fn as_arc(&self) -> &Arc<T> {
        &self.resource
    }
}

impl<T: ?Sized> Deref for ResourceHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

// Manual impl: a derive would require T: Clone.
impl<T: ?Sized> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
