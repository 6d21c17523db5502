use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{InstanceRegistry, RegistryStats};

/// An [`InstanceRegistry`] behind one coarse lock, for hosts that mutate
/// instances from several threads.
///
/// Every operation takes the lock for its whole duration, so a flush always
/// sees a stable snapshot of each instance list.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<InstanceRegistry>>,
}

impl SharedRegistry {
    /// Wrap an existing registry.
    #[must_use]
    pub fn new(registry: InstanceRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Exclusive access for a batch of operations.
    pub fn lock(&self) -> MutexGuard<'_, InstanceRegistry> {
        self.inner.lock()
    }

    /// Flush under the lock.
    pub fn flush(&self) {
        self.inner.lock().flush();
    }

    /// Stats under the lock.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.inner.lock().stats()
    }

    /// Cleanup under the lock.
    pub fn cleanup(&self) {
        self.inner.lock().cleanup();
    }
}

impl From<InstanceRegistry> for SharedRegistry {
    fn from(registry: InstanceRegistry) -> Self {
        Self::new(registry)
    }
}
