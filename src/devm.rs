//! Device-managed resources.
//!
//! Allocations made through [`Device::devm_alloc`] live as long as the device
//! binding: the bus framework calls [`Device::release_all`] after a failed
//! probe and after `remove`, so drivers never free them by hand.

use crate::errors::{DriverError, DriverResult};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Resource = Arc<dyn Any + Send + Sync>;

pub struct Device {
    name: String,
    /// Upper bound on live managed resources; `None` is unbounded.
    limit: Option<usize>,
    resources: Mutex<Vec<Resource>>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_resource_limit(name, None)
    }

    pub fn with_resource_limit(name: impl Into<String>, limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            limit,
            resources: Mutex::new(Vec::new()),
        })
    }

    /// Name used as the log prefix, e.g. `1-001c`
    pub fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> MutexGuard<'_, Vec<Resource>> {
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocate `value` with its lifetime tied to this device's binding.
    pub fn devm_alloc<T: Any + Send + Sync>(&self, value: T) -> DriverResult<Arc<T>> {
        let mut resources = self.resources();
        if self.limit.is_some_and(|limit| resources.len() >= limit) {
            return Err(DriverError::OutOfMemory);
        }
        resources
            .try_reserve(1)
            .map_err(|_| DriverError::OutOfMemory)?;

        let value = Arc::new(value);
        resources.push(value.clone());
        Ok(value)
    }

    pub fn managed_count(&self) -> usize {
        self.resources().len()
    }

    /// Drop every managed resource, newest first. Returns how many were
    /// released.
    pub fn release_all(&self) -> usize {
        let mut resources = self.resources();
        let released = resources.len();
        while let Some(resource) = resources.pop() {
            drop(resource);
        }
        if released > 0 {
            debug!("[{}] released {} managed resource(s)", self.name, released);
        }
        released
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("managed", &self.managed_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_release() {
        let dev = Device::new("1-001c");
        let value = dev.devm_alloc(42u32).unwrap();
        assert_eq!(*value, 42);
        assert_eq!(dev.managed_count(), 1);

        assert_eq!(dev.release_all(), 1);
        assert_eq!(dev.managed_count(), 0);
        // The caller's handle outlives the binding's reference
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn test_limit_exhausted() {
        let dev = Device::with_resource_limit("1-001c", Some(1));
        dev.devm_alloc(1u8).unwrap();
        assert!(matches!(dev.devm_alloc(2u8), Err(DriverError::OutOfMemory)));

        let empty = Device::with_resource_limit("1-001d", Some(0));
        assert!(matches!(empty.devm_alloc(()), Err(DriverError::OutOfMemory)));
    }
}
