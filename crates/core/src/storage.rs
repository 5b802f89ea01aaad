//! Tab-scoped key/value storage and the one-shot latch built on it

use crate::error::CoreResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Storage that lives as long as the browser tab (`sessionStorage`)
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove_item(&self, key: &str) -> CoreResult<()>;
}

/// In-memory storage for native runs and tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Monotonic flag persisted under a fixed key: once set it stays set for the
/// lifetime of the storage.
#[derive(Clone)]
pub struct OneShotLatch {
    storage: Rc<dyn SessionStorage>,
    key: String,
}

impl OneShotLatch {
    pub fn new(storage: Rc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Whether the latch has already fired
    pub fn is_set(&self) -> CoreResult<bool> {
        Ok(self.storage.get_item(&self.key)?.is_some())
    }

    /// Set the latch if absent. Returns `true` only for the call that set it.
    pub fn try_set(&self) -> CoreResult<bool> {
        if self.is_set()? {
            return Ok(false);
        }
        self.storage.set_item(&self.key, "true")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_latch_fires_once() {
        let storage: Rc<dyn SessionStorage> = Rc::new(MemoryStorage::new());
        let latch = OneShotLatch::new(storage.clone(), "guard");

        assert!(!latch.is_set().unwrap());
        assert!(latch.try_set().unwrap());
        assert!(!latch.try_set().unwrap());
        assert!(latch.is_set().unwrap());

        // A second latch over the same storage sees the persisted flag
        let other = OneShotLatch::new(storage, "guard");
        assert!(!other.try_set().unwrap());
    }
}
