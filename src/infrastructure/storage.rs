use crate::domain::errors::AppError;
use crate::domain::market_data::PreferenceStore;
use gloo::storage::{LocalStorage, Storage};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Preferences in `window.localStorage`, stored as raw strings
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStoragePreferences;

impl PreferenceStore for LocalStoragePreferences {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| AppError::StorageError(format!("localStorage write failed: {:?}", e)))
    }
}

/// In-memory preferences. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let prefs = Self::new();
        prefs.values.borrow_mut().insert(key.to_string(), value.to_string());
        prefs
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
