use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use log::warn;
use uuid::Uuid;

/// Storage key under which the browser keeps the visitor id.
pub const VISITOR_ID_KEY: &str = "toledoia_visitor_id";

/// Key/value persistence for the visitor identity (`localStorage` in the browser).
pub trait VisitorStore {
    fn load(&self, key: &str) -> Option<String>;

    /// Returns `false` when the value could not be persisted (quota, private mode).
    fn save(&self, key: &str, value: &str) -> bool;
}

#[derive(Default)]
pub struct MemoryVisitorStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryVisitorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisitorStore for MemoryVisitorStore {
    fn load(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> bool {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        true
    }
}

/// Returns the durable visitor id, generating and persisting one on first use.
///
/// Without a store the id only lives as long as the page.
pub fn resolve_visitor_id(store: Option<&dyn VisitorStore>) -> String {
    let Some(store) = store else {
        return format!("visitor-{}", Uuid::new_v4().simple());
    };

    if let Some(existing) = store.load(VISITOR_ID_KEY).filter(|v| !v.trim().is_empty()) {
        return existing;
    }

    let visitor_id = Uuid::new_v4().to_string();
    if !store.save(VISITOR_ID_KEY, &visitor_id) {
        warn!("Could not persist visitor id; it will change on the next visit");
    }
    visitor_id
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnlyStore;

    impl VisitorStore for ReadOnlyStore {
        fn load(&self, _key: &str) -> Option<String> {
            None
        }
        fn save(&self, _key: &str, _value: &str) -> bool {
            false
        }
    }

    #[test]
    fn first_visit_generates_and_persists_uuid() {
        let store = MemoryVisitorStore::new();
        let id = resolve_visitor_id(Some(&store));

        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(store.load(VISITOR_ID_KEY).as_deref(), Some(id.as_str()));
    }

    #[test]
    fn reopening_reuses_stored_id() {
        let store = MemoryVisitorStore::new();
        let first = resolve_visitor_id(Some(&store));
        let second = resolve_visitor_id(Some(&store));
        assert_eq!(first, second);
    }

    #[test]
    fn blank_stored_value_is_replaced() {
        let store = MemoryVisitorStore::new();
        store.save(VISITOR_ID_KEY, "   ");
        let id = resolve_visitor_id(Some(&store));
        assert!(!id.trim().is_empty());
        assert_eq!(store.load(VISITOR_ID_KEY), Some(id));
    }

    #[test]
    fn missing_storage_falls_back_to_random_id() {
        let a = resolve_visitor_id(None);
        let b = resolve_visitor_id(None);
        assert!(a.starts_with("visitor-"));
        assert_ne!(a, b);
    }

    #[test]
    fn failing_store_still_yields_an_id() {
        let id = resolve_visitor_id(Some(&ReadOnlyStore));
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
