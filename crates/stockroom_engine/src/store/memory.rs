use parking_lot::Mutex;
use serde_json::Value;

use stockroom_base::StockroomResult;

use crate::store::traits::InventoryStore;

/// An in-memory inventory store.
///
/// Keeps the collection in a Vec behind a mutex, with no persistence. This
/// is the simplest InventoryStore implementation, intended for tests that
/// exercise the handler layer without any file involvement. The failing
/// variant reports every save as an error, for driving the 500 paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collection: Mutex<Vec<Value>>,
    fail_saves: bool,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose saves always fail.
    pub fn failing() -> Self {
        Self {
            collection: Mutex::new(Vec::new()),
            fail_saves: true,
        }
    }
}

impl InventoryStore for MemoryStore {
    fn load(&self) -> Vec<Value> {
        self.collection.lock().clone()
    }

    fn save(&self, collection: &[Value]) -> StockroomResult<()> {
        if self.fail_saves {
            return Err(stockroom_base::err!("Simulated save failure"));
        }
        *self.collection.lock() = collection.to_vec();
        Ok(())
    }

    fn initialize(&self) -> StockroomResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_load_save() {
        let store = MemoryStore::new();
        assert!(store.load().is_empty());

        let collection = vec![serde_json::json!({"id": 1, "name": "Widget"})];
        store.save(&collection).unwrap();
        assert_eq!(store.load(), collection);

        store.save(&[]).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_memory_store_initialize_is_noop() {
        let store = MemoryStore::new();
        store.save(&[serde_json::json!({"id": 1})]).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_failing_store() {
        let store = MemoryStore::failing();
        assert!(store.save(&[]).is_err());
        assert!(store.load().is_empty());
    }
}
