pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{InventoryStore, StoreHandle};

use serde_json::Value;

/// Derive the identifier for the next created product.
///
/// Returns 1 for an empty or wholly malformed collection; otherwise one
/// plus the maximum `id` among entries that are well-formed objects
/// carrying an integer `id`. Malformed entries are skipped rather than
/// causing failure.
///
/// This is a derivation over current data, not a monotonic counter: when
/// the highest-id record is deleted, the next created record reuses a
/// previously-issued identifier.
pub fn next_product_id(collection: &[Value]) -> u64 {
    collection
        .iter()
        .filter_map(|entry| entry.as_object())
        .filter_map(|record| record.get("id"))
        .filter_map(Value::as_u64)
        .max()
        .map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_id_empty_collection() {
        assert_eq!(next_product_id(&[]), 1);
    }

    #[test]
    fn test_next_id_is_max_plus_one() {
        let collection = vec![json!({"id": 5}), json!({"id": 2})];
        assert_eq!(next_product_id(&collection), 6);
    }

    #[test]
    fn test_next_id_skips_malformed_entries() {
        let collection = vec![
            json!("stray"),
            json!({"no_id": true}),
            json!({"id": "three"}),
            json!({"id": 3}),
        ];
        assert_eq!(next_product_id(&collection), 4);
    }

    #[test]
    fn test_next_id_wholly_malformed_collection() {
        let collection = vec![json!(null), json!(42), json!({"name": "Widget"})];
        assert_eq!(next_product_id(&collection), 1);
    }
}
