use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stockroom_base::StockroomResult;

/// One inventory record.
///
/// The struct field order is the stable serialization order of the JSON
/// representation. `description` and `expiration_date` default to empty
/// strings; `modified_at` is absent until the first successful update.
/// Identifiers are assigned by the store and immutable afterwards, as is
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: u64,
    #[serde(default)]
    pub expiration_date: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl Product {
    /// Create a product from the required fields. Optional fields start at
    /// their documented defaults.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        category: impl Into<String>,
        price: f64,
        quantity: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            description: String::new(),
            price,
            quantity,
            expiration_date: String::new(),
            created_at: String::new(),
            modified_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expiration date (free-form, not validated as a date).
    pub fn with_expiration_date(mut self, expiration_date: impl Into<String>) -> Self {
        self.expiration_date = expiration_date.into();
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Convert to the storage/wire representation (a JSON object mapping
    /// field names to plain scalar values).
    pub fn to_value(&self) -> StockroomResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| stockroom_base::err!("Failed to serialize product {}: {}", self.id, e))
    }

    /// Convert from a stored JSON object.
    ///
    /// Missing optional fields are tolerated via their defaults. Returns
    /// None for entries that do not conform to the record shape (missing
    /// required fields, wrong types); such entries are skipped by aggregate
    /// operations but preserved verbatim in the collection.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Per-field update set for a product. Only supplied fields are
/// overwritten; everything else keeps its stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u64>,
    pub expiration_date: Option<String>,
}

/// Apply a patch directly to a stored record object.
///
/// Works on the raw JSON object rather than a typed `Product` so fields the
/// record model does not know about survive the update unchanged. Sets
/// `modified_at` to the supplied timestamp; `id` and `created_at` are never
/// touched.
pub fn apply_patch(record: &mut Map<String, Value>, patch: &ProductPatch, timestamp: &str) {
    if let Some(name) = &patch.name {
        record.insert("name".to_string(), Value::from(name.clone()));
    }
    if let Some(category) = &patch.category {
        record.insert("category".to_string(), Value::from(category.clone()));
    }
    if let Some(description) = &patch.description {
        record.insert("description".to_string(), Value::from(description.clone()));
    }
    if let Some(price) = patch.price {
        record.insert("price".to_string(), Value::from(price));
    }
    if let Some(quantity) = patch.quantity {
        record.insert("quantity".to_string(), Value::from(quantity));
    }
    if let Some(expiration_date) = &patch.expiration_date {
        record.insert(
            "expiration_date".to_string(),
            Value::from(expiration_date.clone()),
        );
    }
    record.insert("modified_at".to_string(), Value::from(timestamp));
}

/// Current local time in the timestamp format used for `created_at` and
/// `modified_at`.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
