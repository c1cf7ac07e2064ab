pub mod api;
pub mod config;
pub mod product;
pub mod store;
pub mod validate;

pub use api::ApiService;
pub use config::{Config, load_config};
pub use product::{Product, ProductPatch, apply_patch, now_timestamp};
pub use store::{InventoryStore, JsonFileStore, MemoryStore, StoreHandle, next_product_id};
pub use validate::{NewProductInput, parse_new_product, parse_product_patch};
