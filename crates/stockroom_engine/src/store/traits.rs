use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use stockroom_base::StockroomResult;

/// Trait for inventory storage implementations.
///
/// The store is the sole authority for reading and persisting the product
/// collection, and it always operates on the collection as one unit: there
/// is no per-record access, and no state is kept in memory between calls.
///
/// The collection is a sequence of raw JSON values rather than typed
/// products: a backing file may contain entries that do not conform to the
/// record shape, and those must be carried through a load/save cycle
/// verbatim rather than dropped or repaired.
pub trait InventoryStore: Send + Sync + 'static {
    /// Load the full collection.
    ///
    /// Never fails from the caller's perspective: any hard failure degrades
    /// to an empty collection (the layer above performs destructive
    /// whole-collection rewrites, so a failed read must not propagate).
    fn load(&self) -> Vec<Value>;

    /// Persist the full collection, replacing whatever was stored before.
    ///
    /// The backing file is never observed half-written; on failure the
    /// previous contents remain intact.
    fn save(&self, collection: &[Value]) -> StockroomResult<()>;

    /// Ensure the backing storage exists and holds at least an empty
    /// collection. Idempotent; called once at process start.
    fn initialize(&self) -> StockroomResult<()>;
}

/// A thread-safe handle to an inventory store.
///
/// Provides cheap cloning (via Arc) and single-writer serialization (via
/// Mutex): `with_store` holds the lock across an entire load-mutate-save
/// cycle, so concurrent handler calls queue instead of racing each other's
/// whole-collection rewrites.
#[derive(Clone)]
pub struct StoreHandle(Arc<Mutex<dyn InventoryStore>>);

impl StoreHandle {
    /// Create a new StoreHandle wrapping the given store implementation.
    pub fn new<S: InventoryStore>(store: S) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    /// Load the full collection.
    ///
    /// See [`InventoryStore::load`] for details.
    pub fn load(&self) -> Vec<Value> {
        self.0.lock().load()
    }

    /// Persist the full collection.
    ///
    /// See [`InventoryStore::save`] for details.
    pub fn save(&self, collection: &[Value]) -> StockroomResult<()> {
        self.0.lock().save(collection)
    }

    /// Initialize the backing storage.
    ///
    /// See [`InventoryStore::initialize`] for details.
    pub fn initialize(&self) -> StockroomResult<()> {
        self.0.lock().initialize()
    }

    /// Run a closure against the store with the lock held for its whole
    /// duration. All read-modify-write cycles go through here.
    pub fn with_store<R>(&self, f: impl FnOnce(&dyn InventoryStore) -> R) -> R {
        let guard = self.0.lock();
        f(&*guard)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish()
    }
}
