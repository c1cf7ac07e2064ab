use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use stockroom_base::{FilePath, PalHandle, StockroomResult};

use crate::store::traits::InventoryStore;

/// File-backed inventory store: the product collection lives in a single
/// JSON array, pretty-printed so the file diffs cleanly.
///
/// Load never raises — every hard failure degrades to an empty collection,
/// and unparsable content is quarantined to a `.backup` sibling instead of
/// being destroyed. Save goes through a `.tmp` sibling and an atomic
/// rename, so the backing file is never observed half-written.
pub struct JsonFileStore {
    pal: PalHandle,
    path: FilePath,
}

impl JsonFileStore {
    /// Create a store over the given backing file path (relative to the
    /// PAL base directory).
    pub fn new(pal: PalHandle, path: FilePath) -> Self {
        Self { pal, path }
    }

    fn ensure_parent_directory(&self) -> StockroomResult<()> {
        if let Some(parent) = self.path.parent() {
            self.pal.create_directory_all(&parent)?;
        }
        Ok(())
    }

    /// Move unparsable content out of the way and reinitialize, so no data
    /// is silently destroyed.
    fn quarantine_corrupt_file(&self) {
        let backup = self.path.with_suffix(".backup");
        match self.pal.rename_file(&self.path, &backup) {
            Ok(()) => {
                warn!(path = %self.path, backup = %backup, "backed up corrupt inventory file");
            }
            Err(e) => {
                error!(path = %self.path, error = %e, "failed to back up corrupt inventory file");
            }
        }
        if let Err(e) = self.initialize() {
            error!(path = %self.path, error = %e, "failed to reinitialize inventory file");
        }
    }

    fn remove_temp_file(&self, temp: &FilePath) {
        if let Err(e) = self.pal.remove_file(temp) {
            debug!(temp = %temp, error = %e, "no partial temp file to clean up");
        }
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish()
    }
}

impl InventoryStore for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path))]
    fn load(&self) -> Vec<Value> {
        match self.pal.file_exists(&self.path) {
            Ok(true) => {}
            Ok(false) => {
                warn!("inventory file not found, initializing");
                if let Err(e) = self.initialize() {
                    error!(error = %e, "failed to initialize inventory file");
                }
                return Vec::new();
            }
            Err(e) => {
                error!(error = %e, "failed to check for inventory file");
                return Vec::new();
            }
        }

        let content = match self.pal.read_file_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                // Unreadable but present (e.g. permissions): degrade to
                // empty without touching the file.
                error!(error = %e, "failed to read inventory file");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => {
                debug!(count = entries.len(), "inventory loaded");
                entries
            }
            Ok(_) => {
                warn!("inventory file does not contain an array, recovering");
                self.quarantine_corrupt_file();
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "inventory file is not valid JSON, recovering");
                self.quarantine_corrupt_file();
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, collection), fields(path = %self.path, count = collection.len()))]
    fn save(&self, collection: &[Value]) -> StockroomResult<()> {
        self.ensure_parent_directory()?;

        let json = serde_json::to_string_pretty(collection)
            .map_err(|e| stockroom_base::err!("Failed to serialize inventory: {}", e))?;

        let temp = self.path.with_suffix(".tmp");
        if let Err(e) = self.pal.write_file(&temp, json.as_bytes()) {
            self.remove_temp_file(&temp);
            return Err(Box::new(e.context("Failed to write inventory temp file")));
        }
        if let Err(e) = self.pal.rename_file(&temp, &self.path) {
            self.remove_temp_file(&temp);
            return Err(Box::new(e.context("Failed to replace inventory file")));
        }

        debug!("inventory saved");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn initialize(&self) -> StockroomResult<()> {
        self.ensure_parent_directory()?;
        if !self.pal.file_exists(&self.path)? {
            self.pal.write_file(&self.path, b"[]")?;
            info!("created empty inventory file");
        }
        Ok(())
    }
}
