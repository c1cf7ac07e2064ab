use std::io::{Read, Write};
use std::sync::Arc;

use crate::StockroomResult;

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/// Platform Abstraction Layer (PAL) trait providing filesystem operations
/// and the HTTP listener.
///
/// Code depends on this abstraction, not a concrete implementation. Two
/// implementations are provided:
/// - `RealPal`: the real filesystem via `std::fs`, real sockets via tiny_http
/// - `MockPal`: in-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file exists at the given path.
    fn file_exists(&self, path: &FilePath) -> StockroomResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> StockroomResult<Box<dyn Read + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    ///
    /// Convenience method with a default implementation: reads the file,
    /// validates UTF-8, and returns the string or an error.
    fn read_file_to_string(&self, path: &FilePath) -> StockroomResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(crate::StockroomError::file(
                path.as_path().to_path_buf(),
                e,
            ))
        })?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Create a new file, overwriting if it exists.
    fn create_file(&self, path: &FilePath) -> StockroomResult<Box<dyn Write>>;

    /// Write the given bytes to a file, overwriting if it exists.
    ///
    /// Convenience method with a default implementation on top of
    /// `create_file`; write and flush failures are reported as errors.
    fn write_file(&self, path: &FilePath, contents: &[u8]) -> StockroomResult<()> {
        let mut writer = self.create_file(path)?;
        writer
            .write_all(contents)
            .and_then(|_| writer.flush())
            .map_err(|e| {
                Box::new(crate::StockroomError::file(
                    path.as_path().to_path_buf(),
                    e,
                ))
            })
    }

    /// Create a directory and all parent directories.
    fn create_directory_all(&self, path: &FilePath) -> StockroomResult<()>;

    /// Rename a file, replacing the destination if it exists.
    ///
    /// On the real filesystem this is a single atomic rename within the
    /// base directory, which is what the store's write-temp-then-rename
    /// save and corruption backup rely on.
    fn rename_file(&self, from: &FilePath, to: &FilePath) -> StockroomResult<()>;

    /// Remove a file.
    fn remove_file(&self, path: &FilePath) -> StockroomResult<()>;

    /// Start an HTTP server with the given service.
    ///
    /// Returns a handle to the running server. The server starts
    /// immediately; when the handle is dropped (or shutdown() is called) it
    /// stops accepting new connections.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> StockroomResult<HttpServerHandle>;
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// Internally wraps `Arc<dyn Pal>` for cheap cloning and thread-safe
/// sharing. Can be cloned and passed around freely without lifetime
/// concerns.
///
/// # Examples
///
/// ```no_run
/// use stockroom_base::{PalHandle, RealPal};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    /// Create a new PalHandle from a Pal implementation.
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
