use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::StockroomError;
use crate::StockroomResult;

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::Pal;

/// In-memory PAL implementation for testing.
///
/// Stores file contents in a HashMap and supports all Pal operations without
/// touching the real filesystem. Failure injection (`set_fail_writes`,
/// `set_fail_reads`) simulates a full disk or an unreadable file, which the
/// store's atomicity and degraded-load behavior are tested against.
///
/// # Examples
///
/// ```
/// use stockroom_base::{FilePath, MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("inventory.json"), b"[]".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("inventory.json")).unwrap();
/// assert_eq!(content, "[]");
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    directories: Arc<Mutex<HashSet<FilePath>>>,
    http_servers: Arc<Mutex<HashMap<u16, HttpServerInfo>>>,
    next_port: Arc<AtomicU16>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

/// Information about a registered HTTP server.
#[derive(Debug)]
struct HttpServerInfo {
    service: Box<dyn HttpService>,
    _config: HttpServerConfig,
}

impl MockPal {
    /// Create a new empty MockPal.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            directories: Arc::new(Mutex::new(HashSet::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_reads: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.files.lock().unwrap().insert(path, content);
    }

    /// Get a file's content from the mock storage.
    pub fn file_content(&self, path: &FilePath) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// List all file paths currently in the mock storage.
    pub fn file_paths(&self) -> Vec<FilePath> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// Make subsequent writes fail mid-stream, as if the disk were full.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reads fail, as if the file were unreadable.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Simulate an HTTP request to a running server.
    ///
    /// Looks up the registered service for the given port and invokes it
    /// directly, without any network involvement.
    pub fn simulate_request(
        &self,
        port: u16,
        request: HttpRequest,
    ) -> StockroomResult<HttpResponse> {
        let servers = self.http_servers.lock().unwrap();
        let server_info = servers
            .get(&port)
            .ok_or_else(|| crate::err!("No HTTP server registered on port {}", port))?;

        server_info.service.handle_request(request)
    }

    /// Get the number of registered HTTP servers.
    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().unwrap().len()
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> StockroomResult<bool> {
        let files = self.files.lock().unwrap();
        Ok(files.contains_key(path))
    }

    fn read_file(&self, path: &FilePath) -> StockroomResult<Box<dyn Read + 'static>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Box::new(StockroomError::file(
                path.as_path().to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
            )));
        }
        let files = self.files.lock().unwrap();
        let content = files
            .get(path)
            .ok_or_else(|| {
                Box::new(StockroomError::file(
                    path.as_path().to_path_buf(),
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("File not found: {}", path),
                    ),
                ))
            })?
            .clone();
        Ok(Box::new(Cursor::new(content)))
    }

    fn create_file(&self, path: &FilePath) -> StockroomResult<Box<dyn Write>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Ok(Box::new(FailingWriter));
        }
        // The writer stores its buffer in the mock storage on flush/drop
        Ok(Box::new(MockFileWriter {
            path: path.clone(),
            files: Arc::clone(&self.files),
            buffer: Vec::new(),
        }))
    }

    fn create_directory_all(&self, path: &FilePath) -> StockroomResult<()> {
        self.directories.lock().unwrap().insert(path.clone());
        Ok(())
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> StockroomResult<()> {
        let mut files = self.files.lock().unwrap();
        let content = files.remove(from).ok_or_else(|| {
            Box::new(StockroomError::file(
                from.as_path().to_path_buf(),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", from),
                ),
            ))
        })?;
        files.insert(to.clone(), content);
        Ok(())
    }

    fn remove_file(&self, path: &FilePath) -> StockroomResult<()> {
        let mut files = self.files.lock().unwrap();
        files.remove(path).ok_or_else(|| {
            Box::new(StockroomError::file(
                path.as_path().to_path_buf(),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ),
            ))
        })?;
        Ok(())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> StockroomResult<HttpServerHandle> {
        let port = config
            .port
            .unwrap_or_else(|| self.next_port.fetch_add(1, Ordering::SeqCst));
        self.http_servers.lock().unwrap().insert(
            port,
            HttpServerInfo {
                service,
                _config: config,
            },
        );
        Ok(HttpServerHandle::new(port))
    }
}

/// Writer that stores its buffer into the mock storage when flushed or
/// dropped.
struct MockFileWriter {
    path: FilePath,
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    buffer: Vec<u8>,
}

impl MockFileWriter {
    fn store(&self) {
        self.files
            .lock()
            .unwrap()
            .insert(self.path.clone(), self.buffer.clone());
    }
}

impl Write for MockFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.store();
        Ok(())
    }
}

impl Drop for MockFileWriter {
    fn drop(&mut self) {
        self.store();
    }
}

/// Writer that fails on the first write, simulating a full disk.
struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("no space left on device"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::other("no space left on device"))
    }
}
