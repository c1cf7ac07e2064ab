use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::{StockroomError, StockroomResult};

use super::FilePath;
use super::http::{
    HttpBody, HttpMethod, HttpRequest, HttpServerConfig, HttpServerHandle, HttpService,
};
use super::traits::Pal;

/// Concrete PAL implementation using the real filesystem via std::fs and
/// a tiny_http listener for the HTTP server.
///
/// All file paths are resolved relative to a configured base directory,
/// ensuring operations stay within intended boundaries.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    ///
    /// # Arguments
    /// * `base_dir` - All paths will be resolved relative to this directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolve a FilePath to an absolute filesystem path.
    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> StockroomResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.exists();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> StockroomResult<Box<dyn Read + 'static>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "opening file for reading");
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            Box::new(StockroomError::file(resolved, e))
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_file(&self, path: &FilePath) -> StockroomResult<Box<dyn Write>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "creating file");
        let file = fs::File::create(&resolved).map_err(|e| {
            debug!(error = %e, "failed to create file");
            Box::new(StockroomError::file(resolved, e))
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_directory_all(&self, path: &FilePath) -> StockroomResult<()> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "creating directory and parents");
        fs::create_dir_all(&resolved)
            .map_err(|e| Box::new(StockroomError::file(resolved, e)))?;
        Ok(())
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    fn rename_file(&self, from: &FilePath, to: &FilePath) -> StockroomResult<()> {
        let resolved_from = self.resolve_path(from);
        let resolved_to = self.resolve_path(to);
        debug!(
            from = %resolved_from.display(),
            to = %resolved_to.display(),
            "renaming file"
        );
        fs::rename(&resolved_from, &resolved_to)
            .map_err(|e| Box::new(StockroomError::file(resolved_from, e)))?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove_file(&self, path: &FilePath) -> StockroomResult<()> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "removing file");
        fs::remove_file(&resolved)
            .map_err(|e| Box::new(StockroomError::file(resolved, e)))?;
        Ok(())
    }

    #[instrument(skip(self, service))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> StockroomResult<HttpServerHandle> {
        let address = config.address();
        let server = tiny_http::Server::http(&address)
            .map_err(|e| crate::err!("Failed to bind HTTP server on {}: {}", address, e))?;

        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(0);
        debug!(port, "HTTP server bound");

        let handle = HttpServerHandle::new(port);
        let shutdown = Arc::clone(handle.shutdown_flag());

        std::thread::spawn(move || {
            // Poll with a timeout so the shutdown flag is observed even
            // when no requests arrive.
            loop {
                if shutdown.load(Ordering::SeqCst) {
                    debug!("HTTP server shutting down");
                    break;
                }
                match server.recv_timeout(Duration::from_millis(100)) {
                    Ok(Some(request)) => handle_connection(request, service.as_ref()),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "failed to receive HTTP request");
                        break;
                    }
                }
            }
        });

        Ok(handle)
    }
}

/// Translate one tiny_http request into the PAL types, dispatch it to the
/// service, and send the response back.
fn handle_connection(mut raw: tiny_http::Request, service: &dyn HttpService) {
    let method = match HttpMethod::parse(&raw.method().to_string()) {
        Some(method) => method,
        None => {
            debug!(method = %raw.method(), "rejecting unsupported HTTP method");
            respond(
                raw,
                405,
                r#"{"success":false,"error":"Method not allowed"}"#.into(),
            );
            return;
        }
    };

    let url = raw.url().to_string();
    let mut request = HttpRequest::new(method, url);
    for header in raw.headers() {
        request = request.with_header(
            header.field.as_str().as_str().to_string(),
            header.value.as_str().to_string(),
        );
    }

    let mut body = Vec::new();
    if let Err(e) = raw.as_reader().read_to_end(&mut body) {
        warn!(error = %e, "failed to read request body");
        respond(
            raw,
            500,
            r#"{"success":false,"error":"Failed to read request body"}"#.into(),
        );
        return;
    }
    let request = request.with_body(HttpBody::from_bytes(body));

    match service.handle_request(request) {
        Ok(response) => {
            let status = response.status().as_u16();
            let headers: Vec<(String, String)> = response
                .headers()
                .all()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut out = tiny_http::Response::from_data(response.into_body().into_bytes())
                .with_status_code(status);
            for (key, value) in headers {
                if let Ok(header) = tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes())
                {
                    out = out.with_header(header);
                }
            }
            if let Err(e) = raw.respond(out) {
                warn!(error = %e, "failed to send HTTP response");
            }
        }
        Err(e) => {
            warn!(error = %e, "service failed to handle request");
            respond(
                raw,
                500,
                r#"{"success":false,"error":"Internal server error"}"#.into(),
            );
        }
    }
}

fn respond(raw: tiny_http::Request, status: u16, body: String) {
    let mut out = tiny_http::Response::from_data(body.into_bytes()).with_status_code(status);
    if let Ok(header) =
        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
    {
        out = out.with_header(header);
    }
    if let Err(e) = raw.respond(out) {
        warn!(error = %e, "failed to send HTTP response");
    }
}
