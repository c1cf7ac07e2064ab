// The HTTP abstraction allows the application to serve requests while
// remaining fully testable with MockPal: services are plain values that map
// HttpRequest to HttpResponse, and only RealPal touches a network socket.

use std::collections::HashMap;
use std::sync::Arc;

/// HTTP methods understood by the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl HttpMethod {
    /// Parse an HTTP method from a string. Unknown methods yield None.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Convert the method to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP headers collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: HashMap<String, String>,
}

impl HttpHeaders {
    /// Create empty headers.
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Insert a header.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Get a header value.
    pub fn get(&self, key: &str) -> Option<&String> {
        self.inner.get(key)
    }

    /// Check if a header exists.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Get all headers as a reference.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.inner
    }
}

/// HTTP message body. Bodies are plain byte buffers; the API only ever
/// exchanges small JSON documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpBody {
    bytes: Vec<u8>,
}

impl HttpBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        Self { bytes: vec![] }
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Create from string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self {
            bytes: s.into().into_bytes(),
        }
    }

    /// Get content as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get content as a string if valid UTF-8.
    pub fn as_string(&self) -> Option<String> {
        String::from_utf8(self.bytes.clone()).ok()
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Get the content length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Take ownership of the content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for HttpBody {
    fn from(v: Vec<u8>) -> Self {
        Self::from_bytes(v)
    }
}

impl From<String> for HttpBody {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl From<&str> for HttpBody {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

/// HTTP request structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    path: String,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    /// Get the HTTP method.
    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// Get the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the request headers.
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    /// Get the request body.
    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }
}

/// HTTP status codes used by the API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
}

impl HttpStatusCode {
    /// Get the numeric status code.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the standard reason phrase.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            201 => Self::Created,
            204 => Self::NoContent,
            400 => Self::BadRequest,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            _ => Self::InternalServerError,
        }
    }
}

/// HTTP response structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: HttpStatusCode,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpResponse {
    /// Create a new response with the given status.
    pub fn new(status: HttpStatusCode) -> Self {
        Self {
            status,
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    /// Create a 200 OK response.
    pub fn ok() -> Self {
        Self::new(HttpStatusCode::Ok)
    }

    /// Create a 201 Created response.
    pub fn created() -> Self {
        Self::new(HttpStatusCode::Created)
    }

    /// Create a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(HttpStatusCode::NoContent)
    }

    /// Get the status code.
    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    /// Get the headers.
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    /// Get the body.
    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    /// Take ownership of the body.
    pub fn into_body(self) -> HttpBody {
        self.body
    }

    /// Set the response body.
    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Set the Content-Type header.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on. If None, the OS will assign an available port.
    pub port: Option<u16>,
    /// Server name used in diagnostics.
    pub server_name: String,
}

impl HttpServerConfig {
    /// Create a new configuration with the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            server_name: "stockroom-server".to_string(),
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Get the address string (host:port, port 0 for OS-assigned).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(0))
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            server_name: "stockroom-server".to_string(),
        }
    }
}

/// Trait for handling HTTP requests.
///
/// Implement this trait to create an HTTP service. The service receives raw
/// HTTP requests and returns responses; client-visible failures (400, 404,
/// 500) are expressed as responses with the matching status code. An `Err`
/// return marks an internal fault (e.g. a serialization failure) and is
/// converted to a 500 response by the PAL implementation.
pub trait HttpService: std::fmt::Debug + Send + Sync + 'static {
    /// Handle an HTTP request and return a response.
    fn handle_request(&self, request: HttpRequest) -> crate::StockroomResult<HttpResponse>;
}

/// Handle to a running HTTP server.
///
/// When the last handle is dropped, the server shuts down: it stops
/// accepting new connections and lets in-flight ones complete.
#[derive(Debug, Clone)]
pub struct HttpServerHandle {
    port: u16,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
}

impl HttpServerHandle {
    /// Create a new handle for the given port.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the full address (host:port) the server is listening on.
    pub fn address(&self, host: &str) -> String {
        format!("{}:{}", host, self.port)
    }

    /// Signal the server to shut down.
    pub fn shutdown(&self) {
        self.shutdown
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if the server has been signaled to shut down.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Access the shutdown flag (for use by PAL implementations).
    pub fn shutdown_flag(&self) -> &Arc<std::sync::atomic::AtomicBool> {
        &self.shutdown
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("POST"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("put"), Some(HttpMethod::Put)); // Case insensitive
        assert_eq!(HttpMethod::parse("delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("TRACE"), None);
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(format!("{}", HttpMethod::Get), "GET");
        assert_eq!(format!("{}", HttpMethod::Delete), "DELETE");
    }

    #[test]
    fn test_http_headers() {
        let mut headers = HttpHeaders::new();
        headers.insert("Content-Type", "application/json");

        assert_eq!(
            headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert!(headers.contains("Content-Type"));
        assert!(!headers.contains("X-Custom"));
    }

    #[test]
    fn test_http_body() {
        let body = HttpBody::from_string("{\"success\":true}");
        assert_eq!(body.as_string(), Some("{\"success\":true}".to_string()));
        assert_eq!(body.len(), 16);

        let empty = HttpBody::empty();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_http_request() {
        let request = HttpRequest::new(HttpMethod::Post, "/api/products")
            .with_header("Accept", "application/json")
            .with_body("{\"name\": \"Widget\"}");

        assert_eq!(request.method(), &HttpMethod::Post);
        assert_eq!(request.path(), "/api/products");
        assert_eq!(
            request.headers().get("Accept"),
            Some(&"application/json".to_string())
        );
        assert_eq!(
            request.body().as_string(),
            Some("{\"name\": \"Widget\"}".to_string())
        );
    }

    #[test]
    fn test_http_response_helpers() {
        let ok = HttpResponse::ok();
        assert_eq!(ok.status(), HttpStatusCode::Ok);

        let created = HttpResponse::created();
        assert_eq!(created.status(), HttpStatusCode::Created);

        let json = HttpResponse::ok()
            .with_content_type("application/json")
            .with_body("{\"data\": []}");
        assert_eq!(
            json.headers().get("Content-Type"),
            Some(&"application/json".to_string())
        );
    }

    #[test]
    fn test_http_status_code_from_u16() {
        assert_eq!(HttpStatusCode::from(200), HttpStatusCode::Ok);
        assert_eq!(HttpStatusCode::from(404), HttpStatusCode::NotFound);
        assert_eq!(
            HttpStatusCode::from(500),
            HttpStatusCode::InternalServerError
        );
        // Unknown codes default to 500
        assert_eq!(
            HttpStatusCode::from(999),
            HttpStatusCode::InternalServerError
        );
    }

    #[test]
    fn test_http_server_config() {
        let config = HttpServerConfig::new("127.0.0.1").with_port(5000);
        assert_eq!(config.address(), "127.0.0.1:5000");

        let default = HttpServerConfig::default();
        assert_eq!(default.address(), "127.0.0.1:0");
    }

    #[test]
    fn test_http_server_handle() {
        let handle = HttpServerHandle::new(5000);
        assert_eq!(handle.port(), 5000);
        assert_eq!(handle.address("127.0.0.1"), "127.0.0.1:5000");

        assert!(!handle.is_shutdown());
        handle.shutdown();
        assert!(handle.is_shutdown());
    }

    #[test]
    fn test_http_service_trait() {
        #[derive(Debug)]
        struct TestService;
        impl HttpService for TestService {
            fn handle_request(&self, request: HttpRequest) -> crate::StockroomResult<HttpResponse> {
                if request.path() == "/ping" {
                    Ok(HttpResponse::ok().with_body("pong"))
                } else {
                    Ok(HttpResponse::new(HttpStatusCode::NotFound))
                }
            }
        }

        let service = TestService;
        let resp = service
            .handle_request(HttpRequest::new(HttpMethod::Get, "/ping"))
            .unwrap();
        assert_eq!(resp.status(), HttpStatusCode::Ok);
        assert_eq!(resp.body().as_string(), Some("pong".to_string()));

        let resp2 = service
            .handle_request(HttpRequest::new(HttpMethod::Get, "/other"))
            .unwrap();
        assert_eq!(resp2.status(), HttpStatusCode::NotFound);
    }
}
