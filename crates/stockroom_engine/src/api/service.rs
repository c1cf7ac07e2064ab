use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use stockroom_base::StockroomResult;
use stockroom_base::pal::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode,
};

use crate::product::{Product, apply_patch, now_timestamp};
use crate::store::{StoreHandle, next_product_id};
use crate::validate::{parse_new_product, parse_product_patch};

const API_VERSION: &str = "1.0";

/// API response for the index endpoint.
#[derive(Serialize)]
struct IndexResponse {
    message: &'static str,
    version: &'static str,
    endpoints: BTreeMap<&'static str, &'static str>,
}

/// API response for the product listing.
#[derive(Serialize)]
struct ListResponse {
    success: bool,
    total: usize,
    products: Vec<Value>,
}

/// API response carrying a single product.
#[derive(Serialize)]
struct ProductResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    product: Value,
}

/// API response carrying only a confirmation message.
#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

/// API error envelope.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

/// HTTP service providing the inventory API.
///
/// A single service handles all endpoints:
/// - `GET /` - API index
/// - `GET /api/products` - List the full collection
/// - `GET /api/products/{id}` - Get a single product
/// - `POST /api/products` - Create a product
/// - `PUT /api/products/{id}` - Update a product (partial)
/// - `DELETE /api/products/{id}` - Delete a product
/// - `OPTIONS` - CORS preflight
///
/// Field validation happens here, before any store call; the store only
/// performs structural work. Every mutation runs as one load-mutate-save
/// cycle under the store lock, and storage failures surface as 500
/// envelopes. All responses carry a permissive CORS header for browser
/// front-ends.
#[derive(Clone)]
pub struct ApiService {
    store: StoreHandle,
}

impl std::fmt::Debug for ApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiService").finish()
    }
}

impl ApiService {
    /// Create a new ApiService over the given store handle.
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Serialize data to JSON and wrap it in a response with the given
    /// status. Serialization failures become an internal error, which the
    /// PAL converts to a 500 response.
    fn json_response<T: Serialize>(
        status: HttpStatusCode,
        data: &T,
    ) -> StockroomResult<HttpResponse> {
        serde_json::to_string(data)
            .map(|json| {
                HttpResponse::new(status)
                    .with_content_type("application/json")
                    .with_header("Access-Control-Allow-Origin", "*")
                    .with_body(json)
            })
            .map_err(|e| stockroom_base::err!("JSON serialization error: {}", e))
    }

    fn error_response(
        status: HttpStatusCode,
        error: impl Into<String>,
    ) -> StockroomResult<HttpResponse> {
        Self::json_response(
            status,
            &ErrorResponse {
                success: false,
                error: error.into(),
            },
        )
    }

    /// Parse the id segment of `/api/products/{id}`.
    ///
    /// Returns None for any other path shape or a non-numeric segment;
    /// those fall through to the 404 envelope.
    fn extract_product_id(path: &str) -> Option<u64> {
        let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if parts.len() == 3 && parts[0] == "api" && parts[1] == "products" {
            parts[2].parse().ok()
        } else {
            None
        }
    }

    /// Read the request body as a non-empty JSON object.
    fn read_json_object(
        request: &HttpRequest,
        empty_message: &'static str,
    ) -> Result<Value, String> {
        if request.body().is_empty() {
            return Err(empty_message.to_string());
        }
        let body: Value = serde_json::from_slice(request.body().as_bytes())
            .map_err(|_| "Request body must be valid JSON".to_string())?;
        match body.as_object() {
            Some(map) if !map.is_empty() => Ok(body),
            _ => Err(empty_message.to_string()),
        }
    }

    fn record_id(entry: &Value) -> Option<u64> {
        entry.get("id").and_then(Value::as_u64)
    }

    /// Handle `GET /`.
    fn handle_index(&self) -> StockroomResult<HttpResponse> {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("GET /api/products", "List all products");
        endpoints.insert("GET /api/products/{id}", "Get a single product");
        endpoints.insert("POST /api/products", "Create a new product");
        endpoints.insert("PUT /api/products/{id}", "Update a product");
        endpoints.insert("DELETE /api/products/{id}", "Delete a product");

        Self::json_response(
            HttpStatusCode::Ok,
            &IndexResponse {
                message: "Inventory Management API",
                version: API_VERSION,
                endpoints,
            },
        )
    }

    /// Handle `GET /api/products`.
    fn handle_list(&self) -> StockroomResult<HttpResponse> {
        let products = self.store.load();
        Self::json_response(
            HttpStatusCode::Ok,
            &ListResponse {
                success: true,
                total: products.len(),
                products,
            },
        )
    }

    /// Handle `GET /api/products/{id}`.
    fn handle_get(&self, id: u64) -> StockroomResult<HttpResponse> {
        let products = self.store.load();
        match products
            .iter()
            .find(|entry| Self::record_id(entry) == Some(id))
        {
            Some(product) => Self::json_response(
                HttpStatusCode::Ok,
                &ProductResponse {
                    success: true,
                    message: None,
                    product: product.clone(),
                },
            ),
            None => Self::error_response(HttpStatusCode::NotFound, "Product not found"),
        }
    }

    /// Handle `POST /api/products`.
    fn handle_create(&self, request: &HttpRequest) -> StockroomResult<HttpResponse> {
        let body = match Self::read_json_object(request, "No data received") {
            Ok(body) => body,
            Err(message) => return Self::error_response(HttpStatusCode::BadRequest, message),
        };
        let input = match parse_new_product(&body) {
            Ok(input) => input,
            Err(message) => return Self::error_response(HttpStatusCode::BadRequest, message),
        };

        let created: StockroomResult<Value> = self.store.with_store(|store| {
            let mut products = store.load();
            let id = next_product_id(&products);
            let product = Product::new(id, input.name, input.category, input.price, input.quantity)
                .with_description(input.description)
                .with_expiration_date(input.expiration_date)
                .with_created_at(now_timestamp());
            let value = product.to_value()?;
            products.push(value.clone());
            store.save(&products)?;
            Ok(value)
        });

        match created {
            Ok(product) => {
                debug!(id = Self::record_id(&product), "product created");
                Self::json_response(
                    HttpStatusCode::Created,
                    &ProductResponse {
                        success: true,
                        message: Some("Product created successfully"),
                        product,
                    },
                )
            }
            Err(e) => {
                warn!(error = %e, "failed to create product");
                Self::error_response(
                    HttpStatusCode::InternalServerError,
                    format!("Failed to create product: {}", e),
                )
            }
        }
    }

    /// Handle `PUT /api/products/{id}`.
    fn handle_update(&self, id: u64, request: &HttpRequest) -> StockroomResult<HttpResponse> {
        let body = match Self::read_json_object(request, "No data received to update") {
            Ok(body) => body,
            Err(message) => return Self::error_response(HttpStatusCode::BadRequest, message),
        };
        let patch = match parse_product_patch(&body) {
            Ok(patch) => patch,
            Err(message) => return Self::error_response(HttpStatusCode::BadRequest, message),
        };

        let updated: StockroomResult<Option<Value>> = self.store.with_store(|store| {
            let mut products = store.load();
            let position = products
                .iter()
                .position(|entry| Self::record_id(entry) == Some(id));
            let Some(position) = position else {
                // Not found: nothing is written
                return Ok(None);
            };
            if let Some(record) = products[position].as_object_mut() {
                apply_patch(record, &patch, &now_timestamp());
            }
            let value = products[position].clone();
            store.save(&products)?;
            Ok(Some(value))
        });

        match updated {
            Ok(Some(product)) => {
                debug!(id, "product updated");
                Self::json_response(
                    HttpStatusCode::Ok,
                    &ProductResponse {
                        success: true,
                        message: Some("Product updated successfully"),
                        product,
                    },
                )
            }
            Ok(None) => Self::error_response(HttpStatusCode::NotFound, "Product not found"),
            Err(e) => {
                warn!(id, error = %e, "failed to update product");
                Self::error_response(
                    HttpStatusCode::InternalServerError,
                    format!("Failed to update product: {}", e),
                )
            }
        }
    }

    /// Handle `DELETE /api/products/{id}`.
    fn handle_delete(&self, id: u64) -> StockroomResult<HttpResponse> {
        let deleted: StockroomResult<bool> = self.store.with_store(|store| {
            let mut products = store.load();
            let before = products.len();
            products.retain(|entry| Self::record_id(entry) != Some(id));
            if products.len() == before {
                // Not found: nothing is written
                return Ok(false);
            }
            store.save(&products)?;
            Ok(true)
        });

        match deleted {
            Ok(true) => {
                debug!(id, "product deleted");
                Self::json_response(
                    HttpStatusCode::Ok,
                    &MessageResponse {
                        success: true,
                        message: "Product deleted successfully",
                    },
                )
            }
            Ok(false) => Self::error_response(HttpStatusCode::NotFound, "Product not found"),
            Err(e) => {
                warn!(id, error = %e, "failed to delete product");
                Self::error_response(
                    HttpStatusCode::InternalServerError,
                    format!("Failed to delete product: {}", e),
                )
            }
        }
    }

    /// Handle a CORS preflight request.
    fn handle_preflight(&self) -> StockroomResult<HttpResponse> {
        Ok(HttpResponse::no_content()
            .with_header("Access-Control-Allow-Origin", "*")
            .with_header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
            .with_header("Access-Control-Allow-Headers", "Content-Type"))
    }
}

impl HttpService for ApiService {
    fn handle_request(&self, request: HttpRequest) -> StockroomResult<HttpResponse> {
        // Remove query parameters from the path before routing
        let path = request.path().split('?').next().unwrap_or(request.path());
        debug!(method = %request.method(), path, "handling request");

        if request.method() == &HttpMethod::Options {
            return self.handle_preflight();
        }

        match (request.method(), path) {
            (HttpMethod::Get, "/") => self.handle_index(),
            (HttpMethod::Get, "/api/products") => self.handle_list(),
            (HttpMethod::Post, "/api/products") => self.handle_create(&request),
            _ => match Self::extract_product_id(path) {
                Some(id) => match request.method() {
                    HttpMethod::Get => self.handle_get(id),
                    HttpMethod::Put => self.handle_update(id, &request),
                    HttpMethod::Delete => self.handle_delete(id),
                    _ => Self::error_response(HttpStatusCode::NotFound, "Endpoint not found"),
                },
                None => Self::error_response(HttpStatusCode::NotFound, "Endpoint not found"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn create_test_service() -> ApiService {
        ApiService::new(StoreHandle::new(MemoryStore::new()))
    }

    fn get(service: &ApiService, path: &str) -> HttpResponse {
        service
            .handle_request(HttpRequest::new(HttpMethod::Get, path))
            .unwrap()
    }

    fn post(service: &ApiService, path: &str, body: &Value) -> HttpResponse {
        service
            .handle_request(
                HttpRequest::new(HttpMethod::Post, path).with_body(body.to_string()),
            )
            .unwrap()
    }

    fn put(service: &ApiService, path: &str, body: &Value) -> HttpResponse {
        service
            .handle_request(HttpRequest::new(HttpMethod::Put, path).with_body(body.to_string()))
            .unwrap()
    }

    fn delete(service: &ApiService, path: &str) -> HttpResponse {
        service
            .handle_request(HttpRequest::new(HttpMethod::Delete, path))
            .unwrap()
    }

    fn body_json(response: &HttpResponse) -> Value {
        serde_json::from_slice(response.body().as_bytes()).unwrap()
    }

    #[test]
    fn test_index() {
        let service = create_test_service();
        let response = get(&service, "/");

        assert_eq!(response.status(), HttpStatusCode::Ok);
        let body = body_json(&response);
        assert_eq!(body["message"], json!("Inventory Management API"));
        assert!(body["endpoints"]["GET /api/products"].is_string());
    }

    #[test]
    fn test_list_empty() {
        let service = create_test_service();
        let response = get(&service, "/api/products");

        assert_eq!(response.status(), HttpStatusCode::Ok);
        let body = body_json(&response);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["total"], json!(0));
        assert_eq!(body["products"], json!([]));
    }

    #[test]
    fn test_create_product() {
        let service = create_test_service();
        let response = post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools", "price": 10.5, "quantity": 3}),
        );

        assert_eq!(response.status(), HttpStatusCode::Created);
        let body = body_json(&response);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Product created successfully"));
        let product = &body["product"];
        assert_eq!(product["id"], json!(1));
        assert_eq!(product["name"], json!("Widget"));
        assert_eq!(product["price"], json!(10.5));
        assert_eq!(product["quantity"], json!(3));
        assert!(product["created_at"].is_string());
        assert!(product.get("modified_at").is_none());
    }

    #[test]
    fn test_create_accepts_stringly_numbers() {
        let service = create_test_service();
        let response = post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools", "price": "10.5", "quantity": "3"}),
        );

        assert_eq!(response.status(), HttpStatusCode::Created);
        let body = body_json(&response);
        assert_eq!(body["product"]["price"], json!(10.5));
        assert_eq!(body["product"]["quantity"], json!(3));
    }

    #[test]
    fn test_create_validation_errors() {
        let service = create_test_service();

        let response = post(&service, "/api/products", &json!({"category": "Tools"}));
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(body_json(&response)["error"], json!("Name is required"));

        let response = post(
            &service,
            "/api/products",
            &json!({"name": "W", "category": "T", "price": -1}),
        );
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(
            body_json(&response)["error"],
            json!("Price cannot be negative")
        );
    }

    #[test]
    fn test_create_empty_body() {
        let service = create_test_service();
        let response = service
            .handle_request(HttpRequest::new(HttpMethod::Post, "/api/products"))
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(body_json(&response)["error"], json!("No data received"));

        let response = post(&service, "/api/products", &json!({}));
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(body_json(&response)["error"], json!("No data received"));
    }

    #[test]
    fn test_create_invalid_json_body() {
        let service = create_test_service();
        let response = service
            .handle_request(
                HttpRequest::new(HttpMethod::Post, "/api/products").with_body("{not json"),
            )
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(
            body_json(&response)["error"],
            json!("Request body must be valid JSON")
        );
    }

    #[test]
    fn test_get_product() {
        let service = create_test_service();
        post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools", "price": 1, "quantity": 1}),
        );

        let response = get(&service, "/api/products/1");
        assert_eq!(response.status(), HttpStatusCode::Ok);
        let body = body_json(&response);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["product"]["name"], json!("Widget"));

        let response = get(&service, "/api/products/99");
        assert_eq!(response.status(), HttpStatusCode::NotFound);
        assert_eq!(body_json(&response)["error"], json!("Product not found"));
    }

    #[test]
    fn test_non_numeric_id_is_unknown_endpoint() {
        let service = create_test_service();
        let response = get(&service, "/api/products/abc");

        assert_eq!(response.status(), HttpStatusCode::NotFound);
        assert_eq!(body_json(&response)["error"], json!("Endpoint not found"));
    }

    #[test]
    fn test_partial_update() {
        let service = create_test_service();
        post(
            &service,
            "/api/products",
            &json!({
                "name": "Widget",
                "category": "Tools",
                "description": "original",
                "price": 10.5,
                "quantity": 3,
                "expiration_date": "2027-01-01"
            }),
        );

        let response = put(&service, "/api/products/1", &json!({"price": 9.99}));
        assert_eq!(response.status(), HttpStatusCode::Ok);
        let body = body_json(&response);
        assert_eq!(body["message"], json!("Product updated successfully"));

        let product = &body["product"];
        assert_eq!(product["price"], json!(9.99));
        // Everything else unchanged, modification timestamp set
        assert_eq!(product["name"], json!("Widget"));
        assert_eq!(product["category"], json!("Tools"));
        assert_eq!(product["description"], json!("original"));
        assert_eq!(product["quantity"], json!(3));
        assert_eq!(product["expiration_date"], json!("2027-01-01"));
        assert!(product["created_at"].is_string());
        assert!(product["modified_at"].is_string());
    }

    #[test]
    fn test_update_validation_and_not_found() {
        let service = create_test_service();
        post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools"}),
        );

        let response = put(&service, "/api/products/1", &json!({"name": "  "}));
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(body_json(&response)["error"], json!("Name cannot be empty"));

        let response = put(&service, "/api/products/42", &json!({"price": 1}));
        assert_eq!(response.status(), HttpStatusCode::NotFound);

        let response = service
            .handle_request(HttpRequest::new(HttpMethod::Put, "/api/products/1"))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(
            body_json(&response)["error"],
            json!("No data received to update")
        );
    }

    #[test]
    fn test_delete_product() {
        let service = create_test_service();
        post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools"}),
        );

        let response = delete(&service, "/api/products/1");
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            body_json(&response)["message"],
            json!("Product deleted successfully")
        );

        assert_eq!(
            get(&service, "/api/products/1").status(),
            HttpStatusCode::NotFound
        );
        assert_eq!(
            delete(&service, "/api/products/1").status(),
            HttpStatusCode::NotFound
        );
    }

    #[test]
    fn test_create_delete_create_reuses_derived_id() {
        let service = create_test_service();

        let first = post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools", "price": 10.5, "quantity": 3}),
        );
        assert_eq!(body_json(&first)["product"]["id"], json!(1));
        assert!(body_json(&first)["product"].get("modified_at").is_none());

        let second = post(
            &service,
            "/api/products",
            &json!({"name": "Gadget", "category": "Tools", "price": 5, "quantity": 1}),
        );
        assert_eq!(body_json(&second)["product"]["id"], json!(2));

        delete(&service, "/api/products/1");

        // Max remaining id is 2, so the next id is 3: ids freed below the
        // maximum are not reissued, ids above it are
        let third = post(
            &service,
            "/api/products",
            &json!({"name": "Gizmo", "category": "Tools", "price": 1, "quantity": 1}),
        );
        assert_eq!(body_json(&third)["product"]["id"], json!(3));

        let listing = body_json(&get(&service, "/api/products"));
        assert_eq!(listing["total"], json!(2));
    }

    #[test]
    fn test_unknown_endpoint() {
        let service = create_test_service();

        let response = get(&service, "/api/other");
        assert_eq!(response.status(), HttpStatusCode::NotFound);
        assert_eq!(body_json(&response)["error"], json!("Endpoint not found"));

        // Method without a route on a known path
        let response = put(&service, "/api/products", &json!({"name": "W"}));
        assert_eq!(response.status(), HttpStatusCode::NotFound);
    }

    #[test]
    fn test_save_failure_maps_to_500() {
        let service = ApiService::new(StoreHandle::new(MemoryStore::failing()));
        let response = post(
            &service,
            "/api/products",
            &json!({"name": "Widget", "category": "Tools"}),
        );

        assert_eq!(response.status(), HttpStatusCode::InternalServerError);
        let body = body_json(&response);
        assert_eq!(body["success"], json!(false));
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Failed to create product")
        );
    }

    #[test]
    fn test_cors_headers() {
        let service = create_test_service();

        let response = get(&service, "/api/products");
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin"),
            Some(&"*".to_string())
        );

        let preflight = service
            .handle_request(HttpRequest::new(HttpMethod::Options, "/api/products"))
            .unwrap();
        assert_eq!(preflight.status(), HttpStatusCode::NoContent);
        assert_eq!(
            preflight.headers().get("Access-Control-Allow-Methods"),
            Some(&"GET, POST, PUT, DELETE, OPTIONS".to_string())
        );
    }

    #[test]
    fn test_query_parameters_are_ignored_for_routing() {
        let service = create_test_service();
        let response = get(&service, "/api/products?format=json");
        assert_eq!(response.status(), HttpStatusCode::Ok);
    }
}
