//! Request-body validation for the handler layer.
//!
//! Field semantics (non-empty name/category, non-negative price/quantity)
//! are enforced here, before any store call; the store itself only performs
//! structural work. Errors are client-facing messages that the service
//! wraps in a 400 envelope.
//!
//! Numeric fields accept JSON numbers or numeric strings: the HTML form
//! front-end submits every value as a string.

use serde_json::Value;

use crate::product::ProductPatch;

/// Validated field set for creating a product. Identifier and creation
/// timestamp are assigned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProductInput {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: f64,
    pub quantity: u64,
    pub expiration_date: String,
}

/// Validate a create request body.
///
/// `name` and `category` are required and must be non-empty after
/// trimming; `price` and `quantity` default to zero when absent.
pub fn parse_new_product(body: &Value) -> Result<NewProductInput, String> {
    let name = required_string(body, "name").ok_or("Name is required")?;
    let category = required_string(body, "category").ok_or("Category is required")?;

    let price = match body.get("price") {
        Some(value) => parse_price(value)?,
        None => 0.0,
    };
    let quantity = match body.get("quantity") {
        Some(value) => parse_quantity(value)?,
        None => 0,
    };

    Ok(NewProductInput {
        name,
        category,
        description: optional_string(body, "description"),
        price,
        quantity,
        expiration_date: optional_string(body, "expiration_date"),
    })
}

/// Validate an update request body into a per-field patch.
///
/// Each field is validated only if supplied; supplying an empty `name` or
/// `category` is rejected rather than treated as an omission.
pub fn parse_product_patch(body: &Value) -> Result<ProductPatch, String> {
    let mut patch = ProductPatch::default();

    if body.get("name").is_some() {
        patch.name = Some(required_string(body, "name").ok_or("Name cannot be empty")?);
    }
    if body.get("category").is_some() {
        patch.category =
            Some(required_string(body, "category").ok_or("Category cannot be empty")?);
    }
    if let Some(value) = body.get("price") {
        patch.price = Some(parse_price(value)?);
    }
    if let Some(value) = body.get("quantity") {
        patch.quantity = Some(parse_quantity(value)?);
    }
    if body.get("description").is_some() {
        patch.description = Some(optional_string(body, "description"));
    }
    if body.get("expiration_date").is_some() {
        patch.expiration_date = Some(optional_string(body, "expiration_date"));
    }

    Ok(patch)
}

fn required_string(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_string(body: &Value, field: &str) -> String {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Parse a price value: a JSON number or a numeric string, non-negative.
fn parse_price(value: &Value) -> Result<f64, String> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
    .ok_or("Price must be a valid number")?;

    if price < 0.0 {
        return Err("Price cannot be negative".to_string());
    }
    Ok(price)
}

/// Parse a quantity value: a JSON integer, a float (truncated), or an
/// integer string, non-negative.
fn parse_quantity(value: &Value) -> Result<u64, String> {
    match value {
        Value::Number(n) => {
            if let Some(q) = n.as_u64() {
                Ok(q)
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                if f < 0.0 {
                    Err("Quantity cannot be negative".to_string())
                } else {
                    Ok(f as u64)
                }
            } else {
                Err("Quantity must be a valid integer".to_string())
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(q) if q < 0 => Err("Quantity cannot be negative".to_string()),
            Ok(q) => Ok(q as u64),
            Err(_) => Err("Quantity must be a valid integer".to_string()),
        },
        _ => Err("Quantity must be a valid integer".to_string()),
    }
}
