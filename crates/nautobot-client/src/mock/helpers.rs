//! Helper functions for building nested Nautobot references and errors

use crate::error::NautobotError;
use crate::models::NestedObject;
use serde_json::{Value, json};
use uuid::Uuid;

pub struct Helpers {
    base_url: String,
}

impl Helpers {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    /// Reference to an object at `endpoint` (e.g. `dcim/locations`)
    pub fn nested(&self, endpoint: &str, object_type: &str, id: Uuid, name: Option<&str>) -> NestedObject {
        NestedObject {
            id,
            object_type: Some(object_type.to_string()),
            url: Some(format!("{}/api/{}/{}/", self.base_url, endpoint, id)),
            name: name.map(str::to_string),
        }
    }

    pub fn status(&self, name: &str) -> NestedObject {
        self.nested("extras/statuses", "extras.status", status_id(name), Some(name))
    }
}

// Stable per-name status ids so records compare equal across writes.
fn status_id(name: &str) -> Uuid {
    let mut bytes = [0u8; 16];
    for (i, b) in name.bytes().enumerate() {
        bytes[i % 16] ^= b;
    }
    Uuid::from_bytes(bytes)
}

/// Name carried by a patch value: `"Active"` or `{"name": "Active"}`
pub fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// UUID carried by a patch value: `"<uuid>"` or `{"id": "<uuid>"}`
pub fn uuid_of(value: &Value) -> Option<Uuid> {
    let s = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("id").and_then(Value::as_str)?,
        _ => return None,
    };
    Uuid::parse_str(s).ok()
}

pub fn bad_request(method: &str, path: &str, body: Value) -> NautobotError {
    NautobotError::BadRequest {
        method: method.to_string(),
        path: path.to_string(),
        body: body.to_string(),
    }
}

pub fn unique_set(method: &str, path: &str, fields: &str) -> NautobotError {
    bad_request(
        method,
        path,
        json!({"non_field_errors": [format!("The fields {fields} must make a unique set.")]}),
    )
}

pub fn already_exists(method: &str, path: &str, kind: &str, field: &str) -> NautobotError {
    bad_request(method, path, json!({field: [format!("{kind} with this {field} already exists.")]}))
}

pub fn not_found(kind: &str, id: impl std::fmt::Display) -> NautobotError {
    NautobotError::NotFound(format!("{kind} {id} not found"))
}
