//! Request parsing and response envelopes.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use backoffice_auth::{Feature, Operation, Role};
use backoffice_core::{DomainError, FieldErrors};
use backoffice_infra::records::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use backoffice_infra::records::{body_id, paginate, Page};

use crate::app::errors::ApiError;

// -------------------------
// Request parsing
// -------------------------

/// JSON object body; anything else (empty, malformed, non-object) is `{}`.
pub fn parse_body(bytes: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Deserialize a typed payload, reporting shape errors as validation errors.
pub fn from_body<T: DeserializeOwned>(body: &Map<String, Value>) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(body.clone()))
        .map_err(|e| ApiError::from(DomainError::validation("body", e.to_string())))
}

/// Like [`from_body`], with `id` normalised (missing or numeric string) first.
pub fn from_body_with_id<T: DeserializeOwned>(body: &Map<String, Value>) -> Result<T, ApiError> {
    let mut body = body.clone();
    let id = body_id(&body)?;
    body.insert("id".into(), Value::from(id.get()));
    from_body(&body)
}

/// Paging fields of catalog list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
        }
    }
}

impl PageParams {
    pub fn apply<T>(self, items: Vec<T>) -> Result<Page<T>, ApiError> {
        let mut errors = FieldErrors::new();
        if self.page < 1 {
            errors.entry("page".into()).or_default().push("page must be at least 1".into());
        }
        if self.page_size < 1 {
            errors.entry("pageSize".into()).or_default().push("pageSize must be at least 1".into());
        }
        DomainError::check(errors)?;

        let size = (self.page_size as u64).min(MAX_PAGE_SIZE);
        Ok(paginate(items, self.page as u64, size))
    }
}

// -------------------------
// Response envelopes
// -------------------------

pub fn data<T: Serialize>(data: T) -> Response {
    Json(json!({ "data": data })).into_response()
}

pub fn message<T: Serialize>(message: &str, data: T) -> Response {
    Json(json!({ "message": message, "data": data })).into_response()
}

/// A role together with its features resolved against the live catalog.
#[derive(Debug, Clone, Serialize)]
pub struct RoleView {
    #[serde(flatten)]
    pub role: Role,
    pub features: Vec<Feature>,
}

impl RoleView {
    pub fn new(role: Role, catalog: &[Operation]) -> Self {
        let features = role.features(catalog);
        Self { role, features }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_auth::NodeType;

    #[test]
    fn malformed_bodies_are_empty_objects() {
        assert!(parse_body(b"").is_empty());
        assert!(parse_body(b"not json").is_empty());
        assert!(parse_body(b"[1, 2]").is_empty());
        assert_eq!(parse_body(br#"{"id": 3}"#)["id"], 3);
    }

    #[test]
    fn ids_are_normalised_before_typed_parsing() {
        let body = parse_body(br#"{"id": "4", "key": "faq", "title": "FAQ", "url": "/api/Faq"}"#);
        let op: Operation = from_body_with_id(&body).unwrap();
        assert_eq!(op.id.get(), 4);
        assert_eq!(op.operation_type, NodeType::Page);

        let inserted: Operation =
            from_body_with_id(&parse_body(br#"{"key": "faq", "title": "FAQ", "url": "/api/Faq"}"#)).unwrap();
        assert!(inserted.id.is_new());
    }

    #[test]
    fn bad_page_params_are_validation_errors() {
        let err = PageParams { page: 0, page_size: 10 }.apply(vec![1]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains_key("page")));
    }

    #[test]
    fn huge_pages_are_empty() {
        let page = PageParams { page: i64::MAX, page_size: 10 }.apply(vec![1, 2, 3]).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.next, None);
    }
}
