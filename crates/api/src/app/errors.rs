use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use backoffice_auth::GateError;
use backoffice_core::{DomainError, FieldErrors};

/// Every failure a handler or middleware can answer with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("authentication failed")]
    Unauthenticated,

    #[error("request closed")]
    Forbidden,

    #[error("endpoint not found")]
    EndpointNotFound,

    #[error("record not found")]
    RecordNotFound,

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("could not read request body")]
    UnreadableBody,

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::EndpointNotFound => StatusCode::NOT_FOUND,
            ApiError::RecordNotFound
            | ApiError::Validation(_)
            | ApiError::DeleteFailed(_)
            | ApiError::UnreadableBody => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a delete failure: conflicts become `delete failed: ...`.
    pub fn delete_failed(err: DomainError) -> Self {
        match err {
            DomainError::Conflict(reason) => ApiError::DeleteFailed(reason),
            other => other.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => ApiError::Validation(errors),
            DomainError::InvalidId(msg) => {
                let mut errors = FieldErrors::new();
                errors.entry("id".into()).or_default().push(msg);
                ApiError::Validation(errors)
            }
            DomainError::NotFound => ApiError::RecordNotFound,
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::InvariantViolation(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        if err.is_authentication() {
            ApiError::Unauthenticated
        } else {
            ApiError::Forbidden
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (
                status,
                axum::Json(json!({ "message": "validation failed", "errors": errors })),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                json_error(status, "internal error")
            }
            other => json_error(status, other.to_string()),
        }
    }
}

/// `{"message": ...}` body with the given status.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "message": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_auth::TokenError;

    #[test]
    fn gate_errors_split_into_401_and_403() {
        let expired: ApiError = GateError::Token(TokenError::Expired).into();
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        let missing_role: ApiError = GateError::MissingRole.into();
        assert_eq!(missing_role.status(), StatusCode::FORBIDDEN);
        assert_eq!(missing_role.to_string(), "request closed");
    }

    #[test]
    fn domain_errors_map_to_client_errors() {
        assert_eq!(ApiError::from(DomainError::NotFound).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::delete_failed(DomainError::conflict("still referenced")),
            ApiError::DeleteFailed("still referenced".into())
        );
        assert_eq!(
            ApiError::DeleteFailed("x".into()).to_string(),
            "delete failed: x"
        );
    }
}
