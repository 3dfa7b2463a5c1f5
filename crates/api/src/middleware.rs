use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use http_body_util::LengthLimitError;
use tracing::Instrument;

use backoffice_auth::{
    classify, BodyHints, EndpointAction, Gate, GateDecision, GateRequest, Hs256JwtValidator,
};
use backoffice_infra::directory::InMemoryDirectory;

use crate::app::errors::ApiError;
use crate::context::{CallerContext, RequestId};

/// Header carrying the caller's selected role.
pub const ROLE_HEADER: &str = "roleid";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<Gate<Hs256JwtValidator>>,
    pub directory: Arc<InMemoryDirectory>,
    pub max_body_bytes: usize,
}

/// Authorization gate for `/api/...` endpoints.
///
/// Buffers the body (the gate reads `id` and `type` from it), runs the token,
/// role and feature checks, and forwards the rebuilt request on success.
pub async fn gate_middleware(
    State(state): State<GateState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(body_error)?;

    let path = parts.uri.path().to_string();
    let outcome = {
        let endpoint = classify(&path);
        let hints = match endpoint.action {
            Some(EndpointAction::AddOrUpdate | EndpointAction::Delete) => BodyHints::from_json(&bytes),
            _ => BodyHints::default(),
        };
        let gate_req = GateRequest {
            bearer: extract_bearer(&parts.headers),
            role_header: parts.headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok()),
            path: &path,
            hints,
        };
        state.gate.check(&gate_req, state.directory.as_ref(), Utc::now())
    };

    let (caller, decision) = outcome.map_err(|e| {
        tracing::warn!(path = %path, reason = %e, "gate.deny");
        ApiError::from(e)
    })?;

    let role_id = match &decision {
        GateDecision::Superuser => None,
        GateDecision::Granted { role_id, .. } => Some(*role_id),
    };
    tracing::debug!(
        path = %path,
        user = %caller.user_id,
        superuser = caller.is_superuser,
        role = ?role_id,
        "gate.allow"
    );

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(CallerContext::new(caller, role_id));
    Ok(next.run(req).await)
}

/// Token-only authentication for session routes (`/whoami`, `/menu`).
pub async fn auth_middleware(
    State(state): State<GateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = state
        .gate
        .authenticate(extract_bearer(req.headers()), state.directory.as_ref(), Utc::now())
        .map_err(|e| {
            tracing::warn!(path = %req.uri().path(), reason = %e, "auth.deny");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(CallerContext::new(caller, None));
    Ok(next.run(req).await)
}

/// Tag every request with a fresh uuid v7, on its span and in the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = uuid::Uuid::now_v7().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// 413 when the buffered body hit the size limit, 400 for any other read failure.
fn body_error(err: axum::Error) -> ApiError {
    let inner = err.into_inner();
    let root: &(dyn std::error::Error + 'static) = &*inner;
    let mut source = Some(root);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return ApiError::PayloadTooLarge;
        }
        source = e.source();
    }
    tracing::debug!(error = %inner, "request body could not be read");
    ApiError::UnreadableBody
}

/// Bearer token from the `Authorization` header, if well-formed.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn only_the_length_limit_maps_to_413() {
        let err = axum::body::to_bytes(Body::from("x".repeat(32)), 8).await.unwrap_err();
        assert_eq!(body_error(err), ApiError::PayloadTooLarge);

        let reset = axum::Error::new(std::io::Error::other("connection reset"));
        let mapped = body_error(reset);
        assert_eq!(mapped, ApiError::UnreadableBody);
        assert_eq!(mapped.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
