use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;

use backoffice_auth::{build_menu, menu_for_role, GateError, MenuNode, PolicySource};
use backoffice_core::{RoleId, Status};

use crate::app::{errors::ApiError, services::AppServices};
use crate::context::CallerContext;
use crate::middleware::ROLE_HEADER;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<CallerContext>) -> Json<serde_json::Value> {
    let caller = caller.caller();
    Json(json!({
        "user_id": caller.user_id,
        "username": caller.username,
        "roles": caller.roles,
        "is_superuser": caller.is_superuser,
    }))
}

/// GET /menu - navigation tree for the selected role (full tree for superusers).
pub async fn menu(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<MenuNode>>, ApiError> {
    let directory = &services.directory;
    let operations = directory.operations();

    if caller.is_superuser() {
        return Ok(Json(build_menu(&operations, |_| true)));
    }

    let raw = headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(GateError::MissingRole)?;
    let role_id: RoleId = raw.parse().map_err(|_| GateError::InvalidRole)?;
    if !caller.caller().has_role(role_id) {
        return Err(GateError::RoleNotAssigned(role_id).into());
    }
    let role = directory
        .role(role_id)
        .filter(|r| r.status == Status::Active)
        .ok_or(GateError::UnknownRole(role_id))?;

    Ok(Json(menu_for_role(&operations, &role)))
}
