//! Operation and Role endpoints.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use backoffice_auth::{EndpointAction, Operation, Role};
use backoffice_core::{DeleteMode, DomainError, OperationId, RoleId};
use backoffice_infra::records::{body_id, body_type};

use crate::app::dto::{self, PageParams, RoleView};
use crate::app::{errors::ApiError, services::AppServices};

/// `OperationAddOrUpdate/`, `OperationList/`, `OperationGet/`, `OperationDelete/`.
///
/// Operations are removed for good; `type` must be 3 or 4.
pub fn operation(
    services: &AppServices,
    action: EndpointAction,
    body: &Map<String, Value>,
) -> Result<Response, ApiError> {
    let directory = &services.directory;

    match action {
        EndpointAction::AddOrUpdate => {
            let op: Operation = dto::from_body_with_id(body)?;
            let inserted = op.id.is_new();
            let saved = directory.save_operation(op)?;
            let msg = if inserted { "operation created" } else { "operation updated" };
            Ok(dto::message(msg, saved))
        }
        EndpointAction::List => {
            let params: PageParams = dto::from_body(body)?;
            let page = params.apply(directory.list_operations()?)?;
            Ok(Json(page).into_response())
        }
        EndpointAction::Get => {
            let id = OperationId::new(body_id(body)?.get());
            Ok(dto::data(directory.get_operation(id)?))
        }
        EndpointAction::Delete => {
            let id = OperationId::new(body_id(body)?.get());
            let mode = DeleteMode::try_from(body_type(body)?)?;
            if mode.is_soft() {
                return Err(DomainError::validation("type", "operations can only be hard deleted").into());
            }
            let removed = directory
                .delete_operation(id)
                .map_err(ApiError::delete_failed)?;
            Ok(Json(json!({ "message": "operation deleted", "data": removed })).into_response())
        }
        EndpointAction::UnDelete => Err(ApiError::EndpointNotFound),
    }
}

/// `RoleAddOrUpdate/`, `RoleList/`, `RoleGet/`.
///
/// Responses carry the role's features resolved against the live catalog.
pub fn role(
    services: &AppServices,
    action: EndpointAction,
    body: &Map<String, Value>,
) -> Result<Response, ApiError> {
    let directory = &services.directory;

    match action {
        EndpointAction::AddOrUpdate => {
            let role: Role = dto::from_body_with_id(body)?;
            let inserted = role.id.is_new();
            let saved = directory.save_role(role)?;
            let view = RoleView::new(saved, &directory.list_operations()?);
            let msg = if inserted { "role created" } else { "role updated" };
            Ok(dto::message(msg, view))
        }
        EndpointAction::List => {
            let params: PageParams = dto::from_body(body)?;
            let catalog = directory.list_operations()?;
            let views = directory
                .list_roles()?
                .into_iter()
                .map(|role| RoleView::new(role, &catalog))
                .collect();
            Ok(Json(params.apply(views)?).into_response())
        }
        EndpointAction::Get => {
            let id = RoleId::new(body_id(body)?.get());
            let role = directory.get_role(id)?;
            Ok(dto::data(RoleView::new(role, &directory.list_operations()?)))
        }
        EndpointAction::Delete | EndpointAction::UnDelete => Err(ApiError::EndpointNotFound),
    }
}
