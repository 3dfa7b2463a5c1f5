//! Record family endpoints: `<Family>AddOrUpdate/`, `List/`, `Get/`,
//! `Delete/`, `UnDelete/`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Map, Value};

use backoffice_auth::EndpointAction;
use backoffice_core::{DeleteMode, RestoreMode};
use backoffice_infra::records::{body_id, body_type, Family, ListQuery};

use crate::app::{dto, errors::ApiError, services::AppServices};

pub fn handle(
    services: &AppServices,
    family: Family,
    action: EndpointAction,
    body: &Map<String, Value>,
) -> Result<Response, ApiError> {
    let engine = &services.records;
    let now = Utc::now();

    match action {
        EndpointAction::AddOrUpdate => {
            let inserted = body_id(body)?.is_new();
            let record = engine.add_or_update(family, body, now)?;
            let msg = if inserted { "record created" } else { "record updated" };
            Ok(dto::message(msg, record))
        }
        EndpointAction::List => {
            let query: ListQuery = dto::from_body(body)?;
            Ok(Json(engine.list(family, &query)?).into_response())
        }
        EndpointAction::Get => {
            let record = engine.get(family, body_id(body)?)?;
            Ok(dto::data(record))
        }
        EndpointAction::Delete => {
            let id = body_id(body)?;
            let mode = DeleteMode::try_from(body_type(body)?)?;
            let changed = engine
                .delete(family, id, mode, now)
                .map_err(ApiError::delete_failed)?;
            Ok(Json(json!({ "message": "record deleted", "changed": changed })).into_response())
        }
        EndpointAction::UnDelete => {
            let id = body_id(body)?;
            let mode = RestoreMode::try_from(body_type(body)?)?;
            let record = engine.undelete(family, id, mode, now)?;
            Ok(dto::message("record restored", record))
        }
    }
}
