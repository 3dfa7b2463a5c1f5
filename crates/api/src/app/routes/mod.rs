use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    response::Response,
};

use backoffice_auth::classify;
use backoffice_infra::records::Family;

use crate::app::{dto, errors::ApiError, services::AppServices};
use crate::context::CallerContext;

pub mod catalog;
pub mod records;
pub mod system;

/// POST /api/:endpoint/ - route a gated request to its family handler.
///
/// `Operation` and `Role` are catalog endpoints; every other resource name
/// must be a registered record family.
pub async fn dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(endpoint): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let target = classify(&endpoint);
    let action = target.action.ok_or(ApiError::EndpointNotFound)?;
    let body = dto::parse_body(&body);

    tracing::debug!(
        user = %caller.user_id(),
        resource = target.resource,
        action = action.suffix(),
        "dispatch"
    );

    match target.resource {
        "Operation" => catalog::operation(&services, action, &body),
        "Role" => catalog::role(&services, action, &body),
        name => {
            let family = Family::from_name(name).ok_or(ApiError::EndpointNotFound)?;
            records::handle(&services, family, action, &body)
        }
    }
}
