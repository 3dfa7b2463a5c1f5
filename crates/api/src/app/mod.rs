//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: in-memory directory and record engine
//! - `routes/`: HTTP handlers (endpoint dispatch, catalog, records, session)
//! - `dto.rs`: request parsing and response envelopes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use backoffice_auth::{Gate, Hs256JwtValidator};
use backoffice_infra::directory::DirectorySeed;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &ApiConfig, seed: DirectorySeed) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(seed)?);

    let gate_state = middleware::GateState {
        gate: Arc::new(Gate::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes()))),
        directory: services.directory.clone(),
        max_body_bytes: config.max_body_bytes,
    };

    // Endpoint families: token + roleId + feature flags.
    let gated = Router::new()
        .route("/api/:endpoint", post(routes::dispatch))
        .route("/api/:endpoint/", post(routes::dispatch))
        .route_layer(axum::middleware::from_fn_with_state(
            gate_state.clone(),
            middleware::gate_middleware,
        ));

    // Session routes: token only.
    let session = Router::new()
        .route("/whoami", get(routes::system::whoami))
        .route("/menu", get(routes::system::menu))
        .route_layer(axum::middleware::from_fn_with_state(
            gate_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(gated)
        .merge(session)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_id_middleware))
                .layer(DefaultBodyLimit::max(config.max_body_bytes))
                .layer(Extension(services)),
        ))
}
