//! HTTP API: server wiring, the authorization gate middleware and handlers.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
