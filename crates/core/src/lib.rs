//! `backoffice-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no HTTP, no storage).

pub mod entity;
pub mod error;
pub mod id;
pub mod lifecycle;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldErrors};
pub use id::{OperationId, RecordId, RoleId, UserId};
pub use lifecycle::{DeleteMode, RestoreMode, Status};
