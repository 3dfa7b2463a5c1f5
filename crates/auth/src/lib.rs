//! `backoffice-auth`: authentication and role-gated authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage: the gate works
//! on a path, two request hints and a [`PolicySource`] supplied by the caller.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod menu;
pub mod operation;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{
    authorize, classify, BodyHints, Endpoint, EndpointAction, Gate, GateDecision, GateError,
    GateRequest, PolicySource,
};
pub use claims::{validate_claims, JwtClaims, TokenError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use menu::{build_menu, menu_for_role, MenuNode};
pub use operation::{NodeType, Operation};
pub use permissions::{Capability, Feature, FeatureFlags};
pub use principal::Caller;
pub use roles::{FeatureGrant, Role};
pub use user::User;
