//! The role gate: path-derived endpoint actions checked against role features.
//!
//! Decision order:
//! 1. bearer token must verify (401 otherwise, before anything else);
//! 2. superusers pass unconditionally;
//! 3. the `roleId` header must name one of the caller's roles;
//! 4. the selected role must hold a feature keyed by the path prefix;
//! 5. the feature must grant the capabilities the endpoint action requires.
//!
//! - No IO beyond the supplied [`PolicySource`]
//! - No panics

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use backoffice_core::{RoleId, Status, UserId};

use crate::{Caller, Capability, Feature, JwtValidator, Operation, Role, TokenError, User};

/// Read access to users, roles and the operation catalog.
pub trait PolicySource: Send + Sync {
    fn user(&self, id: UserId) -> Option<User>;
    fn role(&self, id: RoleId) -> Option<Role>;
    fn operations(&self) -> Vec<Operation>;
}

impl<S> PolicySource for Arc<S>
where
    S: PolicySource + ?Sized,
{
    fn user(&self, id: UserId) -> Option<User> {
        (**self).user(id)
    }

    fn role(&self, id: RoleId) -> Option<Role> {
        (**self).role(id)
    }

    fn operations(&self) -> Vec<Operation> {
        (**self).operations()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint classification
// ─────────────────────────────────────────────────────────────────────────────

/// Action inferred from the trailing path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EndpointAction {
    List,
    Get,
    AddOrUpdate,
    Delete,
    UnDelete,
}

/// Known suffixes, longest first so `UnDelete` wins over `Delete`.
const SUFFIXES: [(&str, EndpointAction); 5] = [
    ("AddOrUpdate", EndpointAction::AddOrUpdate),
    ("UnDelete", EndpointAction::UnDelete),
    ("Delete", EndpointAction::Delete),
    ("List", EndpointAction::List),
    ("Get", EndpointAction::Get),
];

impl EndpointAction {
    pub fn suffix(self) -> &'static str {
        match self {
            EndpointAction::List => "List",
            EndpointAction::Get => "Get",
            EndpointAction::AddOrUpdate => "AddOrUpdate",
            EndpointAction::Delete => "Delete",
            EndpointAction::UnDelete => "UnDelete",
        }
    }

    /// Capabilities a feature must grant for this action.
    pub fn required_capabilities(self, hints: &BodyHints) -> Vec<Capability> {
        match self {
            EndpointAction::List => vec![Capability::ViewList],
            EndpointAction::Get => vec![Capability::View],
            EndpointAction::UnDelete => vec![Capability::UnDelete],
            EndpointAction::AddOrUpdate => {
                if hints.record_id() == 0 {
                    vec![Capability::Add]
                } else {
                    vec![Capability::Edit]
                }
            }
            EndpointAction::Delete => match hints.delete_type {
                Some(1) | Some(2) => vec![Capability::Delete, Capability::SoftDelete],
                Some(3) | Some(4) => vec![Capability::Delete, Capability::HardDelete],
                _ => vec![Capability::Delete],
            },
        }
    }
}

/// A request path split into its feature prefix and action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// Path with the trailing slash and action suffix removed (the feature key).
    pub prefix: &'a str,
    /// Final segment with the action suffix removed (e.g. `Branch`).
    pub resource: &'a str,
    pub action: Option<EndpointAction>,
}

/// Classify a request path.
///
/// Paths whose final segment carries none of the known suffixes yield
/// `action: None` with the whole (slash-trimmed) path as prefix.
pub fn classify(path: &str) -> Endpoint<'_> {
    let trimmed = path.trim_end_matches('/');
    let segment_start = trimmed.rfind('/').map(|i| i + 1).unwrap_or(0);
    let segment = &trimmed[segment_start..];

    for (suffix, action) in SUFFIXES {
        if let Some(resource) = segment.strip_suffix(suffix) {
            return Endpoint {
                prefix: &trimmed[..trimmed.len() - suffix.len()],
                resource,
                action: Some(action),
            };
        }
    }

    Endpoint {
        prefix: trimmed,
        resource: segment,
        action: None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request model
// ─────────────────────────────────────────────────────────────────────────────

/// Body fields the gate needs: the record `id` and the delete `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyHints {
    pub id: Option<i64>,
    pub delete_type: Option<i64>,
}

impl BodyHints {
    /// Extract hints from a JSON body. Anything unparsable counts as absent.
    pub fn from_json(bytes: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
            return Self::default();
        };
        Self {
            id: value.get("id").and_then(as_int),
            delete_type: value.get("type").and_then(as_int),
        }
    }

    /// Record id, with a missing id treated as an insert.
    pub fn record_id(&self) -> i64 {
        self.id.unwrap_or(0)
    }
}

fn as_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Everything the gate looks at on an incoming request.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub bearer: Option<&'a str>,
    pub role_header: Option<&'a str>,
    pub path: &'a str,
    pub hints: BodyHints,
}

// ─────────────────────────────────────────────────────────────────────────────
// Decisions and errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a request was let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Superuser,
    Granted {
        role_id: RoleId,
        feature: Feature,
        action: Option<EndpointAction>,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    Token(#[from] TokenError),

    #[error("unknown or inactive user")]
    UnknownUser,

    #[error("missing roleId header")]
    MissingRole,

    #[error("roleId header is not a valid id")]
    InvalidRole,

    #[error("role {0} is not assigned to the caller")]
    RoleNotAssigned(RoleId),

    #[error("role {0} is unknown or inactive")]
    UnknownRole(RoleId),

    #[error("role has no feature for '{0}'")]
    FeatureNotFound(String),

    #[error("feature does not grant {0}")]
    MissingCapability(Capability),
}

impl GateError {
    /// Authentication failures (401) as opposed to authorization failures (403).
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            GateError::MissingToken | GateError::Token(_) | GateError::UnknownUser
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────────────

/// Role/feature authorization for an already authenticated caller.
pub fn authorize<P>(caller: &Caller, req: &GateRequest<'_>, policy: &P) -> Result<GateDecision, GateError>
where
    P: PolicySource + ?Sized,
{
    if caller.is_superuser {
        return Ok(GateDecision::Superuser);
    }

    let raw = req.role_header.ok_or(GateError::MissingRole)?;
    let role_id: RoleId = raw.parse().map_err(|_| GateError::InvalidRole)?;
    if !caller.has_role(role_id) {
        return Err(GateError::RoleNotAssigned(role_id));
    }

    let role = policy
        .role(role_id)
        .filter(|r| r.status == Status::Active)
        .ok_or(GateError::UnknownRole(role_id))?;

    let endpoint = classify(req.path);
    let feature = role
        .feature_for(&policy.operations(), endpoint.prefix)
        .ok_or_else(|| GateError::FeatureNotFound(endpoint.prefix.to_string()))?;

    match endpoint.action {
        Some(action) => {
            for capability in action.required_capabilities(&req.hints) {
                if !feature.flags.grants(capability) {
                    return Err(GateError::MissingCapability(capability));
                }
            }
        }
        None => {
            tracing::warn!(
                path = req.path,
                role_id = %role_id,
                "no endpoint action recognised; capability checks skipped"
            );
        }
    }

    Ok(GateDecision::Granted {
        role_id,
        feature,
        action: endpoint.action,
    })
}

/// Token verification + [`authorize`], as one synchronous check.
pub struct Gate<V> {
    validator: V,
}

impl<V: JwtValidator> Gate<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    /// Verify the bearer token and resolve the caller.
    pub fn authenticate<P>(&self, bearer: Option<&str>, policy: &P, now: DateTime<Utc>) -> Result<Caller, GateError>
    where
        P: PolicySource + ?Sized,
    {
        let token = bearer.ok_or(GateError::MissingToken)?;
        let claims = self.validator.validate(token, now)?;
        let user = policy
            .user(claims.sub)
            .filter(|u| u.is_active)
            .ok_or(GateError::UnknownUser)?;
        Ok(Caller::from(&user))
    }

    pub fn check<P>(
        &self,
        req: &GateRequest<'_>,
        policy: &P,
        now: DateTime<Utc>,
    ) -> Result<(Caller, GateDecision), GateError>
    where
        P: PolicySource + ?Sized,
    {
        let caller = self.authenticate(req.bearer, policy, now)?;
        let decision = authorize(&caller, req, policy)?;
        Ok((caller, decision))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
