use backoffice_auth::Caller;
use backoffice_core::{RoleId, UserId};

/// Authenticated caller for a request, inserted by the gate middleware.
///
/// `role_id` is the role selected through the `roleId` header; it is `None`
/// for superusers and for routes that only require a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: Caller,
    role_id: Option<RoleId>,
}

impl CallerContext {
    pub fn new(caller: Caller, role_id: Option<RoleId>) -> Self {
        Self { caller, role_id }
    }

    pub fn user_id(&self) -> UserId {
        self.caller.user_id
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn role_id(&self) -> Option<RoleId> {
        self.role_id
    }

    pub fn is_superuser(&self) -> bool {
        self.caller.is_superuser
    }
}

/// Request correlation id (uuid v7), echoed as `x-request-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);
