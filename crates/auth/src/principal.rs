use serde::Serialize;

use backoffice_core::{RoleId, UserId};

use crate::User;

/// Identity of an authenticated caller, resolved from a verified token.
///
/// Construction is decoupled from storage and transport: the gate builds it
/// from the token subject and whatever [`crate::PolicySource`] is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<RoleId>,
    pub is_superuser: bool,
}

impl Caller {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
            is_superuser: user.is_superuser,
        }
    }
}
