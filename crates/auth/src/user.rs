//! User accounts as seen by the gate.

use serde::{Deserialize, Serialize};

use backoffice_core::{Entity, RoleId, UserId};

/// A user account.
///
/// # Invariants
/// - `roles` lists the only role ids the user may select via the `roleId` header.
/// - Superusers bypass role and feature checks entirely.
/// - Inactive users cannot authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl User {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_defaults_to_active_non_superuser() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 4,
            "username": "editor",
            "roles": [2, 3]
        }))
        .unwrap();

        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert!(user.has_role(RoleId::new(3)));
        assert!(!user.has_role(RoleId::new(1)));
    }
}
