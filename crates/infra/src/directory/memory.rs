use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use backoffice_auth::operation::check_parent;
use backoffice_auth::{Operation, PolicySource, Role, User};
use backoffice_core::{DomainError, DomainResult, FieldErrors, OperationId, RoleId, UserId};

use super::seed::DirectorySeed;

#[derive(Debug, Default)]
struct DirectoryState {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleId, Role>,
    operations: BTreeMap<OperationId, Operation>,
}

impl DirectoryState {
    fn catalog(&self) -> Vec<Operation> {
        self.operations.values().cloned().collect()
    }
}

/// Users, roles and the operation catalog, held in memory.
///
/// Roles keep only grants; features are resolved against the current
/// catalog on every read, so operation edits are visible immediately.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

fn poisoned() -> DomainError {
    DomainError::invariant("directory lock poisoned")
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a seed, validating the catalog and role grants.
    pub fn from_seed(seed: DirectorySeed) -> DomainResult<Self> {
        let mut state = DirectoryState::default();

        for op in seed.operations {
            op.validate()?;
            if op.id.get() <= 0 {
                return Err(DomainError::validation("operations", format!("operation '{}' needs a positive id", op.key)));
            }
            if state.operations.insert(op.id, op).is_some() {
                return Err(DomainError::validation("operations", "duplicate operation id"));
            }
        }
        let catalog = state.catalog();
        for op in &catalog {
            check_parent(&catalog, op.id, op.parent)?;
        }

        for role in seed.roles {
            validate_role(&role, &state.operations)?;
            state.roles.insert(role.id, role);
        }
        for user in seed.users {
            if let Some(missing) = user.roles.iter().find(|r| !state.roles.contains_key(*r)) {
                tracing::warn!(user = %user.id, role = %missing, "seed user references an unknown role");
            }
            state.users.insert(user.id, user);
        }

        tracing::info!(
            users = state.users.len(),
            roles = state.roles.len(),
            operations = state.operations.len(),
            "directory loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub fn list_operations(&self) -> DomainResult<Vec<Operation>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.catalog())
    }

    pub fn get_operation(&self, id: OperationId) -> DomainResult<Operation> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state.operations.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    /// Insert (`id == 0`) or replace an operation.
    ///
    /// Keys are unique, and the parent link may not create a cycle.
    pub fn save_operation(&self, mut op: Operation) -> DomainResult<Operation> {
        op.validate()?;

        let mut state = self.state.write().map_err(|_| poisoned())?;
        if op.id.is_new() {
            let next = state.operations.keys().next_back().map_or(1, |id| id.get() + 1);
            op.id = OperationId::new(next);
        } else if !state.operations.contains_key(&op.id) {
            return Err(DomainError::NotFound);
        }

        if state.operations.values().any(|other| other.id != op.id && other.key == op.key) {
            return Err(DomainError::validation("key", format!("key '{}' is already used", op.key)));
        }
        check_parent(&state.catalog(), op.id, op.parent)?;

        state.operations.insert(op.id, op.clone());
        tracing::info!(operation = %op.id, url = %op.url, "operation saved");
        Ok(op)
    }

    /// Remove a leaf operation and every role grant pointing at it.
    pub fn delete_operation(&self, id: OperationId) -> DomainResult<Operation> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if !state.operations.contains_key(&id) {
            return Err(DomainError::NotFound);
        }
        if let Some(child) = state.operations.values().find(|op| op.parent == Some(id)) {
            return Err(DomainError::conflict(format!(
                "operation {id} still has child operation {}",
                child.id
            )));
        }

        let removed = state.operations.remove(&id).ok_or(DomainError::NotFound)?;
        let mut revoked = 0;
        for role in state.roles.values_mut() {
            let before = role.grants.len();
            role.grants.retain(|grant| grant.operation_id != id);
            revoked += before - role.grants.len();
        }
        tracing::info!(operation = %id, revoked, "operation deleted");
        Ok(removed)
    }

    pub fn list_roles(&self) -> DomainResult<Vec<Role>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.roles.values().cloned().collect())
    }

    pub fn get_role(&self, id: RoleId) -> DomainResult<Role> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state.roles.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    /// Insert (`id == 0`) or replace a role with its grants.
    pub fn save_role(&self, mut role: Role) -> DomainResult<Role> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        validate_role(&role, &state.operations)?;

        if role.id.is_new() {
            let next = state.roles.keys().next_back().map_or(1, |id| id.get() + 1);
            role.id = RoleId::new(next);
        } else if !state.roles.contains_key(&role.id) {
            return Err(DomainError::NotFound);
        }

        state.roles.insert(role.id, role.clone());
        tracing::info!(role = %role.id, grants = role.grants.len(), "role saved");
        Ok(role)
    }
}

fn validate_role(role: &Role, operations: &BTreeMap<OperationId, Operation>) -> DomainResult<()> {
    let mut errors = FieldErrors::new();
    if role.title.trim().is_empty() {
        errors.entry("title".into()).or_default().push("title cannot be empty".into());
    }

    let mut seen = HashSet::new();
    for grant in &role.grants {
        if !operations.contains_key(&grant.operation_id) {
            errors
                .entry("grants".into())
                .or_default()
                .push(format!("operation {} does not exist", grant.operation_id));
        }
        if !seen.insert(grant.operation_id) {
            errors
                .entry("grants".into())
                .or_default()
                .push(format!("operation {} is granted twice", grant.operation_id));
        }
    }

    DomainError::check(errors)
}

impl PolicySource for InMemoryDirectory {
    fn user(&self, id: UserId) -> Option<User> {
        let state = self.state.read().ok()?;
        state.users.get(&id).cloned()
    }

    fn role(&self, id: RoleId) -> Option<Role> {
        let state = self.state.read().ok()?;
        state.roles.get(&id).cloned()
    }

    fn operations(&self) -> Vec<Operation> {
        match self.state.read() {
            Ok(state) => state.catalog(),
            Err(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use backoffice_auth::{Capability, FeatureFlags, FeatureGrant, NodeType};
    use backoffice_core::Status;

    use super::*;

    fn op(id: i64, key: &str, url: &str, parent: Option<i64>) -> Operation {
        Operation {
            id: OperationId::new(id),
            key: key.into(),
            title: key.to_uppercase(),
            url: url.into(),
            operation_type: NodeType::Page,
            parent: parent.map(OperationId::new),
            order_num: 0,
            status: Status::Active,
        }
    }

    fn directory() -> InMemoryDirectory {
        let seed = DirectorySeed {
            users: vec![User {
                id: UserId::new(2),
                username: "editor".into(),
                roles: vec![RoleId::new(1)],
                is_superuser: false,
                is_active: true,
            }],
            roles: vec![Role {
                id: RoleId::new(1),
                title: "Editor".into(),
                status: Status::Active,
                grants: vec![FeatureGrant {
                    operation_id: OperationId::new(2),
                    flags: FeatureFlags::default().with(Capability::ViewList, true),
                }],
            }],
            operations: vec![
                op(1, "content", "/content", None),
                op(2, "branch", "/api/Branch", Some(1)),
            ],
        };
        InMemoryDirectory::from_seed(seed).unwrap()
    }

    #[test]
    fn editing_an_operation_url_is_visible_through_roles() {
        let dir = directory();
        let mut branch = dir.get_operation(OperationId::new(2)).unwrap();
        branch.url = "/api/Office".into();
        dir.save_operation(branch).unwrap();

        let role = dir.role(RoleId::new(1)).unwrap();
        let features = role.features(&dir.operations());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].url, "/api/Office");
    }

    #[test]
    fn operations_get_fresh_ids_and_unique_keys() {
        let dir = directory();
        let saved = dir.save_operation(op(0, "city", "/api/City", Some(1))).unwrap();
        assert_eq!(saved.id, OperationId::new(3));

        let err = dir.save_operation(op(0, "city", "/api/City2", None)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref e) if e.contains_key("key")));
    }

    #[test]
    fn cycles_and_parents_with_children_are_rejected() {
        let dir = directory();
        let mut root = dir.get_operation(OperationId::new(1)).unwrap();
        root.parent = Some(OperationId::new(2));
        assert!(dir.save_operation(root).is_err());

        assert!(matches!(
            dir.delete_operation(OperationId::new(1)),
            Err(DomainError::Conflict(_))
        ));
        dir.delete_operation(OperationId::new(2)).unwrap();
        dir.delete_operation(OperationId::new(1)).unwrap();
        assert!(dir.list_operations().unwrap().is_empty());
    }

    #[test]
    fn deleting_an_operation_revokes_its_grants() {
        let dir = directory();
        dir.delete_operation(OperationId::new(2)).unwrap();

        let role = dir.get_role(RoleId::new(1)).unwrap();
        assert!(role.grants.is_empty());
        assert!(role.features(&dir.operations()).is_empty());

        // The role as read back can be saved again unchanged.
        let saved = dir.save_role(role.clone()).unwrap();
        assert_eq!(saved, role);
    }

    #[test]
    fn roles_must_grant_known_operations_once() {
        let dir = directory();
        let grant = |id: i64| FeatureGrant {
            operation_id: OperationId::new(id),
            flags: FeatureFlags::all(),
        };
        let role = Role {
            id: RoleId::NEW,
            title: "Admin".into(),
            status: Status::Active,
            grants: vec![grant(2), grant(2), grant(9)],
        };

        let Err(DomainError::Validation(errors)) = dir.save_role(role.clone()) else {
            panic!("expected validation error");
        };
        assert_eq!(errors["grants"].len(), 2);

        let saved = dir
            .save_role(Role {
                grants: vec![grant(2)],
                ..role
            })
            .unwrap();
        assert_eq!(saved.id, RoleId::new(2));
        assert_eq!(dir.list_roles().unwrap().len(), 2);
    }
}
