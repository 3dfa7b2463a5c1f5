use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use backoffice_auth::{NodeType, Operation, Role, User};
use backoffice_core::{OperationId, Status, UserId};

use crate::records::Family;

/// Initial directory contents, as stored in the JSON seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// Endpoint families that are not record families.
const ADMIN_PAGES: [(&str, &str); 2] = [("Operation", "Operations"), ("Role", "Roles")];

impl DirectorySeed {
    /// Development seed: one superuser (`admin`, id 1) and a catalog with a
    /// page for every endpoint family under two menu nodes.
    pub fn bootstrap() -> Self {
        let menu = |id: i64, key: &str, title: &str, order_num: i32| Operation {
            id: OperationId::new(id),
            key: key.into(),
            title: title.into(),
            url: String::new(),
            operation_type: NodeType::Menu,
            parent: None,
            order_num,
            status: Status::Active,
        };
        let page = |id: i64, name: &str, title: &str, parent: i64, order_num: i32| Operation {
            id: OperationId::new(id),
            key: name.to_lowercase(),
            title: title.into(),
            url: format!("/api/{name}"),
            operation_type: NodeType::Page,
            parent: Some(OperationId::new(parent)),
            order_num,
            status: Status::Active,
        };

        let mut operations = vec![menu(1, "content", "Content", 1), menu(2, "administration", "Administration", 2)];
        let mut next = 3;
        for (order, family) in Family::ALL.into_iter().enumerate() {
            operations.push(page(next, family.name(), family.name(), 1, order as i32));
            next += 1;
        }
        for (order, (name, title)) in ADMIN_PAGES.into_iter().enumerate() {
            operations.push(page(next, name, title, 2, order as i32));
            next += 1;
        }

        Self {
            users: vec![User {
                id: UserId::new(1),
                username: "admin".into(),
                roles: vec![],
                is_superuser: true,
                is_active: true,
            }],
            roles: vec![],
            operations,
        }
    }
}

/// Read a [`DirectorySeed`] from a JSON file.
pub fn load_seed(path: impl AsRef<Path>) -> anyhow::Result<DirectorySeed> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
}
