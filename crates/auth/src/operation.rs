//! Operations: the navigation tree that features are keyed on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, Entity, OperationId, Status};

/// Kind of navigation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Grouping node without an endpoint family of its own.
    Menu,
    /// Node backed by an endpoint family (`<url>List/`, `<url>Get/`, ...).
    #[default]
    Page,
}

/// A navigation/menu node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub key: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub operation_type: NodeType,
    #[serde(default)]
    pub parent: Option<OperationId>,
    #[serde(default)]
    pub order_num: i32,
    #[serde(default)]
    pub status: Status,
}

impl Entity for Operation {
    type Id = OperationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Operation {
    /// Field checks that do not depend on the rest of the catalog.
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = backoffice_core::FieldErrors::new();
        if self.key.trim().is_empty() {
            errors.entry("key".into()).or_default().push("key cannot be empty".into());
        }
        if self.title.trim().is_empty() {
            errors.entry("title".into()).or_default().push("title cannot be empty".into());
        }
        if self.operation_type == NodeType::Page && !self.url.starts_with('/') {
            errors
                .entry("url".into())
                .or_default()
                .push("page url must start with '/'".into());
        }
        DomainError::check(errors)
    }
}

/// Ensure that re-parenting `id` under `parent` keeps the catalog a forest.
///
/// Fails when `parent` does not exist, is `id` itself, or is a descendant of `id`.
pub fn check_parent(
    catalog: &[Operation],
    id: OperationId,
    parent: Option<OperationId>,
) -> DomainResult<()> {
    let Some(parent) = parent else {
        return Ok(());
    };

    let parents: HashMap<OperationId, Option<OperationId>> =
        catalog.iter().map(|op| (op.id, op.parent)).collect();

    if !parents.contains_key(&parent) {
        return Err(DomainError::validation("parent", format!("operation {parent} does not exist")));
    }

    // Walk up from the proposed parent; reaching `id` means a cycle.
    let mut cursor = Some(parent);
    let mut steps = 0usize;
    while let Some(current) = cursor {
        if current == id {
            return Err(DomainError::validation("parent", "operation cannot be its own ancestor"));
        }
        steps += 1;
        if steps > parents.len() {
            return Err(DomainError::invariant("operation catalog already contains a cycle"));
        }
        cursor = parents.get(&current).copied().flatten();
    }

    Ok(())
}
