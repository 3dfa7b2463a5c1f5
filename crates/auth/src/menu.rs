//! Navigation tree built from the operation catalog.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use backoffice_core::{OperationId, Status};

use crate::{NodeType, Operation, Role};

/// One node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuNode {
    pub id: OperationId,
    pub key: String,
    pub title: String,
    pub url: String,
    pub operation_type: NodeType,
    pub order_num: i32,
    pub children: Vec<MenuNode>,
}

/// Build the navigation tree of active operations.
///
/// `visible` decides which nodes the caller may see; ancestors of visible nodes
/// are kept so the tree stays connected. Inactive nodes hide their whole
/// subtree. Siblings are ordered by `order_num`, then id. Nodes whose parent is
/// missing become roots; nodes only reachable through a cycle are dropped.
pub fn build_menu<F>(operations: &[Operation], visible: F) -> Vec<MenuNode>
where
    F: Fn(&Operation) -> bool,
{
    let ids: HashSet<OperationId> = operations.iter().map(|op| op.id).collect();

    let mut children: HashMap<Option<OperationId>, Vec<&Operation>> = HashMap::new();
    for op in operations {
        let parent = op.parent.filter(|p| ids.contains(p));
        children.entry(parent).or_default().push(op);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|op| (op.order_num, op.id));
    }

    build_level(None, &children, &visible)
}

fn build_level<F>(
    parent: Option<OperationId>,
    children: &HashMap<Option<OperationId>, Vec<&Operation>>,
    visible: &F,
) -> Vec<MenuNode>
where
    F: Fn(&Operation) -> bool,
{
    let Some(siblings) = children.get(&parent) else {
        return Vec::new();
    };

    siblings
        .iter()
        .filter(|op| op.status == Status::Active)
        .filter_map(|op| {
            let kids = build_level(Some(op.id), children, visible);
            if kids.is_empty() && !visible(*op) {
                return None;
            }
            Some(MenuNode {
                id: op.id,
                key: op.key.clone(),
                title: op.title.clone(),
                url: op.url.clone(),
                operation_type: op.operation_type,
                order_num: op.order_num,
                children: kids,
            })
        })
        .collect()
}

/// Menu visible to a role: pages it may view or list.
pub fn menu_for_role(operations: &[Operation], role: &Role) -> Vec<MenuNode> {
    build_menu(operations, |op| {
        role.grant_for(op.id)
            .is_some_and(|g| g.flags.is_view || g.flags.is_view_list)
    })
}
