use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use backoffice_core::{Entity, OperationId, RoleId, Status};

use crate::{Feature, FeatureFlags, Operation};

/// Flags a role holds on one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGrant {
    pub operation_id: OperationId,
    #[serde(flatten)]
    pub flags: FeatureFlags,
}

/// A role: a named set of grants on operations.
///
/// The role keeps only references to operations. Titles and urls are read from
/// the live operation catalog whenever features are resolved, so editing an
/// operation never requires rewriting roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub grants: Vec<FeatureGrant>,
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Role {
    /// Resolve this role's features against the current operation catalog.
    ///
    /// Grants whose operation no longer exists are skipped. Output order
    /// follows the grant order.
    pub fn features(&self, operations: &[Operation]) -> Vec<Feature> {
        let by_id: HashMap<OperationId, &Operation> = operations.iter().map(|op| (op.id, op)).collect();

        self.grants
            .iter()
            .filter_map(|grant| {
                by_id.get(&grant.operation_id).map(|op| Feature {
                    id: op.id,
                    key: op.key.clone(),
                    title: op.title.clone(),
                    url: op.url.clone(),
                    flags: grant.flags,
                })
            })
            .collect()
    }

    /// First feature keyed by `prefix`, if any.
    pub fn feature_for(&self, operations: &[Operation], prefix: &str) -> Option<Feature> {
        self.features(operations).into_iter().find(|f| f.matches_url(prefix))
    }

    pub fn grant_for(&self, operation_id: OperationId) -> Option<&FeatureGrant> {
        self.grants.iter().find(|g| g.operation_id == operation_id)
    }
}
