use serde::{Deserialize, Serialize};

use backoffice_core::OperationId;

/// A single grantable capability on a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    View,
    ViewList,
    Add,
    Edit,
    Delete,
    SoftDelete,
    HardDelete,
    UnDelete,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::View,
        Capability::ViewList,
        Capability::Add,
        Capability::Edit,
        Capability::Delete,
        Capability::SoftDelete,
        Capability::HardDelete,
        Capability::UnDelete,
    ];

    /// Wire name of the flag carrying this capability.
    pub fn flag_name(self) -> &'static str {
        match self {
            Capability::View => "isView",
            Capability::ViewList => "isViewList",
            Capability::Add => "isAdd",
            Capability::Edit => "isEdit",
            Capability::Delete => "isDelete",
            Capability::SoftDelete => "isSoftDelete",
            Capability::HardDelete => "isHardDelete",
            Capability::UnDelete => "isUnDelete",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.flag_name())
    }
}

/// Per-feature capability flags as stored on a role grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    pub is_view: bool,
    pub is_view_list: bool,
    pub is_add: bool,
    pub is_edit: bool,
    pub is_delete: bool,
    pub is_soft_delete: bool,
    pub is_hard_delete: bool,
    pub is_un_delete: bool,
}

impl FeatureFlags {
    /// Every capability granted.
    pub fn all() -> Self {
        Self {
            is_view: true,
            is_view_list: true,
            is_add: true,
            is_edit: true,
            is_delete: true,
            is_soft_delete: true,
            is_hard_delete: true,
            is_un_delete: true,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.is_view,
            Capability::ViewList => self.is_view_list,
            Capability::Add => self.is_add,
            Capability::Edit => self.is_edit,
            Capability::Delete => self.is_delete,
            Capability::SoftDelete => self.is_soft_delete,
            Capability::HardDelete => self.is_hard_delete,
            Capability::UnDelete => self.is_un_delete,
        }
    }

    pub fn with(mut self, capability: Capability, granted: bool) -> Self {
        let slot = match capability {
            Capability::View => &mut self.is_view,
            Capability::ViewList => &mut self.is_view_list,
            Capability::Add => &mut self.is_add,
            Capability::Edit => &mut self.is_edit,
            Capability::Delete => &mut self.is_delete,
            Capability::SoftDelete => &mut self.is_soft_delete,
            Capability::HardDelete => &mut self.is_hard_delete,
            Capability::UnDelete => &mut self.is_un_delete,
        };
        *slot = granted;
        self
    }
}

/// A resolved permission record: an operation's current identity plus the
/// flags a role holds on it.
///
/// Features are never stored. They are computed from the operation catalog and
/// a role's grants (see [`crate::Role::features`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: OperationId,
    pub key: String,
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub flags: FeatureFlags,
}

impl Feature {
    /// Whether this feature is keyed by `prefix` (trailing slashes ignored).
    pub fn matches_url(&self, prefix: &str) -> bool {
        normalize_url(&self.url) == normalize_url(prefix)
    }
}

/// Strip trailing slashes; the empty path stays `/`.
pub fn normalize_url(url: &str) -> &str {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
