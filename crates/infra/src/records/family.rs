//! Static registry of record families served by the record engine.

use serde::{Deserialize, Serialize};

/// A record family. Its name is the endpoint prefix: `Branch` serves
/// `BranchList/`, `BranchGet/`, `BranchAddOrUpdate/`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    Branch,
    City,
    Country,
    Faq,
    Help,
    Slider,
    PageSeo,
    CustomerComment,
    TaskProject,
    TaskRequest,
    ContentManager,
    FileManager,
}

impl Family {
    pub const ALL: [Family; 12] = [
        Family::Branch,
        Family::City,
        Family::Country,
        Family::Faq,
        Family::Help,
        Family::Slider,
        Family::PageSeo,
        Family::CustomerComment,
        Family::TaskProject,
        Family::TaskRequest,
        Family::ContentManager,
        Family::FileManager,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Branch => "Branch",
            Family::City => "City",
            Family::Country => "Country",
            Family::Faq => "Faq",
            Family::Help => "Help",
            Family::Slider => "Slider",
            Family::PageSeo => "PageSeo",
            Family::CustomerComment => "CustomerComment",
            Family::TaskProject => "TaskProject",
            Family::TaskRequest => "TaskRequest",
            Family::ContentManager => "ContentManager",
            Family::FileManager => "FileManager",
        }
    }

    /// Exact, case-sensitive lookup by endpoint name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn spec(self) -> &'static ResourceSpec {
        match self {
            Family::Branch => &BRANCH,
            Family::City => &CITY,
            Family::Country => &COUNTRY,
            Family::Faq => &FAQ,
            Family::Help => &HELP,
            Family::Slider => &SLIDER,
            Family::PageSeo => &PAGE_SEO,
            Family::CustomerComment => &CUSTOMER_COMMENT,
            Family::TaskProject => &TASK_PROJECT,
            Family::TaskRequest => &TASK_REQUEST,
            Family::ContentManager => &CONTENT_MANAGER,
            Family::FileManager => &FILE_MANAGER,
        }
    }

    /// Url prefix the authorization gate keys features on.
    pub fn url(self) -> String {
        format!("/api/{}", self.name())
    }
}

impl core::fmt::Display for Family {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_len: usize },
    Integer,
    Boolean,
    /// Id of a record in another family.
    Reference(Family),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn text(name: &'static str, max_len: usize, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text { max_len },
        required,
    }
}

const fn int(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer,
        required: false,
    }
}

const fn flag(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Boolean,
        required: false,
    }
}

const fn reference(name: &'static str, family: Family, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Reference(family),
        required,
    }
}

/// Columns every family has, regardless of its own fields.
pub const BASE_COLUMNS: [&str; 4] = ["id", "status", "created_at", "updated_at"];

/// Shape of one record family.
#[derive(Debug)]
pub struct ResourceSpec {
    pub family: Family,
    pub fields: &'static [FieldSpec],
    /// Columns accepted by `searches` (case-insensitive substring).
    pub searchable: &'static [&'static str],
    /// Columns accepted by `filters`, on top of [`BASE_COLUMNS`].
    pub filterable: &'static [&'static str],
    /// Whether records carry a `content` reference (ContentManager).
    pub owns_content: bool,
    /// Whether records carry a `photo` reference (FileManager).
    pub owns_photo: bool,
}

impl ResourceSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every column a record of this family exposes.
    pub fn is_column(&self, name: &str) -> bool {
        BASE_COLUMNS.contains(&name)
            || self.field(name).is_some()
            || (self.owns_content && name == "content")
            || (self.owns_photo && name == "photo")
    }

    pub fn is_filterable(&self, name: &str) -> bool {
        BASE_COLUMNS.contains(&name) || self.filterable.contains(&name)
    }

    pub fn is_searchable(&self, name: &str) -> bool {
        self.searchable.contains(&name)
    }
}

static BRANCH: ResourceSpec = ResourceSpec {
    family: Family::Branch,
    fields: &[
        text("title", 200, true),
        text("address", 500, false),
        text("phone", 50, false),
        reference("city", Family::City, false),
        int("order_num"),
    ],
    searchable: &["title", "address", "phone"],
    filterable: &["city"],
    owns_content: false,
    owns_photo: true,
};

static CITY: ResourceSpec = ResourceSpec {
    family: Family::City,
    fields: &[text("title", 200, true), reference("country", Family::Country, true)],
    searchable: &["title"],
    filterable: &["country"],
    owns_content: false,
    owns_photo: false,
};

static COUNTRY: ResourceSpec = ResourceSpec {
    family: Family::Country,
    fields: &[text("title", 200, true), text("code", 3, true)],
    searchable: &["title", "code"],
    filterable: &["code"],
    owns_content: false,
    owns_photo: true,
};

static FAQ: ResourceSpec = ResourceSpec {
    family: Family::Faq,
    fields: &[text("question", 500, true), int("order_num")],
    searchable: &["question"],
    filterable: &[],
    owns_content: true,
    owns_photo: false,
};

static HELP: ResourceSpec = ResourceSpec {
    family: Family::Help,
    fields: &[text("title", 200, true), text("key", 100, true)],
    searchable: &["title", "key"],
    filterable: &["key"],
    owns_content: true,
    owns_photo: false,
};

static SLIDER: ResourceSpec = ResourceSpec {
    family: Family::Slider,
    fields: &[text("title", 200, true), text("link", 500, false), int("order_num")],
    searchable: &["title"],
    filterable: &[],
    owns_content: true,
    owns_photo: true,
};

static PAGE_SEO: ResourceSpec = ResourceSpec {
    family: Family::PageSeo,
    fields: &[
        text("page", 200, true),
        text("meta_title", 200, false),
        text("meta_description", 500, false),
        flag("no_index"),
    ],
    searchable: &["page", "meta_title"],
    filterable: &["page", "no_index"],
    owns_content: true,
    owns_photo: false,
};

static CUSTOMER_COMMENT: ResourceSpec = ResourceSpec {
    family: Family::CustomerComment,
    fields: &[
        text("full_name", 200, true),
        text("comment", 2000, true),
        int("rating"),
        flag("is_approved"),
    ],
    searchable: &["full_name", "comment"],
    filterable: &["rating", "is_approved"],
    owns_content: false,
    owns_photo: true,
};

static TASK_PROJECT: ResourceSpec = ResourceSpec {
    family: Family::TaskProject,
    fields: &[text("title", 200, true), text("description", 2000, false)],
    searchable: &["title", "description"],
    filterable: &[],
    owns_content: true,
    owns_photo: false,
};

static TASK_REQUEST: ResourceSpec = ResourceSpec {
    family: Family::TaskRequest,
    fields: &[
        text("title", 200, true),
        reference("project", Family::TaskProject, true),
        int("priority"),
        flag("is_done"),
    ],
    searchable: &["title"],
    filterable: &["project", "priority", "is_done"],
    owns_content: true,
    owns_photo: true,
};

static CONTENT_MANAGER: ResourceSpec = ResourceSpec {
    family: Family::ContentManager,
    fields: &[text("body", 100_000, true)],
    searchable: &["body"],
    filterable: &[],
    owns_content: false,
    owns_photo: false,
};

static FILE_MANAGER: ResourceSpec = ResourceSpec {
    family: Family::FileManager,
    fields: &[
        text("file_name", 255, true),
        text("file_path", 1000, true),
        text("mime_type", 100, false),
    ],
    searchable: &["file_name"],
    filterable: &["mime_type"],
    owns_content: false,
    owns_photo: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_specs_match_their_family() {
        for family in Family::ALL {
            assert_eq!(Family::from_name(family.name()), Some(family));
            assert_eq!(family.spec().family, family);
        }
        assert_eq!(Family::from_name("branch"), None);
    }

    #[test]
    fn registry_columns_are_consistent() {
        for family in Family::ALL {
            let spec = family.spec();
            for column in spec.searchable.iter().chain(spec.filterable) {
                assert!(spec.is_column(column), "{family}: unknown column {column}");
            }
            for field in spec.fields {
                assert!(!BASE_COLUMNS.contains(&field.name));
            }
        }
    }

    #[test]
    fn owned_columns_only_exist_where_owned() {
        assert!(Family::Slider.spec().is_column("content"));
        assert!(Family::Slider.spec().is_column("photo"));
        assert!(!Family::City.spec().is_column("photo"));
        assert!(!Family::ContentManager.spec().is_column("content"));
    }
}
