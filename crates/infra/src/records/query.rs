//! List requests: filtering, searching, sorting and pagination.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use backoffice_core::{DomainError, DomainResult, FieldErrors};

use super::family::ResourceSpec;
use super::record::Record;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_SORT: &str = "-id";

/// `{column, value}` pair used by `filters` and `searches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMatch {
    pub column: String,
    pub value: Value,
}

/// Body of a `<Family>List/` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    pub is_deleted: bool,
    pub searches: Vec<ColumnMatch>,
    pub filters: Vec<ColumnMatch>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
            is_deleted: false,
            searches: Vec::new(),
            filters: Vec::new(),
        }
    }
}

/// A page of results. `next`/`previous` are page numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub data: Vec<T>,
}

/// Sort key parsed from `sort`: a column, optionally prefixed with `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix('-') {
            Some(column) => Self {
                column: column.to_string(),
                descending: true,
            },
            None => Self {
                column: raw.to_string(),
                descending: false,
            },
        }
    }
}

impl ListQuery {
    /// Check columns and paging against a family, collecting every problem.
    pub fn validate(&self, spec: &ResourceSpec) -> DomainResult<(SortKey, u64, u64)> {
        let mut errors = FieldErrors::new();
        let mut push = |field: &str, msg: String| errors.entry(field.into()).or_default().push(msg);

        let sort = SortKey::parse(self.sort.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_SORT));
        if !spec.is_column(&sort.column) {
            push("sort", format!("unknown column '{}'", sort.column));
        }
        for filter in &self.filters {
            if !spec.is_filterable(&filter.column) {
                push("filters", format!("column '{}' cannot be filtered", filter.column));
            }
            if filter.value.is_array() || filter.value.is_object() {
                push("filters", format!("value for '{}' must be a scalar", filter.column));
            }
        }
        for search in &self.searches {
            if !spec.is_searchable(&search.column) {
                push("searches", format!("column '{}' cannot be searched", search.column));
            }
            if !search.value.is_string() {
                push("searches", format!("value for '{}' must be a string", search.column));
            }
        }
        if self.page < 1 {
            push("page", "page must be at least 1".into());
        }
        if self.page_size < 1 {
            push("pageSize", "pageSize must be at least 1".into());
        }

        DomainError::check(errors)?;
        let page_size = (self.page_size as u64).min(MAX_PAGE_SIZE);
        Ok((sort, self.page as u64, page_size))
    }

    /// Whether a record passes the deleted flag, filters and searches.
    pub fn matches(&self, record: &Record) -> bool {
        if record.is_deleted != self.is_deleted {
            return false;
        }

        let filters_ok = self.filters.iter().all(|f| {
            record
                .column(&f.column)
                .is_some_and(|v| scalar_text(&v) == scalar_text(&f.value))
        });

        filters_ok
            && self.searches.iter().all(|s| {
                let needle = scalar_text(&s.value).to_lowercase();
                record
                    .column(&s.column)
                    .is_some_and(|v| scalar_text(&v).to_lowercase().contains(&needle))
            })
    }
}

/// String form of a JSON scalar, as filters compare it.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Total order over JSON scalars: null, booleans, numbers, strings.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sort records by `key`; ties fall back to ascending id.
pub fn sort_records(records: &mut [Record], key: &SortKey) {
    records.sort_by(|a, b| {
        let (va, vb) = (
            a.column(&key.column).unwrap_or(Value::Null),
            b.column(&key.column).unwrap_or(Value::Null),
        );
        let ord = compare_values(&va, &vb);
        let ord = if key.descending { ord.reverse() } else { ord };
        ord.then_with(|| a.id.cmp(&b.id))
    });
}

/// Cut one page (1-based) out of `items`.
///
/// A page whose offset does not fit in `usize` lies past the end and is empty.
pub fn paginate<T>(items: Vec<T>, page: u64, page_size: u64) -> Page<T> {
    let count = items.len();
    let start = page
        .saturating_sub(1)
        .checked_mul(page_size)
        .and_then(|offset| usize::try_from(offset).ok())
        .unwrap_or(usize::MAX);
    let size = usize::try_from(page_size).unwrap_or(usize::MAX);
    let end = start.saturating_add(size).min(count);

    let data = if start < count {
        items.into_iter().skip(start).take(end - start).collect()
    } else {
        Vec::new()
    };

    Page {
        count,
        next: (end < count).then_some(page + 1),
        previous: (page > 1).then(|| page - 1),
        data,
    }
}
