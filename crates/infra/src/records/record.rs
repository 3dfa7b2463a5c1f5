use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use backoffice_core::{Entity, RecordId, Status};

use super::family::{Family, FieldKind};

/// One row of a record family.
///
/// Family-specific columns live in `fields`; lifecycle columns are typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(skip)]
    pub family: Family,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub status: Status,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store version this copy was read at; `0` before the first commit.
    #[serde(skip)]
    pub version: u64,
}

impl Entity for Record {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl Record {
    /// A fresh, unsaved record.
    pub fn new(family: Family, now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::NEW,
            family,
            fields: Map::new(),
            status: Status::Active,
            is_deleted: false,
            content: None,
            photo: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn key(&self) -> (Family, RecordId) {
        (self.family, self.id)
    }

    /// Value of a column as exposed over the API, `None` for unknown columns.
    pub fn column(&self, name: &str) -> Option<Value> {
        let ts = |t: &DateTime<Utc>| Value::String(t.to_rfc3339_opts(SecondsFormat::Micros, true));
        let ref_id = |id: Option<RecordId>| id.map_or(Value::Null, |id| Value::from(id.get()));

        match name {
            "id" => Some(Value::from(self.id.get())),
            "status" => Some(Value::String(self.status.to_string())),
            "is_deleted" => Some(Value::Bool(self.is_deleted)),
            "content" => Some(ref_id(self.content)),
            "photo" => Some(ref_id(self.photo)),
            "created_at" => Some(ts(&self.created_at)),
            "updated_at" => Some(ts(&self.updated_at)),
            other if self.family.spec().field(other).is_some() => {
                Some(self.fields.get(other).cloned().unwrap_or(Value::Null))
            }
            _ => None,
        }
    }

    /// Every record this one points at: owned content/photo and reference fields.
    pub fn references(&self) -> Vec<(Family, RecordId)> {
        let mut refs = Vec::new();
        if let Some(content) = self.content {
            refs.push((Family::ContentManager, content));
        }
        if let Some(photo) = self.photo {
            refs.push((Family::FileManager, photo));
        }
        for field in self.family.spec().fields {
            if let FieldKind::Reference(target) = field.kind {
                if let Some(id) = self.fields.get(field.name).and_then(Value::as_i64) {
                    refs.push((target, RecordId::new(id)));
                }
            }
        }
        refs
    }

    /// Owned dependents touched by cascading deletes and restores.
    pub fn owned(&self) -> Vec<(Family, RecordId)> {
        let mut owned = Vec::new();
        if let Some(content) = self.content {
            owned.push((Family::ContentManager, content));
        }
        if let Some(photo) = self.photo {
            owned.push((Family::FileManager, photo));
        }
        owned
    }

    pub fn references_key(&self, key: (Family, RecordId)) -> bool {
        self.references().contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_fields_flat_and_hides_internal_state() {
        let now = Utc::now();
        let mut branch = Record::new(Family::Branch, now);
        branch.id = RecordId::new(3);
        branch.version = 7;
        branch.photo = Some(RecordId::new(9));
        branch.fields.insert("title".into(), Value::from("Main"));

        let json = serde_json::to_value(&branch).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "Main");
        assert_eq!(json["photo"], 9);
        assert_eq!(json["status"], "Active");
        assert!(json.get("content").is_none());
        assert!(json.get("version").is_none());
        assert!(json.get("family").is_none());
    }

    #[test]
    fn references_include_reference_fields_and_owned_rows() {
        let mut branch = Record::new(Family::Branch, Utc::now());
        branch.photo = Some(RecordId::new(2));
        branch.fields.insert("city".into(), Value::from(5));

        assert_eq!(
            branch.references(),
            vec![(Family::FileManager, RecordId::new(2)), (Family::City, RecordId::new(5))]
        );
        assert_eq!(branch.owned(), vec![(Family::FileManager, RecordId::new(2))]);
        assert_eq!(branch.column("city"), Some(Value::from(5)));
        assert_eq!(branch.column("address"), Some(Value::Null));
        assert_eq!(branch.column("nope"), None);
    }
}
