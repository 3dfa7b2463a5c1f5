//! Generic AddOrUpdate / List / Get / Delete / UnDelete over record families.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use backoffice_core::{DeleteMode, DomainError, DomainResult, FieldErrors, RecordId, RestoreMode, Status};

use super::family::{Family, FieldKind, FieldSpec};
use super::query::{paginate, sort_records, ListQuery, Page};
use super::record::Record;
use super::store::{RecordStore, StoreError};
use super::tx::RecordTx;

/// Payload keys managed by the engine; accepted and ignored on write.
const IGNORED_KEYS: [&str; 4] = ["id", "created_at", "updated_at", "is_deleted"];

/// Read an `id` from a JSON body: integer or numeric string, missing means `0`.
pub fn body_id(body: &Map<String, Value>) -> DomainResult<RecordId> {
    let id = match body.get("id") {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match id {
        Some(id) if id >= 0 => Ok(RecordId::new(id)),
        _ => Err(DomainError::validation("id", "id must be a non-negative integer")),
    }
}

/// Read the `type` of a Delete/UnDelete body.
pub fn body_type(body: &Map<String, Value>) -> DomainResult<i64> {
    match body.get("type") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| DomainError::validation("type", "type is required"))
}

/// Record lifecycle engine over any [`RecordStore`].
#[derive(Debug)]
pub struct RecordEngine<S> {
    store: S,
}

impl<S: RecordStore> RecordEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert when `id` is `0`, otherwise patch the provided fields.
    pub fn add_or_update(
        &self,
        family: Family,
        body: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> DomainResult<Record> {
        let id = body_id(body)?;
        let mut tx = RecordTx::begin(&self.store);

        let mut record = if id.is_new() {
            Record::new(family, now)
        } else {
            tx.require(family, id)?
        };

        let mut errors = FieldErrors::new();
        apply_payload(&tx, &mut record, body, &mut errors);
        if id.is_new() {
            check_required(&record, &mut errors);
        }
        DomainError::check(errors)?;

        record.updated_at = now;
        let key = record.key();
        tx.put(record);
        let mut written = tx.commit().map_err(|e| match e {
            // A reference vanished between validation and commit.
            StoreError::Missing { family, id } if (family, id) != key => {
                DomainError::validation("references", format!("{family} {id} does not exist"))
            }
            other => other.into(),
        })?;
        let saved = written.pop().ok_or_else(|| DomainError::invariant("commit returned no rows"))?;

        tracing::info!(family = %family, id = %saved.id, inserted = id.is_new(), "record saved");
        Ok(saved)
    }

    pub fn get(&self, family: Family, id: RecordId) -> DomainResult<Record> {
        self.store.get(family, id)?.ok_or(DomainError::NotFound)
    }

    pub fn list(&self, family: Family, query: &ListQuery) -> DomainResult<Page<Record>> {
        let (sort, page, page_size) = query.validate(family.spec())?;

        let mut rows: Vec<Record> = self
            .store
            .list(family)?
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        sort_records(&mut rows, &sort);

        Ok(paginate(rows, page, page_size))
    }

    /// Soft or hard delete, optionally cascading to owned content/photo rows.
    ///
    /// Returns the number of rows changed. Either every row of a cascade is
    /// changed or none is.
    pub fn delete(&self, family: Family, id: RecordId, mode: DeleteMode, now: DateTime<Utc>) -> DomainResult<usize> {
        let mut tx = RecordTx::begin(&self.store);
        let record = tx.require(family, id)?;

        let mut targets = vec![record];
        if mode.cascades() {
            for (owned_family, owned_id) in targets[0].owned() {
                if let Some(owned) = tx.get(owned_family, owned_id)? {
                    targets.push(owned);
                }
            }
        }

        let mut changed = 0;
        for mut target in targets {
            if mode.is_hard() {
                tx.remove(&target);
                changed += 1;
            } else if !target.is_deleted {
                target.is_deleted = true;
                target.updated_at = now;
                tx.put(target);
                changed += 1;
            }
        }

        tx.commit()?;

        tracing::info!(family = %family, id = %id, mode = mode.code(), changed, "record deleted");
        Ok(changed)
    }

    /// Clear the deleted flag, optionally on owned content/photo rows too.
    pub fn undelete(&self, family: Family, id: RecordId, mode: RestoreMode, now: DateTime<Utc>) -> DomainResult<Record> {
        let mut tx = RecordTx::begin(&self.store);
        let record = tx.require(family, id)?;

        let mut targets = vec![record];
        if mode == RestoreMode::Cascade {
            for (owned_family, owned_id) in targets[0].owned() {
                if let Some(owned) = tx.get(owned_family, owned_id)? {
                    targets.push(owned);
                }
            }
        }

        let root = targets[0].key();
        for mut target in targets {
            if target.is_deleted {
                target.is_deleted = false;
                target.updated_at = now;
                tx.put(target);
            }
        }

        tx.commit()?;
        tracing::info!(family = %family, id = %id, "record restored");
        self.get(root.0, root.1)
    }
}

fn apply_payload<S: RecordStore + ?Sized>(
    tx: &RecordTx<'_, S>,
    record: &mut Record,
    body: &Map<String, Value>,
    errors: &mut FieldErrors,
) {
    let spec = record.family.spec();
    let mut push = |field: &str, msg: String| errors.entry(field.to_string()).or_default().push(msg);

    for (key, value) in body {
        let key = key.as_str();
        if IGNORED_KEYS.contains(&key) {
            continue;
        }

        match key {
            "status" => match serde_json::from_value::<Status>(value.clone()) {
                Ok(status) => record.status = status,
                Err(_) => push("status", "status must be 'Active' or 'Inactive'".into()),
            },
            "content" if spec.owns_content => {
                match owned_ref(tx, Family::ContentManager, value) {
                    Ok(id) => record.content = id,
                    Err(msg) => push("content", msg),
                }
            }
            "photo" if spec.owns_photo => match owned_ref(tx, Family::FileManager, value) {
                Ok(id) => record.photo = id,
                Err(msg) => push("photo", msg),
            },
            _ => match spec.field(key) {
                Some(field) => match check_value(tx, field, value) {
                    Ok(Value::Null) => {
                        record.fields.remove(key);
                    }
                    Ok(v) => {
                        record.fields.insert(key.to_string(), v);
                    }
                    Err(msg) => push(key, msg),
                },
                None => push(key, "unknown field".into()),
            },
        }
    }
}

fn check_required(record: &Record, errors: &mut FieldErrors) {
    for field in record.family.spec().fields.iter().filter(|f| f.required) {
        if !record.fields.contains_key(field.name) && !errors.contains_key(field.name) {
            errors
                .entry(field.name.to_string())
                .or_default()
                .push("this field is required".into());
        }
    }
}

/// Validate one payload value against its field spec and normalise it.
fn check_value<S: RecordStore + ?Sized>(
    tx: &RecordTx<'_, S>,
    field: &FieldSpec,
    value: &Value,
) -> Result<Value, String> {
    if value.is_null() {
        return if field.required {
            Err("this field cannot be null".into())
        } else {
            Ok(Value::Null)
        };
    }

    match field.kind {
        FieldKind::Text { max_len } => {
            let Some(text) = value.as_str() else {
                return Err("expected a string".into());
            };
            if field.required && text.trim().is_empty() {
                return Err("this field cannot be blank".into());
            }
            if text.chars().count() > max_len {
                return Err(format!("at most {max_len} characters"));
            }
            Ok(Value::String(text.to_string()))
        }
        FieldKind::Integer => value
            .as_i64()
            .map(Value::from)
            .ok_or_else(|| "expected an integer".to_string()),
        FieldKind::Boolean => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| "expected a boolean".to_string()),
        FieldKind::Reference(target) => {
            let id = reference_id(value)?;
            match tx.get(target, id) {
                Ok(Some(_)) => Ok(Value::from(id.get())),
                Ok(None) => Err(format!("{target} {id} does not exist")),
                Err(e) => Err(e.to_string()),
            }
        }
    }
}

fn owned_ref<S: RecordStore + ?Sized>(
    tx: &RecordTx<'_, S>,
    family: Family,
    value: &Value,
) -> Result<Option<RecordId>, String> {
    if value.is_null() {
        return Ok(None);
    }
    let id = reference_id(value)?;
    match tx.get(family, id) {
        Ok(Some(_)) => Ok(Some(id)),
        Ok(None) => Err(format!("{family} {id} does not exist")),
        Err(e) => Err(e.to_string()),
    }
}

fn reference_id(value: &Value) -> Result<RecordId, String> {
    value
        .as_i64()
        .filter(|id| *id > 0)
        .map(RecordId::new)
        .ok_or_else(|| "expected a positive record id".to_string())
}
