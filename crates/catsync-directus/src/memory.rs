//! In-memory [`TargetStore`] for tests.
//!
//! Supports the filter subset the engine issues (`_eq`, `_null`, `_nnull`,
//! `_and`), optional per-field unique constraints that reject writes with
//! [`StoreError::DuplicateKey`], and fault injection. Every operation yields
//! to the scheduler once so concurrent callers interleave the way they would
//! against a network store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use catsync_core::ItemId;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::{Collection, ItemQuery, TargetStore};

/// Store operation targeted by an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct Fault {
    collection: Collection,
    operation: Operation,
    /// Only fail writes whose payload (or target row) has this field value.
    matching: Option<(String, String)>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<Collection, BTreeMap<i64, Value>>,
    next_id: i64,
    unique: HashMap<Collection, HashSet<String>>,
    faults: Vec<Fault>,
    writes: usize,
}

/// Thread-safe in-memory item store with integer primary keys.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects creates and updates that would duplicate a non-null `field`.
    #[must_use]
    pub fn with_unique(self, collection: Collection, field: &str) -> Self {
        self.lock()
            .unique
            .entry(collection)
            .or_default()
            .insert(field.to_owned());
        self
    }

    /// Inserts a row without any constraint checks and returns its id.
    pub fn insert_raw(&self, collection: Collection, mut row: Value) -> ItemId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        if let Value::Object(map) = &mut row {
            map.insert("id".to_owned(), Value::from(id));
        }
        inner.rows.entry(collection).or_default().insert(id, row);
        ItemId::new(id.to_string())
    }

    /// Every row in `collection`, ordered by id.
    #[must_use]
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.lock()
            .rows
            .get(&collection)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Makes every `operation` on `collection` fail.
    pub fn fail_on(&self, collection: Collection, operation: Operation) {
        self.lock().faults.push(Fault {
            collection,
            operation,
            matching: None,
        });
    }

    /// Makes `operation` fail for rows whose `field` equals `value`.
    pub fn fail_on_match(
        &self,
        collection: Collection,
        operation: Operation,
        field: &str,
        value: impl Into<Value>,
    ) {
        let key = value_key(&value.into()).unwrap_or_default();
        self.lock().faults.push(Fault {
            collection,
            operation,
            matching: Some((field.to_owned(), key)),
        });
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Number of successful creates, updates and deletes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Inner {
    fn check_fault(
        &self,
        collection: Collection,
        operation: Operation,
        row: Option<&Value>,
    ) -> Result<(), StoreError> {
        let hit = self.faults.iter().any(|fault| {
            fault.collection == collection
                && fault.operation == operation
                && match (&fault.matching, row) {
                    (None, _) => true,
                    (Some((field, key)), Some(row)) => {
                        row.get(field).and_then(value_key).as_deref() == Some(key.as_str())
                    }
                    (Some(_), None) => false,
                }
        });
        if hit {
            return Err(StoreError::UnexpectedStatus {
                status: 503,
                collection: collection.to_string(),
                message: format!("injected {operation:?} failure"),
            });
        }
        Ok(())
    }

    fn check_unique(
        &self,
        collection: Collection,
        candidate: &Value,
        except: Option<i64>,
    ) -> Result<(), StoreError> {
        let Some(fields) = self.unique.get(&collection) else {
            return Ok(());
        };
        let Some(rows) = self.rows.get(&collection) else {
            return Ok(());
        };
        for field in fields {
            let Some(key) = candidate.get(field).and_then(value_key) else {
                continue;
            };
            let clash = rows.iter().any(|(id, row)| {
                Some(*id) != except
                    && row.get(field).and_then(value_key).as_deref() == Some(key.as_str())
            });
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    message: format!("value for field \"{field}\" has to be unique"),
                });
            }
        }
        Ok(())
    }
}

/// Loose scalar key: numbers and numeric strings compare equal. `None` for
/// null, empty strings, arrays and objects.
fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
    }
}

fn is_null(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn matches_filter(row: &Value, filter: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return true;
    };
    conditions.iter().all(|(field, condition)| {
        if field == "_and" {
            return condition
                .as_array()
                .is_some_and(|parts| parts.iter().all(|part| matches_filter(row, part)));
        }
        let value = row.get(field);
        let Some(ops) = condition.as_object() else {
            return false;
        };
        ops.iter().all(|(op, operand)| match op.as_str() {
            "_eq" => {
                let expected = value_key(operand);
                expected.is_some() && value.and_then(value_key) == expected
            }
            "_null" => is_null(value) == operand.as_bool().unwrap_or(true),
            "_nnull" => is_null(value) != operand.as_bool().unwrap_or(true),
            _ => false,
        })
    })
}

fn project(row: &Value, fields: &[String]) -> Value {
    if fields.is_empty() || fields.iter().any(|f| f == "*") {
        return row.clone();
    }
    let Some(map) = row.as_object() else {
        return row.clone();
    };
    let projected: Map<String, Value> = fields
        .iter()
        .filter_map(|f| map.get(f).map(|v| (f.clone(), v.clone())))
        .collect();
    Value::Object(projected)
}

fn sort_rows(rows: &mut [Value], keys: &[String]) {
    for key in keys.iter().rev() {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key.as_str(), false),
        };
        rows.sort_by(|a, b| {
            let ka = a.get(field).and_then(value_key).map(ItemId::new);
            let kb = b.get(field).and_then(value_key).map(ItemId::new);
            let ordering = ka
                .as_ref()
                .map(ItemId::sort_key)
                .cmp(&kb.as_ref().map(ItemId::sort_key));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

fn parse_id(id: &ItemId) -> Option<i64> {
    id.as_str().parse().ok()
}

fn not_found(collection: Collection, id: &ItemId) -> StoreError {
    StoreError::UnexpectedStatus {
        status: 404,
        collection: collection.to_string(),
        message: format!("item {id} not found"),
    }
}

impl TargetStore for MemoryStore {
    async fn read_items(
        &self,
        collection: Collection,
        query: &ItemQuery,
    ) -> Result<Vec<Value>, StoreError> {
        tokio::task::yield_now().await;
        let inner = self.lock();
        inner.check_fault(collection, Operation::Read, None)?;

        let mut rows: Vec<Value> = inner
            .rows
            .get(&collection)
            .map(|rows| {
                rows.values()
                    .filter(|row| query.filter.as_ref().is_none_or(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_rows(&mut rows, &query.sort);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.iter().map(|row| project(row, &query.fields)).collect())
    }

    async fn create_item(&self, collection: Collection, item: &Value) -> Result<Value, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        inner.check_fault(collection, Operation::Create, Some(item))?;
        inner.check_unique(collection, item, None)?;

        inner.next_id += 1;
        let id = inner.next_id;
        let mut row = item.clone();
        if let Value::Object(map) = &mut row {
            map.insert("id".to_owned(), Value::from(id));
        }
        inner
            .rows
            .entry(collection)
            .or_default()
            .insert(id, row.clone());
        inner.writes += 1;
        Ok(row)
    }

    async fn update_item(
        &self,
        collection: Collection,
        id: &ItemId,
        patch: &Value,
    ) -> Result<Value, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        let key = parse_id(id).ok_or_else(|| not_found(collection, id))?;
        let existing = inner
            .rows
            .get(&collection)
            .and_then(|rows| rows.get(&key))
            .cloned()
            .ok_or_else(|| not_found(collection, id))?;
        inner.check_fault(collection, Operation::Update, Some(&existing))?;

        let mut merged = existing;
        if let (Value::Object(target), Value::Object(changes)) = (&mut merged, patch) {
            for (field, value) in changes {
                if field != "id" {
                    target.insert(field.clone(), value.clone());
                }
            }
        }
        inner.check_unique(collection, &merged, Some(key))?;
        inner
            .rows
            .entry(collection)
            .or_default()
            .insert(key, merged.clone());
        inner.writes += 1;
        Ok(merged)
    }

    async fn delete_item(&self, collection: Collection, id: &ItemId) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        let key = parse_id(id).ok_or_else(|| not_found(collection, id))?;
        let existing = inner
            .rows
            .get(&collection)
            .and_then(|rows| rows.get(&key))
            .cloned()
            .ok_or_else(|| not_found(collection, id))?;
        inner.check_fault(collection, Operation::Delete, Some(&existing))?;
        if let Some(rows) = inner.rows.get_mut(&collection) {
            rows.remove(&key);
        }
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{eq, is_null, not_null};
    use serde_json::json;

    #[tokio::test]
    async fn eq_filter_compares_numbers_and_strings_loosely() {
        let store = MemoryStore::new();
        store.insert_raw(Collection::Categories, json!({"printful_id": 5, "slug": "a"}));
        store.insert_raw(Collection::Categories, json!({"printful_id": "6", "slug": "b"}));

        let by_string = store
            .read_items(Collection::Categories, &ItemQuery::new().filter(eq("printful_id", "5")))
            .await
            .unwrap();
        let by_number = store
            .read_items(Collection::Categories, &ItemQuery::new().filter(eq("printful_id", 6)))
            .await
            .unwrap();
        assert_eq!(by_string.len(), 1);
        assert_eq!(by_string[0]["slug"], json!("a"));
        assert_eq!(by_number[0]["slug"], json!("b"));
    }

    #[tokio::test]
    async fn null_filters_treat_missing_as_null() {
        let store = MemoryStore::new();
        store.insert_raw(Collection::Products, json!({"printful_id": "1"}));
        store.insert_raw(Collection::Products, json!({"printful_id": null}));
        store.insert_raw(Collection::Products, json!({"name": "manual"}));

        let synced = store
            .read_items(Collection::Products, &ItemQuery::new().filter(not_null("printful_id")))
            .await
            .unwrap();
        let unsynced = store
            .read_items(Collection::Products, &ItemQuery::new().filter(is_null("printful_id")))
            .await
            .unwrap();
        assert_eq!(synced.len(), 1);
        assert_eq!(unsynced.len(), 2);
    }

    #[tokio::test]
    async fn unique_constraint_rejects_second_create() {
        let store = MemoryStore::new().with_unique(Collection::Categories, "printful_id");
        store
            .create_item(Collection::Categories, &json!({"printful_id": 5}))
            .await
            .unwrap();
        let err = store
            .create_item(Collection::Categories, &json!({"printful_id": "5"}))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        // null never clashes
        store
            .create_item(Collection::Categories, &json!({"printful_id": null}))
            .await
            .unwrap();
        store
            .create_item(Collection::Categories, &json!({"printful_id": null}))
            .await
            .unwrap();
        assert_eq!(store.rows(Collection::Categories).len(), 3);
    }

    #[tokio::test]
    async fn update_merges_fields_and_delete_removes_row() {
        let store = MemoryStore::new();
        let id = store.insert_raw(Collection::Variants, json!({"name": "M", "sku": "A"}));
        store
            .update_item(Collection::Variants, &id, &json!({"name": "L"}))
            .await
            .unwrap();
        let rows = store.rows(Collection::Variants);
        assert_eq!(rows[0]["name"], json!("L"));
        assert_eq!(rows[0]["sku"], json!("A"));

        store.delete_item(Collection::Variants, &id).await.unwrap();
        assert!(store.rows(Collection::Variants).is_empty());
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn sort_limit_and_projection_apply() {
        let store = MemoryStore::new();
        for n in [3, 1, 2] {
            store.insert_raw(Collection::Categories, json!({"category_position": n, "name": "x"}));
        }
        let rows = store
            .read_items(
                Collection::Categories,
                &ItemQuery::new()
                    .fields(&["id", "category_position"])
                    .sort(&["-category_position"])
                    .limit(2),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["category_position"], json!(3));
        assert!(rows[0].get("name").is_none());
    }

    #[tokio::test]
    async fn injected_faults_target_matching_rows_only() {
        let store = MemoryStore::new();
        store.fail_on_match(Collection::Products, Operation::Create, "printful_id", "13");
        store
            .create_item(Collection::Products, &json!({"printful_id": "12"}))
            .await
            .unwrap();
        let err = store
            .create_item(Collection::Products, &json!({"printful_id": "13"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedStatus { status: 503, .. }));

        store.fail_on(Collection::Categories, Operation::Read);
        assert!(store.probe().await.is_err());
        store.clear_faults();
        assert!(store.probe().await.is_ok());
    }

    #[tokio::test]
    async fn missing_rows_report_not_found() {
        let store = MemoryStore::new();
        let err = store
            .delete_item(Collection::Products, &ItemId::new("99"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedStatus { status: 404, .. }));
    }
}
