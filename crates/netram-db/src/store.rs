//! Document store abstraction.
//!
//! Collections hold schemaless JSON objects. The store owns three metadata
//! fields on every document: `id`, `created_at` and `updated_at`. Any values
//! a caller supplies for them are discarded on write and re-injected on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::error::{Result, StoreError};

pub const COLLECTION_USERS: &str = "users";
pub const COLLECTION_PATIENTS: &str = "patients";
pub const COLLECTION_APPOINTMENTS: &str = "appointments";
pub const COLLECTION_INVOICES: &str = "invoices";
pub const COLLECTION_EMR: &str = "emr";

/// Fields managed by the store itself.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// A stored document: metadata plus the caller's fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: String, data: Map<String, Value>) -> Self {
        Self { id, created_at: Utc::now(), updated_at: None, data }
    }

    /// Look up a top-level field, metadata included.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "created_at" => serde_json::to_value(self.created_at).ok(),
            "updated_at" => self.updated_at.and_then(|t| serde_json::to_value(t).ok()),
            other => self.data.get(other).cloned(),
        }
    }

    /// Caller fields with the metadata merged in.
    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert(
            "created_at".into(),
            serde_json::to_value(self.created_at).unwrap_or(Value::Null),
        );
        map.insert(
            "updated_at".into(),
            self.updated_at
                .and_then(|t| serde_json::to_value(t).ok())
                .unwrap_or(Value::Null),
        );
        Value::Object(map)
    }
}

/// Turn an incoming value into storable fields, dropping reserved keys.
pub fn into_fields(data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(mut map) => {
            for key in RESERVED_FIELDS {
                map.remove(key);
            }
            Ok(map)
        }
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    ArrayContains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.field(&self.field) else {
            return self.op == FilterOp::Ne;
        };
        match self.op {
            FilterOp::Eq => compare_values(&actual, &self.value) == Some(Ordering::Equal),
            FilterOp::Ne => compare_values(&actual, &self.value) != Some(Ordering::Equal),
            FilterOp::Gt => compare_values(&actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                compare_values(&actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare_values(&actual, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                compare_values(&actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|v| compare_values(v, &self.value) == Some(Ordering::Equal))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Filters are ANDed, then results are sorted and truncated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), op, value: value.into() });
        self
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Run the query over an in-memory candidate set.
    pub fn apply<'a>(&self, docs: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).cloned().collect();
        if !self.order_by.is_empty() {
            out.sort_by(|a, b| {
                for (field, dir) in &self.order_by {
                    let ord = total_order(a.field(field).as_ref(), b.field(field).as_ref());
                    let ord = if *dir == Direction::Desc { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}

/// Ordering between two values of the same kind; `None` when incomparable.
/// Numbers compare numerically, strings lexicographically.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Sort order: missing < null < bool < number < string < array < object.
fn total_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y)
            .unwrap_or_else(|| type_rank(a).cmp(&type_rank(b))),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

// ── Trait ────────────────────────────────────────────────────────────────────

/// Document counts per collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub collections: std::collections::BTreeMap<String, u64>,
    pub persistent: bool,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert with a freshly generated id.
    async fn insert(&self, collection: &str, data: Value) -> Result<Document>;

    /// Insert or overwrite under a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Document>;

    /// Insert under `id` unless the id is taken or another document already
    /// holds the same value in `unique_field`. The check and the write happen
    /// as one step; a clash fails with `Duplicate`.
    async fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        unique_field: &str,
    ) -> Result<Document>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Shallow merge of `patch` into the stored fields. Fails with `NotFound`.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Document>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// Count of matches, ignoring `limit`.
    async fn count(&self, collection: &str, query: &Query) -> Result<u64>;

    async fn stats(&self) -> Result<StoreStats>;
}
