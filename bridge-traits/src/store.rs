//! Remote Document Store Abstraction
//!
//! Capability interface over a remote document database. The core treats the
//! backend as an opaque store exposing `{query, get, set, update, delete,
//! listen}` over string-keyed documents grouped in fixed collections.
//!
//! ## Collections
//!
//! Documents live in a small set of logical namespaces. Per-user data is
//! nested under the owner's user document:
//!
//! ```text
//! users/{uid}
//! users/{uid}/books/{bookID}
//! users/{uid}/categories/{categoryID}
//! recommendations/{ownerID_bookID}
//! ```
//!
//! ## Queries
//!
//! A [`StoreQuery`] carries filters, ordered sort keys, a limit and an optional
//! `start_after` cursor. Sort keys are compared with document-store ordering
//! (see [`compare_values`]); the last sort key is expected to be the document
//! identifier so that cursors are stable.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result, StoreErrorCode};

/// Field path addressing a document's identifier in filters and sort keys.
pub const DOCUMENT_ID: &str = "__name__";

/// Field set of a stored document.
pub type Fields = Map<String, Value>;

/// Fixed logical namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Books,
    Categories,
    Recommendations,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Books => "books",
            Collection::Categories => "categories",
            Collection::Recommendations => "recommendations",
        }
    }
}

/// Location of a collection, optionally nested under an owner's user document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub collection: Collection,
    pub owner_id: Option<String>,
}

impl CollectionPath {
    /// Top-level collection.
    pub fn root(collection: Collection) -> Self {
        Self {
            collection,
            owner_id: None,
        }
    }

    /// Collection nested under `users/{owner_id}`.
    pub fn owned(collection: Collection, owner_id: impl Into<String>) -> Self {
        Self {
            collection,
            owner_id: Some(owner_id.into()),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_id {
            Some(owner) => write!(
                f,
                "{}/{}/{}",
                Collection::Users.as_str(),
                owner,
                self.collection.as_str()
            ),
            None => f.write_str(self.collection.as_str()),
        }
    }
}

/// A stored document: identifier plus its field set.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Encode a serializable record. The record must serialize to a JSON object.
    pub fn from_record<T: Serialize>(id: impl Into<String>, record: &T) -> Result<Self> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(Self::new(id, fields)),
            other => Err(BridgeError::store(
                StoreErrorCode::InvalidArgument,
                format!("record must encode to an object, got {}", type_name(&other)),
            )),
        }
    }

    /// Decode the field set into a record.
    pub fn to_record<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Resolve a dotted field path (`volumeInfo.title`). [`DOCUMENT_ID`]
    /// resolves to the identifier.
    pub fn get(&self, path: &str) -> Option<Value> {
        if path == DOCUMENT_ID {
            return Some(Value::String(self.id.clone()));
        }
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// Write a value at a dotted field path, creating intermediate maps.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut current = &mut self.fields;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.to_string(), value);
    }
}

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    ArrayContains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    /// Evaluate the filter against a document. Missing fields never match.
    pub fn matches(&self, document: &Document) -> bool {
        let Some(actual) = document.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Equal => actual == self.value,
            FilterOp::ArrayContains => actual
                .as_array()
                .map(|items| items.contains(&self.value))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Position after which a paginated query resumes: the sort-key values of the
/// last returned document, in `order_by` order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub document_id: String,
    pub values: Vec<Value>,
}

/// Store-level query description.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub path: CollectionPath,
    pub filters: Vec<FieldFilter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub start_after: Option<PageCursor>,
}

impl StoreQuery {
    pub fn new(path: CollectionPath) -> Self {
        Self {
            path,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            start_after: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: PageCursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Capture the cursor for `document` under this query's sort keys.
    ///
    /// Returns `None` when the document lacks one of the sort fields, which
    /// means it could never have been returned by this query.
    pub fn cursor_for(&self, document: &Document) -> Option<PageCursor> {
        let values = self
            .order_by
            .iter()
            .map(|order| document.get(&order.field))
            .collect::<Option<Vec<_>>>()?;
        Some(PageCursor {
            document_id: document.id.clone(),
            values,
        })
    }

    /// Whether `document` satisfies every filter and carries every sort field.
    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(document))
            && self
                .order_by
                .iter()
                .all(|order| document.get(&order.field).is_some())
    }

    /// Compare two documents under the query's sort keys.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for order in &self.order_by {
            let left = a.get(&order.field).unwrap_or(Value::Null);
            let right = b.get(&order.field).unwrap_or(Value::Null);
            let ordering = compare_values(&left, &right);
            let ordering = match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    }

    /// Compare a document to a cursor position under the query's sort keys.
    pub fn compare_to_cursor(&self, document: &Document, cursor: &PageCursor) -> Ordering {
        for (index, order) in self.order_by.iter().enumerate() {
            let left = document.get(&order.field).unwrap_or(Value::Null);
            let right = cursor.values.get(index).cloned().unwrap_or(Value::Null);
            let ordering = compare_values(&left, &right);
            let ordering = match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        document.id.cmp(&cursor.document_id)
    }
}

/// Total order over stored values:
/// null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
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
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Kind of change reported for a single document in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: Document,
}

/// Full materialized result of a listened query, plus what changed since the
/// previous snapshot delivered to the same listener.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySnapshot {
    pub documents: Vec<Document>,
    pub changes: Vec<DocumentChange>,
}

/// Callback invoked by the store for every snapshot of a listened query.
///
/// The store may call it from any thread; consumers must marshal the value to
/// their own execution context.
pub type SnapshotListener = Arc<dyn Fn(Result<QuerySnapshot>) + Send + Sync>;

/// Server-side subscription created by [`RemoteStore::listen`].
pub trait ListenerRegistration: Send + Sync {
    /// Detach the subscription. Calling it more than once is a no-op.
    fn remove(&self);
}

/// Remote document store trait
///
/// All operations are asynchronous. Failures surface as
/// [`BridgeError::Store`] carrying the backend's status code; timeouts are the
/// adapter's concern and are reported as [`StoreErrorCode::DeadlineExceeded`].
///
/// # Example
///
/// ```ignore
/// use bridge_traits::store::{Collection, CollectionPath, RemoteStore, StoreQuery};
///
/// async fn count_books(store: &dyn RemoteStore, uid: &str) -> Result<usize> {
///     let query = StoreQuery::new(CollectionPath::owned(Collection::Books, uid));
///     Ok(store.query(&query).await?.len())
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Execute a query and return the matching documents in sort order.
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Document>>;

    /// Point read. `Ok(None)` when the document does not exist.
    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>>;

    /// Create or fully replace a document.
    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()>;

    /// Patch individual (dotted) fields of an existing document.
    ///
    /// Fails with [`StoreErrorCode::NotFound`] when the document is missing.
    async fn update(&self, path: &CollectionPath, id: &str, patch: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()>;

    /// Subscribe to a query. The listener receives an initial snapshot and one
    /// snapshot per subsequent change to the result set until the returned
    /// registration is removed.
    async fn listen(
        &self,
        query: StoreQuery,
        listener: SnapshotListener,
    ) -> Result<Box<dyn ListenerRegistration>>;
}
