//! In-Memory Document Store
//!
//! A complete [`RemoteStore`] held in process memory. It implements the same
//! query, cursor and listen semantics a hosted document database provides, so
//! it doubles as the offline store for desktop builds and as the store used by
//! integration tests.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result, StoreErrorCode},
    store::{
        ChangeKind, CollectionPath, Document, DocumentChange, Fields, ListenerRegistration,
        QuerySnapshot, RemoteStore, SnapshotListener, StoreQuery,
    },
};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, trace};

type CollectionMap = HashMap<CollectionPath, BTreeMap<String, Fields>>;

struct Subscription {
    query: StoreQuery,
    listener: SnapshotListener,
    last: Vec<Document>,
}

#[derive(Default)]
struct Inner {
    collections: Mutex<CollectionMap>,
    subscriptions: Mutex<HashMap<u64, Subscription>>,
    next_subscription: AtomicU64,
}

impl Inner {
    fn collections(&self) -> MutexGuard<'_, CollectionMap> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<u64, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn run_query(&self, query: &StoreQuery) -> Vec<Document> {
        let collections = self.collections();
        let Some(documents) = collections.get(&query.path) else {
            return Vec::new();
        };

        let mut matching: Vec<Document> = documents
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|document| query.matches(document))
            .collect();
        drop(collections);

        matching.sort_by(|a, b| query.compare(a, b));

        let start = match &query.start_after {
            Some(cursor) => matching
                .iter()
                .position(|document| {
                    query.compare_to_cursor(document, cursor) == CmpOrdering::Greater
                })
                .unwrap_or(matching.len()),
            None => 0,
        };

        matching
            .into_iter()
            .skip(start)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Recompute every subscription on `path` and deliver snapshots whose
    /// result set changed. Callbacks run after all locks are released.
    fn notify(&self, path: &CollectionPath) {
        let mut pending = Vec::new();
        {
            let mut subscriptions = self.subscriptions();
            for (id, subscription) in subscriptions.iter_mut() {
                if &subscription.query.path != path {
                    continue;
                }
                let documents = self.run_query(&subscription.query);
                let changes = diff(&subscription.last, &documents);
                if changes.is_empty() {
                    continue;
                }
                trace!(subscription = id, changes = changes.len(), "Delivering snapshot");
                subscription.last = documents.clone();
                pending.push((
                    Arc::clone(&subscription.listener),
                    QuerySnapshot { documents, changes },
                ));
            }
        }

        for (listener, snapshot) in pending {
            listener(Ok(snapshot));
        }
    }
}

fn diff(previous: &[Document], current: &[Document]) -> Vec<DocumentChange> {
    let before: HashMap<&str, &Document> =
        previous.iter().map(|d| (d.id.as_str(), d)).collect();
    let after: HashMap<&str, &Document> = current.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut changes = Vec::new();
    for document in current {
        match before.get(document.id.as_str()) {
            None => changes.push(DocumentChange {
                kind: ChangeKind::Added,
                document: document.clone(),
            }),
            Some(old) if old.fields != document.fields => changes.push(DocumentChange {
                kind: ChangeKind::Modified,
                document: document.clone(),
            }),
            Some(_) => {}
        }
    }
    for document in previous {
        if !after.contains_key(document.id.as_str()) {
            changes.push(DocumentChange {
                kind: ChangeKind::Removed,
                document: document.clone(),
            });
        }
    }
    changes
}

/// In-memory [`RemoteStore`] implementation
///
/// Cloning yields another handle onto the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored under `path`
    pub fn len(&self, path: &CollectionPath) -> usize {
        self.inner
            .collections()
            .get(path)
            .map(|documents| documents.len())
            .unwrap_or(0)
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions().len()
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Document>> {
        let documents = self.inner.run_query(query);
        debug!(path = %query.path, returned = documents.len(), "Query executed");
        Ok(documents)
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>> {
        Ok(self
            .inner
            .collections()
            .get(path)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()> {
        if id.is_empty() {
            return Err(BridgeError::store(
                StoreErrorCode::InvalidArgument,
                "document id must not be empty",
            ));
        }
        self.inner
            .collections()
            .entry(path.clone())
            .or_default()
            .insert(id.to_string(), fields);
        debug!(%path, id, "Document set");
        self.inner.notify(path);
        Ok(())
    }

    async fn update(&self, path: &CollectionPath, id: &str, patch: Fields) -> Result<()> {
        {
            let mut collections = self.inner.collections();
            let fields = collections
                .get_mut(path)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| {
                    BridgeError::store(
                        StoreErrorCode::NotFound,
                        format!("no document {}/{}", path, id),
                    )
                })?;

            let mut document = Document::new(id, std::mem::take(fields));
            for (field, value) in patch {
                document.set_path(&field, value);
            }
            *fields = document.fields;
        }
        debug!(%path, id, "Document updated");
        self.inner.notify(path);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let removed = self
            .inner
            .collections()
            .get_mut(path)
            .and_then(|documents| documents.remove(id))
            .is_some();
        if removed {
            debug!(%path, id, "Document deleted");
            self.inner.notify(path);
        }
        Ok(())
    }

    async fn listen(
        &self,
        query: StoreQuery,
        listener: SnapshotListener,
    ) -> Result<Box<dyn ListenerRegistration>> {
        let documents = self.inner.run_query(&query);
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);

        self.inner.subscriptions().insert(
            id,
            Subscription {
                query,
                listener: Arc::clone(&listener),
                last: documents.clone(),
            },
        );
        debug!(subscription = id, "Listener registered");

        let changes = documents
            .iter()
            .map(|document| DocumentChange {
                kind: ChangeKind::Added,
                document: document.clone(),
            })
            .collect();
        listener(Ok(QuerySnapshot { documents, changes }));

        Ok(Box::new(MemoryRegistration {
            id,
            inner: Arc::downgrade(&self.inner),
        }))
    }
}

struct MemoryRegistration {
    id: u64,
    inner: Weak<Inner>,
}

impl ListenerRegistration for MemoryRegistration {
    fn remove(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.subscriptions().remove(&self.id).is_some() {
                debug!(subscription = self.id, "Listener removed");
            }
        }
    }
}
