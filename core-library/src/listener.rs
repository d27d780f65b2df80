//! Live book list subscriptions
//!
//! A listener wraps a store subscription and re-delivers every snapshot to
//! the caller as the full, decoded book list. Snapshots are queued from the
//! store's callback context and delivered in order by one dispatcher task
//! per listener, so the caller's callback is never invoked concurrently with
//! itself.
//!
//! ## Lifecycle
//!
//! ```text
//! Inactive --attach--> Active --remove--> Cancelled
//! ```
//!
//! `Cancelled` is terminal. The dispatcher checks the state under the same
//! lock `remove` takes to flip it, so once `remove` returns no callback can
//! start, and a callback that was already running has finished.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    ListenerRegistration, QuerySnapshot, RemoteStore, SnapshotListener, StoreQuery,
};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{LibraryError, Result};
use crate::models::Book;

/// Callback receiving the full book list after every change.
pub type BookListCallback = Arc<dyn Fn(Result<Vec<Book>>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Inactive,
    Active,
    Cancelled,
}

struct Shared {
    label: String,
    state: Mutex<ListenerState>,
    registration: StdMutex<Option<Box<dyn ListenerRegistration>>>,
    cancel: CancellationToken,
}

/// Caller-owned handle to a live subscription.
///
/// Dropping the handle does not cancel the subscription; call
/// [`ListenerHandle::remove`] (or the owning service's `remove_listener`).
#[derive(Clone)]
pub struct ListenerHandle {
    id: Uuid,
    shared: Arc<Shared>,
}

impl ListenerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> ListenerState {
        *self.shared.state.lock().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Stop delivery and release the store subscription. Idempotent.
    ///
    /// Waits for a delivery that is already running to finish.
    pub async fn remove(&self) {
        let mut state = self.shared.state.lock().await;
        if *state == ListenerState::Cancelled {
            return;
        }
        *state = ListenerState::Cancelled;

        let registration = self
            .shared
            .registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(registration) = registration {
            registration.remove();
        }
        self.shared.cancel.cancel();
        debug!(listener = %self.id, query = %self.shared.label, "Listener removed");
    }

    /// Open a subscription for `query` and start delivering to `callback`.
    pub(crate) async fn attach(
        store: &dyn RemoteStore,
        query: StoreQuery,
        label: String,
        callback: BookListCallback,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let shared = Arc::new(Shared {
            label,
            state: Mutex::new(ListenerState::Inactive),
            registration: StdMutex::new(None),
            cancel: CancellationToken::new(),
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        let on_snapshot: SnapshotListener =
            Arc::new(move |snapshot: BridgeResult<QuerySnapshot>| {
                // The receiver is gone once the listener is cancelled.
                let _ = sender.send(snapshot);
            });

        let registration = store.listen(query, on_snapshot).await?;
        *shared
            .registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(registration);
        *shared.state.lock().await = ListenerState::Active;

        tokio::spawn(dispatch(id, Arc::clone(&shared), receiver, callback));
        debug!(listener = %id, query = %shared.label, "Listener attached");

        Ok(Self { id, shared })
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("query", &self.shared.label)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

async fn dispatch(
    id: Uuid,
    shared: Arc<Shared>,
    mut receiver: mpsc::UnboundedReceiver<BridgeResult<QuerySnapshot>>,
    callback: BookListCallback,
) {
    loop {
        let snapshot = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            next = receiver.recv() => match next {
                Some(snapshot) => snapshot,
                None => break,
            },
        };

        let state = shared.state.lock().await;
        if *state != ListenerState::Active {
            break;
        }
        callback(decode_snapshot(snapshot));
        drop(state);
    }
    debug!(listener = %id, "Listener dispatcher stopped");
}

fn decode_snapshot(snapshot: BridgeResult<QuerySnapshot>) -> Result<Vec<Book>> {
    let snapshot = snapshot.map_err(|err| {
        warn!(error = %err, "Listener received store error");
        LibraryError::from(err)
    })?;
    snapshot
        .documents
        .iter()
        .map(|document| document.to_record::<Book>().map_err(LibraryError::from))
        .collect()
}
