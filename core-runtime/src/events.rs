//! # Event Bus
//!
//! Broadcast channel for domain events raised by the library core. Services
//! emit events after a mutation is acknowledged by the remote store, and any
//! number of subscribers (UI glue, analytics, tests) observe them
//! independently.
//!
//! ```text
//! ┌────────────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ LibraryService ├─────────>│           ├────────────>│ Subscriber │
//! └────────────────┘          │ EventBus  │             └────────────┘
//! ┌────────────────┐   emit   │           │  subscribe  ┌────────────┐
//! │ Session        ├─────────>│           ├────────────>│ Subscriber │
//! └────────────────┘          └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Library(LibraryEvent::BookDeleted {
//!     owner_id: "u1".to_string(),
//!     book_id: "b1".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Book deleted");
//! # }
//! ```
//!
//! Events are not a delivery guarantee: a subscriber that falls more than the
//! buffer size behind receives `RecvError::Lagged` and continues from the
//! oldest retained event. `emit` with no subscribers is not an error for the
//! emitting service; callers discard the `SendError`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Library(LibraryEvent),
    Account(AccountEvent),
}

impl CoreEvent {
    /// Short human-readable description.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Account(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Library(LibraryEvent::CoverUploadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Account(AccountEvent::AccountDeleted { .. }) => EventSeverity::Info,
            CoreEvent::Account(AccountEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::BookSaved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Changes to a user's books.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LibraryEvent {
    /// A book document was created or replaced.
    BookSaved {
        owner_id: String,
        book_id: String,
        /// `true` when the book did not exist before the write.
        created: bool,
    },
    BookDeleted {
        owner_id: String,
        book_id: String,
    },
    /// A favorite/recommending flag was written.
    BookStatusChanged {
        owner_id: String,
        book_id: String,
        field: String,
        value: bool,
    },
    /// The book was saved but its cover image could not be stored.
    CoverUploadFailed {
        owner_id: String,
        book_id: String,
        reason: String,
    },
    CategoryChanged {
        owner_id: String,
        category_id: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::BookSaved { created: true, .. } => "Book added",
            LibraryEvent::BookSaved { created: false, .. } => "Book updated",
            LibraryEvent::BookDeleted { .. } => "Book deleted",
            LibraryEvent::BookStatusChanged { .. } => "Book status changed",
            LibraryEvent::CoverUploadFailed { .. } => "Cover upload failed",
            LibraryEvent::CategoryChanged { .. } => "Category changed",
        }
    }
}

/// Session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AccountEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
    AccountDeleted { user_id: String },
    ProfileUpdated { user_id: String },
}

impl AccountEvent {
    fn description(&self) -> &str {
        match self {
            AccountEvent::SignedIn { .. } => "User signed in",
            AccountEvent::SignedOut { .. } => "User signed out",
            AccountEvent::AccountDeleted { .. } => "Account deleted",
            AccountEvent::ProfileUpdated { .. } => "Profile updated",
        }
    }
}

/// Broadcast hub for [`CoreEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus whose subscribers may lag by at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event. Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Receives every event emitted after this call.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiving end of the bus with optional filtering.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when `n` events were dropped for this subscriber,
    /// `RecvError::Closed` once the bus is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event without waiting, `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(book_id: &str) -> CoreEvent {
        CoreEvent::Library(LibraryEvent::BookSaved {
            owner_id: "u1".to_string(),
            book_id: book_id.to_string(),
            created: true,
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(saved("b1")).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(saved("b1")).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), saved("b1"));
        assert_eq!(second.recv().await.unwrap(), saved("b1"));
    }

    #[tokio::test]
    async fn test_filtered_stream_skips_other_events() {
        let bus = EventBus::new(8);
        let mut accounts = bus
            .subscribe()
            .filter(|event| matches!(event, CoreEvent::Account(_)));

        bus.emit(saved("b1")).unwrap();
        bus.emit(CoreEvent::Account(AccountEvent::SignedOut {
            user_id: "u1".to_string(),
        }))
        .unwrap();

        let event = accounts.recv().await.unwrap();
        assert_eq!(event.description(), "User signed out");
        assert!(accounts.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = bus.subscribe();
        for i in 0..4 {
            bus.emit(saved(&format!("b{}", i))).unwrap();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(2)))));
        assert_eq!(stream.try_recv().unwrap().unwrap(), saved("b2"));
    }

    #[test]
    fn test_severity_and_description() {
        let failed = CoreEvent::Library(LibraryEvent::CoverUploadFailed {
            owner_id: "u1".to_string(),
            book_id: "b1".to_string(),
            reason: "quota".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Warning);

        let updated = CoreEvent::Library(LibraryEvent::BookSaved {
            owner_id: "u1".to_string(),
            book_id: "b1".to_string(),
            created: false,
        });
        assert_eq!(updated.description(), "Book updated");
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(saved("b1")).unwrap();
        assert_eq!(json["type"], "Library");
        assert_eq!(json["payload"]["event"], "book_saved");
        assert_eq!(json["payload"]["book_id"], "b1");
    }
}
