//! # Host Bridge Traits
//!
//! Capability traits that each host platform must provide to the library core.
//!
//! ## Overview
//!
//! The core never talks to a concrete backend SDK. Everything it needs from the
//! outside world is expressed as a trait here and injected at startup:
//!
//! ### Remote data
//! - [`RemoteStore`](store::RemoteStore) - Document database with query/get/set/update/delete/listen
//! - [`ImageStorage`](storage::ImageStorage) - Blob storage returning download URLs
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Process-wide connectivity state, read synchronously
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Store adapters
//! must report backend failures as `BridgeError::Store` with the closest
//! [`StoreErrorCode`](error::StoreErrorCode) so the original code survives up
//! to the caller for diagnostics.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod error;
pub mod network;
pub mod storage;
pub mod store;
pub mod time;

pub use error::{BridgeError, StoreErrorCode};

// Re-export commonly used types
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::ImageStorage;
pub use store::{
    ChangeKind, Collection, CollectionPath, Direction, Document, DocumentChange, FieldFilter,
    Fields, FilterOp, ListenerRegistration, OrderBy, PageCursor, QuerySnapshot, RemoteStore,
    SnapshotListener, StoreQuery, DOCUMENT_ID,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
