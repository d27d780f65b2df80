//! # Services
//!
//! Per-user services over the remote store. Every service is bound to one
//! signed-in user and scopes its reads and writes to that user's documents.
//!
//! ## Available Services
//!
//! - `LibraryService` - Books: create/read/list/delete, status flags, live listeners
//! - `UserService` - The user's profile document and photo
//! - `CategoryService` - User-defined categories books are tagged with
//! - `RecommendationService` - The shared recommendations feed
//!
//! All services share a [`ServiceContext`] carrying the injected bridges.
//! Mutating calls consult the network monitor first and fail with
//! [`LibraryError::NoNetwork`] without touching the store when offline.

use bridge_traits::{Clock, ImageStorage, NetworkMonitor, RemoteStore, SystemClock};
use core_runtime::config::{CoreConfig, LibraryConfig};
use core_runtime::events::{CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::error::{LibraryError, Result};

pub mod category;
pub mod library;
pub mod recommendation;
pub mod user;

pub use category::CategoryService;
pub use library::LibraryService;
pub use recommendation::RecommendationService;
pub use user::UserService;

/// Bridges and settings shared by the services.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn RemoteStore>,
    pub images: Arc<dyn ImageStorage>,
    pub network: Arc<dyn NetworkMonitor>,
    pub clock: Arc<dyn Clock>,
    pub config: LibraryConfig,
    pub events: Option<EventBus>,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        images: Arc<dyn ImageStorage>,
        network: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            store,
            images,
            network,
            clock: Arc::new(SystemClock),
            config: LibraryConfig::default(),
            events: None,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            store: Arc::clone(&config.remote_store),
            images: Arc::clone(&config.image_storage),
            network: Arc::clone(&config.network_monitor),
            clock: Arc::clone(&config.clock),
            config: config.library,
            events: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_library_config(mut self, config: LibraryConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish domain events on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Pre-flight connectivity gate for mutating calls.
    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.network.is_connected() {
            Ok(())
        } else {
            warn!(status = ?self.network.status(), "Rejecting write while offline");
            Err(LibraryError::NoNetwork)
        }
    }

    pub(crate) fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.events {
            if bus.emit(event).is_err() {
                trace!("No event subscribers");
            }
        }
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.clock.unix_timestamp_millis()
    }
}

/// Rejects empty identifiers before they reach the store.
pub(crate) fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LibraryError::invalid_input(field, "cannot be empty"));
    }
    Ok(())
}
