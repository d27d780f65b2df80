//! # Core Configuration
//!
//! Builder-based configuration holding every host bridge the library core
//! needs. Validation is fail-fast: a missing capability is reported when the
//! configuration is built, not on the first call that needs it.
//!
//! ## Required bridges
//!
//! - `RemoteStore` - document database holding users, books and categories
//! - `ImageStorage` - blob storage for covers and profile photos
//!
//! ## Optional bridges
//!
//! - `NetworkMonitor` - connectivity gate for writes. With the
//!   `desktop-shims` feature a [`DesktopNetworkMonitor`] is injected when
//!   none is provided; without it the builder fails.
//! - `Clock` - defaults to [`SystemClock`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .remote_store(Arc::new(MyStore::connect(url).await?))
//!     .image_storage(Arc::new(MyBucket::new()))
//!     .default_page_size(20)
//!     .build()?;
//! ```
//!
//! [`DesktopNetworkMonitor`]: https://docs.rs/bridge-desktop
//! [`SystemClock`]: bridge_traits::time::SystemClock

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, ImageStorage, NetworkMonitor, RemoteStore, SystemClock};
use std::sync::Arc;

/// Page size used when a query does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 40;

/// Upper bound on a single page request.
pub const MAX_PAGE_SIZE: usize = 500;

/// Core configuration. Construct with [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    /// Remote document store (required)
    pub remote_store: Arc<dyn RemoteStore>,

    /// Image upload target (required)
    pub image_storage: Arc<dyn ImageStorage>,

    /// Connectivity monitor consulted before every write
    pub network_monitor: Arc<dyn NetworkMonitor>,

    /// Time source for record timestamps
    pub clock: Arc<dyn Clock>,

    pub library: LibraryConfig,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("remote_store", &"RemoteStore { ... }")
            .field("image_storage", &"ImageStorage { ... }")
            .field("network_monitor", &self.network_monitor.network_info())
            .field("clock", &"Clock { ... }")
            .field("library", &self.library)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Paging limits for book list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl LibraryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(Error::Config(
                "Maximum page size must be greater than 0".to_string(),
            ));
        }

        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "Default page size must be between 1 and {} (got {})",
                self.max_page_size, self.default_page_size
            )));
        }

        Ok(())
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks paging limits and the event buffer.
    pub fn validate(&self) -> Result<()> {
        self.library.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn remote_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteStore".to_string(),
        message: "RemoteStore implementation is required to read and write library data. \
                  Inject the platform's document database adapter, or bridge_desktop::InMemoryStore \
                  for local development and tests."
            .to_string(),
    }
}

fn image_storage_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ImageStorage".to_string(),
        message: "ImageStorage implementation is required for book covers and profile photos. \
                  Desktop: inject bridge_desktop::LocalImageStorage. \
                  Mobile/Web: inject the platform's blob storage adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    use bridge_desktop::DesktopNetworkMonitor;
    use bridge_traits::NetworkStatus;

    // Desktop hosts are assumed online until a probe says otherwise.
    let monitor: Arc<dyn NetworkMonitor> =
        Arc::new(DesktopNetworkMonitor::with_status(NetworkStatus::Connected));
    Ok(monitor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Err(Error::CapabilityMissing {
        capability: "NetworkMonitor".to_string(),
        message: "NetworkMonitor implementation is required to gate writes on connectivity. \
                  Desktop: enable the 'desktop-shims' feature to use DesktopNetworkMonitor. \
                  Mobile: inject the platform reachability API."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    remote_store: Option<Arc<dyn RemoteStore>>,
    image_storage: Option<Arc<dyn ImageStorage>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    library: LibraryConfig,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the remote document store (required).
    pub fn remote_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.remote_store = Some(store);
        self
    }

    /// Sets the image storage used for covers and profile photos (required).
    pub fn image_storage(mut self, storage: Arc<dyn ImageStorage>) -> Self {
        self.image_storage = Some(storage);
        self
    }

    /// Sets the network monitor.
    ///
    /// If not provided, the desktop default is used when the `desktop-shims`
    /// feature is enabled.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Overrides the time source, mainly for deterministic tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Page size used when a list query does not specify one.
    ///
    /// Default: 40
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.library.default_page_size = size;
        self
    }

    /// Largest page a caller may request.
    ///
    /// Default: 500
    pub fn max_page_size(mut self, size: usize) -> Self {
        self.library.max_page_size = size;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    /// - [`Error::Config`] when paging limits or buffer sizes are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let remote_store = self.remote_store.ok_or_else(remote_store_missing_error)?;
        let image_storage = self.image_storage.ok_or_else(image_storage_missing_error)?;
        let network_monitor = match self.network_monitor {
            Some(monitor) => monitor,
            None => provide_default_network_monitor()?,
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            remote_store,
            image_storage,
            network_monitor,
            clock,
            library: self.library,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}
