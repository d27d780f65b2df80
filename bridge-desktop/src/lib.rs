//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux) and for local development.
//!
//! ## Overview
//!
//! - `RemoteStore` as an in-process document store (`InMemoryStore`)
//! - `ImageStorage` backed by a local directory (`LocalImageStorage`)
//! - `NetworkMonitor` with an atomic status and a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, InMemoryStore, LocalImageStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(InMemoryStore::new());
//!     let images = Arc::new(LocalImageStorage::new());
//!     let network = Arc::new(DesktopNetworkMonitor::new());
//!     let _probe = network.spawn_probe("8.8.8.8:53", std::time::Duration::from_secs(30));
//!
//!     // Use in core configuration
//! }
//! ```

mod images;
mod memory_store;
mod network;

pub use images::LocalImageStorage;
pub use memory_store::InMemoryStore;
pub use network::DesktopNetworkMonitor;
