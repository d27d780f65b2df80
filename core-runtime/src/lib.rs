//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, the fail-fast configuration of
//! host bridges, and the event broadcasting used to tell the UI layer that
//! library or account state changed.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, LibraryConfig};
pub use error::{Error, Result};
pub use events::{AccountEvent, CoreEvent, EventBus, EventStream, LibraryEvent};
