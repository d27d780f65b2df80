//! # Library Module
//!
//! Data synchronization and query layer for a user's book library kept in a
//! remote document store.
//!
//! ## Overview
//!
//! This module provides:
//! - Book, user and category models stored as camel-cased documents
//! - A query builder mapping list types to filtered, ordered store queries
//! - Cursor-based "load more" pagination with one state per query
//! - Live listeners delivering the full, current book list on every change
//! - Per-user services gating writes on network availability
//!
//! Every store access goes through the [`RemoteStore`](bridge_traits::RemoteStore)
//! bridge, so the same code runs against a backend SDK adapter or the
//! in-memory store used by tests.

pub mod error;
pub mod listener;
pub mod models;
pub mod pagination;
pub mod query;
pub mod services;

#[cfg(test)]
mod test_support;

pub use error::{ErrorKind, LibraryError, Result};
pub use listener::{BookListCallback, ListenerHandle, ListenerState};
pub use models::{
    Book, Category, CoverUpload, ImageLinks, IndustryIdentifier, Price, SaleInfo, SavedBook,
    StatusField, User, VolumeInfo,
};
pub use pagination::{BookPage, CursorState, PaginationManager};
pub use query::{BookQuery, ListType, QueryField};
pub use services::{
    CategoryService, LibraryService, RecommendationService, ServiceContext, UserService,
};
