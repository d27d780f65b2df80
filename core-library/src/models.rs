//! Domain models for the book library
//!
//! Records are stored as documents using the camel-cased keys the remote
//! store already holds (`bookID`, `volumeInfo.title`, ...). Every field has a
//! serde default so that partially written documents still decode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{LibraryError, Result};
use crate::query::QueryField;

// =============================================================================
// Book
// =============================================================================

/// A book in a user's library.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    /// Unique per owner
    #[serde(rename = "bookID")]
    pub book_id: String,

    /// Immutable once the book is stored
    #[serde(rename = "ownerID")]
    pub owner_id: String,

    pub volume_info: VolumeInfo,

    pub sale_info: SaleInfo,

    /// Creation time in unix milliseconds
    pub timestamp: i64,

    /// Category identifiers the book is tagged with
    pub category: BTreeSet<String>,

    pub favorite: bool,

    pub recommending: bool,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            volume_info: VolumeInfo {
                title: title.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.volume_info.title
    }

    /// Whether the record may be persisted.
    pub fn has_title(&self) -> bool {
        !self.volume_info.title.trim().is_empty()
    }

    /// Rejects records that may not be persisted.
    pub fn validate(&self) -> Result<()> {
        if !self.has_title() {
            return Err(LibraryError::NoBookTitle);
        }
        Ok(())
    }

    pub fn cover_url(&self) -> Option<&str> {
        self.volume_info.image_links.thumbnail.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeInfo {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<i64>,
    pub industry_identifiers: Vec<IndustryIdentifier>,
    pub image_links: ImageLinks,
    /// ISO 639 language code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// ISBN or similar identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryIdentifier {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub identifier_type: Option<String>,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageLinks {
    /// Download URL of the cover image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    pub amount: f64,
    pub currency_code: String,
}

/// Boolean flags that can be toggled on a stored book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    Favorite,
    Recommending,
}

impl StatusField {
    pub fn field(&self) -> QueryField {
        match self {
            StatusField::Favorite => QueryField::Favorite,
            StatusField::Recommending => QueryField::Recommending,
        }
    }
}

/// Outcome of the best-effort cover upload performed by `create_book`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverUpload {
    /// No cover bytes were supplied.
    NotRequested,
    /// The cover was stored and its URL written to the book.
    Stored(String),
    /// The book was saved without a cover.
    Failed(String),
}

/// Result of a successful `create_book`.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedBook {
    /// The record as persisted, including generated id, owner and timestamp.
    pub book: Book,
    pub cover: CoverUpload,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

impl User {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: email.into(),
            photo_url: String::new(),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// User-defined tag that books reference by `category_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(rename = "uid")]
    pub category_id: String,
    pub name: String,
}

impl Category {
    /// Key used for case-insensitive uniqueness.
    pub fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }
}
