//! Image Storage Abstraction
//!
//! Blob storage for cover images and profile photos. Only the resulting
//! download URL is persisted in documents; image bytes never travel through
//! the document store.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Image storage trait
///
/// # Platform Support
///
/// - **Desktop**: local directory (`bridge-desktop::LocalImageStorage`)
/// - **Mobile**: the backend's object storage SDK
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::ImageStorage;
///
/// async fn store_cover(storage: &dyn ImageStorage, bytes: Bytes) -> Result<String> {
///     storage.upload("users/u1/images/book-1", bytes).await
/// }
/// ```
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Upload image bytes under `path`, replacing any previous image, and
    /// return the URL the image can be fetched from.
    ///
    /// Failures are reported as [`BridgeError::Upload`](crate::BridgeError::Upload).
    async fn upload(&self, path: &str, data: Bytes) -> Result<String>;

    /// Delete the image stored under `path`. Deleting a missing image succeeds.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Storage path of a book's cover image.
pub fn cover_image_path(owner_id: &str, book_id: &str) -> String {
    format!("users/{}/images/{}", owner_id, book_id)
}

/// Storage path of a user's profile photo.
pub fn profile_photo_path(user_id: &str) -> String {
    format!("users/{}/profile", user_id)
}
