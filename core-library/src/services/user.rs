//! Profile document of the signed-in user.

use bridge_traits::storage::profile_photo_path;
use bridge_traits::{Collection, CollectionPath, Document, Fields};
use bytes::Bytes;
use core_runtime::events::{AccountEvent, CoreEvent};
use core_runtime::logging::{redact_if_sensitive, short_id};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{require_id, ServiceContext};
use crate::error::{LibraryError, Result};
use crate::models::User;

pub struct UserService {
    ctx: ServiceContext,
    user_id: String,
}

impl UserService {
    pub fn new(ctx: ServiceContext, user_id: impl Into<String>) -> Self {
        Self {
            ctx,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn users_path() -> CollectionPath {
        CollectionPath::root(Collection::Users)
    }

    /// Write the profile document, replacing any existing one.
    ///
    /// The record is always stored under the signed-in user's id.
    #[instrument(skip(self, user), fields(user = %short_id(&self.user_id)))]
    pub async fn create_user(&self, mut user: User) -> Result<User> {
        require_id("userId", &self.user_id)?;
        self.ctx.ensure_connected()?;

        user.user_id = self.user_id.clone();
        let document = Document::from_record(user.user_id.as_str(), &user)?;
        self.ctx
            .store
            .set(&Self::users_path(), &user.user_id, document.fields)
            .await?;

        info!(
            email = %redact_if_sensitive("email", &user.email),
            "User record created"
        );
        Ok(user)
    }

    /// The profile document, or `None` when it was never created.
    pub async fn find_user(&self) -> Result<Option<User>> {
        require_id("userId", &self.user_id)?;
        let document = self.ctx.store.get(&Self::users_path(), &self.user_id).await?;
        Ok(document.map(|d| d.to_record()).transpose()?)
    }

    pub async fn retrieve_user(&self) -> Result<User> {
        self.find_user()
            .await?
            .ok_or_else(|| LibraryError::not_found("User", self.user_id.as_str()))
    }

    #[instrument(skip(self, name), fields(user = %short_id(&self.user_id)))]
    pub async fn update_display_name(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::invalid_input(
                "displayName",
                "cannot be empty",
            ));
        }
        self.ctx.ensure_connected()?;

        let mut patch = Fields::new();
        patch.insert("displayName".to_string(), Value::String(name.to_string()));
        self.ctx
            .store
            .update(&Self::users_path(), &self.user_id, patch)
            .await?;

        debug!("Display name updated");
        self.profile_updated();
        Ok(())
    }

    /// Store a new profile photo and return its URL.
    ///
    /// Unlike book covers the photo is the whole point of the call, so an
    /// upload failure fails the operation.
    #[instrument(skip(self, photo), fields(user = %short_id(&self.user_id), bytes = photo.len()))]
    pub async fn update_photo(&self, photo: Bytes) -> Result<String> {
        if photo.is_empty() {
            return Err(LibraryError::invalid_input("photo", "image data is empty"));
        }
        self.ctx.ensure_connected()?;

        let url = self
            .ctx
            .images
            .upload(&profile_photo_path(&self.user_id), photo)
            .await?;

        let mut patch = Fields::new();
        patch.insert("photoURL".to_string(), Value::String(url.clone()));
        self.ctx
            .store
            .update(&Self::users_path(), &self.user_id, patch)
            .await?;

        info!("Profile photo updated");
        self.profile_updated();
        Ok(url)
    }

    /// Delete the profile document and photo. Books are left in place.
    #[instrument(skip(self), fields(user = %short_id(&self.user_id)))]
    pub async fn delete_user(&self) -> Result<()> {
        require_id("userId", &self.user_id)?;
        self.ctx.ensure_connected()?;

        self.ctx
            .store
            .delete(&Self::users_path(), &self.user_id)
            .await?;
        if let Err(err) = self
            .ctx
            .images
            .delete(&profile_photo_path(&self.user_id))
            .await
        {
            warn!(error = %err, "Failed to delete profile photo");
        }

        info!("User record deleted");
        Ok(())
    }

    fn profile_updated(&self) {
        self.ctx.emit(CoreEvent::Account(AccountEvent::ProfileUpdated {
            user_id: self.user_id.clone(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{offline, online, MockImages, MockStore};
    use bridge_traits::{BridgeError, StoreErrorCode};
    use core_runtime::events::EventBus;
    use serde_json::json;
    use std::sync::Arc;

    fn service(store: MockStore, images: MockImages, online_now: bool) -> UserService {
        let network = if online_now { online() } else { offline() };
        UserService::new(
            ServiceContext::new(Arc::new(store), Arc::new(images), network),
            "user1",
        )
    }

    #[tokio::test]
    async fn test_create_user_uses_signed_in_id() {
        let mut store = MockStore::new();
        store
            .expect_set()
            .withf(|path, id, fields| {
                path == &CollectionPath::root(Collection::Users)
                    && id == "user1"
                    && fields["userId"] == json!("user1")
                    && fields["displayName"] == json!("Ada")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = service(store, MockImages::new(), true);

        let user = service
            .create_user(User::new("spoofed", "Ada", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(user.user_id, "user1");
    }

    #[tokio::test]
    async fn test_retrieve_missing_user() {
        let mut store = MockStore::new();
        store.expect_get().returning(|_, _| Ok(None));
        let service = service(store, MockImages::new(), true);

        assert_eq!(
            service.retrieve_user().await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(service.find_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_display_name_rejected_before_network() {
        let service = service(MockStore::new(), MockImages::new(), false);
        assert!(matches!(
            service.update_display_name("   ").await,
            Err(LibraryError::InvalidInput { .. })
        ));
        assert!(matches!(
            service.update_display_name("Ada").await,
            Err(LibraryError::NoNetwork)
        ));
    }

    #[tokio::test]
    async fn test_update_photo_links_url_and_emits() {
        let mut store = MockStore::new();
        store
            .expect_update()
            .withf(|_, id, patch| id == "user1" && patch["photoURL"] == json!("https://img/p"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut images = MockImages::new();
        images
            .expect_upload()
            .withf(|path, _| path == "users/user1/profile")
            .returning(|_, _| Ok("https://img/p".to_string()));

        let bus = EventBus::new(4);
        let mut events = bus.subscribe();
        let service = UserService::new(
            ServiceContext::new(Arc::new(store), Arc::new(images), online()).with_event_bus(bus),
            "user1",
        );

        let url = service.update_photo(Bytes::from_static(b"png")).await.unwrap();
        assert_eq!(url, "https://img/p");
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Account(AccountEvent::ProfileUpdated {
                user_id: "user1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_update_photo_upload_failure() {
        let mut store = MockStore::new();
        store.expect_update().never();
        let mut images = MockImages::new();
        images
            .expect_upload()
            .returning(|_, _| Err(BridgeError::Upload("too large".to_string())));
        let service = service(store, images, true);

        let err = service
            .update_photo(Bytes::from_static(b"png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreFailure);
    }

    #[tokio::test]
    async fn test_delete_user_store_failure() {
        let mut store = MockStore::new();
        store.expect_delete().returning(|_, _| {
            Err(BridgeError::store(StoreErrorCode::PermissionDenied, "denied"))
        });
        let service = service(store, MockImages::new(), true);

        let err = service.delete_user().await.unwrap_err();
        assert_eq!(err.store_code(), Some(StoreErrorCode::PermissionDenied));
    }
}
