//! User-defined categories.
//!
//! Books reference categories by id through their `category` set. The
//! reference is weak: deleting a category leaves tagged books untouched, and
//! a category query for a deleted id simply returns an empty list.

use bridge_traits::{
    Collection, CollectionPath, Direction, Document, Fields, StoreQuery, DOCUMENT_ID,
};
use core_runtime::events::{CoreEvent, LibraryEvent};
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{require_id, ServiceContext};
use crate::error::{LibraryError, Result};
use crate::models::Category;

const NAME_FIELD: &str = "name";

pub struct CategoryService {
    ctx: ServiceContext,
    user_id: String,
}

impl CategoryService {
    pub fn new(ctx: ServiceContext, user_id: impl Into<String>) -> Self {
        Self {
            ctx,
            user_id: user_id.into(),
        }
    }

    fn path(&self) -> CollectionPath {
        CollectionPath::owned(Collection::Categories, self.user_id.as_str())
    }

    fn validate_name(name: &str) -> Result<&str> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::invalid_input("name", "cannot be empty"));
        }
        Ok(name)
    }

    /// Fails when another category (other than `except`) already uses `name`,
    /// ignoring case.
    async fn ensure_unique(&self, name: &str, except: Option<&str>) -> Result<()> {
        let key = Category::normalize(name);
        let taken = self
            .get_categories()
            .await?
            .into_iter()
            .any(|c| Some(c.category_id.as_str()) != except && Category::normalize(&c.name) == key);
        if taken {
            return Err(LibraryError::AlreadyExists {
                entity_type: "Category".to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_category(&self, name: &str) -> Result<Category> {
        let name = Self::validate_name(name)?;
        self.ctx.ensure_connected()?;
        self.ensure_unique(name, None).await?;

        let category = Category {
            category_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        let document = Document::from_record(category.category_id.as_str(), &category)?;
        self.ctx
            .store
            .set(&self.path(), &category.category_id, document.fields)
            .await?;

        info!(category_id = %category.category_id, "Category added");
        self.changed(&category.category_id);
        Ok(category)
    }

    /// All categories of the user ordered by name.
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let query = StoreQuery::new(self.path())
            .order_by(NAME_FIELD, Direction::Ascending)
            .order_by(DOCUMENT_ID, Direction::Ascending);
        let documents = self.ctx.store.query(&query).await?;
        debug!(count = documents.len(), "Categories fetched");

        documents
            .iter()
            .map(|d| d.to_record::<Category>().map_err(LibraryError::from))
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn update_category_name(&self, category_id: &str, name: &str) -> Result<()> {
        require_id("uid", category_id)?;
        let name = Self::validate_name(name)?;
        self.ctx.ensure_connected()?;
        self.ensure_unique(name, Some(category_id)).await?;

        let mut patch = Fields::new();
        patch.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));
        self.ctx
            .store
            .update(&self.path(), category_id, patch)
            .await?;

        info!("Category renamed");
        self.changed(category_id);
        Ok(())
    }

    /// Delete a category. Books keep the dangling id.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: &str) -> Result<()> {
        require_id("uid", category_id)?;
        self.ctx.ensure_connected()?;

        self.ctx.store.delete(&self.path(), category_id).await?;

        info!("Category deleted");
        self.changed(category_id);
        Ok(())
    }

    fn changed(&self, category_id: &str) {
        self.ctx.emit(CoreEvent::Library(LibraryEvent::CategoryChanged {
            owner_id: self.user_id.clone(),
            category_id: category_id.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{offline, online, MockImages, MockStore};
    use serde_json::json;
    use std::sync::Arc;

    fn category_doc(id: &str, name: &str) -> Document {
        Document::new(id, json!({ "uid": id, "name": name }).as_object().cloned().unwrap())
    }

    fn service(store: MockStore, online_now: bool) -> CategoryService {
        let network = if online_now { online() } else { offline() };
        CategoryService::new(
            ServiceContext::new(Arc::new(store), Arc::new(MockImages::new()), network),
            "user1",
        )
    }

    #[tokio::test]
    async fn test_add_category_rejects_duplicate_ignoring_case() {
        let mut store = MockStore::new();
        store
            .expect_query()
            .returning(|_| Ok(vec![category_doc("c1", "Science Fiction")]));
        store.expect_set().never();
        let service = service(store, true);

        let err = service.add_category("  science fiction ").await.unwrap_err();
        assert!(matches!(err, LibraryError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_add_category_trims_and_stores() {
        let mut store = MockStore::new();
        store.expect_query().returning(|_| Ok(Vec::new()));
        store
            .expect_set()
            .withf(|path, id, fields| {
                path == &CollectionPath::owned(Collection::Categories, "user1")
                    && fields["uid"] == json!(id)
                    && fields["name"] == json!("Poetry")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = service(store, true);

        let category = service.add_category(" Poetry ").await.unwrap();
        assert_eq!(category.name, "Poetry");
        assert!(!category.category_id.is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let service = service(MockStore::new(), false);
        assert!(matches!(
            service.add_category("").await,
            Err(LibraryError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_offline_writes_rejected() {
        let service = service(MockStore::new(), false);
        assert!(matches!(
            service.delete_category("c1").await,
            Err(LibraryError::NoNetwork)
        ));
        assert!(matches!(
            service.update_category_name("c1", "Poetry").await,
            Err(LibraryError::NoNetwork)
        ));
    }

    #[tokio::test]
    async fn test_rename_to_own_name_in_other_case_allowed() {
        let mut store = MockStore::new();
        store
            .expect_query()
            .returning(|_| Ok(vec![category_doc("c1", "poetry")]));
        store
            .expect_update()
            .withf(|_, id, patch| id == "c1" && patch["name"] == json!("Poetry"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = service(store, true);

        service.update_category_name("c1", "Poetry").await.unwrap();
    }
}
