//! Shared recommendations feed.
//!
//! Recommended books are copied into one namespace shared by all users, keyed
//! by `{ownerID}_{bookID}` so that two owners' books never collide. The
//! `recommending` flag on the owner's book is written separately through
//! [`LibraryService::set_status`](super::LibraryService::set_status).

use bridge_traits::{Collection, CollectionPath, Direction, Document, StoreQuery, DOCUMENT_ID};
use tracing::{debug, info, instrument};

use super::{require_id, ServiceContext};
use crate::error::{LibraryError, Result};
use crate::models::Book;
use crate::query::QueryField;

pub struct RecommendationService {
    ctx: ServiceContext,
    user_id: String,
}

/// Document id of `book` in the shared feed.
pub fn recommendation_id(book: &Book) -> String {
    format!("{}_{}", book.owner_id, book.book_id)
}

impl RecommendationService {
    pub fn new(ctx: ServiceContext, user_id: impl Into<String>) -> Self {
        Self {
            ctx,
            user_id: user_id.into(),
        }
    }

    fn path() -> CollectionPath {
        CollectionPath::root(Collection::Recommendations)
    }

    fn check_owned(&self, book: &Book) -> Result<()> {
        require_id("bookID", &book.book_id)?;
        if book.owner_id != self.user_id {
            return Err(LibraryError::invalid_input(
                "ownerID",
                "only the owner can recommend a book",
            ));
        }
        Ok(())
    }

    /// Publish one of the user's books to the feed.
    #[instrument(skip(self, book), fields(book_id = %book.book_id))]
    pub async fn add(&self, book: &Book) -> Result<()> {
        self.check_owned(book)?;
        self.ctx.ensure_connected()?;

        let mut record = book.clone();
        record.recommending = true;
        let id = recommendation_id(&record);
        let document = Document::from_record(id.as_str(), &record)?;
        self.ctx.store.set(&Self::path(), &id, document.fields).await?;

        info!("Book recommended");
        Ok(())
    }

    /// Withdraw a book from the feed. Withdrawing twice succeeds.
    #[instrument(skip(self, book), fields(book_id = %book.book_id))]
    pub async fn remove(&self, book: &Book) -> Result<()> {
        self.check_owned(book)?;
        self.ctx.ensure_connected()?;

        self.ctx
            .store
            .delete(&Self::path(), &recommendation_id(book))
            .await?;

        info!("Recommendation withdrawn");
        Ok(())
    }

    /// Newest recommendations from every user.
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<Book>> {
        let limit = limit.unwrap_or(self.ctx.config.default_page_size);
        if limit == 0 || limit > self.ctx.config.max_page_size {
            return Err(LibraryError::invalid_input(
                "limit",
                format!("must be between 1 and {}", self.ctx.config.max_page_size),
            ));
        }

        let query = StoreQuery::new(Self::path())
            .order_by(QueryField::Timestamp.as_str(), Direction::Descending)
            .order_by(DOCUMENT_ID, Direction::Ascending)
            .limit(limit);
        let documents = self.ctx.store.query(&query).await?;
        debug!(count = documents.len(), "Recommendations fetched");

        documents
            .iter()
            .map(|d| d.to_record::<Book>().map_err(LibraryError::from))
            .collect()
    }
}
