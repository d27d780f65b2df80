//! Library service: the signed-in user's books.

use bridge_traits::storage::cover_image_path;
use bridge_traits::{Collection, CollectionPath, Document, Fields};
use bytes::Bytes;
use core_runtime::events::{CoreEvent, LibraryEvent};
use core_runtime::logging::short_id;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{require_id, ServiceContext};
use crate::error::{LibraryError, Result};
use crate::listener::{BookListCallback, ListenerHandle};
use crate::models::{Book, CoverUpload, SavedBook, StatusField};
use crate::pagination::{BookPage, PaginationManager};
use crate::query::BookQuery;

const THUMBNAIL_FIELD: &str = "volumeInfo.imageLinks.thumbnail";

/// Books of one user.
///
/// Owns the paging state of every query it has served and the listeners
/// attached through it.
pub struct LibraryService {
    ctx: ServiceContext,
    user_id: String,
    pagination: PaginationManager,
    listeners: Mutex<HashMap<Uuid, ListenerHandle>>,
}

impl LibraryService {
    pub fn new(ctx: ServiceContext, user_id: impl Into<String>) -> Self {
        Self {
            ctx,
            user_id: user_id.into(),
            pagination: PaginationManager::new(),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn pagination(&self) -> &PaginationManager {
        &self.pagination
    }

    fn books_path(&self, owner_id: &str) -> CollectionPath {
        CollectionPath::owned(Collection::Books, owner_id)
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<Uuid, ListenerHandle>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Save a book for the signed-in user, optionally with a cover image.
    ///
    /// The title is checked before connectivity, so an untitled book is
    /// rejected even offline. An empty `book_id` gets a generated one and a
    /// zero `timestamp` is stamped with the current time. The owner is
    /// always the signed-in user.
    ///
    /// The cover upload is best-effort: when it fails the book stays saved
    /// and the failure is reported in [`SavedBook::cover`].
    #[instrument(skip(self, book, cover), fields(user = %short_id(&self.user_id)))]
    pub async fn create_book(&self, mut book: Book, cover: Option<Bytes>) -> Result<SavedBook> {
        book.validate()?;
        self.ctx.ensure_connected()?;

        if book.book_id.trim().is_empty() {
            book.book_id = Uuid::new_v4().to_string();
        }
        book.owner_id = self.user_id.clone();
        if book.timestamp == 0 {
            book.timestamp = self.ctx.now_millis();
        }

        let path = self.books_path(&self.user_id);
        let existing = self.ctx.store.get(&path, &book.book_id).await?;
        if let Some(existing) = &existing {
            let stored: Book = existing.to_record()?;
            if !stored.owner_id.is_empty() && stored.owner_id != self.user_id {
                return Err(LibraryError::invalid_input(
                    "ownerID",
                    "a book's owner cannot change",
                ));
            }
        }

        let document = Document::from_record(book.book_id.as_str(), &book)?;
        self.ctx
            .store
            .set(&path, &book.book_id, document.fields)
            .await
            .map_err(|err| {
                error!(book_id = %book.book_id, code = %err.store_code(), "Failed to save book");
                LibraryError::from(err)
            })?;

        let created = existing.is_none();
        info!(book_id = %book.book_id, created, "Book saved");
        self.ctx.emit(CoreEvent::Library(LibraryEvent::BookSaved {
            owner_id: self.user_id.clone(),
            book_id: book.book_id.clone(),
            created,
        }));

        let cover = match cover {
            Some(bytes) if !bytes.is_empty() => self.store_cover(&mut book, bytes).await,
            _ => CoverUpload::NotRequested,
        };

        Ok(SavedBook { book, cover })
    }

    async fn store_cover(&self, book: &mut Book, bytes: Bytes) -> CoverUpload {
        let image_path = cover_image_path(&self.user_id, &book.book_id);
        let uploaded = match self.ctx.images.upload(&image_path, bytes).await {
            Ok(url) => {
                let mut patch = Fields::new();
                patch.insert(THUMBNAIL_FIELD.to_string(), Value::String(url.clone()));
                let linked = self
                    .ctx
                    .store
                    .update(&self.books_path(&self.user_id), &book.book_id, patch)
                    .await;
                if linked.is_err() {
                    // The record never points at the blob; drop it.
                    if let Err(err) = self.ctx.images.delete(&image_path).await {
                        warn!(book_id = %book.book_id, error = %err, "Failed to delete orphaned cover");
                    }
                }
                linked.map(|_| url)
            }
            Err(err) => Err(err),
        };

        match uploaded {
            Ok(url) => {
                debug!(book_id = %book.book_id, "Cover stored");
                book.volume_info.image_links.thumbnail = Some(url.clone());
                CoverUpload::Stored(url)
            }
            Err(err) => {
                warn!(book_id = %book.book_id, error = %err, "Cover upload failed; book saved without cover");
                self.ctx.emit(CoreEvent::Library(LibraryEvent::CoverUploadFailed {
                    owner_id: self.user_id.clone(),
                    book_id: book.book_id.clone(),
                    reason: err.to_string(),
                }));
                CoverUpload::Failed(err.to_string())
            }
        }
    }

    /// Point read of `owner_id`'s book.
    #[instrument(skip(self))]
    pub async fn get_book(&self, book_id: &str, owner_id: &str) -> Result<Book> {
        require_id("bookID", book_id)?;
        require_id("ownerID", owner_id)?;

        let document = self
            .ctx
            .store
            .get(&self.books_path(owner_id), book_id)
            .await?
            .ok_or_else(|| LibraryError::not_found("Book", book_id))?;

        let book: Book = document.to_record()?;
        if book.owner_id != owner_id {
            // Stored under the owner but claiming someone else; never hand it out.
            warn!(book_id, "Book owner mismatch");
            return Err(LibraryError::not_found("Book", book_id));
        }
        Ok(book)
    }

    /// One page of `query`.
    ///
    /// With `for_more == false` the query starts over from the first page.
    /// With `for_more == true` it continues after the last page returned; once
    /// the list is exhausted this returns an empty page rather than an error.
    /// `limit` defaults to the configured page size.
    ///
    /// A second call for the same query while one is running fails with
    /// [`LibraryError::PageRequestInFlight`].
    #[instrument(skip(self, query), fields(query = %query))]
    pub async fn get_book_list(
        &self,
        query: &BookQuery,
        limit: Option<usize>,
        for_more: bool,
    ) -> Result<BookPage> {
        query.validate()?;
        let limit = limit.unwrap_or(self.ctx.config.default_page_size);
        if limit == 0 || limit > self.ctx.config.max_page_size {
            return Err(LibraryError::invalid_input(
                "limit",
                format!("must be between 1 and {}", self.ctx.config.max_page_size),
            ));
        }

        let _guard = self.pagination.begin(query)?;
        if !for_more {
            self.pagination.reset(query);
        }

        // One extra document tells whether another page exists.
        let fetch_size = limit + 1;
        let store_query = query.build(&self.user_id, Some(fetch_size), None)?;
        let Some(store_query) = self.pagination.next_page(query, store_query) else {
            debug!("Query exhausted");
            return Ok(BookPage {
                books: Vec::new(),
                exhausted: true,
            });
        };

        let documents = self.ctx.store.query(&store_query).await.map_err(|err| {
            error!(code = %err.store_code(), error = %err, "Book list query failed");
            LibraryError::from(err)
        })?;
        let fetched = documents.len();

        let page: Vec<_> = documents.into_iter().take(limit).collect();
        let books = page
            .iter()
            .map(|document| document.to_record::<Book>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let last = page.last().and_then(|document| store_query.cursor_for(document));

        let state = self.pagination.advance(query, last, fetch_size, fetched);
        debug!(returned = books.len(), exhausted = state.exhausted, "Book page fetched");

        Ok(BookPage {
            books,
            exhausted: state.exhausted,
        })
    }

    /// Delete one of the signed-in user's books and, best-effort, its cover.
    ///
    /// Removing the book from the recommendations feed is left to the caller.
    #[instrument(skip(self, book), fields(book_id = %book.book_id))]
    pub async fn delete_book(&self, book: &Book) -> Result<()> {
        require_id("bookID", &book.book_id)?;
        if !book.owner_id.is_empty() && book.owner_id != self.user_id {
            return Err(LibraryError::invalid_input(
                "ownerID",
                "only the owner can delete a book",
            ));
        }
        self.ctx.ensure_connected()?;

        self.ctx
            .store
            .delete(&self.books_path(&self.user_id), &book.book_id)
            .await
            .map_err(|err| {
                error!(code = %err.store_code(), "Failed to delete book");
                LibraryError::from(err)
            })?;

        let image_path = cover_image_path(&self.user_id, &book.book_id);
        if let Err(err) = self.ctx.images.delete(&image_path).await {
            warn!(error = %err, "Failed to delete cover image");
        }

        info!("Book deleted");
        self.ctx.emit(CoreEvent::Library(LibraryEvent::BookDeleted {
            owner_id: self.user_id.clone(),
            book_id: book.book_id.clone(),
        }));
        Ok(())
    }

    /// Set a favorite/recommending flag without rewriting the record.
    #[instrument(skip(self))]
    pub async fn set_status(&self, value: bool, field: StatusField, book_id: &str) -> Result<()> {
        require_id("bookID", book_id)?;
        self.ctx.ensure_connected()?;

        let mut patch = Fields::new();
        patch.insert(field.field().as_str().to_string(), Value::Bool(value));
        self.ctx
            .store
            .update(&self.books_path(&self.user_id), book_id, patch)
            .await
            .map_err(|err| {
                error!(code = %err.store_code(), "Failed to update book status");
                LibraryError::from(err)
            })?;

        debug!("Book status updated");
        self.ctx.emit(CoreEvent::Library(LibraryEvent::BookStatusChanged {
            owner_id: self.user_id.clone(),
            book_id: book_id.to_string(),
            field: field.field().as_str().to_string(),
            value,
        }));
        Ok(())
    }

    /// Subscribe to `query`. `on_update` receives the full current list on
    /// attach and after every change until the handle is removed.
    ///
    /// `limit` caps the list size; `None` listens to the whole list.
    #[instrument(skip(self, query, on_update), fields(query = %query))]
    pub async fn attach_listener<F>(
        &self,
        query: &BookQuery,
        limit: Option<usize>,
        on_update: F,
    ) -> Result<ListenerHandle>
    where
        F: Fn(Result<Vec<Book>>) + Send + Sync + 'static,
    {
        let store_query = query.build(&self.user_id, limit, None)?;
        let callback: BookListCallback = Arc::new(on_update);
        let handle = ListenerHandle::attach(
            self.ctx.store.as_ref(),
            store_query,
            query.to_string(),
            callback,
        )
        .await?;

        let mut listeners = self.listeners();
        listeners.retain(|_, live| !live.is_cancelled());
        listeners.insert(handle.id(), handle.clone());
        Ok(handle)
    }

    /// Release a listener. Removing it twice is a no-op.
    pub async fn remove_listener(&self, handle: &ListenerHandle) {
        handle.remove().await;
        self.listeners().remove(&handle.id());
    }

    /// Release every listener attached through this service.
    pub async fn remove_all_listeners(&self) {
        let handles: Vec<ListenerHandle> = self.listeners().drain().map(|(_, h)| h).collect();
        if handles.is_empty() {
            return;
        }
        let count = handles.len();
        join_all(handles.iter().map(|handle| handle.remove())).await;
        info!(count, "Removed all book listeners");
    }

    /// Live listeners attached through this service. Handles released
    /// directly with [`ListenerHandle::remove`] are pruned here.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners();
        listeners.retain(|_, live| !live.is_cancelled());
        listeners.len()
    }
}
