//! Integration tests for the library services
//!
//! These tests drive the services against the in-memory document store and
//! verify:
//! - Book round-trips, validation and the offline gate
//! - Paging without duplicates and the exhausted signal
//! - Live listener delivery and cancellation
//! - Category, user and recommendation flows

use async_trait::async_trait;
use bridge_desktop::{DesktopNetworkMonitor, InMemoryStore, LocalImageStorage};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    Collection, CollectionPath, Document, Fields, ListenerRegistration, NetworkStatus,
    RemoteStore, SnapshotListener, StoreQuery,
};
use bytes::Bytes;
use core_library::{
    Book, BookQuery, CategoryService, CoverUpload, ErrorKind, LibraryError, LibraryService,
    RecommendationService, ServiceContext, StatusField, User, UserService,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

const OWNER: &str = "owner-1";

struct Harness {
    store: InMemoryStore,
    network: Arc<DesktopNetworkMonitor>,
    ctx: ServiceContext,
    _images: TempDir,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let network = Arc::new(DesktopNetworkMonitor::with_status(NetworkStatus::Connected));
        let images = tempfile::tempdir().unwrap();
        let ctx = ServiceContext::new(
            Arc::new(store.clone()),
            Arc::new(LocalImageStorage::with_root(images.path())),
            network.clone(),
        );
        Self {
            store,
            network,
            ctx,
            _images: images,
        }
    }

    fn library(&self) -> LibraryService {
        LibraryService::new(self.ctx.clone(), OWNER)
    }

    fn stored_books(&self) -> usize {
        self.store
            .len(&CollectionPath::owned(Collection::Books, OWNER))
    }
}

/// Book with a fixed id and timestamp so ordering is predictable
fn book(id: &str, title: &str, timestamp: i64) -> Book {
    let mut book = Book::new(title);
    book.book_id = id.to_string();
    book.timestamp = timestamp;
    book
}

/// In-memory store whose queries take a while to answer
struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

#[async_trait]
impl RemoteStore for SlowStore {
    async fn query(&self, query: &StoreQuery) -> BridgeResult<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(query).await
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> BridgeResult<Option<Document>> {
        self.inner.get(path, id).await
    }

    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> BridgeResult<()> {
        self.inner.set(path, id, fields).await
    }

    async fn update(&self, path: &CollectionPath, id: &str, patch: Fields) -> BridgeResult<()> {
        self.inner.update(path, id, patch).await
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> BridgeResult<()> {
        self.inner.delete(path, id).await
    }

    async fn listen(
        &self,
        query: StoreQuery,
        listener: SnapshotListener,
    ) -> BridgeResult<Box<dyn ListenerRegistration>> {
        self.inner.listen(query, listener).await
    }
}

async fn seed(library: &LibraryService, count: usize) {
    for i in 0..count {
        library
            .create_book(book(&format!("b{}", i), &format!("Title {}", i), i as i64 + 1), None)
            .await
            .unwrap();
    }
}

// =============================================================================
// Create / get / delete
// =============================================================================

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let harness = Harness::new();
    let library = harness.library();

    let mut record = book("b1", "Dune", 42);
    record.volume_info.authors = vec!["Frank Herbert".to_string()];
    record.category.insert("c1".to_string());
    let saved = library.create_book(record, None).await.unwrap();

    let fetched = library.get_book("b1", OWNER).await.unwrap();
    assert_eq!(fetched, saved.book);
    assert_eq!(fetched.owner_id, OWNER);
}

#[tokio::test]
async fn test_empty_title_never_written() {
    let harness = Harness::new();
    let library = harness.library();

    for online in [true, false] {
        let status = if online {
            NetworkStatus::Connected
        } else {
            NetworkStatus::Disconnected
        };
        harness.network.set_status(status);

        let err = library
            .create_book(book("b1", "", 1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    harness.network.set_status(NetworkStatus::Connected);
    let err = library.get_book("b1", OWNER).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_offline_create_performs_no_write() {
    let harness = Harness::new();
    harness.network.set_status(NetworkStatus::Disconnected);

    let err = harness
        .library()
        .create_book(book("b1", "Dune", 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NoNetwork));
    assert_eq!(harness.stored_books(), 0);
}

#[tokio::test]
async fn test_indeterminate_network_treated_as_offline() {
    let harness = Harness::new();
    harness.network.set_status(NetworkStatus::Indeterminate);

    let err = harness
        .library()
        .set_status(true, StatusField::Favorite, "b1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);
}

#[tokio::test]
async fn test_delete_then_get_not_found() {
    let harness = Harness::new();
    let library = harness.library();
    let saved = library
        .create_book(book("b1", "Dune", 1), Some(Bytes::from_static(b"cover")))
        .await
        .unwrap();

    library.delete_book(&saved.book).await.unwrap();

    assert!(matches!(
        library.get_book("b1", OWNER).await,
        Err(LibraryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_cover_url_persisted() {
    let harness = Harness::new();
    let library = harness.library();

    let saved = library
        .create_book(book("b1", "Dune", 1), Some(Bytes::from_static(b"cover")))
        .await
        .unwrap();
    let url = match &saved.cover {
        CoverUpload::Stored(url) => url.clone(),
        other => panic!("cover not stored: {:?}", other),
    };
    assert!(url.starts_with("file://"));

    let fetched = library.get_book("b1", OWNER).await.unwrap();
    assert_eq!(fetched.cover_url(), Some(url.as_str()));
}

#[tokio::test]
async fn test_books_are_scoped_by_owner() {
    let harness = Harness::new();
    harness
        .library()
        .create_book(book("b1", "Dune", 1), None)
        .await
        .unwrap();

    let other = LibraryService::new(harness.ctx.clone(), "owner-2");
    assert!(matches!(
        other.get_book("b1", "owner-2").await,
        Err(LibraryError::NotFound { .. })
    ));
    let page = other
        .get_book_list(&BookQuery::all_books(), None, false)
        .await
        .unwrap();
    assert!(page.is_empty());
}

// =============================================================================
// Status flags
// =============================================================================

#[tokio::test]
async fn test_set_status_is_idempotent() {
    let harness = Harness::new();
    let library = harness.library();
    library
        .create_book(book("b1", "Dune", 7), None)
        .await
        .unwrap();

    library.set_status(true, StatusField::Favorite, "b1").await.unwrap();
    let once = library.get_book("b1", OWNER).await.unwrap();
    library.set_status(true, StatusField::Favorite, "b1").await.unwrap();
    let twice = library.get_book("b1", OWNER).await.unwrap();

    assert!(twice.favorite);
    assert_eq!(once, twice);
    assert_eq!(twice.title(), "Dune");
    assert_eq!(twice.timestamp, 7);
}

#[tokio::test]
async fn test_set_status_on_missing_book_is_store_failure() {
    let harness = Harness::new();

    let err = harness
        .library()
        .set_status(true, StatusField::Recommending, "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreFailure);
}

// =============================================================================
// Paging
// =============================================================================

#[tokio::test]
async fn test_paging_has_no_duplicates_and_exhausts() {
    let harness = Harness::new();
    let library = harness.library();
    seed(&library, 7).await;
    let query = BookQuery::all_books();

    let first = library.get_book_list(&query, Some(3), false).await.unwrap();
    let second = library.get_book_list(&query, Some(3), true).await.unwrap();
    let third = library.get_book_list(&query, Some(3), true).await.unwrap();

    assert_eq!(first.len(), 3);
    assert!(!first.exhausted);
    assert_eq!(second.len(), 3);
    assert!(!second.exhausted);
    assert_eq!(third.len(), 1);
    assert!(third.exhausted);

    let ids: Vec<_> = first
        .books
        .iter()
        .chain(&second.books)
        .chain(&third.books)
        .map(|b| b.book_id.clone())
        .collect();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), 7);
    assert_eq!(unique.len(), 7);

    let titles: Vec<_> = first.books.iter().map(|b| b.title().to_string()).collect();
    assert_eq!(titles, vec!["Title 0", "Title 1", "Title 2"]);

    let after_end = library.get_book_list(&query, Some(3), true).await.unwrap();
    assert!(after_end.is_empty());
    assert!(after_end.exhausted);
}

#[tokio::test]
async fn test_fresh_query_restarts_from_first_page() {
    let harness = Harness::new();
    let library = harness.library();
    seed(&library, 4).await;
    let query = BookQuery::new_entries();

    let first = library.get_book_list(&query, Some(2), false).await.unwrap();
    library.get_book_list(&query, Some(2), true).await.unwrap();
    let refreshed = library.get_book_list(&query, Some(2), false).await.unwrap();

    assert_eq!(first, refreshed);
    // Newest first.
    assert_eq!(first.books[0].book_id, "b3");
}

#[tokio::test]
async fn test_favorites_newest_first_one_per_page() {
    let harness = Harness::new();
    let library = harness.library();
    for (id, timestamp) in [("old", 1), ("new", 2)] {
        let mut record = book(id, id, timestamp);
        record.favorite = true;
        library.create_book(record, None).await.unwrap();
    }
    library
        .create_book(book("plain", "plain", 3), None)
        .await
        .unwrap();
    let query = BookQuery::favorites();

    let first = library.get_book_list(&query, Some(1), false).await.unwrap();
    assert_eq!(first.books.len(), 1);
    assert_eq!(first.books[0].timestamp, 2);
    assert!(!first.exhausted);

    let second = library.get_book_list(&query, Some(1), true).await.unwrap();
    assert_eq!(second.books.len(), 1);
    assert_eq!(second.books[0].timestamp, 1);
    assert!(second.exhausted);
}

#[tokio::test]
async fn test_category_query_filters_and_empty_value_succeeds() {
    let harness = Harness::new();
    let library = harness.library();
    let mut tagged = book("b1", "Dune", 1);
    tagged.category.insert("scifi".to_string());
    library.create_book(tagged, None).await.unwrap();
    library.create_book(book("b2", "Emma", 2), None).await.unwrap();

    let page = library
        .get_book_list(&BookQuery::category("scifi"), None, false)
        .await
        .unwrap();
    assert_eq!(page.books.len(), 1);
    assert_eq!(page.books[0].book_id, "b1");

    let empty = library
        .get_book_list(&BookQuery::category(""), None, false)
        .await
        .unwrap();
    assert!(empty.is_empty());
    assert!(empty.exhausted);
}

#[tokio::test]
async fn test_overlapping_page_requests_rejected() {
    let harness = Harness::new();
    seed(&harness.library(), 5).await;

    let slow = SlowStore {
        inner: harness.store.clone(),
        delay: Duration::from_millis(50),
    };
    let ctx = ServiceContext::new(
        Arc::new(slow),
        Arc::new(LocalImageStorage::with_root(harness._images.path())),
        harness.network.clone(),
    );
    let library = LibraryService::new(ctx, OWNER);
    let query = BookQuery::all_books();

    let (first, second) = tokio::join!(
        library.get_book_list(&query, Some(2), false),
        library.get_book_list(&query, Some(2), true),
    );
    assert_eq!(first.unwrap().len(), 2);
    assert!(matches!(second, Err(LibraryError::PageRequestInFlight { .. })));

    // A different query is not blocked, and the slot is free afterwards.
    let favorites_query = BookQuery::favorites();
    let (all, favorites) = tokio::join!(
        library.get_book_list(&query, Some(2), true),
        library.get_book_list(&favorites_query, Some(2), false),
    );
    assert_eq!(all.unwrap().len(), 2);
    assert!(favorites.unwrap().is_empty());
}

// =============================================================================
// Listeners
// =============================================================================

#[tokio::test]
async fn test_listener_receives_full_list_until_removed() {
    let harness = Harness::new();
    let library = harness.library();
    library.create_book(book("b1", "Dune", 1), None).await.unwrap();

    let (tx, mut updates) = mpsc::unbounded_channel();
    let handle = library
        .attach_listener(&BookQuery::all_books(), None, move |books| {
            let _ = tx.send(books);
        })
        .await
        .unwrap();
    assert_eq!(library.listener_count(), 1);

    let initial = updates.recv().await.unwrap().unwrap();
    assert_eq!(initial.len(), 1);

    library.create_book(book("b2", "Emma", 2), None).await.unwrap();
    let after_add = updates.recv().await.unwrap().unwrap();
    let ids: Vec<_> = after_add.iter().map(|b| b.book_id.as_str()).collect();
    assert_eq!(ids, vec!["b1", "b2"]);

    library.remove_listener(&handle).await;
    library.remove_listener(&handle).await;
    assert_eq!(library.listener_count(), 0);
    assert_eq!(harness.store.listener_count(), 0);

    library.create_book(book("b3", "Ulysses", 3), None).await.unwrap();
    let late = tokio::time::timeout(Duration::from_millis(50), updates.recv()).await;
    assert!(matches!(late, Err(_) | Ok(None)));
}

#[tokio::test]
async fn test_handle_removed_directly_drops_from_service_count() {
    let harness = Harness::new();
    let library = harness.library();

    let handle = library
        .attach_listener(&BookQuery::all_books(), None, |_books| {})
        .await
        .unwrap();
    let kept = library
        .attach_listener(&BookQuery::favorites(), None, |_books| {})
        .await
        .unwrap();
    assert_eq!(library.listener_count(), 2);

    handle.remove().await;
    assert_eq!(library.listener_count(), 1);
    assert_eq!(harness.store.listener_count(), 1);

    library.remove_listener(&kept).await;
    assert_eq!(library.listener_count(), 0);
}

#[tokio::test]
async fn test_remove_all_listeners() {
    let harness = Harness::new();
    let library = harness.library();

    for query in [BookQuery::favorites(), BookQuery::recommendations()] {
        library
            .attach_listener(&query, Some(10), |_books| {})
            .await
            .unwrap();
    }
    assert_eq!(harness.store.listener_count(), 2);

    library.remove_all_listeners().await;
    assert_eq!(library.listener_count(), 0);
    assert_eq!(harness.store.listener_count(), 0);
}

// =============================================================================
// Categories, users, recommendations
// =============================================================================

#[tokio::test]
async fn test_category_lifecycle() {
    let harness = Harness::new();
    let categories = CategoryService::new(harness.ctx.clone(), OWNER);

    let poetry = categories.add_category("Poetry").await.unwrap();
    categories.add_category("Drama").await.unwrap();
    assert!(matches!(
        categories.add_category("poetry").await,
        Err(LibraryError::AlreadyExists { .. })
    ));

    let names: Vec<_> = categories
        .get_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Drama", "Poetry"]);

    categories
        .update_category_name(&poetry.category_id, "Verse")
        .await
        .unwrap();
    categories.delete_category(&poetry.category_id).await.unwrap();

    let remaining = categories.get_categories().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Drama");
}

#[tokio::test]
async fn test_user_profile_flow() {
    let harness = Harness::new();
    let users = UserService::new(harness.ctx.clone(), OWNER);

    users
        .create_user(User::new(OWNER, "Ada", "ada@example.com"))
        .await
        .unwrap();
    users.update_display_name("Ada L.").await.unwrap();
    let url = users.update_photo(Bytes::from_static(b"png")).await.unwrap();

    let user = users.retrieve_user().await.unwrap();
    assert_eq!(user.display_name, "Ada L.");
    assert_eq!(user.photo_url, url);

    users.delete_user().await.unwrap();
    assert_eq!(
        users.retrieve_user().await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_recommendations_shared_across_users() {
    let harness = Harness::new();
    let library = harness.library();
    let saved = library
        .create_book(book("b1", "Dune", 5), None)
        .await
        .unwrap()
        .book;

    let mine = RecommendationService::new(harness.ctx.clone(), OWNER);
    mine.add(&saved).await.unwrap();
    library
        .set_status(true, StatusField::Recommending, &saved.book_id)
        .await
        .unwrap();

    let theirs = RecommendationService::new(harness.ctx.clone(), "owner-2");
    let feed = theirs.list(None).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].book_id, "b1");
    assert!(feed[0].recommending);

    mine.remove(&saved).await.unwrap();
    mine.remove(&saved).await.unwrap();
    assert!(theirs.list(None).await.unwrap().is_empty());
}
