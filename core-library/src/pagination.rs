//! Cursor bookkeeping for "load more" paging
//!
//! Each distinct [`BookQuery`] owns one [`CursorState`]: the position of the
//! last record handed to the caller and whether the list is exhausted. The
//! state only moves forward until [`PaginationManager::reset`] is called.
//!
//! Overlapping requests for the same query would race on that state, so a
//! request must hold a [`PageGuard`] from [`PaginationManager::begin`] for
//! its whole duration.

use bridge_traits::{PageCursor, StoreQuery};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::{LibraryError, Result};
use crate::models::Book;
use crate::query::BookQuery;

/// Paging position of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorState {
    /// Sort-key position of the last returned record, `None` before the
    /// first page.
    pub cursor: Option<PageCursor>,
    pub exhausted: bool,
}

/// One page of a book list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPage {
    pub books: Vec<Book>,
    /// No further page exists; another `for_more` call returns an empty page.
    pub exhausted: bool,
}

impl BookPage {
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }
}

#[derive(Debug, Default)]
pub struct PaginationManager {
    states: Mutex<HashMap<BookQuery, CursorState>>,
    in_flight: Mutex<HashSet<BookQuery>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PaginationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `query` as being paged. Fails while another guard for the same
    /// query is alive.
    pub fn begin(&self, query: &BookQuery) -> Result<PageGuard<'_>> {
        if !lock(&self.in_flight).insert(query.clone()) {
            return Err(LibraryError::PageRequestInFlight {
                query: query.to_string(),
            });
        }
        Ok(PageGuard {
            manager: self,
            query: query.clone(),
        })
    }

    pub fn state(&self, query: &BookQuery) -> CursorState {
        lock(&self.states).get(query).cloned().unwrap_or_default()
    }

    /// Resume `store_query` after the stored cursor.
    ///
    /// Returns `None` once the query is exhausted.
    pub fn next_page(&self, query: &BookQuery, store_query: StoreQuery) -> Option<StoreQuery> {
        let state = self.state(query);
        if state.exhausted {
            return None;
        }
        Some(match state.cursor {
            Some(cursor) => store_query.start_after(cursor),
            None => store_query,
        })
    }

    /// Record a fetched page.
    ///
    /// `last` is the position of the last record handed to the caller; the
    /// query is exhausted when `returned < page_size` or nothing came back.
    pub fn advance(
        &self,
        query: &BookQuery,
        last: Option<PageCursor>,
        page_size: usize,
        returned: usize,
    ) -> CursorState {
        let mut states = lock(&self.states);
        let state = states.entry(query.clone()).or_default();
        if let Some(cursor) = last {
            state.cursor = Some(cursor);
        }
        if returned == 0 || returned < page_size {
            state.exhausted = true;
        }
        state.clone()
    }

    /// Forget the position of `query` (pull-to-refresh).
    pub fn reset(&self, query: &BookQuery) {
        lock(&self.states).remove(query);
    }

    pub fn reset_all(&self) {
        lock(&self.states).clear();
    }
}

/// Marks a page request in flight until dropped.
#[derive(Debug)]
pub struct PageGuard<'a> {
    manager: &'a PaginationManager,
    query: BookQuery,
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        lock(&self.manager.in_flight).remove(&self.query);
    }
}
