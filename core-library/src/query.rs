//! Book list queries and their translation into store queries.
//!
//! A [`BookQuery`] names *what* list the caller wants (all books, favorites,
//! one category, ...) and how it is ordered. [`BookQuery::build`] turns it
//! into a [`StoreQuery`] scoped to the owner's `books` collection, with a
//! document-id tie-break appended so that page cursors are stable.

use bridge_traits::{
    Collection, CollectionPath, Direction, FilterOp, PageCursor, StoreQuery, DOCUMENT_ID,
};
use serde_json::Value;
use std::fmt;

use crate::error::{LibraryError, Result};

/// Which list a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListType {
    AllBooks,
    NewEntries,
    Categories,
    Favorites,
    Recommendations,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::AllBooks => "all-books",
            ListType::NewEntries => "new-entries",
            ListType::Categories => "categories",
            ListType::Favorites => "favorites",
            ListType::Recommendations => "recommendations",
        }
    }
}

/// Stored book fields usable in filters and sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryField {
    BookId,
    OwnerId,
    Favorite,
    Recommending,
    Timestamp,
    Title,
    Category,
}

impl QueryField {
    /// Document field path.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryField::BookId => "bookID",
            QueryField::OwnerId => "ownerID",
            QueryField::Favorite => "favorite",
            QueryField::Recommending => "recommending",
            QueryField::Timestamp => "timestamp",
            QueryField::Title => "volumeInfo.title",
            QueryField::Category => "category",
        }
    }
}

/// A book listing request.
///
/// Equal queries share pagination state, so two screens showing the same
/// list page through it together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookQuery {
    pub list_type: ListType,
    pub order_by: QueryField,
    pub descending: bool,
    /// Category id for [`ListType::Categories`]; unused otherwise.
    pub field_value: Option<String>,
}

impl BookQuery {
    /// Every book, by title.
    pub fn all_books() -> Self {
        Self {
            list_type: ListType::AllBooks,
            order_by: QueryField::Title,
            descending: false,
            field_value: None,
        }
    }

    /// Most recently added first.
    pub fn new_entries() -> Self {
        Self {
            list_type: ListType::NewEntries,
            order_by: QueryField::Timestamp,
            descending: true,
            field_value: None,
        }
    }

    pub fn favorites() -> Self {
        Self {
            list_type: ListType::Favorites,
            order_by: QueryField::Timestamp,
            descending: true,
            field_value: None,
        }
    }

    pub fn recommendations() -> Self {
        Self {
            list_type: ListType::Recommendations,
            order_by: QueryField::Timestamp,
            descending: true,
            field_value: None,
        }
    }

    /// Books tagged with `category_id`.
    ///
    /// An empty id is accepted and simply matches nothing.
    pub fn category(category_id: impl Into<String>) -> Self {
        Self {
            list_type: ListType::Categories,
            order_by: QueryField::Category,
            descending: false,
            field_value: Some(category_id.into()),
        }
    }

    /// Override ordering.
    pub fn ordered_by(mut self, field: QueryField, descending: bool) -> Self {
        self.order_by = field;
        self.descending = descending;
        self
    }

    /// Checks that the ordering field fits the list type.
    pub fn validate(&self) -> Result<()> {
        match self.list_type {
            ListType::Categories => {
                if self.order_by != QueryField::Category {
                    return Err(LibraryError::InvalidQuery(format!(
                        "category lists must be ordered by {}",
                        QueryField::Category.as_str()
                    )));
                }
                if self.field_value.is_none() {
                    return Err(LibraryError::InvalidQuery(
                        "category lists require a category id".to_string(),
                    ));
                }
            }
            ListType::NewEntries if self.order_by != QueryField::Timestamp => {
                return Err(LibraryError::InvalidQuery(format!(
                    "new entries must be ordered by {}",
                    QueryField::Timestamp.as_str()
                )));
            }
            _ if self.order_by == QueryField::Category => {
                return Err(LibraryError::InvalidQuery(format!(
                    "{} lists cannot be ordered by {}",
                    self.list_type.as_str(),
                    QueryField::Category.as_str()
                )));
            }
            _ => {}
        }

        if self.list_type != ListType::Categories && self.field_value.is_some() {
            return Err(LibraryError::InvalidQuery(format!(
                "{} lists do not take a filter value",
                self.list_type.as_str()
            )));
        }

        Ok(())
    }

    /// Store query for `owner_id`'s books returning at most `limit` documents
    /// after `cursor`.
    pub fn build(
        &self,
        owner_id: &str,
        limit: Option<usize>,
        cursor: Option<PageCursor>,
    ) -> Result<StoreQuery> {
        self.validate()?;

        let mut query = StoreQuery::new(CollectionPath::owned(Collection::Books, owner_id));

        query = match self.list_type {
            ListType::Favorites => {
                query.filter(QueryField::Favorite.as_str(), FilterOp::Equal, Value::Bool(true))
            }
            ListType::Recommendations => query.filter(
                QueryField::Recommending.as_str(),
                FilterOp::Equal,
                Value::Bool(true),
            ),
            ListType::Categories => query.filter(
                QueryField::Category.as_str(),
                FilterOp::ArrayContains,
                Value::String(self.field_value.clone().unwrap_or_default()),
            ),
            ListType::AllBooks | ListType::NewEntries => query,
        };

        let direction = if self.descending {
            Direction::Descending
        } else {
            Direction::Ascending
        };
        query = query
            .order_by(self.order_by.as_str(), direction)
            .order_by(DOCUMENT_ID, Direction::Ascending);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(cursor) = cursor {
            query = query.start_after(cursor);
        }

        Ok(query)
    }
}

impl fmt::Display for BookQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} by {} {}",
            self.list_type.as_str(),
            self.order_by.as_str(),
            if self.descending { "desc" } else { "asc" }
        )?;
        if let Some(value) = &self.field_value {
            write!(f, " ({:?})", value)?;
        }
        Ok(())
    }
}
