//! Lazy traversal of paginated remote feeds.
//!
//! A [`Pager`] wraps any "fetch page at cursor" call and yields pages until
//! the feed signals its end, so scanners only deal with items.

use bridge_traits::catalog::Page;
use bridge_traits::error::Result as BridgeResult;
use futures::future::BoxFuture;
use tracing::trace;

use crate::error::{Result, SyncError};

/// Future returned by a page fetch.
pub type PageFuture<'a, T> = BoxFuture<'a, BridgeResult<Page<T>>>;

type FetchPage<'a, T> = Box<dyn FnMut(Option<String>) -> PageFuture<'a, T> + Send + 'a>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    Start,
    At(String),
    Exhausted,
}

/// Restartable, finite sequence of pages.
///
/// Ends only when a page carries no continuation cursor. A page can come back
/// empty (the provider filtered every item) and still continue.
///
/// ```ignore
/// let mut artists = Pager::new("followed artists", move |cursor| {
///     catalog.list_followed_artists(cursor)
/// });
/// while let Some(page) = artists.next_page().await? {
///     // ...
/// }
/// ```
pub struct Pager<'a, T> {
    feed: String,
    fetch: FetchPage<'a, T>,
    position: Position,
    pages_fetched: usize,
}

impl<'a, T> Pager<'a, T> {
    pub fn new<F>(feed: impl Into<String>, fetch: F) -> Self
    where
        F: FnMut(Option<String>) -> PageFuture<'a, T> + Send + 'a,
    {
        Self {
            feed: feed.into(),
            fetch: Box::new(fetch),
            position: Position::Start,
            pages_fetched: 0,
        }
    }

    pub fn feed(&self) -> &str {
        &self.feed
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.position == Position::Exhausted
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the feed is exhausted. A failed fetch is a
    /// [`SyncError::Pagination`].
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let cursor = match std::mem::replace(&mut self.position, Position::Exhausted) {
            Position::Exhausted => return Ok(None),
            Position::Start => None,
            Position::At(cursor) => Some(cursor),
        };

        let page = (self.fetch)(cursor)
            .await
            .map_err(|source| SyncError::Pagination {
                feed: self.feed.clone(),
                source,
            })?;
        self.pages_fetched += 1;

        trace!(
            feed = %self.feed,
            items = page.items.len(),
            has_next = page.next.is_some(),
            "Fetched page"
        );

        if let Some(next) = page.next {
            self.position = Position::At(next);
        }
        Ok(Some(page.items))
    }

    /// Go back to the first page.
    pub fn restart(&mut self) {
        self.position = Position::Start;
    }

    /// Drain every remaining page into one list.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}
