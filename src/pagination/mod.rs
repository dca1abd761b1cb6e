//! Pagination
//!
//! Lazy traversal of multi-page result sets. The caller supplies a fetch
//! function that turns a [`Cursor`] into a [`Page`], and an [`AdvanceRule`]
//! that derives the next cursor from the page just fetched. The paginator
//! owns only traversal state; a fetch failure ends the sequence with an
//! error rather than an empty tail.

use futures::stream::{self, Stream, StreamExt};
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::json::JsonValue;

/// Position of a page within a result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// First page, requested without a position.
    Start,
    /// Explicit page number.
    Index(u64),
    /// Opaque continuation token taken from the previous response.
    Token(String),
}

impl Cursor {
    /// Query parameter value, `None` for the first page.
    pub fn query_value(&self) -> Option<String> {
        match self {
            Cursor::Start => None,
            Cursor::Index(n) => Some(n.to_string()),
            Cursor::Token(token) => Some(token.clone()),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Start => f.write_str("start"),
            Cursor::Index(n) => write!(f, "{}", n),
            Cursor::Token(token) => f.write_str(token),
        }
    }
}

/// A single page of decoded results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Cursor the page was fetched with.
    pub cursor: Cursor,
    /// Items in source order.
    pub items: Vec<JsonValue>,
    /// Whether the source reports further pages.
    pub has_more: bool,
    /// Continuation token embedded in the response.
    pub next_cursor: Option<String>,
    /// Total item count, if the source declares one.
    pub total: Option<u64>,
}

impl Page {
    /// Creates a new page.
    pub fn new(cursor: Cursor, items: Vec<JsonValue>, has_more: bool) -> Self {
        Self {
            cursor,
            items,
            has_more,
            next_cursor: None,
            total: None,
        }
    }

    /// Sets the embedded continuation token.
    pub fn with_next_cursor(mut self, next_cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(next_cursor.into());
        self
    }

    /// Sets the declared total.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<JsonValue> {
        self.items
    }
}

impl IntoIterator for Page {
    type Item = JsonValue;
    type IntoIter = std::vec::IntoIter<JsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Derives the cursor of the next page.
///
/// Only consulted when the fetched page reports `has_more`. Returning `None`
/// ends the traversal.
pub trait AdvanceRule: Send + Sync {
    fn next(&self, current: &Cursor, page: &Page) -> Option<Cursor>;
}

/// Page-number pagination. [`Cursor::Start`] stands for page `first`.
#[derive(Debug, Clone, Copy)]
pub struct PageNumber {
    pub first: u64,
}

impl PageNumber {
    pub fn new(first: u64) -> Self {
        Self { first }
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self { first: 1 }
    }
}

impl AdvanceRule for PageNumber {
    fn next(&self, current: &Cursor, _page: &Page) -> Option<Cursor> {
        match current {
            Cursor::Start => Some(Cursor::Index(self.first + 1)),
            Cursor::Index(n) => Some(Cursor::Index(n + 1)),
            Cursor::Token(_) => None,
        }
    }
}

/// Cursor pagination through the page's embedded continuation token.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCursor;

impl AdvanceRule for EmbeddedCursor {
    fn next(&self, _current: &Cursor, page: &Page) -> Option<Cursor> {
        page.next_cursor.clone().map(Cursor::Token)
    }
}

impl<F> AdvanceRule for F
where
    F: Fn(&Cursor, &Page) -> Option<Cursor> + Send + Sync,
{
    fn next(&self, current: &Cursor, page: &Page) -> Option<Cursor> {
        self(current, page)
    }
}

/// Lazy page sequence.
///
/// Nothing is fetched until [`next_page`](Self::next_page) is awaited or the
/// stream is polled. Dropping the paginator abandons the traversal.
pub struct Paginator<F> {
    fetch: F,
    rule: Box<dyn AdvanceRule>,
    initial: Cursor,
    next: Option<Cursor>,
    items_seen: u64,
    pages_fetched: usize,
    max_pages: Option<usize>,
}

impl<F, Fut> Paginator<F>
where
    F: FnMut(Cursor) -> Fut,
    Fut: Future<Output = ApiResult<Page>>,
{
    /// Create a paginator starting at `initial`.
    pub fn new(fetch: F, initial: Cursor, rule: impl AdvanceRule + 'static) -> Self {
        Self {
            fetch,
            rule: Box::new(rule),
            next: Some(initial.clone()),
            initial,
            items_seen: 0,
            pages_fetched: 0,
            max_pages: None,
        }
    }

    /// Stop after `max_pages` pages even if the source reports more.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Fetch the next page; `None` once the sequence has ended.
    pub async fn next_page(&mut self) -> Option<ApiResult<Page>> {
        if self
            .max_pages
            .is_some_and(|max| self.pages_fetched >= max)
        {
            if self.next.take().is_some() {
                debug!(pages = self.pages_fetched, "Page limit reached");
            }
            return None;
        }

        let cursor = self.next.take()?;

        let page = match (self.fetch)(cursor.clone()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(cursor = %cursor, error = %e, "Page fetch failed");
                return Some(Err(ApiError::Pagination {
                    cursor: cursor.to_string(),
                    source: Box::new(e),
                }));
            }
        };

        self.pages_fetched += 1;
        self.items_seen += page.items.len() as u64;

        let total_reached = page.total.is_some_and(|total| self.items_seen >= total);
        self.next = if page.has_more && !total_reached {
            self.rule.next(&cursor, &page)
        } else {
            None
        };

        if self.next.as_ref() == Some(&cursor) {
            warn!(cursor = %cursor, "Advance rule repeated the current cursor, stopping");
            self.next = None;
        }

        debug!(
            cursor = %cursor,
            items = page.items.len(),
            items_seen = self.items_seen,
            has_next = self.next.is_some(),
            "Fetched page"
        );
        Some(Ok(page))
    }

    /// Rewind to the initial cursor.
    pub fn restart(&mut self) {
        self.next = Some(self.initial.clone());
        self.items_seen = 0;
        self.pages_fetched = 0;
    }

    /// Items returned so far.
    pub fn items_seen(&self) -> u64 {
        self.items_seen
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the sequence has ended.
    pub fn is_finished(&self) -> bool {
        self.next.is_none()
            || self
                .max_pages
                .is_some_and(|max| self.pages_fetched >= max)
    }

    /// Fetch every remaining page and concatenate their items.
    pub async fn collect_all(mut self) -> ApiResult<Vec<JsonValue>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }

    /// Pages as a lazy stream.
    pub fn into_stream(self) -> impl Stream<Item = ApiResult<Page>> {
        stream::unfold(self, |mut paginator| async move {
            paginator
                .next_page()
                .await
                .map(|page| (page, paginator))
        })
    }

    /// Items across all pages as a lazy stream, in source order.
    pub fn into_items(self) -> impl Stream<Item = ApiResult<JsonValue>> {
        self.into_stream().flat_map(|page| {
            let items: Vec<ApiResult<JsonValue>> = match page {
                Ok(page) => page.items.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
    }
}

impl<F> fmt::Debug for Paginator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("initial", &self.initial)
            .field("next", &self.next)
            .field("items_seen", &self.items_seen)
            .field("pages_fetched", &self.pages_fetched)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}
