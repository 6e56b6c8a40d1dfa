use crate::config::INITIAL_PAGE;
use crate::error::FeedError;
use serde::{Deserialize, Serialize};

/// Payload returned by a page fetch function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub data: Vec<T>,
}

/// One fetched page, tagged with the page number it was requested for.
#[derive(Clone, Debug, PartialEq)]
pub struct PageResult<T> {
    pub page: u32,
    pub items: Vec<T>,
}

/// Pages accumulated for one query key, in ascending page order.
#[derive(Clone, Debug, PartialEq)]
pub struct InfiniteData<T> {
    pub pages: Vec<PageResult<T>>,
}

impl<T> Default for InfiniteData<T> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<T: Clone> InfiniteData<T> {
    pub fn flatten(&self) -> Vec<T> {
        self.pages
            .iter()
            .flat_map(|p| p.items.iter().cloned())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

/// Cache entry for one infinite query.
pub struct InfiniteQuery<T> {
    data: InfiniteData<T>,
    in_flight: Option<u32>,
    error: Option<FeedError>,
    exhausted: bool,
}

impl<T> Default for InfiniteQuery<T> {
    fn default() -> Self {
        Self {
            data: InfiniteData::default(),
            in_flight: None,
            error: None,
            exhausted: false,
        }
    }
}

impl<T> InfiniteQuery<T> {
    pub fn data(&self) -> &InfiniteData<T> {
        &self.data
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_next_page(&self) -> bool {
        !self.exhausted
    }

    pub fn status(&self) -> QueryStatus {
        if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.pages.is_empty() {
            QueryStatus::Pending
        } else {
            QueryStatus::Success
        }
    }

    pub fn next_page(&self) -> Option<u32> {
        if self.exhausted {
            return None;
        }
        Some(
            self.data
                .pages
                .last()
                .map_or(INITIAL_PAGE, |last| last.page + 1),
        )
    }

    /// Marks the next page as in flight. Returns `None` if a fetch is already
    /// running or the list is complete.
    pub fn begin(&mut self) -> Option<u32> {
        if self.in_flight.is_some() {
            return None;
        }
        let page = self.next_page()?;
        self.in_flight = Some(page);
        Some(page)
    }

    /// Stores the outcome of the fetch started by [`begin`](Self::begin).
    /// Results for a page that is not in flight are ignored.
    pub fn settle(&mut self, page: u32, result: Result<Vec<T>, FeedError>) -> bool {
        if self.in_flight != Some(page) {
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(items) => {
                self.error = None;
                if items.is_empty() {
                    self.exhausted = true;
                }
                self.data.pages.push(PageResult { page, items });
            }
            Err(e) => self.error = Some(e),
        }
        true
    }

    /// Releases `page` without a result so it can be requested again.
    pub fn abandon(&mut self, page: u32) -> bool {
        if self.in_flight != Some(page) {
            return false;
        }
        self.in_flight = None;
        true
    }
}
