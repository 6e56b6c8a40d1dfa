use super::infinite::{InfiniteQuery, PageResponse, QueryStatus};
use super::key::QueryKey;
use crate::error::FeedError;
use dioxus::logger::tracing::{debug, warn};
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

pub type PageFuture<T> = LocalBoxFuture<'static, Result<PageResponse<T>, FeedError>>;

/// Caller-supplied function mapping a 1-based page number to a page request.
pub struct PageFetcher<T>(Rc<dyn Fn(u32) -> PageFuture<T>>);

impl<T> Clone for PageFetcher<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> PageFetcher<T> {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(u32) -> Fut + 'static,
        Fut: Future<Output = Result<PageResponse<T>, FeedError>> + 'static,
    {
        Self(Rc::new(move |page| fetch(page).boxed_local()))
    }

    pub fn call(&self, page: u32) -> PageFuture<T> {
        (self.0)(page)
    }
}

struct Slot {
    generation: u64,
    query: Box<dyn Any>,
}

#[derive(Default)]
struct ClientInner {
    entries: RefCell<HashMap<QueryKey, Slot>>,
    listeners: RefCell<HashMap<QueryKey, Vec<(u64, Rc<dyn Fn()>)>>>,
    next_id: Cell<u64>,
}

impl ClientInner {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

/// Shared store of infinite queries, keyed by [`QueryKey`].
///
/// Cloning yields another handle to the same store. Entries are created on
/// first fetch and live until invalidated.
#[derive(Clone, Default)]
pub struct QueryClient {
    inner: Rc<ClientInner>,
}

impl PartialEq for QueryClient {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A page marked in flight. Dropping it before [`complete`](Self::complete)
/// releases the slot so the page can be requested again.
struct PendingPage<T: 'static> {
    client: QueryClient,
    key: QueryKey,
    generation: u64,
    page: u32,
    settled: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: 'static> PendingPage<T> {
    fn complete(mut self, result: Result<Vec<T>, FeedError>) {
        self.settled = true;
        self.client
            .settle(&self.key, self.generation, self.page, result);
    }
}

impl<T: 'static> Drop for PendingPage<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.client
                .abandon::<T>(&self.key, self.generation, self.page);
        }
    }
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_query<T: 'static, R>(
        &self,
        key: &QueryKey,
        f: impl FnOnce(&InfiniteQuery<T>) -> R,
    ) -> Option<R> {
        let entries = self.inner.entries.borrow();
        let slot = entries.get(key)?;
        slot.query.downcast_ref::<InfiniteQuery<T>>().map(f)
    }

    fn with_query_mut<T: 'static, R>(
        &self,
        key: &QueryKey,
        f: impl FnOnce(&mut InfiniteQuery<T>) -> R,
    ) -> Result<(R, u64), FeedError> {
        let mut entries = self.inner.entries.borrow_mut();
        let slot = entries.entry(key.clone()).or_insert_with(|| Slot {
            generation: self.inner.next_id(),
            query: Box::new(InfiniteQuery::<T>::default()),
        });
        let generation = slot.generation;
        slot.query
            .downcast_mut::<InfiniteQuery<T>>()
            .map(|q| (f(q), generation))
            .ok_or_else(|| FeedError::KeyConflict(key.to_string()))
    }

    /// Runs `f` on the entry of `key` if it still belongs to `generation`.
    fn with_generation<T: 'static>(
        &self,
        key: &QueryKey,
        generation: u64,
        f: impl FnOnce(&mut InfiniteQuery<T>) -> bool,
    ) -> bool {
        let mut entries = self.inner.entries.borrow_mut();
        match entries.get_mut(key) {
            Some(slot) if slot.generation == generation => slot
                .query
                .downcast_mut::<InfiniteQuery<T>>()
                .is_some_and(f),
            _ => false,
        }
    }

    /// Items of every cached page for `key`, in page order.
    pub fn items<T: Clone + 'static>(&self, key: &QueryKey) -> Vec<T> {
        self.with_query::<T, _>(key, |q| q.data().flatten())
            .unwrap_or_default()
    }

    pub fn is_fetching<T: 'static>(&self, key: &QueryKey) -> bool {
        self.with_query::<T, _>(key, |q| q.is_fetching())
            .unwrap_or(false)
    }

    pub fn has_next_page<T: 'static>(&self, key: &QueryKey) -> bool {
        self.with_query::<T, _>(key, |q| q.has_next_page())
            .unwrap_or(true)
    }

    pub fn error<T: 'static>(&self, key: &QueryKey) -> Option<FeedError> {
        self.with_query::<T, _>(key, |q| q.error().cloned())
            .flatten()
    }

    pub fn status<T: 'static>(&self, key: &QueryKey) -> QueryStatus {
        self.with_query::<T, _>(key, |q| q.status())
            .unwrap_or(QueryStatus::Pending)
    }

    /// Starts fetching the next page of `key` and returns the future that
    /// completes the request. Returns `None` when a request for `key` is
    /// already in flight or the list is complete.
    pub fn fetch_next_page<T: 'static>(
        &self,
        key: &QueryKey,
        fetcher: &PageFetcher<T>,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        let (page, generation) = match self.with_query_mut::<T, _>(key, |q| q.begin()) {
            Ok((Some(page), generation)) => (page, generation),
            Ok((None, _)) => return None,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        debug!(%key, page, "fetching page");
        self.notify(key);

        let pending = PendingPage::<T> {
            client: self.clone(),
            key: key.clone(),
            generation,
            page,
            settled: false,
            _item: PhantomData,
        };
        let request = fetcher.call(page);
        Some(
            async move {
                let result = request.await.map(|res| res.data);
                pending.complete(result);
            }
            .boxed_local(),
        )
    }

    /// Like [`fetch_next_page`](Self::fetch_next_page), but only when nothing
    /// has been loaded for `key` yet and the last attempt did not fail.
    pub fn ensure_first_page<T: 'static>(
        &self,
        key: &QueryKey,
        fetcher: &PageFetcher<T>,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        let idle = self
            .with_query::<T, _>(key, |q| {
                q.data().pages.is_empty() && !q.is_fetching() && q.error().is_none()
            })
            .unwrap_or(true);
        if !idle {
            return None;
        }
        self.fetch_next_page(key, fetcher)
    }

    fn settle<T: 'static>(
        &self,
        key: &QueryKey,
        generation: u64,
        page: u32,
        result: Result<Vec<T>, FeedError>,
    ) {
        if let Err(e) = &result {
            warn!(%key, page, "page fetch failed: {}", e);
        }

        if self.with_generation::<T>(key, generation, |q| q.settle(page, result)) {
            self.notify(key);
        } else {
            debug!(%key, page, "discarding result for invalidated query");
        }
    }

    fn abandon<T: 'static>(&self, key: &QueryKey, generation: u64, page: u32) {
        if self.with_generation::<T>(key, generation, |q| q.abandon(page)) {
            debug!(%key, page, "request dropped before completion");
            self.notify(key);
        }
    }

    /// Drops every cached page of `key`. Requests still in flight for it are
    /// discarded when they resolve.
    pub fn invalidate(&self, key: &QueryKey) {
        let removed = self.inner.entries.borrow_mut().remove(key).is_some();
        if removed {
            self.notify(key);
        }
    }

    /// Registers `listener` to run after every state change of `key`.
    pub fn subscribe(&self, key: &QueryKey, listener: Rc<dyn Fn()>) -> Subscription {
        let id = self.inner.next_id();
        self.inner
            .listeners
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push((id, listener));

        Subscription {
            inner: Rc::downgrade(&self.inner),
            key: key.clone(),
            id,
        }
    }

    fn notify(&self, key: &QueryKey) {
        // Listeners may call back into the client, so release the borrow first
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .listeners
            .borrow()
            .get(key)
            .map(|l| l.iter().map(|(_, f)| f.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener();
        }
    }
}

/// Keeps a listener registered until dropped.
pub struct Subscription {
    inner: Weak<ClientInner>,
    key: QueryKey,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut listeners = inner.listeners.borrow_mut();
            if let Some(list) = listeners.get_mut(&self.key) {
                list.retain(|(id, _)| *id != self.id);
                if list.is_empty() {
                    listeners.remove(&self.key);
                }
            }
        }
    }
}
