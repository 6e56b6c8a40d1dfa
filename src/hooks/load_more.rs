use crate::error::FeedError;
use crate::query::{PageFetcher, PageResponse, QueryClient, QueryKey, QueryStatus, Subscription};
use crate::viewport::{
    IntersectionWatcher, ObserverOptions, SentinelId, SentinelState, SentinelTracker,
    ViewportObserver,
};
use dioxus::core::schedule_update;
use dioxus::logger::tracing::{debug, warn};
use dioxus::prelude::*;
use futures_util::future::LocalBoxFuture;
use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

#[derive(Clone, Debug, PartialEq)]
pub struct LoadMoreOptions {
    /// When false the viewport observer is torn down and the first page is
    /// not requested automatically. Loaded pages are kept.
    pub enabled: bool,
    /// Changing these rebuilds the observer and re-observes pending sentinels.
    pub observer: ObserverOptions,
}

impl Default for LoadMoreOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            observer: ObserverOptions::default(),
        }
    }
}

type ObserverFactory<O> = Box<dyn Fn(&ObserverOptions) -> Option<O>>;

/// Infinite-scroll state for one list: ties a query in the shared cache to
/// the sentinels that request its next page.
pub struct LoadMoreCore<T: 'static, O: ViewportObserver> {
    client: QueryClient,
    key: QueryKey,
    fetcher: PageFetcher<T>,
    tracker: SentinelTracker,
    // Idle or Observing sentinels only
    targets: Vec<(SentinelId, O::Target)>,
    observer: Option<O>,
    observer_options: ObserverOptions,
    make_observer: ObserverFactory<O>,
    on_change: Rc<dyn Fn()>,
    _subscription: Subscription,
}

impl<T: Clone + 'static, O: ViewportObserver> LoadMoreCore<T, O> {
    pub fn new(
        client: QueryClient,
        key: QueryKey,
        fetcher: PageFetcher<T>,
        options: &LoadMoreOptions,
        make_observer: ObserverFactory<O>,
        on_change: Rc<dyn Fn()>,
    ) -> Self {
        let subscription = client.subscribe(&key, on_change.clone());
        let observer = if options.enabled {
            make_observer(&options.observer)
        } else {
            None
        };

        Self {
            client,
            key,
            fetcher,
            tracker: SentinelTracker::new(options.enabled),
            targets: Vec::new(),
            observer,
            observer_options: options.observer.clone(),
            make_observer,
            on_change,
            _subscription: subscription,
        }
    }

    pub fn data(&self) -> Vec<T> {
        self.client.items::<T>(&self.key)
    }

    pub fn is_fetching(&self) -> bool {
        self.client.is_fetching::<T>(&self.key)
    }

    pub fn has_next_page(&self) -> bool {
        self.client.has_next_page::<T>(&self.key)
    }

    pub fn error(&self) -> Option<FeedError> {
        self.client.error::<T>(&self.key)
    }

    pub fn status(&self) -> QueryStatus {
        self.client.status::<T>(&self.key)
    }

    pub fn set_fetcher(&mut self, fetcher: PageFetcher<T>) {
        self.fetcher = fetcher;
    }

    /// Switches to another list. Sentinels of the previous list are dropped.
    pub fn set_key(&mut self, key: QueryKey) {
        if key == self.key {
            return;
        }
        debug!(from = %self.key, to = %key, "query key changed");

        if let Some(observer) = self.observer.as_mut() {
            for id in self.tracker.observing() {
                observer.unobserve(id);
            }
        }
        self.tracker.reset();
        self.targets.clear();
        self._subscription = self.client.subscribe(&key, self.on_change.clone());
        self.key = key;
    }

    /// Applies options from the latest render. New viewport options take
    /// effect immediately when observing, otherwise on the next enable.
    pub fn set_options(&mut self, options: &LoadMoreOptions) {
        let changed = options.observer != self.observer_options;
        self.observer_options = options.observer.clone();
        if changed && options.enabled && self.tracker.is_enabled() {
            self.rebuild_observer();
        }
        self.set_enabled(options.enabled);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.tracker.is_enabled() {
            return;
        }

        if enabled {
            self.observer = (self.make_observer)(&self.observer_options);
            let ids = self.tracker.enable();
            self.observe_all(&ids);
        } else {
            self.tracker.disable();
            if let Some(mut observer) = self.observer.take() {
                observer.disconnect();
            }
        }
    }

    /// Registers a rendered sentinel element. An element seen before keeps
    /// its id and is never observed a second time.
    pub fn attach(&mut self, target: O::Target) -> SentinelId {
        self.sync();
        let known = O::sentinel_of(&target)
            .filter(|id| self.tracker.state(*id).is_some())
            .or_else(|| {
                self.targets
                    .iter()
                    .find(|(_, t)| *t == target)
                    .map(|(id, _)| *id)
            });
        if let Some(id) = known {
            return id;
        }

        let id = self.tracker.register();
        match self.tracker.state(id) {
            Some(SentinelState::Observing) => {
                if let Some(observer) = self.observer.as_mut() {
                    observer.observe(id, &target);
                }
                self.targets.push((id, target));
            }
            Some(SentinelState::Idle) => self.targets.push((id, target)),
            _ => {}
        }
        id
    }

    /// Handles an observer report for `id`. Returns the page request to run
    /// when the sentinel fires.
    pub fn on_intersection(
        &mut self,
        id: SentinelId,
        is_intersecting: bool,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        self.sync();
        if !self.tracker.on_intersection(id, is_intersecting) {
            return None;
        }

        if let Some(observer) = self.observer.as_mut() {
            observer.unobserve(id);
        }
        self.targets.retain(|(target_id, _)| *target_id != id);
        self.client.fetch_next_page(&self.key, &self.fetcher)
    }

    pub fn fetch_next_page(&mut self) -> Option<LocalBoxFuture<'static, ()>> {
        self.sync();
        self.client.fetch_next_page(&self.key, &self.fetcher)
    }

    /// Requests the first page when enabled and nothing is loaded yet.
    pub fn start(&self) -> Option<LocalBoxFuture<'static, ()>> {
        if !self.tracker.is_enabled() {
            return None;
        }
        self.client.ensure_first_page(&self.key, &self.fetcher)
    }

    /// Follows the cache's end-of-list flag: retires pending sentinels once
    /// the list is complete and resumes after the list was invalidated.
    pub fn sync(&mut self) {
        let has_next_page = self.client.has_next_page::<T>(&self.key);
        if has_next_page == !self.tracker.is_exhausted() {
            return;
        }

        if has_next_page {
            debug!(key = %self.key, "list reset, resuming pagination");
            self.tracker.revive();
            return;
        }

        let ids = self.tracker.exhaust();
        if let Some(observer) = self.observer.as_mut() {
            for id in ids {
                observer.unobserve(id);
            }
        }
        self.targets.clear();
    }

    fn rebuild_observer(&mut self) {
        debug!(key = %self.key, "viewport options changed, rebuilding observer");
        if let Some(mut observer) = self.observer.take() {
            observer.disconnect();
        }
        self.observer = (self.make_observer)(&self.observer_options);
        let ids = self.tracker.observing();
        self.observe_all(&ids);
    }

    fn observe_all(&mut self, ids: &[SentinelId]) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        for (id, target) in self.targets.iter().filter(|(id, _)| ids.contains(id)) {
            observer.observe(*id, target);
        }
    }
}

#[cfg(test)]
impl<T: Clone + 'static, O: ViewportObserver> LoadMoreCore<T, O> {
    fn key(&self) -> &QueryKey {
        &self.key
    }

    fn sentinel_state(&self, id: SentinelId) -> Option<SentinelState> {
        self.tracker.state(id)
    }
}

impl<T: 'static, O: ViewportObserver> Drop for LoadMoreCore<T, O> {
    fn drop(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.disconnect();
        }
    }
}

pub struct LoadMore<T> {
    pub data: Vec<T>,
    pub status: QueryStatus,
    pub is_fetching: bool,
    pub has_next_page: bool,
    pub error: Option<FeedError>,
    /// Attach with `onmounted` on the element whose visibility loads more.
    pub node_ref: EventHandler<MountedEvent>,
    pub fetch_next_page: Callback<()>,
}

type WebCore<T> = Rc<RefCell<LoadMoreCore<T, IntersectionWatcher>>>;

/// Paginated list that loads its next page when the sentinel element bound
/// through `node_ref` scrolls into view. Pages are cached in the
/// [`QueryClient`] from context under `key`.
///
/// Page requests run detached from the component, so a screen unmounted
/// mid-request still stores the page.
pub fn use_load_more<T, F, Fut>(key: QueryKey, fetch_fn: F, options: LoadMoreOptions) -> LoadMore<T>
where
    T: Clone + 'static,
    F: Fn(u32) -> Fut + 'static,
    Fut: Future<Output = Result<PageResponse<T>, FeedError>> + 'static,
{
    let client = use_context::<QueryClient>();
    let fetcher = PageFetcher::new(fetch_fn);

    let core: WebCore<T> = use_hook(|| {
        let update = schedule_update();
        let on_change: Rc<dyn Fn()> = Rc::new(move || update());
        let initial_key = key.clone();

        Rc::new_cyclic(|weak: &Weak<RefCell<LoadMoreCore<T, IntersectionWatcher>>>| {
            let weak = weak.clone();
            let make_observer: ObserverFactory<IntersectionWatcher> =
                Box::new(move |observer_options: &ObserverOptions| {
                    let weak = weak.clone();
                    IntersectionWatcher::new(observer_options, move |id, is_intersecting| {
                        let Some(core) = weak.upgrade() else {
                            return;
                        };
                        let request = core.borrow_mut().on_intersection(id, is_intersecting);
                        if let Some(request) = request {
                            wasm_bindgen_futures::spawn_local(request);
                        }
                    })
                    .map_err(|e| warn!("failed to create viewport observer: {}", e))
                    .ok()
                });

            RefCell::new(LoadMoreCore::new(
                client.clone(),
                initial_key,
                fetcher.clone(),
                &options,
                make_observer,
                on_change,
            ))
        })
    });

    let snapshot = {
        let mut c = core.borrow_mut();
        c.set_key(key);
        c.set_fetcher(fetcher);
        c.set_options(&options);
        c.sync();
        if let Some(request) = c.start() {
            wasm_bindgen_futures::spawn_local(request);
        }
        (
            c.data(),
            c.status(),
            c.is_fetching(),
            c.has_next_page(),
            c.error(),
        )
    };
    let (data, status, is_fetching, has_next_page, error) = snapshot;

    let attach_core = core.clone();
    let node_ref = use_callback(move |evt: MountedEvent| {
        match evt.data().downcast::<web_sys::Element>() {
            Some(element) => {
                attach_core.borrow_mut().attach(element.clone());
            }
            None => warn!("sentinel is not a DOM element"),
        }
    });

    let fetch_core = core.clone();
    let fetch_next_page = use_callback(move |_: ()| {
        let request = fetch_core.borrow_mut().fetch_next_page();
        if let Some(request) = request {
            wasm_bindgen_futures::spawn_local(request);
        }
    });

    LoadMore {
        data,
        status,
        is_fetching,
        has_next_page,
        error,
        node_ref,
        fetch_next_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_key;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Observe(SentinelId, u32),
        Unobserve(SentinelId),
        Disconnect,
    }

    /// Stands in for a DOM node: equal by name, tagged when observed.
    #[derive(Clone, Debug)]
    struct FakeElement {
        name: u32,
        tag: Rc<Cell<Option<SentinelId>>>,
    }

    impl PartialEq for FakeElement {
        fn eq(&self, other: &Self) -> bool {
            self.name == other.name
        }
    }

    struct RecordingObserver {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl ViewportObserver for RecordingObserver {
        type Target = FakeElement;

        fn sentinel_of(target: &FakeElement) -> Option<SentinelId> {
            target.tag.get()
        }

        fn observe(&mut self, id: SentinelId, target: &FakeElement) {
            target.tag.set(Some(id));
            self.calls.borrow_mut().push(Call::Observe(id, target.name));
        }

        fn unobserve(&mut self, id: SentinelId) {
            self.calls.borrow_mut().push(Call::Unobserve(id));
        }

        fn disconnect(&mut self) {
            self.calls.borrow_mut().push(Call::Disconnect);
        }
    }

    struct Harness {
        core: LoadMoreCore<String, RecordingObserver>,
        calls: Rc<RefCell<Vec<Call>>>,
        fetches: Rc<Cell<u32>>,
        observers: Rc<RefCell<Vec<ObserverOptions>>>,
        changes: Rc<Cell<u32>>,
        elements: HashMap<u32, FakeElement>,
    }

    impl Harness {
        /// Mounts the element called `name`, reusing the node if it exists.
        fn attach(&mut self, name: u32) -> SentinelId {
            let element = self
                .elements
                .entry(name)
                .or_insert_with(|| FakeElement {
                    name,
                    tag: Rc::new(Cell::new(None)),
                })
                .clone();
            self.core.attach(element)
        }

        fn observe_count(&self, name: u32) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| matches!(c, Call::Observe(_, n) if *n == name))
                .count()
        }

        fn observers_created(&self) -> usize {
            self.observers.borrow().len()
        }
    }

    // Pages 1 and 2 hold two items each, page 3 is empty.
    fn two_page_fetcher(fetches: Rc<Cell<u32>>) -> PageFetcher<String> {
        PageFetcher::new(move |page| {
            fetches.set(fetches.get() + 1);
            async move {
                let data = if page <= 2 {
                    vec![format!("item-{}-1", page), format!("item-{}-2", page)]
                } else {
                    Vec::new()
                };
                Ok(PageResponse { data })
            }
        })
    }

    fn harness(client: QueryClient, key: QueryKey, enabled: bool) -> Harness {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let fetches = Rc::new(Cell::new(0));
        let observers = Rc::new(RefCell::new(Vec::new()));
        let changes = Rc::new(Cell::new(0));

        let factory_calls = calls.clone();
        let factory_log = observers.clone();
        let make_observer: ObserverFactory<RecordingObserver> =
            Box::new(move |options: &ObserverOptions| {
                factory_log.borrow_mut().push(options.clone());
                Some(RecordingObserver {
                    calls: factory_calls.clone(),
                })
            });
        let change_count = changes.clone();

        let options = LoadMoreOptions {
            enabled,
            ..LoadMoreOptions::default()
        };
        let core = LoadMoreCore::new(
            client,
            key,
            two_page_fetcher(fetches.clone()),
            &options,
            make_observer,
            Rc::new(move || change_count.set(change_count.get() + 1)),
        );

        Harness {
            core,
            calls,
            fetches,
            observers,
            changes,
            elements: HashMap::new(),
        }
    }

    #[test]
    fn test_scroll_to_end() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], true);
        assert!(h.core.data().is_empty());
        assert_eq!(h.core.status(), QueryStatus::Pending);

        block_on(h.core.start().unwrap());
        assert!(h.core.start().is_none());
        assert_eq!(h.core.status(), QueryStatus::Success);

        // each new last item becomes the sentinel
        for name in [1, 2] {
            let id = h.attach(name);
            block_on(h.core.on_intersection(id, true).unwrap());
            assert_eq!(h.core.sentinel_state(id), Some(SentinelState::Triggered));
        }

        assert_eq!(
            h.core.data(),
            vec!["item-1-1", "item-1-2", "item-2-1", "item-2-2"]
        );
        assert!(!h.core.has_next_page());

        let last = h.attach(3);
        assert_eq!(h.core.sentinel_state(last), Some(SentinelState::Exhausted));
        assert_eq!(h.observe_count(3), 0);
        assert!(h.core.on_intersection(last, true).is_none());
        assert!(h.core.fetch_next_page().is_none());
        assert_eq!(h.fetches.get(), 3);
        assert!(h.changes.get() > 0);
    }

    #[test]
    fn test_one_fetch_per_sentinel() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], true);
        block_on(h.core.start().unwrap());

        let id = h.attach(7);
        assert!(h.core.on_intersection(id, false).is_none());
        assert_eq!(h.core.sentinel_state(id), Some(SentinelState::Observing));

        block_on(h.core.on_intersection(id, true).unwrap());
        assert!(h.calls.borrow().contains(&Call::Unobserve(id)));
        assert!(h.core.on_intersection(id, true).is_none());

        // remounting the same element neither re-registers nor re-observes it
        assert_eq!(h.attach(7), id);
        assert_eq!(h.observe_count(7), 1);
        assert_eq!(h.fetches.get(), 2);
    }

    #[test]
    fn test_finished_sentinels_are_released() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], true);
        block_on(h.core.start().unwrap());

        let fired = h.attach(1);
        let pending = h.attach(2);
        assert_eq!(h.core.targets.len(), 2);

        block_on(h.core.on_intersection(fired, true).unwrap());
        assert_eq!(h.core.targets.len(), 1);
        assert_eq!(h.core.targets[0].0, pending);

        // page 3 is empty
        block_on(h.core.fetch_next_page().unwrap());
        h.core.sync();
        assert!(h.core.targets.is_empty());
        assert!(h.calls.borrow().contains(&Call::Unobserve(pending)));
    }

    #[test]
    fn test_rapid_intersections_deduplicated() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], true);
        block_on(h.core.start().unwrap());

        let a = h.attach(1);
        let b = h.attach(2);
        let pending = h.core.on_intersection(a, true).unwrap();
        assert!(h.core.is_fetching());
        assert!(h.core.on_intersection(b, true).is_none());
        assert!(h.core.fetch_next_page().is_none());
        block_on(pending);

        assert_eq!(h.fetches.get(), 2);
        assert_eq!(h.core.data().len(), 4);
    }

    #[test]
    fn test_disable_keeps_data_and_enable_resumes() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], true);
        block_on(h.core.start().unwrap());
        let id = h.attach(1);

        h.core.set_enabled(false);
        assert!(h.calls.borrow().contains(&Call::Disconnect));
        assert_eq!(h.core.sentinel_state(id), Some(SentinelState::Idle));
        assert!(h.core.on_intersection(id, true).is_none());
        assert_eq!(h.core.data(), vec!["item-1-1", "item-1-2"]);

        h.core.set_enabled(true);
        assert_eq!(h.observers_created(), 2);
        assert_eq!(h.observe_count(1), 2);
        block_on(h.core.on_intersection(id, true).unwrap());
        assert_eq!(h.core.data().len(), 4);
    }

    #[test]
    fn test_disabled_does_not_start_or_observe() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], false);
        assert!(h.core.start().is_none());
        assert_eq!(h.observers_created(), 0);

        let id = h.attach(1);
        assert_eq!(h.core.sentinel_state(id), Some(SentinelState::Idle));
        assert!(h.calls.borrow().is_empty());

        // manual loading still works
        block_on(h.core.fetch_next_page().unwrap());
        assert_eq!(h.core.data().len(), 2);
    }

    #[test]
    fn test_viewport_options_rebuild_observer() {
        let mut h = harness(QueryClient::new(), query_key!["posts"], true);
        block_on(h.core.start().unwrap());
        let id = h.attach(1);

        let mut options = LoadMoreOptions::default();
        h.core.set_options(&options);
        assert_eq!(h.observers_created(), 1);

        options.observer.root_margin = "200px".to_string();
        h.core.set_options(&options);
        assert_eq!(h.observers_created(), 2);
        assert_eq!(h.observers.borrow()[1].root_margin, "200px");
        assert!(h.calls.borrow().contains(&Call::Disconnect));
        assert_eq!(h.observe_count(1), 2);

        // while disabled, new options wait for the next enable
        options.enabled = false;
        options.observer.threshold = 0.5;
        h.core.set_options(&options);
        assert_eq!(h.observers_created(), 2);

        options.enabled = true;
        h.core.set_options(&options);
        assert_eq!(h.observers_created(), 3);
        assert_eq!(h.observers.borrow()[2].threshold, 0.5);

        block_on(h.core.on_intersection(id, true).unwrap());
        assert_eq!(h.core.data().len(), 4);
    }

    #[test]
    fn test_invalidate_resumes_pagination() {
        let client = QueryClient::new();
        let key = query_key!["posts"];
        let mut h = harness(client.clone(), key.clone(), true);
        block_on(h.core.start().unwrap());
        for name in [1, 2] {
            let id = h.attach(name);
            block_on(h.core.on_intersection(id, true).unwrap());
        }
        let stale = h.attach(3);
        assert_eq!(h.core.sentinel_state(stale), Some(SentinelState::Exhausted));

        client.invalidate(&key);
        h.core.sync();
        assert!(h.core.has_next_page());
        assert_eq!(h.core.sentinel_state(stale), None);

        block_on(h.core.start().unwrap());
        assert_eq!(h.core.data(), vec!["item-1-1", "item-1-2"]);

        let fresh = h.attach(10);
        assert_eq!(h.core.sentinel_state(fresh), Some(SentinelState::Observing));
        assert_eq!(h.observe_count(10), 1);
        block_on(h.core.on_intersection(fresh, true).unwrap());
        assert_eq!(h.core.data().len(), 4);
        assert_eq!(h.fetches.get(), 5);
    }

    #[test]
    fn test_cancelled_request_releases_slot() {
        let client = QueryClient::new();
        let key = query_key!["posts"];

        let h = harness(client.clone(), key.clone(), true);
        let request = h.core.start().unwrap();
        assert!(h.core.is_fetching());
        // screen unmounted before the request ran
        drop(request);
        drop(h);

        let mut remount = harness(client, key, true);
        assert!(!remount.core.is_fetching());
        block_on(remount.core.start().unwrap());
        block_on(remount.core.fetch_next_page().unwrap());
        assert_eq!(remount.core.data().len(), 4);
    }

    #[test]
    fn test_independent_lists() {
        let client = QueryClient::new();
        let mut posts = harness(client.clone(), query_key!["posts"], true);
        let mut users = harness(client, query_key!["users"], true);

        block_on(posts.core.start().unwrap());
        for name in [1, 2] {
            let id = posts.attach(name);
            block_on(posts.core.on_intersection(id, true).unwrap());
        }
        block_on(users.core.start().unwrap());

        assert!(!posts.core.has_next_page());
        assert!(users.core.has_next_page());
        assert_eq!(posts.core.data().len(), 4);
        assert_eq!(users.core.data(), vec!["item-1-1", "item-1-2"]);
    }

    #[test]
    fn test_key_change_resets_sentinels() {
        let mut h = harness(QueryClient::new(), query_key!["posts", 1], true);
        block_on(h.core.start().unwrap());
        let old = h.attach(1);

        h.core.set_key(query_key!["posts", 2]);
        assert!(h.calls.borrow().contains(&Call::Unobserve(old)));
        assert_eq!(h.core.sentinel_state(old), None);
        assert!(h.core.targets.is_empty());
        assert!(h.core.data().is_empty());

        block_on(h.core.start().unwrap());
        assert_eq!(h.core.key(), &query_key!["posts", 2]);
        assert_eq!(h.core.data().len(), 2);
    }

    #[test]
    fn test_drop_disconnects() {
        let h = harness(QueryClient::new(), query_key!["posts"], true);
        let calls = h.calls.clone();
        drop(h);
        assert_eq!(calls.borrow().last(), Some(&Call::Disconnect));
    }
}
