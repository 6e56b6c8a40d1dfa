use super::{SentinelId, ViewportObserver};
use crate::config::{OBSERVER_ROOT_MARGIN, OBSERVER_THRESHOLD, SENTINEL_ATTR};
use crate::error::FeedError;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    pub root_margin: String,
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: OBSERVER_ROOT_MARGIN.to_string(),
            threshold: OBSERVER_THRESHOLD,
        }
    }
}

type EntriesCallback = Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>;

/// `IntersectionObserver` relative to the browser viewport.
///
/// Each observed element carries its [`SentinelId`] in a data attribute so
/// entries can be routed back. The observer is disconnected on drop.
pub struct IntersectionWatcher {
    observer: IntersectionObserver,
    targets: HashMap<SentinelId, Element>,
    _callback: EntriesCallback,
}

impl IntersectionWatcher {
    pub fn new(
        options: &ObserverOptions,
        mut on_entry: impl FnMut(SentinelId, bool) + 'static,
    ) -> Result<Self, FeedError> {
        let callback = Closure::wrap(Box::new(
            move |entries: js_sys::Array, _observer: IntersectionObserver| {
                for entry in entries.iter() {
                    let entry: IntersectionObserverEntry = entry.unchecked_into();
                    if let Some(id) = sentinel_id(&entry.target()) {
                        on_entry(id, entry.is_intersecting());
                    }
                }
            },
        ) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&options.root_margin);
        init.set_threshold(&JsValue::from_f64(options.threshold));

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;

        Ok(Self {
            observer,
            targets: HashMap::new(),
            _callback: callback,
        })
    }
}

fn sentinel_id(element: &Element) -> Option<SentinelId> {
    element
        .get_attribute(SENTINEL_ATTR)?
        .parse::<u64>()
        .ok()
        .map(SentinelId)
}

impl ViewportObserver for IntersectionWatcher {
    type Target = Element;

    fn sentinel_of(target: &Element) -> Option<SentinelId> {
        sentinel_id(target)
    }

    fn observe(&mut self, id: SentinelId, target: &Element) {
        if let Err(e) = target.set_attribute(SENTINEL_ATTR, &id.0.to_string()) {
            web_sys::console::error_1(&e);
            return;
        }
        self.observer.observe(target);
        self.targets.insert(id, target.clone());
    }

    fn unobserve(&mut self, id: SentinelId) {
        if let Some(target) = self.targets.remove(&id) {
            self.observer.unobserve(&target);
        }
    }

    fn disconnect(&mut self) {
        self.observer.disconnect();
        self.targets.clear();
    }
}

impl Drop for IntersectionWatcher {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
