/// --- Shell ---
pub const APP_TITLE: &str = "Infinite Feed";
pub const APP_SUBTITLE: &str = "Feed v0.1.0";

/// --- Pagination ---
pub const INITIAL_PAGE: u32 = 1;

/// --- Viewport Observation ---
pub const OBSERVER_ROOT_MARGIN: &str = "0px";
pub const OBSERVER_THRESHOLD: f64 = 0.0;
pub const SENTINEL_ATTR: &str = "data-sentinel-id";

/// --- Demo Feed ---
pub const DEMO_PAGE_SIZE: usize = 20;
pub const DEMO_TOTAL_PAGES: u32 = 6;
pub const DEMO_LATENCY_MS: u32 = 400;
pub const DEMO_FAILURE_RATE: f64 = 0.05;

/// Endpoint serving `{ "data": [...] }` pages; the simulated source is used when unset.
pub const FEED_ENDPOINT: Option<&str> = None;
