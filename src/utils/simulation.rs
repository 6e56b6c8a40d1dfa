use crate::config::{DEMO_FAILURE_RATE, DEMO_LATENCY_MS, DEMO_PAGE_SIZE, DEMO_TOTAL_PAGES};
use crate::error::FeedError;
use crate::query::PageResponse;
use gloo_timers::future::TimeoutFuture;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u32,
    pub title: String,
    pub body: String,
}

const BODIES: &[&str] = &[
    "Sensor array calibrated, readings within tolerance.",
    "Firmware update rolled out to the second batch of devices.",
    "Voltage fluctuation detected on the east rack, investigating.",
    "Nightly export finished without errors.",
    "New dashboard widgets are available for early testing.",
];

/// Deterministic page of demo posts. Pages past the last one are empty.
pub fn build_page(page: u32) -> PageResponse<Post> {
    if page == 0 || page > DEMO_TOTAL_PAGES {
        return PageResponse { data: Vec::new() };
    }

    let first = (page - 1) * DEMO_PAGE_SIZE as u32 + 1;
    let data = (first..first + DEMO_PAGE_SIZE as u32)
        .map(|id| Post {
            id,
            title: format!("Post #{}", id),
            body: BODIES[id as usize % BODIES.len()].to_string(),
        })
        .collect();

    PageResponse { data }
}

/// Serves [`build_page`] with network-like latency and the odd failure.
pub async fn fetch_posts(page: u32) -> Result<PageResponse<Post>, FeedError> {
    TimeoutFuture::new(DEMO_LATENCY_MS).await;

    if js_sys::Math::random() < DEMO_FAILURE_RATE {
        return Err(FeedError::Fetch(format!(
            "simulated network failure on page {}",
            page
        )));
    }
    Ok(build_page(page))
}
