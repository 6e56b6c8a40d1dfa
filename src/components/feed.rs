use super::app_shell::Screen;
use super::layout::with_main_layout;
use crate::config::FEED_ENDPOINT;
use crate::error::FeedError;
use crate::hooks::{use_load_more, LoadMoreOptions};
use crate::query::{PageResponse, QueryClient, QueryStatus};
use crate::query_key;
use crate::state::use_locale;
use crate::utils::http::{fetch_page_json, page_url};
use crate::utils::simulation::{self, Post};
use dioxus::prelude::*;

pub fn feed_screen() -> Screen {
    Screen::new(feed_page).with_layout(with_main_layout)
}

fn feed_page() -> Element {
    rsx! {
        FeedScreen {}
    }
}

async fn load_posts(page: u32) -> Result<PageResponse<Post>, FeedError> {
    match FEED_ENDPOINT {
        Some(base) => fetch_page_json(&page_url(base, page)).await,
        None => simulation::fetch_posts(page).await,
    }
}

#[component]
pub fn FeedScreen() -> Element {
    let locale = use_locale();
    let client = use_context::<QueryClient>();
    let auto_load = use_signal(|| true);

    let key = query_key!["posts"];
    let feed = use_load_more(
        key.clone(),
        load_posts,
        LoadMoreOptions {
            enabled: auto_load(),
            ..Default::default()
        },
    );

    let last = feed.data.len().saturating_sub(1);
    let node_ref = feed.node_ref;
    let is_empty = feed.status == QueryStatus::Success && feed.data.is_empty();

    rsx! {
        div { class: "max-w-2xl mx-auto px-4 py-6 flex flex-col gap-3",
            FeedToolbar {
                count: feed.data.len(),
                auto_load,
                on_refresh: move |_| client.invalidate(&key),
            }

            if is_empty {
                p { class: "text-center text-xs text-gray-500 py-10", "{locale.empty}" }
            }

            for (i , post) in feed.data.iter().enumerate() {
                PostCard {
                    key: "{post.id}",
                    post: post.clone(),
                    is_sentinel: i == last,
                    node_ref,
                }
            }

            FeedFooter {
                status: feed.status,
                is_fetching: feed.is_fetching,
                has_next_page: feed.has_next_page,
                has_items: !feed.data.is_empty(),
                error: feed.error.clone(),
                fetch_next_page: feed.fetch_next_page,
            }
        }
    }
}

#[component]
fn FeedToolbar(count: usize, auto_load: Signal<bool>, on_refresh: EventHandler<()>) -> Element {
    let locale = use_locale();
    let count = locale.format_count(count);
    let mut auto_load = auto_load;

    rsx! {
        div { class: "flex items-center justify-between pb-2 border-b border-white/5",
            span { class: "text-[11px] font-bold text-gray-500 uppercase tracking-widest",
                "{count}"
            }
            div { class: "flex gap-2",
                button {
                    class: "px-3 py-1.5 text-[11px] font-bold rounded-lg bg-white/5 hover:bg-white/10 transition-colors",
                    onclick: move |_| auto_load.toggle(),
                    if auto_load() {
                        "{locale.pause}"
                    } else {
                        "{locale.resume}"
                    }
                }
                button {
                    class: "px-3 py-1.5 text-[11px] font-bold rounded-lg bg-white/5 hover:bg-white/10 transition-colors",
                    onclick: move |_| on_refresh.call(()),
                    "{locale.refresh}"
                }
            }
        }
    }
}

#[component]
fn FeedFooter(
    status: QueryStatus,
    is_fetching: bool,
    has_next_page: bool,
    has_items: bool,
    error: Option<FeedError>,
    fetch_next_page: Callback<()>,
) -> Element {
    let locale = use_locale();
    let error_text = error
        .map(|e| format!("{}: {}", locale.error_prefix, e))
        .unwrap_or_default();

    rsx! {
        div { class: "py-4 flex justify-center text-xs",
            if is_fetching {
                span { class: "text-gray-400 animate-pulse", "{locale.loading}" }
            } else if status == QueryStatus::Error {
                div { class: "flex flex-col items-center gap-2",
                    span { style: "color: var(--color-danger);", "{error_text}" }
                    button {
                        class: "px-3 py-1.5 font-bold rounded-lg bg-white/5 hover:bg-white/10",
                        onclick: move |_| fetch_next_page.call(()),
                        "{locale.load_more}"
                    }
                }
            } else if has_next_page {
                button {
                    class: "px-3 py-1.5 font-bold rounded-lg bg-white/5 hover:bg-white/10",
                    onclick: move |_| fetch_next_page.call(()),
                    "{locale.load_more}"
                }
            } else if has_items {
                span { class: "text-gray-600", "{locale.end_of_list}" }
            }
        }
    }
}

#[component]
fn PostCard(post: Post, is_sentinel: bool, node_ref: EventHandler<MountedEvent>) -> Element {
    rsx! {
        article {
            class: "p-4 border border-white/5 flex flex-col gap-1",
            style: "background: var(--color-surface); border-radius: var(--radius);",
            onmounted: move |evt| {
                if is_sentinel {
                    node_ref.call(evt);
                }
            },
            h2 { class: "text-sm font-bold", "{post.title}" }
            p { class: "text-xs leading-relaxed", style: "color: var(--color-muted);",
                "{post.body}"
            }
        }
    }
}
