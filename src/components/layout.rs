use crate::config::{APP_SUBTITLE, APP_TITLE};
use crate::state::use_theme;
use dioxus::prelude::*;

#[component]
pub fn MainLayout(children: Element) -> Element {
    let theme = use_theme();

    rsx! {
        div {
            class: "h-screen w-full flex flex-col overflow-hidden selection:bg-primary/30",
            style: "background: var(--color-background); color: var(--color-text); font-family: var(--font-family);",
            header { class: "shrink-0 px-6 py-4 border-b border-white/5 flex items-baseline gap-3",
                h1 {
                    class: "text-lg font-bold tracking-tight",
                    style: "color: {theme.primary};",
                    "{APP_TITLE}"
                }
                span { class: "text-[10px] text-gray-500 uppercase tracking-widest",
                    "{APP_SUBTITLE}"
                }
            }
            main { class: "flex-1 min-h-0 overflow-y-auto scrollbar-custom", {children} }
        }
    }
}

/// Wraps a page in [`MainLayout`].
pub fn with_main_layout(page: Element) -> Element {
    rsx! {
        MainLayout { {page} }
    }
}
