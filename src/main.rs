use dioxus::prelude::*;

mod components;
mod config;
mod error;
mod hooks;
mod query;
mod state;
mod utils;
mod viewport;
use components::app_shell::AppShell;
use components::feed::feed_screen;

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Link { rel: "preconnect", href: "https://fonts.googleapis.com" }
        document::Link {
            rel: "preconnect",
            href: "https://fonts.gstatic.com",
            crossorigin: "anonymous",
        }
        document::Link {
            rel: "stylesheet",
            href: "https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@300;400;500;600;700&display=swap",
        }
        document::Script { src: "https://cdn.tailwindcss.com" }
        AppShell { screen: feed_screen() }
    }
}
