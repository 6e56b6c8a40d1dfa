use crate::config::APP_TITLE;
use crate::query::QueryClient;
use crate::state::UiConfig;
use dioxus::prelude::*;

pub type Layout = fn(Element) -> Element;

/// A top-level page, optionally rendered through a layout of its own.
#[derive(Clone, Copy, PartialEq)]
pub struct Screen {
    pub render: fn() -> Element,
    pub layout: Option<Layout>,
}

impl Screen {
    pub const fn new(render: fn() -> Element) -> Self {
        Self {
            render,
            layout: None,
        }
    }

    pub const fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn view(&self) -> Element {
        let page = (self.render)();
        match self.layout {
            Some(layout) => layout(page),
            None => page,
        }
    }
}

/// Root of every screen: owns the query cache and the presentation config.
#[component]
pub fn AppShell(screen: Screen) -> Element {
    use_context_provider(QueryClient::new);
    let ui = use_context_provider(UiConfig::default);

    rsx! {
        document::Title { "{APP_TITLE}" }
        div {
            lang: ui.locale.code,
            class: "min-h-screen w-full",
            style: "{ui.theme.css_variables()}",
            {screen.view()}
        }
    }
}
