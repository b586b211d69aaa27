//! Host page: bundle banner plus the remote's test page behind a fallback.
use std::sync::Arc;

use federation::{LazyModule, Suspense};
use serde_json::Value;
use ui_runtime::{Element, UiRuntime};

/// Markup shown while `remote/TestPage` loads.
pub const FALLBACK: &str = "<div>Loading...</div>";

/// Specifier of the page the host embeds.
pub const TEST_PAGE: &str = "remote/TestPage";

pub struct App {
    runtime: Arc<UiRuntime>,
    test_page: LazyModule,
    suspense: Suspense,
}

impl App {
    pub fn new(runtime: Arc<UiRuntime>, test_page: LazyModule) -> Self {
        Self {
            runtime,
            test_page,
            suspense: Suspense::new(FALLBACK),
        }
    }

    pub fn test_page(&self) -> &LazyModule {
        &self.test_page
    }

    /// Render with whatever state the test page is in right now.
    pub fn render(&self) -> String {
        let banner = [
            "Name: container",
            "Framework: federation",
            "Language: Rust",
            "CSS: Tailwind",
        ];
        let page = banner.into_iter().fold(
            Element::new("div").class("max-w-6xl mx-auto mt-10 text-3xl text-red-600"),
            |page, line| page.child(Element::new("div").text(line)),
        );
        let embedded = self
            .suspense
            .render(&self.test_page, &Value::Object(Default::default()));
        self.runtime.render(&page.markup(embedded))
    }
}
