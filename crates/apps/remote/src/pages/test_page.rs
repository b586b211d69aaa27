//! `./TestPage`: the container's buttons in each variant the page shows.
use std::sync::Arc;

use federation::{Component, LazyModule, Suspense};
use serde_json::{Value, json};
use ui_runtime::{Element, UiRuntime};

pub const LABEL: &str = "Test Button";

/// Variants in display order.
pub const VARIANTS: [&str; 5] = ["error", "warning", "primary", "secondary", "info"];

pub struct TestPage {
    runtime: Arc<UiRuntime>,
    button: LazyModule,
    suspense: Suspense,
}

impl TestPage {
    /// `button` is the pending or settled `container/Button`.
    pub fn new(runtime: Arc<UiRuntime>, button: LazyModule) -> Self {
        Self {
            runtime,
            button,
            suspense: Suspense::new(""),
        }
    }

    pub fn button(&self) -> &LazyModule {
        &self.button
    }
}

impl Component for TestPage {
    fn render(&self, _props: &Value) -> String {
        let heading = Element::new("h1")
            .class("text-blue-600 md:text-gray-600")
            .text("Test Page");
        let page = VARIANTS.into_iter().fold(
            Element::new("div").class("space-y-2").child(heading),
            |page, variant| {
                page.markup(self.suspense.render(
                    &self.button,
                    &json!({ "label": LABEL, "buttonType": variant }),
                ))
            },
        );
        self.runtime.render(&page)
    }
}
