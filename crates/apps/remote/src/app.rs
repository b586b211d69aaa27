//! Stand-alone page of the remote bundle.
use std::sync::Arc;

use federation::{LazyModule, Suspense};
use serde_json::Value;
use ui_runtime::{Element, UiRuntime};

pub struct App {
    runtime: Arc<UiRuntime>,
    button: LazyModule,
}

impl App {
    pub fn new(runtime: Arc<UiRuntime>, button: LazyModule) -> Self {
        Self { runtime, button }
    }

    pub fn render(&self) -> String {
        let banner = [
            "Name: remote",
            "Framework: federation",
            "Language: Rust",
            "CSS: Tailwind",
        ];
        let page = banner.into_iter().fold(
            Element::new("div").class("max-w-6xl mx-auto mt-10 text-3xl text-blue-600"),
            |page, line| page.child(Element::new("div").text(line)),
        );
        let button = Suspense::new("").render(&self.button, &Value::Object(Default::default()));
        self.runtime.render(&page.markup(button))
    }
}
