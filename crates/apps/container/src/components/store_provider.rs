//! `./providers/StoreProvider`: marks a subtree as reading the host store.
use std::sync::Arc;

use federation::{Component, StateBridge};
use serde_json::Value;
use ui_runtime::{Element, UiRuntime};

pub struct StoreProvider {
    runtime: Arc<UiRuntime>,
    bridge: StateBridge<Value>,
}

impl StoreProvider {
    pub fn new(runtime: Arc<UiRuntime>, bridge: StateBridge<Value>) -> Self {
        Self { runtime, bridge }
    }
}

impl Component for StoreProvider {
    /// Renders `props.children` (markup) inside a provider node carrying the
    /// counter value of the snapshot it was rendered against.
    fn render(&self, props: &Value) -> String {
        let snapshot = self.bridge.get_snapshot();
        let counter = snapshot["counter"]["value"].as_i64().unwrap_or_default();
        let children = props["children"].as_str().unwrap_or_default();
        self.runtime.render(
            &Element::new("div")
                .attr("data-store", "container")
                .attr("data-counter", counter.to_string())
                .markup(children),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HostReducer;
    use federation::{Action, Store};
    use semver::Version;

    #[test]
    fn wraps_children_with_current_snapshot() {
        let store = Store::new(HostReducer);
        let runtime = Arc::new(UiRuntime::new(Version::new(2, 3, 1)));
        let provider = StoreProvider::new(Arc::clone(&runtime), store.json_bridge());
        store.dispatch(Action::with_payload("counter/incrementByAmount", 4));

        let html = provider.render(&serde_json::json!({ "children": "<p>hi</p>" }));
        assert_eq!(
            html,
            format!(
                "<div data-store=\"container\" data-counter=\"4\" data-ui-instance=\"{}\"><p>hi</p></div>",
                runtime.instance_id()
            )
        );
    }
}
