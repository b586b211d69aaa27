//! Minimal UI runtime shared as a singleton between bundles.
//!
//! Components render through a [`UiRuntime`] instance obtained from the shared
//! scope. Two instances in one process would mean two render trees that cannot
//! see each other's state, so bundles declare this library as a singleton and
//! the federation guarantees they all receive the same one.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use federation::{InstanceHandle, LibraryProvider};
use semver::Version;

/// Name under which the runtime is shared.
pub const LIBRARY: &str = "ui-runtime";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Version of this build of the runtime.
pub fn version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// One live runtime. Every element it renders is tagged with its instance id.
#[derive(Debug)]
pub struct UiRuntime {
    version: Version,
    instance_id: u64,
}

impl UiRuntime {
    pub fn new(version: Version) -> Self {
        let instance_id = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        tracing::info!("UI runtime {} started (instance {})", version, instance_id);
        Self {
            version,
            instance_id,
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    /// Serialize `element` as markup owned by this runtime.
    pub fn render(&self, element: &Element) -> String {
        let mut out = String::new();
        element.write_to(&mut out, Some(self.instance_id));
        out
    }
}

/// Provider contributing this build of the runtime to a shared scope.
pub fn provider() -> Arc<dyn LibraryProvider> {
    provider_for(version())
}

/// Provider of a runtime reporting `version`.
pub fn provider_for(version: Version) -> Arc<dyn LibraryProvider> {
    Arc::new(move || Ok::<_, String>(InstanceHandle::new(UiRuntime::new(version.clone()))))
}

/// A node of rendered UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Pre-rendered markup, inserted verbatim.
    Markup(String),
}

/// An element with attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a `class` attribute, skipping blank class lists.
    pub fn class(self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref().trim();
        if class.is_empty() {
            self
        } else {
            self.attr("class", class)
        }
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn markup(mut self, markup: impl Into<String>) -> Self {
        self.children.push(Node::Markup(markup.into()));
        self
    }

    fn write_to(&self, out: &mut String, owner: Option<u64>) {
        let _ = write!(out, "<{}", self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        if let Some(owner) = owner {
            let _ = write!(out, " data-ui-instance=\"{}\"", owner);
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(out, None),
                Node::Text(text) => out.push_str(&escape(text)),
                Node::Markup(markup) => out.push_str(markup),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_elements_with_owner_tag() {
        let runtime = UiRuntime::new(Version::new(2, 3, 1));
        let html = runtime.render(
            &Element::new("div")
                .class("card")
                .child(Element::new("h2").text("Fish & Chips"))
                .markup("<hr>"),
        );
        assert_eq!(
            html,
            format!(
                "<div class=\"card\" data-ui-instance=\"{}\"><h2>Fish &amp; Chips</h2><hr></div>",
                runtime.instance_id()
            )
        );
    }

    #[test]
    fn blank_class_is_omitted() {
        let runtime = UiRuntime::new(version());
        let html = runtime.render(&Element::new("span").class("  "));
        assert!(html.starts_with("<span data-ui-instance="));
    }

    #[test]
    fn instances_are_distinguishable() {
        let a = UiRuntime::new(version());
        let b = UiRuntime::new(version());
        assert_ne!(a.instance_id(), b.instance_id());
    }

    #[tokio::test]
    async fn provider_builds_runtime_of_requested_version() {
        let handle = provider_for(Version::new(2, 1, 0))
            .instantiate()
            .await
            .unwrap();
        let runtime = handle.downcast::<UiRuntime>().unwrap();
        assert_eq!(runtime.version(), &Version::new(2, 1, 0));
    }
}
