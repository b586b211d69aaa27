//! Explicit pending/ready/failed results for consumers that render while a
//! module loads.
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use super::state::Outcome;
use crate::api::{FederationError, ModuleHandle, ModuleSpecifier, Result};

/// Snapshot of a [`LazyModule`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    Ready(ModuleHandle),
    Failed(FederationError),
}

/// A module request that may not have settled yet.
///
/// Dropping a `LazyModule` releases only this consumer's subscription; the
/// load itself keeps running and fills the loader's cache.
#[derive(Clone)]
pub struct LazyModule {
    specifier: ModuleSpecifier,
    outcome: watch::Receiver<Outcome>,
}

impl LazyModule {
    pub(crate) fn attached(specifier: ModuleSpecifier, outcome: watch::Receiver<Outcome>) -> Self {
        Self { specifier, outcome }
    }

    pub(crate) fn settled(specifier: ModuleSpecifier, outcome: Result<ModuleHandle>) -> Self {
        let (_tx, rx) = watch::channel(Some(outcome));
        Self::attached(specifier, rx)
    }

    pub fn specifier(&self) -> &ModuleSpecifier {
        &self.specifier
    }

    pub fn status(&self) -> LoadStatus {
        match &*self.outcome.borrow() {
            None => LoadStatus::Pending,
            Some(Ok(handle)) => LoadStatus::Ready(handle.clone()),
            Some(Err(err)) => LoadStatus::Failed(err.clone()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outcome.borrow().is_none()
    }

    /// Suspend until the load settles.
    pub async fn wait(&self) -> Result<ModuleHandle> {
        let mut outcome = self.outcome.clone();
        loop {
            if let Some(settled) = outcome.borrow_and_update().clone() {
                return settled;
            }
            if outcome.changed().await.is_err() {
                return Err(FederationError::LoadAborted(self.specifier.to_string()));
            }
        }
    }
}

impl fmt::Debug for LazyModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyModule")
            .field("specifier", &self.specifier.to_string())
            .field("status", &self.status())
            .finish()
    }
}

type ErrorFallback = Arc<dyn Fn(&FederationError) -> String + Send + Sync>;

/// Chooses what to render for a [`LazyModule`]: a fallback while pending, the
/// module's component once ready, an error fallback if it failed.
#[derive(Clone)]
pub struct Suspense {
    fallback: String,
    error_fallback: ErrorFallback,
}

impl Suspense {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            error_fallback: Arc::new(|err| format!("<div class=\"remote-error\">{}</div>", err)),
        }
    }

    pub fn with_error_fallback<F>(mut self, error_fallback: F) -> Self
    where
        F: Fn(&FederationError) -> String + Send + Sync + 'static,
    {
        self.error_fallback = Arc::new(error_fallback);
        self
    }

    pub fn render(&self, module: &LazyModule, props: &Value) -> String {
        match module.status() {
            LoadStatus::Pending => self.fallback.clone(),
            LoadStatus::Ready(handle) => match handle.component() {
                Ok(component) => component.render(props),
                Err(err) => (self.error_fallback)(&err),
            },
            LoadStatus::Failed(err) => (self.error_fallback)(&err),
        }
    }
}

impl fmt::Debug for Suspense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspense")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Component, Exports};
    use semver::Version;

    struct Card;

    impl Component for Card {
        fn render(&self, props: &Value) -> String {
            format!("<card>{}</card>", props["title"].as_str().unwrap_or_default())
        }
    }

    fn specifier() -> ModuleSpecifier {
        "widgets/Card".parse().unwrap()
    }

    fn card_handle() -> ModuleHandle {
        ModuleHandle::new(
            "widgets",
            "./Card",
            "cardModule",
            Version::new(1, 0, 0),
            None,
            Exports::component(Card),
        )
    }

    #[tokio::test]
    async fn renders_fallback_then_content() {
        let (tx, rx) = watch::channel(None);
        let lazy = LazyModule::attached(specifier(), rx);
        let suspense = Suspense::new("loading");
        let props = serde_json::json!({ "title": "Hello" });

        assert_eq!(lazy.status(), LoadStatus::Pending);
        assert_eq!(suspense.render(&lazy, &props), "loading");

        tx.send_replace(Some(Ok(card_handle())));
        lazy.wait().await.unwrap();
        assert_eq!(suspense.render(&lazy, &props), "<card>Hello</card>");
    }

    #[tokio::test]
    async fn failed_load_uses_error_fallback() {
        let lazy = LazyModule::settled(
            specifier(),
            Err(FederationError::UnknownRemote("widgets".to_string())),
        );
        let suspense = Suspense::new("loading").with_error_fallback(|_| "offline".to_string());
        assert_eq!(suspense.render(&lazy, &Value::Null), "offline");
    }

    #[tokio::test]
    async fn dropped_sender_without_outcome_aborts() {
        let (tx, rx) = watch::channel(None);
        let lazy = LazyModule::attached(specifier(), rx);
        drop(tx);
        assert!(matches!(lazy.wait().await, Err(FederationError::LoadAborted(_))));
    }
}
