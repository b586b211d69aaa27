//! Manifest resolution with a per-process cache.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use url::Url;

use super::descriptor::RemoteDescriptor;
use super::wire::RemoteManifest;
use crate::api::{FederationError, Result};
use crate::fetch::{FetchFailure, Fetcher, fetch_with_timeout};

type DescriptorCell = Arc<OnceCell<Arc<RemoteDescriptor>>>;

/// Resolves configured remote names to validated descriptors.
///
/// Manifests are assumed immutable while the process runs: a successful
/// resolution is cached until the resolver is dropped. Failures are not
/// cached, so the next call fetches again.
pub struct ManifestResolver {
    remotes: BTreeMap<String, Url>,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    cache: Mutex<HashMap<String, DescriptorCell>>,
}

impl ManifestResolver {
    pub fn new(remotes: BTreeMap<String, Url>, fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self {
            remotes,
            fetcher,
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Configured manifest URL of `remote`.
    pub fn manifest_url(&self, remote: &str) -> Option<&Url> {
        self.remotes.get(remote)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &str> {
        self.remotes.keys().map(String::as_str)
    }

    /// Descriptor of `remote`, fetching its manifest on first use.
    ///
    /// Concurrent first calls share one fetch.
    pub async fn resolve(&self, remote: &str) -> Result<Arc<RemoteDescriptor>> {
        let url = self
            .remotes
            .get(remote)
            .ok_or_else(|| FederationError::UnknownRemote(remote.to_string()))?;

        let cell = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(remote.to_string()).or_default())
        };

        if let Some(descriptor) = cell.get() {
            tracing::trace!("Manifest cache hit for '{}'", remote);
            return Ok(Arc::clone(descriptor));
        }

        cell.get_or_try_init(|| self.fetch_descriptor(remote, url))
            .await
            .map(Arc::clone)
    }

    /// Cached descriptor, without fetching.
    pub fn cached(&self, remote: &str) -> Option<Arc<RemoteDescriptor>> {
        self.cache
            .lock()
            .get(remote)
            .and_then(|cell| cell.get().cloned())
    }

    async fn fetch_descriptor(&self, remote: &str, url: &Url) -> Result<Arc<RemoteDescriptor>> {
        tracing::debug!("Fetching manifest for '{}' from {}", remote, url);

        let bytes = fetch_with_timeout(self.fetcher.as_ref(), url, self.timeout)
            .await
            .map_err(|failure| match failure {
                FetchFailure::Failed(err) => FederationError::ManifestUnreachable {
                    remote: remote.to_string(),
                    url: url.to_string(),
                    reason: err.to_string(),
                },
                FetchFailure::TimedOut => FederationError::Timeout {
                    remote: remote.to_string(),
                    operation: "manifest fetch",
                    timeout: self.timeout,
                },
            })?;

        let manifest =
            RemoteManifest::parse(&bytes).map_err(|e| FederationError::ManifestMalformed {
                remote: remote.to_string(),
                reason: e.to_string(),
            })?;

        let descriptor = RemoteDescriptor::from_manifest(remote, url, manifest)?;
        tracing::info!(
            "Resolved remote '{}': {} exposed modules, contract v{}",
            remote,
            descriptor.exposed_modules.len(),
            descriptor.contract.version
        );
        Ok(Arc::new(descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractSurface;
    use crate::fetch::StaticFetcher;
    use semver::Version;

    fn url() -> Url {
        Url::parse("https://widgets.example/mf-manifest.json").unwrap()
    }

    fn resolver(fetcher: Arc<StaticFetcher>, timeout: Duration) -> ManifestResolver {
        let remotes = BTreeMap::from([("widgets".to_string(), url())]);
        ManifestResolver::new(remotes, fetcher, timeout)
    }

    fn manifest_json() -> String {
        RemoteManifest::new(
            "widgets",
            "remoteEntry.json",
            &ContractSurface::new(Version::new(1, 0, 0)),
        )
        .expose("./Card", "cardModule")
        .to_json_pretty()
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_remote_is_rejected_without_fetching() {
        let fetcher = Arc::new(StaticFetcher::new());
        let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(1));
        let err = resolver.resolve("gadgets").await.unwrap_err();
        assert_eq!(err, FederationError::UnknownRemote("gadgets".to_string()));
        assert_eq!(fetcher.request_count(&url()), 0);
    }

    #[tokio::test]
    async fn caches_successful_resolution() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert(&url(), manifest_json());
        let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(1));

        let first = resolver.resolve("widgets").await.unwrap();
        let second = resolver.resolve("widgets").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.request_count(&url()), 1);
        assert!(resolver.cached("widgets").is_some());
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_fetch() {
        let fetcher = Arc::new(StaticFetcher::new().with_latency(Duration::from_millis(20)));
        fetcher.insert(&url(), manifest_json());
        let resolver = Arc::new(resolver(Arc::clone(&fetcher), Duration::from_secs(1)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.resolve("widgets").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(fetcher.request_count(&url()), 1);
    }

    #[tokio::test]
    async fn unreachable_is_not_cached() {
        let fetcher = Arc::new(StaticFetcher::new());
        let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(1));

        let err = resolver.resolve("widgets").await.unwrap_err();
        assert!(matches!(err, FederationError::ManifestUnreachable { .. }));

        fetcher.insert(&url(), manifest_json());
        resolver.resolve("widgets").await.unwrap();
        assert_eq!(fetcher.request_count(&url()), 2);
    }

    #[tokio::test]
    async fn malformed_json_is_distinct_from_unreachable() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert(&url(), "{ not json");
        let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(1));

        let err = resolver.resolve("widgets").await.unwrap_err();
        assert!(matches!(err, FederationError::ManifestMalformed { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_manifest_times_out() {
        let fetcher = Arc::new(StaticFetcher::new().with_latency(Duration::from_millis(200)));
        fetcher.insert(&url(), manifest_json());
        let resolver = resolver(Arc::clone(&fetcher), Duration::from_millis(10));

        let err = resolver.resolve("widgets").await.unwrap_err();
        assert!(matches!(err, FederationError::Timeout { operation: "manifest fetch", .. }));
    }
}
