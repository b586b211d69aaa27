//! Host and remote bundles composed in one process over in-memory deployments.
use std::sync::Arc;
use std::time::Duration;

use container_app::ContainerBundle;
use container_app::components::app::FALLBACK;
use container_app::services::ProductService;
use federation::{
    ContractSurface, ErrorKind, Federation, FederationError, ModuleCatalog, RemoteManifest,
    SharedScope, StaticFetcher,
};
use remote_app::RemoteBundle;
use remote_app::store::{use_store, use_store_selector};
use semver::Version;
use url::Url;

fn manifest_url(bundle: &str) -> Url {
    Url::parse(&format!("https://{bundle}.example/mf-manifest.json")).expect("valid url")
}

fn entry_url(bundle: &str) -> Url {
    Url::parse(&format!("https://{bundle}.example/remoteEntry.json")).expect("valid url")
}

fn products_url() -> Url {
    Url::parse("https://products.example/products").expect("valid url")
}

struct Composition {
    container: ContainerBundle,
    host: Federation,
    remote: Federation,
    fetcher: Arc<StaticFetcher>,
}

fn compose() -> Composition {
    let fetcher = Arc::new(StaticFetcher::new());
    let catalog = Arc::new(ModuleCatalog::new());
    let scope = Arc::new(SharedScope::new());

    let mut host_config = container_app::bundle::default_config().expect("host config parses");
    host_config
        .apply_overrides(|key| {
            (key == "FEDERATION_REMOTE_REMOTE").then(|| manifest_url("remote").to_string())
        })
        .expect("override applies");
    let mut remote_config = remote_app::bundle::default_config().expect("remote config parses");
    remote_config
        .apply_overrides(|key| {
            (key == "FEDERATION_REMOTE_CONTAINER").then(|| manifest_url("container").to_string())
        })
        .expect("override applies");

    let entry = ContainerBundle::entry()
        .to_json_pretty()
        .expect("entry serializes")
        .into_bytes();
    let manifest = ContainerBundle::manifest(&host_config, &entry).expect("manifest builds");
    fetcher.insert(
        &manifest_url("container"),
        manifest.to_json_pretty().expect("manifest serializes"),
    );
    fetcher.insert(&entry_url("container"), entry);

    let entry = RemoteBundle::entry()
        .to_json_pretty()
        .expect("entry serializes")
        .into_bytes();
    let manifest = RemoteBundle::manifest(&remote_config, &entry).expect("manifest builds");
    fetcher.insert(
        &manifest_url("remote"),
        manifest.to_json_pretty().expect("manifest serializes"),
    );
    fetcher.insert(&entry_url("remote"), entry);

    let container = ContainerBundle::new(ProductService::new(fetcher.clone(), products_url()));
    let host = container
        .federation_builder(&host_config, Arc::clone(&catalog), Arc::clone(&scope))
        .expect("host config is valid")
        .fetcher(fetcher.clone())
        .build();
    let remote = RemoteBundle::federation_builder(&remote_config, catalog, scope)
        .expect("remote config is valid")
        .fetcher(fetcher.clone())
        .build();
    RemoteBundle::register(&remote);

    Composition {
        container,
        host,
        remote,
        fetcher,
    }
}

#[tokio::test]
async fn test_host_renders_remote_test_page_after_fallback() {
    let c = compose();

    let app = ContainerBundle::app(&c.host).await.expect("app builds");
    let first = app.render();
    assert!(first.contains(FALLBACK));
    assert!(first.contains("<div>Name: container</div>"));

    app.test_page().wait().await.expect("test page loads");
    c.remote
        .load("container/Button")
        .await
        .expect("button loads");

    let html = app.render();
    assert!(!html.contains(FALLBACK));
    assert!(html.contains("<h1 class=\"text-blue-600 md:text-gray-600\">Test Page</h1>"));
    assert_eq!(
        html.matches("<label class=\"cursor-pointer\">Test Button</label>")
            .count(),
        5
    );
    for class in ["bg-red-600", "bg-yellow-500", "bg-blue-500", "bg-black", "bg-sky-200"] {
        assert!(html.contains(class), "missing {class}");
    }

    let runtime = c
        .host
        .scope()
        .resolved(ui_runtime::LIBRARY)
        .expect("runtime resolved")
        .instance
        .downcast::<ui_runtime::UiRuntime>()
        .expect("runtime instance");
    let owner = format!("data-ui-instance=\"{}\"", runtime.instance_id());
    assert_eq!(html.matches("data-ui-instance=").count(), 7);
    assert_eq!(html.matches(owner.as_str()).count(), 7);
}

#[tokio::test]
async fn test_remote_drives_host_store() {
    let c = compose();

    let actions = use_store(&c.remote).await.expect("hooks load");
    let selector = use_store_selector(&c.remote).await.expect("selector loads");

    actions.increment_by_amount_counter(4).expect("hook exists");
    actions.decrement_counter().expect("hook exists");

    assert_eq!(selector.select(|state| state.counter.value), Some(3));
    assert_eq!(c.container.store().get_snapshot().counter.value, 3);
}

#[tokio::test]
async fn test_product_list_reaches_remote_selector() {
    let c = compose();
    c.fetcher.insert(
        &products_url(),
        r#"{"products":[{"id":1,"title":"iPhone 9","description":"","price":549,
        "discountPercentage":12.96,"rating":4.69,"stock":94,"brand":"Apple",
        "category":"smartphones","thumbnail":""}],"total":1,"skip":0,"limit":30}"#,
    );

    let actions = use_store(&c.remote).await.expect("hooks load");
    let selector = use_store_selector(&c.remote).await.expect("selector loads");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = selector.subscribe(move |state| {
        let _ = tx.send(state.product.products.len());
    });

    actions.get_product_list().expect("hook exists");

    let stored = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("products arrive")
        .expect("channel open");
    assert_eq!(stored, 1);
    assert_eq!(
        selector.select(|state| state.product.products[0].title.clone()),
        Some("iPhone 9".to_string())
    );
}

#[tokio::test]
async fn test_remote_rejects_incompatible_container() {
    let c = compose();
    RemoteBundle::check_container(&c.remote)
        .await
        .expect("published container satisfies the remote");

    let skewed = compose();
    skewed.fetcher.insert(
        &manifest_url("container"),
        RemoteManifest::new(
            "container",
            "remoteEntry.json",
            &ContractSurface::new(Version::new(2, 0, 0)),
        )
        .to_json_pretty()
        .expect("manifest serializes"),
    );

    let err = RemoteBundle::check_container(&skewed.remote)
        .await
        .expect_err("major bump is incompatible");
    assert!(matches!(err, FederationError::ContractMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::DeploymentSkew);
}
