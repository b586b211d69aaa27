//! Publish both bundles as local deployments.
//!
//! Each bundle lands in `<out>/<name>/` as `mf-manifest.json` plus its entry
//! document, addressable through `file://` URLs.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use container_app::ContainerBundle;
use federation::RemoteManifest;
use federation::manifest::MANIFEST_FILE_NAME;
use remote_app::RemoteBundle;
use url::Url;

/// Write manifests and entries for every bundle
#[derive(Parser, Debug)]
pub struct Publish {
    /// Output directory
    #[arg(long, default_value = "dist")]
    pub out: PathBuf,
}

impl Publish {
    pub fn execute(self) -> Result<()> {
        let published = publish_all(&self.out)?;
        println!("container: {}", published.container);
        println!("remote:    {}", published.remote);
        Ok(())
    }
}

/// Manifest URLs of a local deployment.
#[derive(Debug, Clone)]
pub struct Published {
    pub container: Url,
    pub remote: Url,
}

pub fn publish_all(out: &Path) -> Result<Published> {
    let config = container_app::bundle::default_config()?;
    let entry = ContainerBundle::entry().to_json_pretty()?.into_bytes();
    let manifest = ContainerBundle::manifest(&config, &entry)?;
    let container = write_bundle(out, container_app::NAME, &entry, &manifest)?;

    let config = remote_app::bundle::default_config()?;
    let entry = RemoteBundle::entry().to_json_pretty()?.into_bytes();
    let manifest = RemoteBundle::manifest(&config, &entry)?;
    let remote = write_bundle(out, remote_app::NAME, &entry, &manifest)?;

    Ok(Published { container, remote })
}

fn write_bundle(out: &Path, name: &str, entry: &[u8], manifest: &RemoteManifest) -> Result<Url> {
    let dir = out.join(name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    std::fs::write(dir.join(&manifest.entry), entry)
        .with_context(|| format!("Failed to write {} entry", name))?;
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    std::fs::write(&manifest_path, manifest.to_json_pretty()?)
        .with_context(|| format!("Failed to write {} manifest", name))?;

    let absolute = manifest_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", manifest_path.display()))?;
    tracing::info!("Published {} to {}", name, dir.display());
    Url::from_file_path(&absolute)
        .map_err(|_| anyhow!("{} is not an absolute path", absolute.display()))
}
