//! Remote manifests: wire format, validated descriptors, and resolution.

mod descriptor;
mod resolver;
mod wire;

pub use descriptor::RemoteDescriptor;
pub use resolver::ManifestResolver;
pub use wire::{
    MANIFEST_FILE_NAME, MANIFEST_SCHEMA_VERSION, RemoteManifest, SharedDeclaration, entry_digest,
};
