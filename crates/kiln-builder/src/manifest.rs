//! Compiled-artifact manifests.
//!
//! Bundler adapters describe their output through these records so the
//! server-render side can locate client chunks without re-reading the
//! bundler's own metadata formats.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use kiln_fs::FileSystem;

use crate::error::Result;

/// Manifest of browser-side output, written by the client adapters as
/// `client.manifest.json` under the server dist directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientManifest {
    /// Every emitted asset, in emission order.
    pub all: Vec<String>,
    /// Assets the initial page load requires.
    pub initial: Vec<String>,
    /// Lazily loaded chunks.
    pub async_files: Vec<String>,
    /// Module id to owning-chunk indices.
    pub modules: BTreeMap<String, Vec<u32>>,
}

/// Manifest of the server-render bundle, written as
/// `server.manifest.json` next to the client manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerManifest {
    pub entry: String,
    /// File name to bundled source.
    pub files: BTreeMap<String, String>,
    /// File name to source map, when maps are emitted.
    pub maps: BTreeMap<String, serde_json::Value>,
}

impl ClientManifest {
    pub async fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        read_json(fs, path).await
    }

    pub async fn store(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        write_json(fs, path, self).await
    }
}

impl ServerManifest {
    pub async fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        read_json(fs, path).await
    }

    pub async fn store(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        write_json(fs, path, self).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> Result<T> {
    let raw = fs.read_to_string(path).await?;
    serde_json::from_str(&raw)
        .map_err(|err| crate::error::BuildError::Custom(format!(
            "invalid manifest {}: {err}",
            path.display()
        )))
}

async fn write_json<T: Serialize>(fs: &dyn FileSystem, path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_vec_pretty(value)
        .map_err(|err| crate::error::BuildError::Custom(format!(
            "could not serialize manifest {}: {err}",
            path.display()
        )))?;
    fs.write(path, &raw).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use kiln_fs::MemoryFileSystem;

    #[tokio::test]
    async fn test_client_manifest_round_trip() {
        let fs = MemoryFileSystem::new();
        let path = PathBuf::from("/dist/server/client.manifest.json");

        let manifest = ClientManifest {
            all: vec!["app.js".into(), "vendor.js".into()],
            initial: vec!["app.js".into()],
            async_files: vec!["pages-about.js".into()],
            modules: BTreeMap::from([("m1".into(), vec![0, 2])]),
        };
        manifest.store(&fs, &path).await.unwrap();

        let loaded = ClientManifest::load(&fs, &path).await.unwrap();
        assert_eq!(loaded, manifest);
    }

    #[tokio::test]
    async fn test_missing_fields_default() {
        let fs = MemoryFileSystem::new();
        let path = PathBuf::from("/dist/server/server.manifest.json");
        fs.write(&path, br#"{"entry": "server.js"}"#).await.unwrap();

        let loaded = ServerManifest::load(&fs, &path).await.unwrap();
        assert_eq!(loaded.entry, "server.js");
        assert!(loaded.files.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let fs = MemoryFileSystem::new();
        let path = PathBuf::from("/m.json");
        fs.write(&path, b"not json").await.unwrap();
        assert!(ClientManifest::load(&fs, &path).await.is_err());
    }
}
