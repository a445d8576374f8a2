//! Read-caching decorator over any [`FileSystem`] backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FsResult;
use crate::storage::Storage;
use crate::{FileMeta, FileSystem};

/// Decorator adding a positive-result cache to the read operations and
/// write-triggered invalidation to the mutating ones.
///
/// Each read family gets its own [`Storage`] ring. Mutations purge the
/// touched path (and the parent's directory listing); `rename` purges
/// everything because its blast radius is unknown.
pub struct CachedFileSystem<F> {
    inner: Arc<F>,
    meta: Storage<FileMeta>,
    exists: Storage<bool>,
    contents: Storage<Arc<Vec<u8>>>,
    strings: Storage<Arc<String>>,
    listings: Storage<Arc<Vec<PathBuf>>>,
}

impl<F: FileSystem> CachedFileSystem<F> {
    /// Wrap `inner`, caching read results for `duration`.
    pub fn new(inner: F, duration: Duration) -> Self {
        Self::from_arc(Arc::new(inner), duration)
    }

    pub fn from_arc(inner: Arc<F>, duration: Duration) -> Self {
        Self {
            inner,
            meta: Storage::new(duration),
            exists: Storage::new(duration),
            contents: Storage::new(duration),
            strings: Storage::new(duration),
            listings: Storage::new(duration),
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<F> {
        &self.inner
    }

    /// Drop cached results for `path` and everything under it.
    pub fn purge(&self, path: &Path) {
        self.meta.purge(path);
        self.exists.purge(path);
        self.contents.purge(path);
        self.strings.purge(path);
        self.listings.purge(path);
        if let Some(parent) = path.parent() {
            // The parent's listing may still name the purged path.
            self.listings.purge(parent);
        }
    }

    pub fn purge_all(&self) {
        self.meta.purge_all();
        self.exists.purge_all();
        self.contents.purge_all();
        self.strings.purge_all();
        self.listings.purge_all();
    }
}

#[async_trait]
impl<F: FileSystem> FileSystem for CachedFileSystem<F> {
    async fn metadata(&self, path: &Path) -> FsResult<FileMeta> {
        if let Some(meta) = self.meta.get(path) {
            return Ok(meta);
        }
        let meta = self.inner.metadata(path).await?;
        self.meta.insert(path, meta);
        Ok(meta)
    }

    async fn exists(&self, path: &Path) -> bool {
        if let Some(known) = self.exists.get(path) {
            return known;
        }
        let known = self.inner.exists(path).await;
        self.exists.insert(path, known);
        known
    }

    async fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        if let Some(contents) = self.contents.get(path) {
            return Ok(contents.as_ref().clone());
        }
        let contents = self.inner.read(path).await?;
        self.contents.insert(path, Arc::new(contents.clone()));
        Ok(contents)
    }

    async fn read_to_string(&self, path: &Path) -> FsResult<String> {
        if let Some(contents) = self.strings.get(path) {
            return Ok(contents.as_ref().clone());
        }
        let contents = self.inner.read_to_string(path).await?;
        self.strings.insert(path, Arc::new(contents.clone()));
        Ok(contents)
    }

    async fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        if let Some(listing) = self.listings.get(path) {
            return Ok(listing.as_ref().clone());
        }
        let listing = self.inner.read_dir(path).await?;
        self.listings.insert(path, Arc::new(listing.clone()));
        Ok(listing)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> FsResult<()> {
        self.inner.write(path, contents).await?;
        self.purge(path);
        Ok(())
    }

    async fn mkdirp(&self, path: &Path) -> FsResult<()> {
        self.inner.mkdirp(path).await?;
        self.purge(path);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> FsResult<()> {
        self.inner.remove(path).await?;
        self.purge(path);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.inner.rename(from, to).await?;
        tracing::trace!(from = %from.display(), to = %to.display(), "rename purges read cache");
        self.purge_all();
        Ok(())
    }
}
