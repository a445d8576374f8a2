//! # kiln-fs
//!
//! Filesystem abstraction for the kiln build orchestrator.
//!
//! The builder and template engine talk to a uniform async [`FileSystem`]
//! trait. Two backends ship here: [`OsFileSystem`] (durable, tokio-backed)
//! and [`MemoryFileSystem`] (ephemeral, used for fast dev iteration). The
//! [`CachedFileSystem`] decorator wraps either backend with time-boxed
//! read caching and write-triggered invalidation.
//!
//! Repeated reads of the same path within the cache window may return
//! stale-but-consistent data. That is acceptable for kiln because template
//! generation is the only writer during a build pass.

pub mod cached;
pub mod error;
pub mod memory;
pub mod os;
pub mod storage;

pub use cached::CachedFileSystem;
pub use error::{FsError, FsResult};
pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Lightweight stat result, cheap to cache and clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub is_file: bool,
    pub is_dir: bool,
    pub len: u64,
}

/// Uniform async filesystem surface.
///
/// All mutating operations are expected to create parent directories as
/// documented per method; `remove` is recursive and succeeds on absent
/// paths so teardown code never has to pre-check.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn metadata(&self, path: &Path) -> FsResult<FileMeta>;

    /// Existence probe; never errors (I/O failures read as absent).
    async fn exists(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> FsResult<Vec<u8>>;

    async fn read_to_string(&self, path: &Path) -> FsResult<String>;

    /// Immediate children of a directory, unsorted order not guaranteed.
    async fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>>;

    /// Write a file, creating parent directories as needed. Implementations
    /// must not leave a partially written file observable on failure.
    async fn write(&self, path: &Path, contents: &[u8]) -> FsResult<()>;

    async fn mkdirp(&self, path: &Path) -> FsResult<()>;

    /// Recursive delete; absent paths are not an error.
    async fn remove(&self, path: &Path) -> FsResult<()>;

    async fn rename(&self, from: &Path, to: &Path) -> FsResult<()>;
}
