//! Durable backend over `tokio::fs`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{FsError, FsResult};
use crate::{FileMeta, FileSystem};

/// OS-backed filesystem. Writes go through a temporary sibling file and a
/// rename so concurrent readers never observe a partial file.
#[derive(Debug, Clone, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn metadata(&self, path: &Path) -> FsResult<FileMeta> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| FsError::io("stat", path, e))?;
        Ok(FileMeta {
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            len: meta.len(),
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| FsError::io("read", path, e))
    }

    async fn read_to_string(&self, path: &Path) -> FsResult<String> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                FsError::InvalidUtf8(path.to_path_buf())
            } else {
                FsError::io("read", path, e)
            }
        })
    }

    async fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::io("readdir", path, e))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::io("readdir", path, e))?
        {
            paths.push(entry.path());
        }
        Ok(paths)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> FsResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::io("mkdirp", parent, e))?;
        }

        // Temp file + rename keeps the destination atomic for readers.
        let tmp = temp_sibling(path);
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| FsError::io("write", &tmp, e))?;
        match tokio::fs::rename(&tmp, path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(FsError::io("rename", path, e))
            }
        }
    }

    async fn mkdirp(&self, path: &Path) -> FsResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| FsError::io("mkdirp", path, e))
    }

    async fn remove(&self, path: &Path) -> FsResult<()> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::io("stat", path, e)),
        };
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io("remove", path, e)),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| FsError::io("rename", from, e))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    name.push_str(".kiln-tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parents_and_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFileSystem::new();
        let path = dir.path().join("a/b/c.txt");

        fs.write(&path, b"hello").await.unwrap();
        assert_eq!(fs.read_to_string(&path).await.unwrap(), "hello");
        assert!(fs.exists(&path).await);
        // no temp file left behind
        let entries = fs.read_dir(path.parent().unwrap()).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_recursive_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFileSystem::new();
        let tree = dir.path().join("tree");

        fs.write(&tree.join("x/y.txt"), b"y").await.unwrap();
        fs.remove(&tree).await.unwrap();
        assert!(!fs.exists(&tree).await);
        // absent path is fine
        fs.remove(&tree).await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata_distinguishes_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFileSystem::new();
        let file = dir.path().join("f.txt");
        fs.write(&file, b"x").await.unwrap();

        let meta = fs.metadata(&file).await.unwrap();
        assert!(meta.is_file);
        assert!(!meta.is_dir);
        assert_eq!(meta.len, 1);

        let meta = fs.metadata(dir.path()).await.unwrap();
        assert!(meta.is_dir);
    }

    #[tokio::test]
    async fn test_read_missing_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFileSystem::new();
        let err = fs.read(&dir.path().join("nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
