//! Ephemeral in-memory backend used for dev-mode fast iteration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{FsError, FsResult};
use crate::{FileMeta, FileSystem};

#[derive(Default)]
struct Nodes {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

/// In-memory filesystem. Parent directories are created implicitly on
/// write, matching what the builder expects after its mkdirp pass.
///
/// The mutation counter exists so tests can assert that a no-op rebuild
/// really touched nothing.
#[derive(Default)]
pub struct MemoryFileSystem {
    nodes: RwLock<Nodes>,
    mutations: AtomicU64,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls (`write`, `mkdirp`, `remove`, `rename`)
    /// performed since construction.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    fn add_parents(nodes: &mut Nodes, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            nodes.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn is_dir(nodes: &Nodes, path: &Path) -> bool {
        nodes.dirs.contains(path) || nodes.files.keys().any(|f| f.starts_with(path) && f != path)
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn metadata(&self, path: &Path) -> FsResult<FileMeta> {
        let nodes = self.nodes.read();
        if let Some(contents) = nodes.files.get(path) {
            return Ok(FileMeta {
                is_file: true,
                is_dir: false,
                len: contents.len() as u64,
            });
        }
        if Self::is_dir(&nodes, path) {
            return Ok(FileMeta {
                is_file: false,
                is_dir: true,
                len: 0,
            });
        }
        Err(FsError::NotFound(path.to_path_buf()))
    }

    async fn exists(&self, path: &Path) -> bool {
        let nodes = self.nodes.read();
        nodes.files.contains_key(path) || Self::is_dir(&nodes, path)
    }

    async fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        self.nodes
            .read()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    async fn read_to_string(&self, path: &Path) -> FsResult<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_path_buf()))
    }

    async fn read_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        let nodes = self.nodes.read();
        if !Self::is_dir(&nodes, path) {
            return if nodes.files.contains_key(path) {
                Err(FsError::NotADirectory(path.to_path_buf()))
            } else {
                Err(FsError::NotFound(path.to_path_buf()))
            };
        }

        let mut children = BTreeSet::new();
        for candidate in nodes.files.keys().chain(nodes.dirs.iter()) {
            if let Ok(rest) = candidate.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    children.insert(path.join(first.as_os_str()));
                }
            }
        }
        Ok(children.into_iter().collect())
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> FsResult<()> {
        self.bump();
        let mut nodes = self.nodes.write();
        Self::add_parents(&mut nodes, path);
        nodes.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    async fn mkdirp(&self, path: &Path) -> FsResult<()> {
        self.bump();
        let mut nodes = self.nodes.write();
        nodes.dirs.insert(path.to_path_buf());
        Self::add_parents(&mut nodes, path);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> FsResult<()> {
        self.bump();
        let mut nodes = self.nodes.write();
        nodes.files.retain(|p, _| !p.starts_with(path));
        nodes.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.bump();
        let mut nodes = self.nodes.write();
        if let Some(contents) = nodes.files.remove(from) {
            Self::add_parents(&mut nodes, to);
            nodes.files.insert(to.to_path_buf(), contents);
            return Ok(());
        }
        if nodes.dirs.contains(from) || Self::is_dir(&nodes, from) {
            let moved: Vec<(PathBuf, Vec<u8>)> = nodes
                .files
                .iter()
                .filter_map(|(p, c)| {
                    p.strip_prefix(from)
                        .ok()
                        .map(|rest| (to.join(rest), c.clone()))
                })
                .collect();
            nodes.files.retain(|p, _| !p.starts_with(from));
            nodes.dirs.retain(|p| !p.starts_with(from));
            nodes.dirs.insert(to.to_path_buf());
            for (p, c) in moved {
                Self::add_parents(&mut nodes, &p);
                nodes.files.insert(p, c);
            }
            return Ok(());
        }
        Err(FsError::NotFound(from.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_roundtrip_with_implicit_dirs() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/app/router/index.js");
        fs.write(path, b"export {}").await.unwrap();

        assert!(fs.exists(path).await);
        assert!(fs.exists(Path::new("/app/router")).await);
        assert!(fs.metadata(Path::new("/app")).await.unwrap().is_dir);
        assert_eq!(fs.read_to_string(path).await.unwrap(), "export {}");
    }

    #[tokio::test]
    async fn test_read_dir_lists_immediate_children() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/app/a.js"), b"").await.unwrap();
        fs.write(Path::new("/app/sub/b.js"), b"").await.unwrap();

        let mut entries = fs.read_dir(Path::new("/app")).await.unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![PathBuf::from("/app/a.js"), PathBuf::from("/app/sub")]
        );
    }

    #[tokio::test]
    async fn test_remove_subtree() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/build/app/x.js"), b"x").await.unwrap();
        fs.write(Path::new("/build/dist/y.js"), b"y").await.unwrap();

        fs.remove(Path::new("/build/app")).await.unwrap();
        assert!(!fs.exists(Path::new("/build/app/x.js")).await);
        assert!(fs.exists(Path::new("/build/dist/y.js")).await);
    }

    #[tokio::test]
    async fn test_mutation_counter() {
        let fs = MemoryFileSystem::new();
        assert_eq!(fs.mutation_count(), 0);
        fs.write(Path::new("/a"), b"1").await.unwrap();
        fs.mkdirp(Path::new("/b")).await.unwrap();
        fs.remove(Path::new("/a")).await.unwrap();
        assert_eq!(fs.mutation_count(), 3);
        // reads do not count
        let _ = fs.exists(Path::new("/b")).await;
        assert_eq!(fs.mutation_count(), 3);
    }

    #[tokio::test]
    async fn test_rename_directory() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/old/a.js"), b"a").await.unwrap();
        fs.rename(Path::new("/old"), Path::new("/new")).await.unwrap();
        assert!(!fs.exists(Path::new("/old/a.js")).await);
        assert_eq!(fs.read(Path::new("/new/a.js")).await.unwrap(), b"a");
    }
}
