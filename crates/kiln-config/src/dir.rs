//! Project directory layout.
//!
//! All paths are relative until resolved against the project root; the
//! `resolve_*` helpers produce absolute paths the builder and watchers use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory map for a kiln project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirConfig {
    /// Application source tree.
    #[serde(default = "default_src")]
    pub src: PathBuf,

    /// Generated build tree (templates land under `<build>/app`, compiled
    /// output under `<build>/dist`).
    #[serde(default = "default_build")]
    pub build: PathBuf,

    #[serde(default = "default_pages")]
    pub pages: PathBuf,

    #[serde(default = "default_layouts")]
    pub layouts: PathBuf,

    #[serde(default = "default_store")]
    pub store: PathBuf,

    #[serde(default = "default_middleware")]
    pub middleware: PathBuf,

    #[serde(default)]
    pub dist: DistDirs,
}

/// Per-target compiled output directories, all under `<build>/dist`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistDirs {
    #[serde(default = "default_dist_client")]
    pub client: PathBuf,

    #[serde(default = "default_dist_server")]
    pub server: PathBuf,

    #[serde(default = "default_dist_weex")]
    pub weex: PathBuf,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            build: default_build(),
            pages: default_pages(),
            layouts: default_layouts(),
            store: default_store(),
            middleware: default_middleware(),
            dist: DistDirs::default(),
        }
    }
}

impl Default for DistDirs {
    fn default() -> Self {
        Self {
            client: default_dist_client(),
            server: default_dist_server(),
            weex: default_dist_weex(),
        }
    }
}

impl DirConfig {
    /// Absolute source directory.
    pub fn resolve_src(&self, root: &Path) -> PathBuf {
        root.join(&self.src)
    }

    /// Absolute build directory.
    pub fn resolve_build(&self, root: &Path) -> PathBuf {
        root.join(&self.build)
    }

    /// Absolute path of a source subdirectory (`pages`, `layouts`, ...).
    pub fn in_src(&self, root: &Path, sub: &Path) -> PathBuf {
        self.resolve_src(root).join(sub)
    }

    /// Absolute path of a dist subdirectory under the build tree.
    pub fn in_dist(&self, root: &Path, sub: &Path) -> PathBuf {
        self.resolve_build(root).join("dist").join(sub)
    }
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_build() -> PathBuf {
    PathBuf::from(".kiln")
}

fn default_pages() -> PathBuf {
    PathBuf::from("pages")
}

fn default_layouts() -> PathBuf {
    PathBuf::from("layouts")
}

fn default_store() -> PathBuf {
    PathBuf::from("store")
}

fn default_middleware() -> PathBuf {
    PathBuf::from("middleware")
}

fn default_dist_client() -> PathBuf {
    PathBuf::from("client")
}

fn default_dist_server() -> PathBuf {
    PathBuf::from("server")
}

fn default_dist_weex() -> PathBuf {
    PathBuf::from("weex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let dir = DirConfig::default();
        assert_eq!(dir.src, PathBuf::from("src"));
        assert_eq!(dir.build, PathBuf::from(".kiln"));
        assert_eq!(dir.dist.server, PathBuf::from("server"));
    }

    #[test]
    fn test_resolution() {
        let dir = DirConfig::default();
        let root = Path::new("/project");
        assert_eq!(dir.resolve_build(root), PathBuf::from("/project/.kiln"));
        assert_eq!(
            dir.in_src(root, &dir.pages),
            PathBuf::from("/project/src/pages")
        );
        assert_eq!(
            dir.in_dist(root, &dir.dist.client),
            PathBuf::from("/project/.kiln/dist/client")
        );
    }
}
