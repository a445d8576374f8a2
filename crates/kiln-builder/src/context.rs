//! Build context: resolved config plus injected collaborators.
//!
//! The original's inheritance chain (build module -> builder -> context)
//! collapses into this one value object, passed explicitly to everything
//! that needs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use kiln_config::KilnConfig;
use kiln_fs::{CachedFileSystem, MemoryFileSystem, OsFileSystem};

use crate::hooks::HookBus;
use crate::target::TargetSet;

/// How long read results stay cached on the durable filesystem. Template
/// generation is the only writer during a build pass, so a short window
/// is safe.
const READ_CACHE_DURATION: Duration = Duration::from_secs(4);

/// Declarative route generator injected by embedders that do not use a
/// `pages/` directory.
pub type RouteGenerator = Arc<dyn Fn(&Path) -> Vec<String> + Send + Sync>;

pub struct BuildContext {
    pub config: KilnConfig,
    /// Project root every relative config path resolves against.
    pub root: PathBuf,
    /// Durable backend with time-boxed read caching.
    pub disk: Arc<CachedFileSystem<OsFileSystem>>,
    /// Ephemeral backend for dev-mode fast iteration.
    pub memory: Arc<MemoryFileSystem>,
    pub hooks: HookBus,
    pub targets: TargetSet,
    route_generator: Option<RouteGenerator>,
    /// Extra paths (template overrides, custom template sources) folded
    /// into the custom watch domain at arm time.
    extra_watch: parking_lot::Mutex<Vec<PathBuf>>,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl BuildContext {
    pub fn new(config: KilnConfig, root: impl Into<PathBuf>) -> Self {
        let targets = TargetSet::from_config(&config);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            config,
            root: root.into(),
            disk: Arc::new(CachedFileSystem::new(
                OsFileSystem::new(),
                READ_CACHE_DURATION,
            )),
            memory: Arc::new(MemoryFileSystem::new()),
            hooks: HookBus::new(),
            targets,
            route_generator: None,
            extra_watch: parking_lot::Mutex::new(Vec::new()),
            cancel_tx,
            cancel_rx,
        }
    }

    pub fn with_route_generator(mut self, generator: RouteGenerator) -> Self {
        self.route_generator = Some(generator);
        self
    }

    pub fn route_generator(&self) -> Option<&RouteGenerator> {
        self.route_generator.as_ref()
    }

    pub fn src_dir(&self) -> PathBuf {
        self.config.dir.resolve_src(&self.root)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.config.dir.resolve_build(&self.root)
    }

    /// Generated entry sources live here.
    pub fn app_dir(&self) -> PathBuf {
        self.build_dir().join("app")
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.build_dir().join("dist")
    }

    /// Path of a generated file relative to the build dir, for logs and
    /// template vars.
    pub fn relative_to_build(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.build_dir())
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    pub fn register_watch_path(&self, path: PathBuf) {
        let mut extra = self.extra_watch.lock();
        if !extra.contains(&path) {
            extra.push(path);
        }
    }

    pub fn extra_watch_paths(&self) -> Vec<PathBuf> {
        self.extra_watch.lock().clone()
    }

    /// Signal an in-flight pipeline to stop at the next stage boundary.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Reset the cancellation flag at pipeline start.
    pub(crate) fn reset_cancel(&self) {
        let _ = self.cancel_tx.send(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_resolution() {
        let ctx = BuildContext::new(KilnConfig::default(), "/project");
        assert_eq!(ctx.src_dir(), PathBuf::from("/project/src"));
        assert_eq!(ctx.app_dir(), PathBuf::from("/project/.kiln/app"));
        assert_eq!(ctx.dist_dir(), PathBuf::from("/project/.kiln/dist"));
        assert_eq!(
            ctx.relative_to_build(Path::new("/project/.kiln/app/App.js")),
            PathBuf::from("app/App.js")
        );
    }

    #[test]
    fn test_cancellation_flag() {
        let ctx = BuildContext::new(KilnConfig::default(), "/project");
        assert!(!ctx.is_cancelled());
        ctx.cancel();
        assert!(ctx.is_cancelled());
        ctx.reset_cancel();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_register_watch_path_dedupes() {
        let ctx = BuildContext::new(KilnConfig::default(), "/project");
        ctx.register_watch_path(PathBuf::from("/a"));
        ctx.register_watch_path(PathBuf::from("/a"));
        ctx.register_watch_path(PathBuf::from("/b"));
        assert_eq!(ctx.extra_watch_paths().len(), 2);
    }
}
