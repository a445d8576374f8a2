//! The build orchestrator.
//!
//! [`Builder`] drives the pipeline: status transition, hook emission,
//! output directory recreation, page validation, template
//! materialization, plugin resolution and the per-target adapter fan-out
//! (sequential in production, concurrent in dev). In dev mode the
//! completed build arms the watch multiplexer; framework/custom events
//! regenerate templates, restart events surface through the hook bus for
//! the embedding process to act on.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use kiln_fs::FileSystem;

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::hooks::TemplateActivity;
use crate::plugin::resolve_plugins;
use crate::status::BuildStatus;
use crate::target::{BundlerAdapter, Target};
use crate::template::TemplateEngine;
use crate::watch::{route_events, WatchDomain, WatchMultiplexer};

pub struct Builder {
    ctx: Arc<BuildContext>,
    adapters: Vec<Arc<dyn BundlerAdapter>>,
    status: RwLock<BuildStatus>,
    /// Single-flight guard: at most one pipeline runs at a time.
    build_lock: Mutex<()>,
    /// Bumped once per completed pipeline. A caller that sees the count
    /// move while waiting for the lock adopts that pipeline's outcome
    /// instead of running another one.
    generation: AtomicU64,
    last_error: SyncMutex<Option<String>>,
    /// Decided by page validation, reused by watch-triggered regeneration.
    default_page: AtomicBool,
    mux: SyncMutex<Option<Arc<WatchMultiplexer>>>,
    tasks: SyncMutex<Vec<JoinHandle<()>>>,
}

impl Builder {
    /// Validate the configuration and assemble a builder. Adapters for
    /// targets the config does not enable are kept but never invoked.
    pub fn new(
        ctx: Arc<BuildContext>,
        adapters: Vec<Arc<dyn BundlerAdapter>>,
    ) -> Result<Arc<Self>> {
        ctx.config.validate(&ctx.root)?;
        Ok(Arc::new(Self {
            ctx,
            adapters,
            status: RwLock::new(BuildStatus::Initial),
            build_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            last_error: SyncMutex::new(None),
            default_page: AtomicBool::new(false),
            mux: SyncMutex::new(None),
            tasks: SyncMutex::new(Vec::new()),
        }))
    }

    pub fn status(&self) -> BuildStatus {
        *self.status.read()
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    /// Run a full build.
    ///
    /// In dev mode a builder that already reached [`BuildStatus::BuildDone`]
    /// returns immediately; stacked rebuild signals must not re-run the
    /// pipeline. Concurrent callers coalesce: whoever takes the build lock
    /// first runs the pipeline, the others adopt its outcome.
    pub async fn build(self: &Arc<Self>) -> Result<()> {
        if self.ctx.config.dev && self.status().is_done() {
            tracing::debug!("build already done, skipping");
            return Ok(());
        }

        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.build_lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != observed {
            return match self.last_error.lock().clone() {
                None => Ok(()),
                Some(message) => Err(BuildError::Custom(message)),
            };
        }

        let result = self.run_pipeline().await;
        *self.last_error.lock() = result.as_ref().err().map(ToString::to_string);
        self.generation.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn run_pipeline(self: &Arc<Self>) -> Result<()> {
        self.ctx.reset_cancel();
        *self.status.write() = BuildStatus::Building;
        tracing::info!(dev = self.ctx.config.dev, "build started");

        let hooks = self.ctx.hooks.clone();
        hooks.emit_build_before(&self.ctx.config.build).await?;
        self.checkpoint()?;

        self.recreate_build_dirs().await?;
        hooks.emit_build_resources(&self.ctx.memory).await?;
        self.checkpoint()?;

        let default_page = self.validate_pages().await?;
        self.default_page.store(default_page, Ordering::SeqCst);
        self.checkpoint()?;

        self.generate_templates(default_page).await?;
        self.checkpoint()?;

        self.run_adapters().await?;
        self.checkpoint()?;

        *self.status.write() = BuildStatus::BuildDone;
        hooks.emit_build_done().await?;
        tracing::info!("build done");

        if self.ctx.config.build.analyze {
            tracing::info!("analyze mode: inspect the bundler reports under the dist directory");
        }
        if self.ctx.config.dev {
            self.watch().await?;
        }
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        if self.ctx.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Output directories, derived from the enabled targets.
    fn build_dirs(&self) -> Vec<PathBuf> {
        let build = self.ctx.build_dir();
        let root = &self.ctx.root;
        let dir = &self.ctx.config.dir;
        let mut dirs = vec![build.join("app"), build.join("dist")];
        if self.ctx.targets.browser_enabled() {
            dirs.push(dir.in_dist(root, &dir.dist.client));
            dirs.push(dir.in_dist(root, &dir.dist.server));
        }
        if self.ctx.targets.weex_enabled() {
            dirs.push(dir.in_dist(root, &dir.dist.weex));
        }
        dirs
    }

    async fn recreate_build_dirs(&self) -> Result<()> {
        let build = self.ctx.build_dir();
        let dirs = self.build_dirs();
        let backends: [&dyn FileSystem; 2] =
            [self.ctx.disk.as_ref() as &dyn FileSystem, self.ctx.memory.as_ref()];
        for fs in backends {
            fs.remove(&build.join("app")).await?;
            fs.remove(&build.join("dist")).await?;
            for dir in &dirs {
                fs.mkdirp(dir).await?;
            }
        }
        Ok(())
    }

    /// Page existence check for the page-based (browser) target. Absent
    /// pages directory with no route generator is fatal, unless a pages
    /// directory next to the source tree suggests a misconfigured `src`;
    /// then degrade to a warning and materialize the built-in default
    /// page.
    async fn validate_pages(&self) -> Result<bool> {
        if !self.ctx.targets.browser_enabled() {
            return Ok(false);
        }
        let dir = &self.ctx.config.dir;
        let src = self.ctx.src_dir();
        let pages = dir.in_src(&self.ctx.root, &dir.pages);
        if self.ctx.disk.exists(&pages).await {
            return Ok(false);
        }
        if self.ctx.route_generator().is_some() {
            return Ok(false);
        }
        let sibling = src.parent().map(|p| p.join(&self.ctx.config.dir.pages));
        if let Some(sibling) = sibling {
            if self.ctx.disk.exists(&sibling).await {
                tracing::warn!(
                    found = %sibling.display(),
                    expected = %pages.display(),
                    "pages directory found outside the source tree, using the default page"
                );
                return Ok(true);
            }
        }
        Err(BuildError::MissingPagesDir { pages, src })
    }

    async fn generate_templates(&self, default_page: bool) -> Result<()> {
        let config = self.ctx.config.clone();
        let engine = TemplateEngine::new(
            config.clone(),
            self.ctx.root.clone(),
            self.ctx.disk.clone() as Arc<dyn FileSystem>,
        );

        let manifest = engine.load_manifest().await?;
        engine.validate_dependencies(&manifest).await?;

        let plugins = resolve_plugins(
            self.ctx.disk.as_ref(),
            &self.ctx.root,
            &config.extensions,
            &config.plugins,
        )
        .await?;

        let plan = engine.plan(&manifest, &self.ctx.targets, default_page).await?;
        for path in &plan.watch_paths {
            self.ctx.register_watch_path(path.clone());
        }

        let vars = engine.vars(&plugins);
        let activity = TemplateActivity {
            files: plan.files.clone(),
            vars: vars.clone(),
        };
        self.ctx.hooks.emit_build_templates(&activity).await?;

        let written = engine.write_plan(&plan, &vars).await?;
        for path in &written {
            tracing::debug!(file = %self.ctx.relative_to_build(path).display(), "template materialized");
        }
        Ok(())
    }

    /// Invoke every enabled target's adapter. Production runs them in
    /// declared order with no overlap; dev starts them all and settles
    /// when every one has, reporting the first failure.
    async fn run_adapters(self: &Arc<Self>) -> Result<()> {
        let enabled: Vec<Arc<dyn BundlerAdapter>> = self
            .adapters
            .iter()
            .filter(|a| self.ctx.targets.contains(a.target()))
            .cloned()
            .collect();

        if !self.ctx.config.dev {
            for adapter in enabled {
                let target = adapter.target();
                tracing::info!(target = %target, "compiling");
                if let Err(err) = adapter.build(&self.ctx).await {
                    return Err(self.target_error(target, err));
                }
            }
            return Ok(());
        }

        let mut handles = Vec::with_capacity(enabled.len());
        for adapter in enabled {
            let ctx = self.ctx.clone();
            handles.push(tokio::spawn(async move {
                let target = adapter.target();
                tracing::info!(target = %target, "compiling");
                (target, adapter.build(&ctx).await)
            }));
        }

        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((target, Err(err))) => {
                    if first_error.is_none() {
                        first_error = Some(self.target_error(target, err));
                    }
                }
                Err(join) => {
                    if first_error.is_none() {
                        first_error = Some(BuildError::Custom(format!(
                            "adapter task failed: {join}"
                        )));
                    }
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn target_error(&self, target: Target, err: BuildError) -> BuildError {
        if self.ctx.config.build.quiet && !self.ctx.config.dev {
            BuildError::TargetDiagnostic {
                target,
                diagnostic: err.to_string(),
            }
        } else {
            tracing::error!(target = %target, error = %err, "target build failed");
            BuildError::TargetFailed { target }
        }
    }

    /// Arm the three watch domains and spawn the routing tasks. Called
    /// after a completed dev build; calling again replaces the previous
    /// watcher set.
    async fn watch(self: &Arc<Self>) -> Result<()> {
        self.teardown_watchers();

        let config = &self.ctx.config;
        let root = &self.ctx.root;

        let framework = vec![
            config.dir.in_src(root, &config.dir.layouts),
            config.dir.in_src(root, &config.dir.store),
            config.dir.in_src(root, &config.dir.middleware),
        ];

        let mut custom: Vec<PathBuf> = config.build.watch.iter().map(|p| root.join(p)).collect();
        custom.extend(config.build.browser.watch.iter().map(|p| root.join(p)));
        custom.extend(config.build.weex.watch.iter().map(|p| root.join(p)));
        custom.extend(config.build.browser.style_resources.values().map(|p| root.join(p)));
        custom.extend(self.ctx.extra_watch_paths());

        let mut restart: Vec<PathBuf> =
            config.server_middleware.iter().map(|p| root.join(p)).collect();
        restart.extend(config.watch.iter().map(|p| root.join(p)));

        let (mux, rx) = WatchMultiplexer::new(config.extensions.clone());
        mux.arm(WatchDomain::Framework, &framework)?;
        mux.arm(WatchDomain::Custom, &custom)?;
        mux.arm(WatchDomain::Restart, &restart)?;

        let (regen_tx, mut regen_rx) = mpsc::channel(1);
        let debounce = Duration::from_millis(config.build.debounce_ms);
        let router = tokio::spawn(route_events(rx, debounce, self.ctx.hooks.clone(), regen_tx));

        let builder = self.clone();
        let regen = tokio::spawn(async move {
            while regen_rx.recv().await.is_some() {
                let default_page = builder.default_page.load(Ordering::SeqCst);
                if let Err(err) = builder.generate_templates(default_page).await {
                    tracing::error!(error = %err, "template regeneration failed");
                }
            }
        });

        *self.mux.lock() = Some(mux);
        self.tasks.lock().extend([router, regen]);
        Ok(())
    }

    fn teardown_watchers(&self) {
        if let Some(mux) = self.mux.lock().take() {
            mux.unwatch_all();
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    /// Close all live watchers and tell every adapter to stop watching.
    /// Safe to call repeatedly and with no watchers armed.
    pub async fn unwatch(&self) -> Result<()> {
        self.teardown_watchers();
        for adapter in &self.adapters {
            adapter.unwatch().await?;
        }
        Ok(())
    }

    /// Tear the builder down. Idempotent at [`BuildStatus::Initial`]. A
    /// pipeline in flight observes the cancellation flag at its next
    /// stage boundary.
    pub async fn close(&self) -> Result<()> {
        {
            let mut status = self.status.write();
            if status.is_initial() {
                return Ok(());
            }
            *status = BuildStatus::Initial;
        }
        self.ctx.cancel();
        self.unwatch().await?;
        for adapter in &self.adapters {
            adapter.close().await?;
        }
        self.ctx.hooks.emit_close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kiln_config::KilnConfig;

    fn project() -> (tempfile::TempDir, Arc<BuildContext>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/pages")).unwrap();
        let ctx = Arc::new(BuildContext::new(KilnConfig::default(), dir.path()));
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_close_at_initial_is_a_noop() {
        let (_dir, ctx) = project();
        let builder = Builder::new(ctx, Vec::new()).unwrap();
        assert_eq!(builder.status(), BuildStatus::Initial);
        builder.close().await.unwrap();
        builder.close().await.unwrap();
        assert_eq!(builder.status(), BuildStatus::Initial);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        // no src directory
        let ctx = Arc::new(BuildContext::new(KilnConfig::default(), dir.path()));
        assert!(Builder::new(ctx, Vec::new()).is_err());
    }

    #[tokio::test]
    async fn test_build_dirs_follow_targets() {
        let (_dir, ctx) = project();
        let build = ctx.build_dir();
        let builder = Builder::new(ctx, Vec::new()).unwrap();
        let dirs = builder.build_dirs();
        assert!(dirs.contains(&build.join("app")));
        assert!(dirs.contains(&build.join("dist/client")));
        assert!(dirs.contains(&build.join("dist/server")));
        assert!(!dirs.contains(&build.join("dist/weex")));
    }

    #[tokio::test]
    async fn test_unwatch_without_watchers_is_safe() {
        let (_dir, ctx) = project();
        let builder = Builder::new(ctx, Vec::new()).unwrap();
        builder.unwatch().await.unwrap();
        builder.unwatch().await.unwrap();
    }
}
