//! Async hook bus for build lifecycle events.
//!
//! Collaborators (the CLI, bundler adapters, tests) register a
//! [`BuildHook`] implementation; every emission invokes handlers in
//! registration order and awaits each one before calling the next. The
//! original duck-typed "maybe a handler exists" style becomes a trait
//! whose methods all default to no-ops, so implementors override only
//! what they observe.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use kiln_config::BuildOptions;
use kiln_fs::MemoryFileSystem;

use crate::error::Result;
use crate::template::ResolvedTemplate;
use crate::watch::WatchEventKind;

/// Structured restart request emitted by the restart watch domain.
#[derive(Debug, Clone)]
pub struct RestartRequest {
    pub event: WatchEventKind,
    pub path: PathBuf,
}

/// Snapshot of a template-materialization pass, handed to hooks before
/// any file is written.
#[derive(Debug, Clone)]
pub struct TemplateActivity {
    pub files: Vec<ResolvedTemplate>,
    /// The merged interpolation context.
    pub vars: serde_json::Value,
}

#[async_trait]
pub trait BuildHook: Send + Sync {
    async fn build_before(&self, _build: &BuildOptions) -> Result<()> {
        Ok(())
    }

    /// Output directories were recreated; the ephemeral filesystem is
    /// empty and ready for this pass.
    async fn build_resources(&self, _memory: &Arc<MemoryFileSystem>) -> Result<()> {
        Ok(())
    }

    async fn build_templates(&self, _activity: &TemplateActivity) -> Result<()> {
        Ok(())
    }

    async fn build_done(&self) -> Result<()> {
        Ok(())
    }

    /// Legacy single-path notification, kept for older hook consumers.
    /// Always emitted immediately before [`BuildHook::watch_restart`].
    async fn watch_file_changed(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn watch_restart(&self, _request: &RestartRequest) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Registry of hook handlers, emission in registration order.
#[derive(Clone, Default)]
pub struct HookBus {
    handlers: Arc<RwLock<Vec<Arc<dyn BuildHook>>>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, hook: Arc<dyn BuildHook>) {
        self.handlers.write().push(hook);
    }

    fn snapshot(&self) -> Vec<Arc<dyn BuildHook>> {
        self.handlers.read().clone()
    }

    pub async fn emit_build_before(&self, build: &BuildOptions) -> Result<()> {
        for hook in self.snapshot() {
            hook.build_before(build).await?;
        }
        Ok(())
    }

    pub async fn emit_build_resources(&self, memory: &Arc<MemoryFileSystem>) -> Result<()> {
        for hook in self.snapshot() {
            hook.build_resources(memory).await?;
        }
        Ok(())
    }

    pub async fn emit_build_templates(&self, activity: &TemplateActivity) -> Result<()> {
        for hook in self.snapshot() {
            hook.build_templates(activity).await?;
        }
        Ok(())
    }

    pub async fn emit_build_done(&self) -> Result<()> {
        for hook in self.snapshot() {
            hook.build_done().await?;
        }
        Ok(())
    }

    pub async fn emit_watch_file_changed(&self, path: &Path) -> Result<()> {
        for hook in self.snapshot() {
            hook.watch_file_changed(path).await?;
        }
        Ok(())
    }

    pub async fn emit_watch_restart(&self, request: &RestartRequest) -> Result<()> {
        for hook in self.snapshot() {
            hook.watch_restart(request).await?;
        }
        Ok(())
    }

    pub async fn emit_close(&self) -> Result<()> {
        for hook in self.snapshot() {
            hook.close().await?;
        }
        Ok(())
    }
}
