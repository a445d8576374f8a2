//! File-change multiplexing.
//!
//! Three watch domains, each with its own path set and event filter,
//! funnel into one channel. A router task debounces framework/custom
//! events into a single template-regeneration signal and forwards restart
//! events to the hook bus immediately. The intake is channel-based so the
//! routing logic is testable with synthetic events.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::hooks::{HookBus, RestartRequest};

/// The three independently-scoped watcher slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchDomain {
    /// Structurally significant framework directories (layouts, store,
    /// middleware). Create/remove only: new or vanished files change the
    /// generated manifest, edits do not.
    Framework,
    /// User-declared watch paths and style resources. Modify only.
    Custom,
    /// Server middleware and top-level watch paths. Any event here means
    /// the whole process is stale.
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Create,
    Modify,
    Remove,
}

impl std::fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WatchEventKind::Create => "create",
            WatchEventKind::Modify => "change",
            WatchEventKind::Remove => "remove",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub domain: WatchDomain,
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

/// Registry of live watcher instances, at most one per domain.
pub struct WatchMultiplexer {
    entries: Mutex<HashMap<WatchDomain, RecommendedWatcher>>,
    tx: mpsc::UnboundedSender<WatchEvent>,
    /// Source extensions the framework domain reacts to.
    extensions: Vec<String>,
}

impl WatchMultiplexer {
    pub fn new(extensions: Vec<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                entries: Mutex::new(HashMap::new()),
                tx,
                extensions,
            }),
            rx,
        )
    }

    /// Attach a watcher for `domain` over `paths`. A previous instance in
    /// the slot is closed before the new one is registered. Paths that do
    /// not exist yet are skipped with a warning. Pre-existing files are
    /// not replayed; only changes after attach produce events.
    pub fn arm(&self, domain: WatchDomain, paths: &[PathBuf]) -> Result<()> {
        let tx = self.tx.clone();
        let extensions = self.extensions.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let Some(kind) = map_kind(&event.kind) else {
                        return;
                    };
                    if !domain_accepts(domain, kind) {
                        return;
                    }
                    for path in event.paths {
                        if domain == WatchDomain::Framework
                            && !has_watched_extension(&path, &extensions)
                        {
                            continue;
                        }
                        let _ = tx.send(WatchEvent { domain, kind, path });
                    }
                }
                Err(err) => {
                    tracing::warn!(?domain, error = %err, "watcher error");
                }
            })?;

        for path in paths {
            if !path.exists() {
                tracing::warn!(path = %path.display(), ?domain, "watch path does not exist, skipping");
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            tracing::debug!(path = %path.display(), ?domain, "watching");
        }

        // Dropping a displaced watcher closes it.
        self.entries.lock().insert(domain, watcher);
        Ok(())
    }

    /// Close every live watcher. Safe to call repeatedly and with no
    /// watchers armed.
    pub fn unwatch_all(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            tracing::debug!(count = entries.len(), "closing watchers");
        }
        entries.clear();
    }

    pub fn is_armed(&self, domain: WatchDomain) -> bool {
        self.entries.lock().contains_key(&domain)
    }

    /// Feed a synthetic event through the same channel the notify
    /// callbacks use.
    pub fn inject(&self, event: WatchEvent) {
        let _ = self.tx.send(event);
    }
}

fn map_kind(kind: &notify::EventKind) -> Option<WatchEventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(WatchEventKind::Create),
        notify::EventKind::Modify(_) => Some(WatchEventKind::Modify),
        notify::EventKind::Remove(_) => Some(WatchEventKind::Remove),
        _ => None,
    }
}

fn domain_accepts(domain: WatchDomain, kind: WatchEventKind) -> bool {
    match domain {
        WatchDomain::Framework => matches!(kind, WatchEventKind::Create | WatchEventKind::Remove),
        WatchDomain::Custom => kind == WatchEventKind::Modify,
        WatchDomain::Restart => true,
    }
}

fn has_watched_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

/// Route events until the channel closes.
///
/// Framework and custom events share one trailing-edge debounce window:
/// a burst collapses into a single message on `regen_tx` sent once the
/// window stays quiet. Restart events bypass the debounce and emit the
/// legacy `watch_file_changed` hook followed by the structured
/// `watch_restart` hook. Hook handler failures are logged, never fatal
/// to the router.
pub async fn route_events(
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
    debounce: Duration,
    hooks: HookBus,
    regen_tx: mpsc::Sender<()>,
) {
    while let Some(event) = rx.recv().await {
        if event.domain == WatchDomain::Restart {
            emit_restart(&hooks, &event).await;
            continue;
        }
        tracing::debug!(path = %event.path.display(), kind = %event.kind, "regeneration trigger");
        // Debounce: swallow further triggers until the window stays quiet,
        // forwarding any restart events that arrive meanwhile.
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(ev) if ev.domain == WatchDomain::Restart => {
                        emit_restart(&hooks, &ev).await;
                    }
                    Some(_) => {}
                    None => {
                        let _ = regen_tx.send(()).await;
                        return;
                    }
                },
                _ = tokio::time::sleep(debounce) => break,
            }
        }
        if regen_tx.send(()).await.is_err() {
            return;
        }
    }
}

async fn emit_restart(hooks: &HookBus, event: &WatchEvent) {
    if let Err(err) = hooks.emit_watch_file_changed(&event.path).await {
        tracing::warn!(error = %err, "watch_file_changed hook failed");
    }
    let request = RestartRequest {
        event: event.kind,
        path: event.path.clone(),
    };
    if let Err(err) = hooks.emit_watch_restart(&request).await {
        tracing::warn!(error = %err, "watch_restart hook failed");
    }
}
