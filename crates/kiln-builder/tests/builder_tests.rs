//! End-to-end builder pipeline tests with mock adapters and a recording
//! hook: coalescing, scheduling, validation and teardown behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use std::path::PathBuf;

use kiln_builder::{
    BuildContext, BuildError, BuildHook, BuildStatus, Builder, BundlerAdapter, Result, Target,
    TemplateActivity,
};
use kiln_config::KilnConfig;

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::create_dir_all(dir.path().join("src/pages")).expect("create src/pages");
    dir
}

fn context(dir: &tempfile::TempDir, dev: bool) -> Arc<BuildContext> {
    let config = KilnConfig {
        dev,
        ..KilnConfig::default()
    };
    Arc::new(BuildContext::new(config, dir.path()))
}

#[derive(Default)]
struct RecordingHook {
    events: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl BuildHook for RecordingHook {
    async fn build_before(&self, _build: &kiln_config::BuildOptions) -> Result<()> {
        self.events.lock().push("before");
        Ok(())
    }

    async fn build_done(&self) -> Result<()> {
        self.events.lock().push("done");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.events.lock().push("close");
        Ok(())
    }
}

struct MockAdapter {
    target: Target,
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl MockAdapter {
    fn new(target: Target, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            target,
            delay,
            fail: false,
            calls: AtomicUsize::new(0),
            spans: Mutex::new(Vec::new()),
        })
    }

    fn failing(target: Target) -> Arc<Self> {
        Arc::new(Self {
            target,
            delay: Duration::ZERO,
            fail: true,
            calls: AtomicUsize::new(0),
            spans: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundlerAdapter for MockAdapter {
    fn target(&self) -> Target {
        self.target
    }

    async fn build(&self, _ctx: &BuildContext) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.spans.lock().push((start, Instant::now()));
        if self.fail {
            Err(BuildError::Custom("mock compile failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn full_pipeline_reaches_build_done() {
    let dir = project();
    let ctx = context(&dir, false);
    let hook = Arc::new(RecordingHook::default());
    ctx.hooks.add(hook.clone());

    let adapter = MockAdapter::new(Target::BrowserLegacy, Duration::ZERO);
    let builder = Builder::new(ctx, vec![adapter.clone()]).unwrap();

    builder.build().await.unwrap();
    assert_eq!(builder.status(), BuildStatus::BuildDone);
    assert_eq!(adapter.calls(), 1);
    assert_eq!(*hook.events.lock(), vec!["before", "done"]);

    // generated entries land under the build dir, namespaced per family
    let app = dir.path().join(".kiln/app/browser/App.js");
    assert!(app.is_file(), "expected {app:?}");
    assert!(dir.path().join(".kiln/dist/server").is_dir());
}

#[derive(Default)]
struct TemplatePlanObserver {
    /// Destinations announced through `build:templates`, captured before
    /// any of them was written.
    planned: Mutex<Vec<PathBuf>>,
    all_absent_at_emission: Mutex<Option<bool>>,
}

#[async_trait]
impl BuildHook for TemplatePlanObserver {
    async fn build_templates(&self, activity: &TemplateActivity) -> Result<()> {
        let absent = activity.files.iter().all(|f| !f.dst.exists());
        *self.all_absent_at_emission.lock() = Some(absent);
        *self.planned.lock() = activity.files.iter().map(|f| f.dst.clone()).collect();
        Ok(())
    }
}

#[tokio::test]
async fn templates_hook_sees_the_plan_before_any_file_is_written() {
    let dir = project();
    let ctx = context(&dir, false);
    let observer = Arc::new(TemplatePlanObserver::default());
    ctx.hooks.add(observer.clone());

    let builder = Builder::new(ctx, Vec::new()).unwrap();
    builder.build().await.unwrap();

    assert_eq!(
        *observer.all_absent_at_emission.lock(),
        Some(true),
        "hook must fire before interpolation writes anything"
    );
    let planned = observer.planned.lock().clone();
    assert!(!planned.is_empty());
    assert!(
        planned.iter().all(|p| p.is_file()),
        "every announced destination exists once the build settles"
    );
}

#[tokio::test]
async fn concurrent_builds_coalesce_into_one_pipeline() {
    let dir = project();
    let ctx = context(&dir, false);
    let hook = Arc::new(RecordingHook::default());
    ctx.hooks.add(hook.clone());

    let builder = Builder::new(ctx, Vec::new()).unwrap();
    let a = {
        let b = builder.clone();
        tokio::spawn(async move { b.build().await })
    };
    let b = {
        let b = builder.clone();
        tokio::spawn(async move { b.build().await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(
        *hook.events.lock(),
        vec!["before", "done"],
        "two concurrent calls must run exactly one pipeline"
    );
}

#[tokio::test]
async fn close_is_idempotent() {
    let dir = project();
    let ctx = context(&dir, false);
    let hook = Arc::new(RecordingHook::default());
    ctx.hooks.add(hook.clone());

    let builder = Builder::new(ctx, Vec::new()).unwrap();
    builder.build().await.unwrap();

    builder.close().await.unwrap();
    assert_eq!(builder.status(), BuildStatus::Initial);
    builder.close().await.unwrap();

    let closes = hook.events.lock().iter().filter(|e| **e == "close").count();
    assert_eq!(closes, 1, "second close must not re-emit hooks");
}

#[tokio::test]
async fn dev_rebuild_after_done_is_a_noop() {
    let dir = project();
    let ctx = context(&dir, true);
    let builder = Builder::new(ctx.clone(), Vec::new()).unwrap();

    builder.build().await.unwrap();
    let mutations = ctx.memory.mutation_count();

    builder.build().await.unwrap();
    assert_eq!(
        ctx.memory.mutation_count(),
        mutations,
        "no directory cleanup or template generation on a stacked rebuild"
    );
    builder.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn production_targets_run_sequentially() {
    let dir = project();
    let ctx = context(&dir, false);
    let first = MockAdapter::new(Target::BrowserLegacy, Duration::from_millis(100));
    let second = MockAdapter::new(Target::ServerRender, Duration::from_millis(100));
    let builder = Builder::new(ctx, vec![first.clone(), second.clone()]).unwrap();

    builder.build().await.unwrap();

    let (_, first_end) = first.spans.lock()[0];
    let (second_start, _) = second.spans.lock()[0];
    assert!(
        first_end <= second_start,
        "target N+1 must not start before target N settles"
    );
}

#[tokio::test(start_paused = true)]
async fn dev_targets_run_concurrently() {
    let dir = project();
    let ctx = context(&dir, true);
    let first = MockAdapter::new(Target::BrowserLegacy, Duration::from_millis(100));
    let second = MockAdapter::new(Target::ServerRender, Duration::from_millis(100));
    let builder = Builder::new(ctx, vec![first.clone(), second.clone()]).unwrap();

    builder.build().await.unwrap();

    let (first_start, first_end) = first.spans.lock()[0];
    let (second_start, second_end) = second.spans.lock()[0];
    assert!(
        first_start < second_end && second_start < first_end,
        "dev adapters must overlap"
    );
    builder.close().await.unwrap();
}

#[tokio::test]
async fn dev_failure_waits_for_all_adapters() {
    let dir = project();
    let ctx = context(&dir, true);
    let failing = MockAdapter::failing(Target::BrowserLegacy);
    let slow = MockAdapter::new(Target::ServerRender, Duration::from_millis(50));
    let builder = Builder::new(ctx, vec![failing.clone(), slow.clone()]).unwrap();

    let err = builder.build().await.unwrap_err();
    assert!(matches!(err, BuildError::TargetFailed { .. }));
    assert_eq!(slow.spans.lock().len(), 1, "slow adapter settled before the error surfaced");
    assert_eq!(builder.status(), BuildStatus::Building, "failed build leaves status at Building");
}

#[tokio::test]
async fn quiet_production_failure_carries_the_diagnostic() {
    let dir = project();
    let mut config = KilnConfig::default();
    config.build.quiet = true;
    let ctx = Arc::new(BuildContext::new(config, dir.path()));
    let failing = MockAdapter::failing(Target::BrowserLegacy);
    let builder = Builder::new(ctx, vec![failing]).unwrap();

    let err = builder.build().await.unwrap_err();
    match err {
        BuildError::TargetDiagnostic { target, diagnostic } => {
            assert_eq!(target, Target::BrowserLegacy);
            assert!(diagnostic.contains("mock compile failure"));
        }
        other => panic!("expected TargetDiagnostic, got {other}"),
    }
}

#[tokio::test]
async fn missing_pages_dir_fails_before_any_adapter_runs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();

    let ctx = context(&dir, false);
    let adapter = MockAdapter::new(Target::BrowserLegacy, Duration::ZERO);
    let builder = Builder::new(ctx, vec![adapter.clone()]).unwrap();

    let err = builder.build().await.unwrap_err();
    assert!(matches!(err, BuildError::MissingPagesDir { .. }));
    assert_eq!(adapter.calls(), 0, "validation must gate the adapters");
}

#[tokio::test]
async fn stray_pages_dir_degrades_to_default_page() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    // pages next to the source tree instead of inside it
    std::fs::create_dir_all(dir.path().join("pages")).unwrap();

    let ctx = context(&dir, false);
    let builder = Builder::new(ctx, Vec::new()).unwrap();
    builder.build().await.unwrap();

    let default_page = dir.path().join(".kiln/app/browser/pages/index.js");
    assert!(default_page.is_file(), "expected {default_page:?}");
    let content = std::fs::read_to_string(default_page).unwrap();
    assert!(content.contains("kiln-default-page"));
}

#[tokio::test]
async fn close_during_build_cancels_at_a_stage_boundary() {
    let dir = project();
    let ctx = context(&dir, false);
    let slow = MockAdapter::new(Target::BrowserLegacy, Duration::from_millis(200));
    let builder = Builder::new(ctx, vec![slow]).unwrap();

    let running = {
        let b = builder.clone();
        tokio::spawn(async move { b.build().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    builder.close().await.unwrap();

    let err = running.await.unwrap().unwrap_err();
    assert!(matches!(err, BuildError::Cancelled));
    assert_eq!(builder.status(), BuildStatus::Initial);
}

#[tokio::test]
async fn disabled_target_adapters_are_never_invoked() {
    let dir = project();
    let ctx = context(&dir, false);
    let browser = MockAdapter::new(Target::BrowserLegacy, Duration::ZERO);
    let weex = MockAdapter::new(Target::WeexBridge, Duration::ZERO);
    let builder = Builder::new(ctx, vec![browser.clone(), weex.clone()]).unwrap();

    builder.build().await.unwrap();
    assert_eq!(browser.calls(), 1);
    assert_eq!(weex.calls(), 0);
}
