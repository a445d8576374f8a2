//! Command-spawning bundler adapter.
//!
//! The concrete bundler backends stay outside this binary: each target
//! family may configure a shell command (`build.browser.command`,
//! `build.weex.command`) that compiles the generated entries. A target
//! without a configured command is a no-op, which keeps template-only
//! projects usable.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;

use kiln_builder::{BuildContext, BuildError, BundlerAdapter, Result, Target, TargetSet};
use kiln_config::KilnConfig;

pub struct CommandAdapter {
    target: Target,
    command: Option<String>,
}

impl CommandAdapter {
    pub fn new(target: Target, command: Option<String>) -> Self {
        Self { target, command }
    }
}

#[async_trait]
impl BundlerAdapter for CommandAdapter {
    fn target(&self) -> Target {
        self.target
    }

    async fn build(&self, ctx: &BuildContext) -> Result<()> {
        let Some(command) = &self.command else {
            tracing::debug!(target = %self.target, "no bundler command configured, skipping");
            return Ok(());
        };

        tracing::info!(target = %self.target, %command, "spawning bundler");
        let mut cmd = if cfg!(windows) {
            let mut c = tokio::process::Command::new("cmd");
            c.arg("/C");
            c
        } else {
            let mut c = tokio::process::Command::new("sh");
            c.arg("-c");
            c
        };
        let status = cmd
            .arg(command)
            .current_dir(&ctx.root)
            .env("KILN_TARGET", self.target.name())
            .env("KILN_BUILD_DIR", ctx.build_dir())
            .env("KILN_APP_DIR", ctx.app_dir())
            .env("KILN_DIST_DIR", ctx.dist_dir())
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|err| {
                BuildError::Custom(format!(
                    "could not spawn bundler command for {}: {err}",
                    self.target
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::Custom(format!(
                "bundler command for {} exited with {status}",
                self.target
            )))
        }
    }
}

/// One adapter per enabled target, each bound to its family's configured
/// command.
pub fn adapters_from_config(config: &KilnConfig) -> Vec<Arc<dyn BundlerAdapter>> {
    TargetSet::from_config(config)
        .iter()
        .map(|target| {
            let command = if target.is_browser_family() {
                config.build.browser.command.clone()
            } else {
                config.build.weex.command.clone()
            };
            Arc::new(CommandAdapter::new(target, command)) as Arc<dyn BundlerAdapter>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapters_follow_enabled_targets() {
        let config = KilnConfig::default();
        let adapters = adapters_from_config(&config);
        let targets: Vec<Target> = adapters.iter().map(|a| a.target()).collect();
        assert_eq!(targets, vec![Target::BrowserLegacy, Target::ServerRender]);
    }

    #[tokio::test]
    async fn test_unconfigured_command_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let ctx = BuildContext::new(KilnConfig::default(), dir.path());
        let adapter = CommandAdapter::new(Target::BrowserLegacy, None);
        adapter.build(&ctx).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let ctx = BuildContext::new(KilnConfig::default(), dir.path());
        let adapter = CommandAdapter::new(Target::BrowserLegacy, Some("exit 3".to_string()));
        let err = adapter.build(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
