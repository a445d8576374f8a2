//! Build targets and the bundler adapter contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kiln_config::KilnConfig;

use crate::context::BuildContext;
use crate::error::Result;

/// One compilation output variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    BrowserLegacy,
    BrowserModern,
    ServerRender,
    WeexBridge,
    Ios,
    Android,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::BrowserLegacy => "browser-legacy",
            Target::BrowserModern => "browser-modern",
            Target::ServerRender => "server-render",
            Target::WeexBridge => "weex-bridge",
            Target::Ios => "ios",
            Target::Android => "android",
        }
    }

    /// Targets sharing a template family also share generated entries.
    pub fn is_browser_family(&self) -> bool {
        matches!(
            self,
            Target::BrowserLegacy | Target::BrowserModern | Target::ServerRender
        )
    }

    pub fn is_weex_family(&self) -> bool {
        matches!(self, Target::WeexBridge | Target::Ios | Target::Android)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of enabled targets, derived once from config and re-derived on
/// explicit reconfiguration. Iteration order is the declared build order
/// used by production scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<Target>,
}

impl TargetSet {
    pub fn from_config(config: &KilnConfig) -> Self {
        let mut targets = Vec::new();
        if config.build.browser.enable {
            targets.push(Target::BrowserLegacy);
            if config.build.browser.modern {
                targets.push(Target::BrowserModern);
            }
            targets.push(Target::ServerRender);
        }
        if config.build.weex.enable {
            targets.push(Target::WeexBridge);
            if config.build.weex.ios_app_id.is_some() {
                targets.push(Target::Ios);
            }
            if config.build.weex.android_app_id.is_some() {
                targets.push(Target::Android);
            }
        }
        Self { targets }
    }

    pub fn contains(&self, target: Target) -> bool {
        self.targets.contains(&target)
    }

    pub fn iter(&self) -> impl Iterator<Item = Target> + '_ {
        self.targets.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn browser_enabled(&self) -> bool {
        self.targets.iter().any(|t| t.is_browser_family())
    }

    pub fn weex_enabled(&self) -> bool {
        self.targets.iter().any(|t| t.is_weex_family())
    }
}

/// Contract between the builder and a target-specific compiler backend.
///
/// `build` is the only required operation; `unwatch` and `close` default
/// to no-ops so adapters without watch or teardown state implement
/// nothing (the explicit-interface replacement for the original's
/// runtime method-existence checks).
#[async_trait]
pub trait BundlerAdapter: Send + Sync {
    fn target(&self) -> Target;

    async fn build(&self, ctx: &BuildContext) -> Result<()>;

    async fn unwatch(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets() {
        let set = TargetSet::from_config(&KilnConfig::default());
        let targets: Vec<Target> = set.iter().collect();
        assert_eq!(targets, vec![Target::BrowserLegacy, Target::ServerRender]);
    }

    #[test]
    fn test_modern_and_weex_targets() {
        let mut config = KilnConfig::default();
        config.build.browser.modern = true;
        config.build.weex.enable = true;
        config.build.weex.ios_app_id = Some("com.example.app".into());

        let set = TargetSet::from_config(&config);
        let targets: Vec<Target> = set.iter().collect();
        assert_eq!(
            targets,
            vec![
                Target::BrowserLegacy,
                Target::BrowserModern,
                Target::ServerRender,
                Target::WeexBridge,
                Target::Ios,
            ]
        );
        assert!(set.weex_enabled());
        assert!(!set.contains(Target::Android));
    }

    #[test]
    fn test_all_disabled_is_empty() {
        let mut config = KilnConfig::default();
        config.build.browser.enable = false;
        assert!(TargetSet::from_config(&config).is_empty());
    }
}
