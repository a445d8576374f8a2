//! Build options: per-target enable flags, watch patterns and scheduling
//! knobs consumed by the builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    #[serde(default)]
    pub browser: BrowserOptions,

    #[serde(default)]
    pub weex: WeexOptions,

    /// Extra watch globs shared by every target (custom watch domain).
    #[serde(default)]
    pub watch: Vec<String>,

    #[serde(default)]
    pub analyze: bool,

    /// Suppress interactive diagnostics; failures carry the serialized
    /// compiler output instead.
    #[serde(default)]
    pub quiet: bool,

    /// Debounce window for watcher-triggered template regeneration.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Browser target family (legacy + modern client bundles and the
/// server-render bundle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOptions {
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Additionally build a modern (ES module) client bundle.
    #[serde(default)]
    pub modern: bool,

    #[serde(default)]
    pub watch: Vec<String>,

    /// Style resource files injected into every stylesheet, watched for
    /// content changes.
    #[serde(default)]
    pub style_resources: BTreeMap<String, String>,

    /// External bundler command invoked for this target family; the
    /// target name is appended as the final argument.
    #[serde(default)]
    pub command: Option<String>,
}

/// Weex bridge target (JS bundle consumed by the native runtimes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeexOptions {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub watch: Vec<String>,

    /// Enables native iOS packaging when set.
    #[serde(default)]
    pub ios_app_id: Option<String>,

    /// Enables native Android packaging when set.
    #[serde(default)]
    pub android_app_id: Option<String>,

    #[serde(default)]
    pub command: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            browser: BrowserOptions::default(),
            weex: WeexOptions::default(),
            watch: Vec::new(),
            analyze: false,
            quiet: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            enable: true,
            modern: false,
            watch: Vec::new(),
            style_resources: BTreeMap::new(),
            command: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    200
}
