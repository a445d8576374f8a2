//! Root configuration structure and file loading.
//!
//! Loading merges, lowest priority first: built-in defaults, a
//! `kiln.config.toml` or `kiln.config.json` in the project root, `KILN_*`
//! environment variables, then caller-supplied overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{CustomTemplate, FrameworkOptions, PluginSpec};
use crate::build::BuildOptions;
use crate::dir::DirConfig;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KilnConfig {
    /// Development mode: parallel target scheduling, watchers armed after
    /// the first build, soft compilation failures.
    #[serde(default)]
    pub dev: bool,

    #[serde(default)]
    pub debug: bool,

    /// Global naming scheme injected into generated sources.
    #[serde(default = "default_global_name")]
    pub global_name: String,

    /// Source extensions considered by watchers and plugin resolution.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub css: Vec<String>,

    /// Layout name to source path map.
    #[serde(default)]
    pub layouts: BTreeMap<String, String>,

    #[serde(default)]
    pub async_modules: Vec<String>,

    #[serde(default)]
    pub frameworks: BTreeMap<String, FrameworkOptions>,

    #[serde(default)]
    pub dir: DirConfig,

    #[serde(default)]
    pub build: BuildOptions,

    /// App template root (directory containing `template.toml`). Falls
    /// back to the built-in browser/weex app template when unset.
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Extra user templates unioned into the materialization pass.
    #[serde(default)]
    pub templates: Vec<CustomTemplate>,

    #[serde(default)]
    pub plugins: Vec<PluginSpec>,

    /// Server middleware sources; changes here require a process restart.
    #[serde(default)]
    pub server_middleware: Vec<String>,

    /// Top-level restart-watch paths.
    #[serde(default)]
    pub watch: Vec<String>,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            dev: false,
            debug: false,
            global_name: default_global_name(),
            extensions: default_extensions(),
            env: BTreeMap::new(),
            css: Vec::new(),
            layouts: BTreeMap::new(),
            async_modules: Vec::new(),
            frameworks: BTreeMap::new(),
            dir: DirConfig::default(),
            build: BuildOptions::default(),
            template: None,
            templates: Vec::new(),
            plugins: Vec::new(),
            server_middleware: Vec::new(),
            watch: Vec::new(),
        }
    }
}

impl KilnConfig {
    /// Load configuration for a project root.
    ///
    /// `overrides` is a partial value (typically built from CLI flags)
    /// whose keys win over every other source; keys it does not carry are
    /// left alone. A missing config file is not an error; defaults apply.
    /// A `kiln.config.*` file in an unreadable format is rejected rather
    /// than silently ignored.
    pub fn load(root: impl AsRef<Path>, overrides: Option<Value>) -> Result<Self> {
        let root = root.as_ref();
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let toml_path = root.join("kiln.config.toml");
        let json_path = root.join("kiln.config.json");
        if toml_path.exists() {
            tracing::debug!(path = %toml_path.display(), "loading config file");
            figment = figment.merge(Toml::file(toml_path));
        } else if json_path.exists() {
            tracing::debug!(path = %json_path.display(), "loading config file");
            figment = figment.merge(Json::file(json_path));
        } else if let Some(found) = unsupported_config_file(root) {
            return Err(ConfigError::UnsupportedFormat(found));
        }

        figment = figment.merge(Env::prefixed("KILN_").split("__"));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: format!("check kiln.config syntax and field types: {e}"),
        })
    }

    /// Create from a `serde_json::Value` (for programmatic config).
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: e.to_string(),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: e.to_string(),
        })
    }
}

/// A `kiln.config.*` file in a format `load` cannot read. Only consulted
/// when neither supported file exists, so a stray sibling never shadows a
/// valid config.
fn unsupported_config_file(root: &Path) -> Option<String> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("kiln.config.")
            && name != "kiln.config.toml"
            && name != "kiln.config.json"
        {
            return Some(name);
        }
    }
    None
}

fn default_global_name() -> String {
    "kiln".to_string()
}

fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx"].map(String::from).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_creates_config() {
        let config = KilnConfig::from_value(json!({
            "dev": true,
            "build": { "weex": { "enable": true } }
        }))
        .unwrap();
        assert!(config.dev);
        assert!(config.build.weex.enable);
        assert_eq!(config.global_name, "kiln");
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KilnConfig::load(dir.path(), None).unwrap();
        assert!(!config.dev);
        assert_eq!(config.extensions, vec!["js", "jsx", "ts", "tsx"]);
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kiln.config.toml"),
            "global_name = \"app\"\n\n[build.weex]\nenable = true\n",
        )
        .unwrap();
        let config = KilnConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.global_name, "app");
        assert!(config.build.weex.enable);
        // untouched sections keep their defaults
        assert!(config.build.browser.enable);
    }

    #[test]
    fn test_unrecognized_config_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kiln.config.yaml"), "dev: true\n").unwrap();
        let err = KilnConfig::load(dir.path(), None).unwrap_err();
        match err {
            ConfigError::UnsupportedFormat(name) => assert_eq!(name, "kiln.config.yaml"),
            other => panic!("expected UnsupportedFormat, got {other}"),
        }
    }

    #[test]
    fn test_sibling_format_ignored_when_toml_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kiln.config.toml"), "dev = true\n").unwrap();
        std::fs::write(dir.path().join("kiln.config.yaml"), "dev: false\n").unwrap();
        let config = KilnConfig::load(dir.path(), None).unwrap();
        assert!(config.dev);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kiln.config.toml"),
            "dev = false\nglobal_name = \"app\"\n",
        )
        .unwrap();
        let config = KilnConfig::load(dir.path(), Some(json!({ "dev": true }))).unwrap();
        assert!(config.dev);
        // keys absent from the overrides keep their file values
        assert_eq!(config.global_name, "app");
    }
}
