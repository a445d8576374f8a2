//! Application-level declarations: frameworks, custom templates, plugins.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-framework wiring exposed to the generated entry sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkOptions {
    /// Name of the render-to-DOM function the generated entry imports.
    #[serde(default)]
    pub render_to_dom: Option<String>,

    #[serde(default)]
    pub create_element: Option<String>,

    #[serde(default)]
    pub get_component: Option<String>,

    /// Modules this framework loads asynchronously.
    #[serde(default)]
    pub async_modules: Vec<String>,
}

/// User-declared template entry, rendered alongside the app template
/// manifest. The bare-string form is shorthand for `{ src }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomTemplate {
    Src(String),
    Entry {
        src: String,
        #[serde(default)]
        dst: Option<String>,
    },
}

impl CustomTemplate {
    pub fn src(&self) -> &str {
        match self {
            CustomTemplate::Src(src) => src,
            CustomTemplate::Entry { src, .. } => src,
        }
    }

    /// Destination name under the build directory; defaults to the source
    /// file name.
    pub fn dst(&self) -> String {
        match self {
            CustomTemplate::Src(src) => basename(src),
            CustomTemplate::Entry { src, dst } => {
                dst.clone().unwrap_or_else(|| basename(src))
            }
        }
    }
}

/// Raw plugin declaration. Normalization into a deduplicated descriptor
/// list happens in the builder on every template-generation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSpec {
    Src(String),
    Entry {
        src: PathBuf,
        #[serde(default = "default_true")]
        ssr: bool,
        #[serde(default = "default_true")]
        web: bool,
        #[serde(default = "default_true")]
        wap: bool,
        #[serde(default = "default_true")]
        ios: bool,
        #[serde(default = "default_true")]
        android: bool,
    },
}

fn basename(src: &str) -> String {
    PathBuf::from(src)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| src.to_string())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_template_dst_defaults_to_basename() {
        let tpl = CustomTemplate::Src("app/router.js".into());
        assert_eq!(tpl.dst(), "router.js");

        let tpl = CustomTemplate::Entry {
            src: "app/router.js".into(),
            dst: Some("router/index.js".into()),
        };
        assert_eq!(tpl.dst(), "router/index.js");
    }

    #[test]
    fn test_plugin_spec_forms() {
        let specs: Vec<PluginSpec> =
            serde_json::from_str(r#"["plugins/a", {"src": "plugins/b", "ssr": false}]"#).unwrap();
        assert!(matches!(specs[0], PluginSpec::Src(_)));
        match &specs[1] {
            PluginSpec::Entry { ssr, web, .. } => {
                assert!(!ssr);
                assert!(web);
            }
            other => panic!("expected table form, got {other:?}"),
        }
    }
}
