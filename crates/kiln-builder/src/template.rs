//! Template materialization.
//!
//! Turns the active app-template manifest plus the user's configuration
//! into concrete entry sources under `<build>/app/<family>`, ready to be
//! handed to the bundler adapters. Interpolation uses `<%= expr %>`
//! delimiters so the generated JavaScript reads naturally in the template
//! sources.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{syntax::SyntaxConfig, Environment, UndefinedBehavior};
use serde::Deserialize;
use serde_json::json;

use kiln_config::{CustomTemplate, KilnConfig};
use kiln_fs::FileSystem;

use crate::error::TemplateError;
use crate::plugin::PluginDescriptor;
use crate::target::TargetSet;

/// Built-in app template, used when `template` is unset in config.
const BUILTIN_FILES: &[&str] = &["App.js", "client.js", "server.js", "weex.js", "middleware.js"];

const DEFAULT_PAGE: &str = "default-page.js";

fn builtin_content(name: &str) -> Option<&'static str> {
    match name {
        "App.js" => Some(include_str!("../templates/App.js")),
        "client.js" => Some(include_str!("../templates/client.js")),
        "server.js" => Some(include_str!("../templates/server.js")),
        "weex.js" => Some(include_str!("../templates/weex.js")),
        "middleware.js" => Some(include_str!("../templates/middleware.js")),
        "default-page.js" => Some(include_str!("../templates/default-page.js")),
        _ => None,
    }
}

/// Declarative description of an app template directory, loaded from its
/// `template.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateManifest {
    /// Template root. `None` selects the built-in template.
    #[serde(skip)]
    pub dir: Option<PathBuf>,

    /// Ordered list of files to materialize, relative to `dir`.
    pub files: Vec<String>,

    /// npm package name to required semver range.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl TemplateManifest {
    fn builtin() -> Self {
        Self {
            dir: None,
            files: BUILTIN_FILES.iter().map(|f| f.to_string()).collect(),
            dependencies: BTreeMap::new(),
        }
    }
}

/// Where a materialized file's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    /// File shipped with the app template directory.
    Packaged(PathBuf),
    /// Same-named file under the project's `src/app/` shadowing the
    /// packaged one.
    Override(PathBuf),
    /// User-declared `{ src, dst }` entry from config.
    Custom(PathBuf),
    /// Compiled-in template, keyed by file name.
    Builtin(&'static str),
}

/// One file of the materialization pass: logical name, content source and
/// absolute destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub name: String,
    pub origin: TemplateOrigin,
    pub dst: PathBuf,
}

/// Fully resolved pass, ready to interpolate and write.
#[derive(Debug, Clone, Default)]
pub struct TemplatePlan {
    pub files: Vec<ResolvedTemplate>,
    /// Override and custom-template sources, to be folded into the custom
    /// watch domain.
    pub watch_paths: Vec<PathBuf>,
}

pub struct TemplateEngine {
    config: KilnConfig,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl TemplateEngine {
    pub fn new(config: KilnConfig, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            root: root.into(),
            fs,
        }
    }

    /// Load the active manifest: `template.toml` under the configured
    /// template root, or the built-in template when none is configured.
    pub async fn load_manifest(&self) -> Result<TemplateManifest, TemplateError> {
        let Some(template_root) = &self.config.template else {
            return Ok(TemplateManifest::builtin());
        };
        let dir = self.root.join(template_root);
        let manifest_path = dir.join("template.toml");
        if !self.fs.exists(&manifest_path).await {
            return Err(TemplateError::ManifestNotFound(manifest_path));
        }
        let raw = self.fs.read_to_string(&manifest_path).await?;
        let mut manifest: TemplateManifest =
            toml::from_str(&raw).map_err(|err| TemplateError::InvalidManifest {
                path: manifest_path.clone(),
                message: err.to_string(),
            })?;
        if manifest.files.is_empty() {
            return Err(TemplateError::NoFiles);
        }
        manifest.dir = Some(dir);
        Ok(manifest)
    }

    /// Check every declared dependency against the version installed under
    /// `node_modules`. All problems are collected before failing so the
    /// user gets one actionable install command.
    pub async fn validate_dependencies(
        &self,
        manifest: &TemplateManifest,
    ) -> Result<(), TemplateError> {
        let mut fixes = Vec::new();
        for (name, range) in &manifest.dependencies {
            let req = semver::VersionReq::parse(range).map_err(|err| {
                TemplateError::InvalidManifest {
                    path: manifest
                        .dir
                        .as_deref()
                        .unwrap_or(Path::new("<builtin>"))
                        .join("template.toml"),
                    message: format!("bad semver range for {name}: {err}"),
                }
            })?;
            match self.installed_version(name).await {
                Some(version) if req.matches(&version) => {}
                Some(version) => {
                    tracing::warn!(%name, installed = %version, required = %range, "dependency out of range");
                    fixes.push(format!("{name}@{range}"));
                }
                None => {
                    tracing::warn!(%name, required = %range, "dependency not installed");
                    fixes.push(format!("{name}@{range}"));
                }
            }
        }
        if fixes.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::MissingDependencies { fixes })
        }
    }

    async fn installed_version(&self, name: &str) -> Option<semver::Version> {
        let pkg = self.root.join("node_modules").join(name).join("package.json");
        let raw = self.fs.read_to_string(&pkg).await.ok()?;
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        semver::Version::parse(value.get("version")?.as_str()?).ok()
    }

    /// Resolve the manifest into destinations, honoring precedence:
    /// custom templates beat manifest files with the same destination
    /// name (filtered before override resolution), and `src/app/<file>`
    /// overrides beat packaged content by presence.
    pub async fn plan(
        &self,
        manifest: &TemplateManifest,
        targets: &TargetSet,
        include_default_page: bool,
    ) -> Result<TemplatePlan, TemplateError> {
        let custom_dsts: BTreeSet<String> =
            self.config.templates.iter().map(CustomTemplate::dst).collect();
        let override_dir = self.config.dir.resolve_src(&self.root).join("app");
        let app_dir = self.config.dir.resolve_build(&self.root).join("app");

        let mut families = Vec::new();
        if targets.browser_enabled() {
            families.push("browser");
        }
        if targets.weex_enabled() {
            families.push("weex");
        }

        let mut plan = TemplatePlan::default();

        for name in &manifest.files {
            if custom_dsts.contains(name) {
                tracing::debug!(file = %name, "custom template shadows packaged file");
                continue;
            }
            let override_path = override_dir.join(name);
            let origin = if self.fs.exists(&override_path).await {
                plan.watch_paths.push(override_path.clone());
                TemplateOrigin::Override(override_path)
            } else if let Some(dir) = &manifest.dir {
                let packaged = dir.join(name);
                if !self.fs.exists(&packaged).await {
                    return Err(TemplateError::FileMissing(packaged));
                }
                TemplateOrigin::Packaged(packaged)
            } else {
                let builtin = BUILTIN_FILES
                    .iter()
                    .copied()
                    .find(|f| *f == name.as_str())
                    .ok_or_else(|| TemplateError::FileMissing(PathBuf::from(name)))?;
                TemplateOrigin::Builtin(builtin)
            };
            for family in &families {
                plan.files.push(ResolvedTemplate {
                    name: name.clone(),
                    origin: origin.clone(),
                    dst: app_dir.join(family).join(name),
                });
            }
        }

        for custom in &self.config.templates {
            let src = self.root.join(custom.src());
            if !self.fs.exists(&src).await {
                return Err(TemplateError::FileMissing(src));
            }
            plan.watch_paths.push(src.clone());
            let dst_name = custom.dst();
            for family in &families {
                plan.files.push(ResolvedTemplate {
                    name: dst_name.clone(),
                    origin: TemplateOrigin::Custom(src.clone()),
                    dst: app_dir.join(family).join(&dst_name),
                });
            }
        }

        if include_default_page {
            for family in &families {
                plan.files.push(ResolvedTemplate {
                    name: "pages/index.js".to_string(),
                    origin: TemplateOrigin::Builtin(DEFAULT_PAGE),
                    dst: app_dir.join(family).join("pages").join("index.js"),
                });
            }
        }

        Ok(plan)
    }

    /// The flat interpolation context every template file sees.
    pub fn vars(&self, plugins: &[PluginDescriptor]) -> serde_json::Value {
        let c = &self.config;
        json!({
            "is_dev": c.dev,
            "is_test": cfg!(test),
            "debug": c.debug,
            "global_name": c.global_name,
            "global_id": format!("__{}", c.global_name),
            "global_context": format!("__{}__", c.global_name.to_uppercase()),
            "extensions": c.extensions.join("|"),
            "env": c.env,
            "css": c.css,
            "layouts": c.layouts,
            "async_modules": c.async_modules,
            "frameworks": c.frameworks,
            "plugins": plugins,
            "dir": {
                "src": c.dir.src,
                "build": c.dir.build,
                "pages": c.dir.pages,
                "layouts": c.dir.layouts,
                "store": c.dir.store,
                "middleware": c.dir.middleware,
            },
            "analyze": c.build.analyze,
            "quiet": c.build.quiet,
        })
    }

    /// Interpolate and write every file of the plan. An interpolation
    /// failure aborts the whole pass; a half-generated entry set would
    /// feed the bundlers stale files.
    pub async fn write_plan(
        &self,
        plan: &TemplatePlan,
        vars: &serde_json::Value,
    ) -> Result<Vec<PathBuf>, TemplateError> {
        let env = interpolation_env()?;
        let mut written = Vec::with_capacity(plan.files.len());
        for file in &plan.files {
            let content = self.origin_content(&file.origin).await?;
            let rendered = env.render_str(&content, vars).map_err(|source| {
                TemplateError::Compile {
                    path: self.origin_path(&file.origin),
                    source,
                }
            })?;
            let normalized = strip_whitespace(&rendered);
            self.fs.write(&file.dst, normalized.as_bytes()).await?;
            written.push(file.dst.clone());
        }
        Ok(written)
    }

    async fn origin_content(&self, origin: &TemplateOrigin) -> Result<String, TemplateError> {
        match origin {
            TemplateOrigin::Packaged(path)
            | TemplateOrigin::Override(path)
            | TemplateOrigin::Custom(path) => Ok(self.fs.read_to_string(path).await?),
            TemplateOrigin::Builtin(name) => builtin_content(name)
                .map(str::to_string)
                .ok_or_else(|| TemplateError::FileMissing(PathBuf::from(*name))),
        }
    }

    fn origin_path(&self, origin: &TemplateOrigin) -> PathBuf {
        match origin {
            TemplateOrigin::Packaged(path)
            | TemplateOrigin::Override(path)
            | TemplateOrigin::Custom(path) => path.clone(),
            TemplateOrigin::Builtin(name) => PathBuf::from(name),
        }
    }
}

/// ERB-style delimiters, strict undefined lookups so a typo in a template
/// expression fails the pass instead of rendering an empty string.
fn interpolation_env() -> Result<Environment<'static>, TemplateError> {
    let mut env = Environment::new();
    let syntax = SyntaxConfig::builder()
        .block_delimiters("<%", "%>")
        .variable_delimiters("<%=", "%>")
        .comment_delimiters("<%#", "%>")
        .build()?;
    env.set_syntax(syntax);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env)
}

/// Collapse blank-line runs left behind by block tags and trim the file
/// edges, keeping one trailing newline.
fn strip_whitespace(input: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0usize;
    for line in input.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim_start().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            lines.push("");
        } else {
            blank_run = 0;
            lines.push(trimmed);
        }
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
