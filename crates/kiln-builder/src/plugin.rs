//! Plugin normalization.
//!
//! Raw config declarations are turned into descriptors with stable,
//! collision-free import names on every template-generation pass.

use std::path::{Path, PathBuf};

use serde::Serialize;

use kiln_config::PluginSpec;
use kiln_fs::FileSystem;

use crate::error::{BuildError, Result};

/// A normalized plugin, ready for interpolation into generated entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    /// Import identifier, unique within the build.
    pub name: String,
    pub src: PathBuf,
    pub ssr: bool,
    pub web: bool,
    pub wap: bool,
    pub ios: bool,
    pub android: bool,
}

impl PluginDescriptor {
    fn from_spec(spec: &PluginSpec) -> Self {
        match spec {
            PluginSpec::Src(src) => Self::with_flags(PathBuf::from(src), true, true, true, true, true),
            PluginSpec::Entry {
                src,
                ssr,
                web,
                wap,
                ios,
                android,
            } => Self::with_flags(src.clone(), *ssr, *web, *wap, *ios, *android),
        }
    }

    fn with_flags(src: PathBuf, ssr: bool, web: bool, wap: bool, ios: bool, android: bool) -> Self {
        let name = import_name(&src);
        Self {
            name,
            src,
            ssr,
            web,
            wap,
            ios,
            android,
        }
    }
}

/// Derive a valid, unique import identifier from the plugin source path.
/// The hash covers the full path so plugins with equal file stems in
/// different directories do not collide.
fn import_name(src: &Path) -> String {
    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let hash = seahash::hash(src.to_string_lossy().as_bytes());
    format!("kiln_plugin_{sanitized}_{hash:016x}")
}

/// Normalize raw plugin declarations: first declaration of a given source
/// path wins, later duplicates are dropped.
pub fn normalize_plugins(specs: &[PluginSpec]) -> Vec<PluginDescriptor> {
    let mut seen: Vec<PathBuf> = Vec::new();
    let mut out = Vec::new();
    for spec in specs {
        let descriptor = PluginDescriptor::from_spec(spec);
        if seen.contains(&descriptor.src) {
            tracing::debug!(src = %descriptor.src.display(), "dropping duplicate plugin");
            continue;
        }
        seen.push(descriptor.src.clone());
        out.push(descriptor);
    }
    out
}

/// Normalize and resolve plugin sources against the project root. A
/// declared source may name the file exactly, omit the extension, or
/// point at a directory with an `index.<ext>` entry.
pub async fn resolve_plugins(
    fs: &dyn FileSystem,
    root: &Path,
    extensions: &[String],
    specs: &[PluginSpec],
) -> Result<Vec<PluginDescriptor>> {
    let mut resolved = Vec::new();
    for mut descriptor in normalize_plugins(specs) {
        let declared = root.join(&descriptor.src);
        let Some(path) = resolve_source(fs, &declared, extensions).await else {
            return Err(BuildError::PluginNotFound(declared));
        };
        descriptor.src = path;
        resolved.push(descriptor);
    }
    Ok(resolved)
}

async fn resolve_source(
    fs: &dyn FileSystem,
    declared: &Path,
    extensions: &[String],
) -> Option<PathBuf> {
    if fs
        .metadata(declared)
        .await
        .is_ok_and(|meta| meta.is_file)
    {
        return Some(declared.to_path_buf());
    }
    for ext in extensions {
        let with_ext = declared.with_extension(ext);
        if fs.exists(&with_ext).await {
            return Some(with_ext);
        }
        let index = declared.join(format!("index.{ext}"));
        if fs.exists(&index).await {
            return Some(index);
        }
    }
    None
}
