//! Config validation: structural checks that need no filesystem beyond
//! the project root.

use std::path::Path;

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

impl KilnConfig {
    /// Validate the resolved configuration against a project root.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::SrcDirNotFound`] when `dir.src` does not exist
    /// - [`ConfigError::NoTargets`] when every target is disabled
    /// - [`ConfigError::NoExtensions`] when the extension list is empty
    pub fn validate(&self, root: impl AsRef<Path>) -> Result<()> {
        let src = self.dir.resolve_src(root.as_ref());
        if !src.is_dir() {
            return Err(ConfigError::SrcDirNotFound(src));
        }

        if !self.build.browser.enable && !self.build.weex.enable {
            return Err(ConfigError::NoTargets);
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }

        for ext in &self.extensions {
            if ext.starts_with('.') || ext.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "extensions".to_string(),
                    hint: format!("extensions are written without a leading dot, got {ext:?}"),
                });
            }
        }

        Ok(())
    }
}
