//! Configuration for notebook sessions and the save patch

use crate::error::ConfigError;
use nbg_metadata::NamespaceMode;
use nbg_schema::DEFAULT_ID_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Notebook type handled by the save patch unless configured otherwise
pub const DEFAULT_NOTEBOOK_TYPE: &str = "jupyter-notebook";

/// nbgrader configuration
///
/// Every field has a default, so a partial TOML file is enough:
///
/// ```toml
/// namespace = "plain"
/// save_patch_delay_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NbgConfig {
    /// Where the host keeps grading records
    pub namespace: NamespaceMode,
    /// Wait after a save notification before patching the file
    pub save_patch_delay_ms: u64,
    /// Prefix of generated grade identifiers
    pub id_prefix: String,
    /// Keep an `nbgrader:` backup tag next to every written record
    pub mirror_backup_tags: bool,
    /// Notebook type the save patch applies to
    pub notebook_type: String,
}

impl NbgConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or mistyped fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a file; a missing file yields the defaults
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file exists but cannot be read,
    /// [`ConfigError::Parse`] when it is not valid configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// With namespace mode
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceMode) -> Self {
        self.namespace = namespace;
        self
    }

    /// With save patch delay in milliseconds
    #[inline]
    #[must_use]
    pub fn with_save_patch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.save_patch_delay_ms = delay_ms;
        self
    }

    /// With identifier prefix
    #[inline]
    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// With backup tag mirroring
    #[inline]
    #[must_use]
    pub fn with_mirror_backup_tags(mut self, mirror: bool) -> Self {
        self.mirror_backup_tags = mirror;
        self
    }

    /// With notebook type
    #[inline]
    #[must_use]
    pub fn with_notebook_type(mut self, notebook_type: impl Into<String>) -> Self {
        self.notebook_type = notebook_type.into();
        self
    }

    /// Save patch delay as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn save_patch_delay(&self) -> Duration {
        Duration::from_millis(self.save_patch_delay_ms)
    }
}

impl Default for NbgConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceMode::Custom,
            save_patch_delay_ms: 200,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            mirror_backup_tags: false,
            notebook_type: DEFAULT_NOTEBOOK_TYPE.to_string(),
        }
    }
}
