//! Where records live inside the host's metadata bag

use nbg_schema::NBGRADER_KEY;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Namespace the host stores notebook-format metadata under
///
/// Hosts that keep unknown metadata nest it under `custom.metadata`; hosts
/// that drop custom metadata keep it under plain `metadata`. The mode is
/// resolved once per operation and passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceMode {
    /// `custom.metadata.nbgrader`
    #[default]
    Custom,
    /// `metadata.nbgrader`
    Plain,
}

impl NamespaceMode {
    /// Resolve from the host serializer's `dropCustomMetadata` capability
    ///
    /// Unknown capability (companion absent or silent) means `Custom`.
    #[inline]
    #[must_use]
    pub const fn from_capability(drop_custom_metadata: Option<bool>) -> Self {
        match drop_custom_metadata {
            Some(true) => Self::Plain,
            _ => Self::Custom,
        }
    }

    /// Dotted path of the notebook-format metadata object
    #[inline]
    #[must_use]
    pub const fn container_path(self) -> &'static str {
        match self {
            Self::Custom => "custom.metadata",
            Self::Plain => "metadata",
        }
    }

    /// Dotted path of the grading record
    #[must_use]
    pub fn record_path(self) -> String {
        format!("{}.{}", self.container_path(), NBGRADER_KEY)
    }

    /// Dotted path of the tag list
    #[must_use]
    pub fn tags_path(self) -> String {
        format!("{}.tags", self.container_path())
    }

    /// The other namespace, read as a legacy fallback
    #[inline]
    #[must_use]
    pub const fn legacy(self) -> Self {
        match self {
            Self::Custom => Self::Plain,
            Self::Plain => Self::Custom,
        }
    }
}

impl Display for NamespaceMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => f.write_str("custom"),
            Self::Plain => f.write_str("plain"),
        }
    }
}

impl FromStr for NamespaceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "custom" => Ok(Self::Custom),
            "plain" => Ok(Self::Plain),
            other => Err(format!("unknown namespace mode '{other}' (expected custom|plain)")),
        }
    }
}
