//! Error types for the notebook crate
//!
//! Provides error handling for:
//! - Host edits that cannot be applied
//! - User commands addressed at a bad cell or with bad input
//! - Loading configuration and `.ipynb` documents

use nbg_metadata::MetadataError;
use nbg_schema::{CellType, SchemaError};
use std::path::PathBuf;

/// Failure of a host document edit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Index past the end of the document
    #[error("cell {index} does not exist (document has {count} cells)")]
    NoSuchCell {
        /// Requested index
        index: usize,
        /// Cells in the document
        count: usize,
    },

    /// The host refused the edit
    #[error("edit rejected: {0}")]
    EditRejected(String),
}

/// Failure of a user-facing command
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Index past the end of the document
    #[error("cell {index} does not exist (document has {count} cells)")]
    NoSuchCell {
        /// Requested index
        index: usize,
        /// Cells in the document
        count: usize,
    },

    /// Autograded type requested on a markdown or raw cell
    #[error("\"{cell_type}\" can only be used with code cells. Convert this cell to code first.")]
    CodeOnlyType {
        /// The rejected type
        cell_type: CellType,
    },

    /// Points input rejected
    #[error("invalid points: {0}")]
    InvalidPoints(#[from] SchemaError),

    /// Record could not be merged into the cell metadata
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// The host refused the edit
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Metadata could not be rendered as JSON
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure loading an `.ipynb` document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Not JSON
    #[error("invalid notebook json: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON without the notebook shape
    #[error("not a notebook: {0}")]
    NotANotebook(String),

    /// Cell metadata could not be placed in the host namespace
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Failure loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure inside the save patch; reported, never propagated to the host
#[derive(Debug, thiserror::Error)]
pub enum SavePatchError {
    /// Reading or writing the saved file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The saved file is not JSON
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The saved file has no `cells` array
    #[error("saved file has no cells array")]
    MissingCells,
}

/// Result alias for user commands
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_only_message_names_the_label() {
        let err = CommandError::CodeOnlyType {
            cell_type: CellType::Tests,
        };
        assert_eq!(
            err.to_string(),
            "\"Autograded tests\" can only be used with code cells. Convert this cell to code first."
        );
    }

    #[test]
    fn host_error_converts() {
        let err: CommandError = HostError::EditRejected("busy".to_string()).into();
        assert!(matches!(err, CommandError::Host(_)));
        assert_eq!(err.to_string(), "host error: edit rejected: busy");
    }
}
