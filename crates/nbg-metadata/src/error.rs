//! Error types for metadata access
//!
//! Provides error handling for:
//! - Backup-tag decoding (a fallback channel, never fatal to a read)
//! - Writes into the metadata bag (structural conflicts)

use std::string::FromUtf8Error;

/// Errors decoding a `nbgrader:<base64>` backup tag
#[derive(Debug, thiserror::Error)]
pub enum BackupTagError {
    /// Tag does not carry the backup prefix
    #[error("not a backup tag: '{0}'")]
    MissingPrefix(String),

    /// Payload is not valid base64
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8
    #[error("payload is not utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// Decoded text is not JSON
    #[error("payload is not json: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON decoded but is not an object
    #[error("payload is not a grading record")]
    NotARecord,
}

/// Errors writing into a metadata bag
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// An intermediate key on the write path holds a non-object value
    #[error("cannot write '{path}': '{segment}' is not an object")]
    PathConflict {
        /// Full dotted path being written
        path: String,
        /// Segment that holds a non-object value
        segment: String,
    },

    /// Metadata supplied by the host is not a JSON object
    #[error("cell metadata is not an object")]
    NotAnObject,

    /// Backup tag could not be produced or read
    #[error("backup tag error: {0}")]
    BackupTag(#[from] BackupTagError),
}

impl MetadataError {
    /// Create path conflict error
    pub fn path_conflict(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::PathConflict {
            path: path.into(),
            segment: segment.into(),
        }
    }
}

/// Result type alias for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_conflict_display() {
        let err = MetadataError::path_conflict("custom.metadata.nbgrader", "custom");
        assert_eq!(
            err.to_string(),
            "cannot write 'custom.metadata.nbgrader': 'custom' is not an object"
        );
    }

    #[test]
    fn backup_error_conversion() {
        let err: MetadataError = BackupTagError::NotARecord.into();
        assert!(matches!(err, MetadataError::BackupTag(BackupTagError::NotARecord)));
    }
}
