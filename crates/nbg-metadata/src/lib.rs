//! nbgrader Metadata Accessor
//!
//! The boundary between a host's opaque per-cell metadata and the typed
//! grading record.
//!
//! # Core Operations
//!
//! - **Read**: locate and parse a record ([`read`]), with legacy, direct and
//!   backup-tag fallbacks
//! - **Write**: produce an updated, key-sorted copy of the metadata ([`write`])
//!
//! # Architecture
//!
//! ```text
//! host metadata bag → read → StoredRecord → (validator / repair) → write → host edit
//! ```
//!
//! # Example
//!
//! ```rust
//! use nbg_metadata::{read, write, MetadataBag, NamespaceMode};
//! use nbg_schema::GradingRecord;
//!
//! let bag = MetadataBag::new();
//! let updated = write(&bag, Some(&GradingRecord::new()), NamespaceMode::Custom).unwrap();
//! assert!(read(&updated, NamespaceMode::Custom).is_some());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod accessor;
pub mod backup;
pub mod bag;
pub mod error;
pub mod namespace;

// Re-exports for convenience
pub use accessor::{read, read_backup, write, write_with, RecordSource, StoredRecord, WriteOptions};
pub use backup::{decode_backup_tag, encode_backup_tag, BACKUP_TAG_PREFIX};
pub use bag::{sort_keys, MetadataBag};
pub use error::{BackupTagError, MetadataError, MetadataResult};
pub use namespace::NamespaceMode;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
