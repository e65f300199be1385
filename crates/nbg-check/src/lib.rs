//! nbgrader Checks
//!
//! Validation and automatic repair of the grading records of one document.
//!
//! # Overview
//!
//! - **Validator**: reports errors, warnings and the point total; never
//!   mutates
//! - **RepairEngine**: rewrites records into a valid state in one pass and
//!   hands every changed record to a [`RecordSink`]
//!
//! # Example
//!
//! ```rust
//! use nbg_check::{CellRecord, DryRun, RepairEngine, Validator};
//! use serde_json::json;
//!
//! let mut cells = vec![CellRecord::from_raw(
//!     0,
//!     true,
//!     Some(json!({"schema_version": 3, "grade": true, "grade_id": "q1"})),
//! )];
//!
//! assert!(!Validator::new().validate(&cells).is_valid());
//!
//! let report = RepairEngine::new().repair(&mut cells, &mut DryRun);
//! assert_eq!(report.fixed, vec![0]);
//! assert!(Validator::new().validate(&cells).is_valid());
//! ```

#![warn(missing_docs)]

pub mod cell;
pub mod repair;
pub mod validator;

// Re-exports
pub use cell::CellRecord;
pub use repair::{DryRun, PendingWrites, RecordSink, RepairEngine, RepairReport};
pub use validator::{Issue, IssueKind, Severity, ValidationReport, Validator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for checking documents
    pub use crate::{
        CellRecord, DryRun, Issue, IssueKind, RecordSink, RepairEngine, RepairReport,
        ValidationReport, Validator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
