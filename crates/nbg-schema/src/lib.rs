//! nbgrader Schema
//!
//! The grading-annotation record attached to notebook cells and the pure
//! functions defined over it.
//!
//! # Core Concepts
//!
//! - [`GradingRecord`]: the per-cell `nbgrader` record (schema version 3)
//! - [`CellType`]: derived, mutually exclusive classification of a record
//! - [`GradeId`]: validated identifier correlating a cell with the rubric
//! - [`IdSource`]: pluggable generator of fresh `cell-<12 hex>` identifiers
//!
//! # Example
//!
//! ```rust
//! use nbg_schema::{build_record, CellType, GradeId};
//!
//! let id = GradeId::parse("cell-0123456789ab").unwrap();
//! let record = build_record(CellType::Tests, 5.0, &id).unwrap();
//!
//! assert_eq!(CellType::derive(Some(&record), true), CellType::Tests);
//! assert_eq!(record.points, Some(5.0));
//! ```

#![warn(unreachable_pub)]

mod cell_type;
mod error;
mod grade_id;
mod points;
mod record;

// Re-exports
pub use cell_type::{available_types, build_record, describe, CellType};
pub use error::SchemaError;
pub use grade_id::{
    generate_grade_id, is_valid_grade_id, sanitize, GradeId, IdSource, RandomIds, SeededIds,
    DEFAULT_ID_PREFIX,
};
pub use points::{coerce_points, parse_points, validate_points};
pub use record::{GradingRecord, NBGRADER_KEY, SCHEMA_KEYS, SCHEMA_VERSION};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with grading records
    pub use crate::{
        build_record, CellType, GradeId, GradingRecord, IdSource, RandomIds, SchemaError,
        SeededIds, NBGRADER_KEY, SCHEMA_VERSION,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
