//! Document-wide validation of grading records
//!
//! Reports schema violations without touching the document. Errors block
//! the external grading toolchain; warnings flag records that are legal but
//! probably not what the author meant.

use crate::cell::CellRecord;
use nbg_schema::{is_valid_grade_id, CellType, GradingRecord, SCHEMA_VERSION};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Severity of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Violates the schema
    Error,
    /// Legal but suspicious
    Warning,
}

/// What is wrong
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// `schema_version` missing or not 3
    UnsupportedSchemaVersion {
        /// Version found, if any
        found: Option<i64>,
    },
    /// `grade`, `solution` or `locked` set without a `grade_id`
    MissingGradeId,
    /// `grade_id` has characters outside `[A-Za-z0-9_-]`
    InvalidGradeId {
        /// Offending identifier
        id: String,
    },
    /// `grade` set without numeric points
    MissingPoints,
    /// `grade` set with points below zero
    NegativePoints {
        /// Offending value
        points: f64,
    },
    /// Autograded type on a markdown/raw cell
    CodeOnlyOnNonCode {
        /// Type the record would have on a code cell
        cell_type: CellType,
    },
    /// `task` set without `grade=true, solution=false, locked=false`
    InconsistentTask,
    /// Same `grade_id` on several cells
    DuplicateGradeId {
        /// Shared identifier
        id: String,
    },
    /// `points` present while `grade` is false
    PointsIgnored,
    /// Graded cell worth nothing
    ZeroPoints,
    /// Record present but the cell is not graded in any way
    NoEffect,
}

impl IssueKind {
    /// Whether the kind is an error or a warning
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::PointsIgnored | Self::ZeroPoints | Self::NoEffect => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSchemaVersion { found: Some(v) } => {
                write!(f, "unsupported schema_version {v} (expected {SCHEMA_VERSION})")
            }
            Self::UnsupportedSchemaVersion { found: None } => {
                write!(f, "missing or invalid schema_version (expected {SCHEMA_VERSION})")
            }
            Self::MissingGradeId => f.write_str("missing grade_id"),
            Self::InvalidGradeId { id } => write!(
                f,
                "invalid grade_id '{id}' (only letters, digits, '_' and '-' are allowed)"
            ),
            Self::MissingPoints => f.write_str("graded cell is missing points"),
            Self::NegativePoints { points } => {
                write!(f, "points must be non-negative, got {points}")
            }
            Self::CodeOnlyOnNonCode { cell_type } => {
                write!(f, "\"{}\" is only valid on code cells", cell_type.label())
            }
            Self::InconsistentTask => {
                f.write_str("task cell must have grade=true, solution=false, locked=false")
            }
            Self::DuplicateGradeId { id } => write!(f, "duplicate grade_id '{id}'"),
            Self::PointsIgnored => f.write_str("points are ignored because grade is false"),
            Self::ZeroPoints => f.write_str("graded cell is worth 0 points"),
            Self::NoEffect => f.write_str("nbgrader metadata present but cell is not graded"),
        }
    }
}

/// A single finding, attached to one or more cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// Cell indices involved, ascending
    pub cells: Vec<usize>,
    /// What is wrong
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl Issue {
    fn at(index: usize, kind: IssueKind) -> Self {
        Self {
            cells: vec![index],
            kind,
        }
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.cells.as_slice() {
            [single] => write!(f, "Cell {single}: {}", self.kind),
            many => {
                let list = many
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Cells {list}: {}", self.kind)
            }
        }
    }
}

/// Outcome of [`Validator::validate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Schema violations, cell order then duplicate identifiers
    pub errors: Vec<Issue>,
    /// Suspicious but legal records
    pub warnings: Vec<Issue>,
    /// Sum of points over graded cells
    pub total_points: f64,
    /// Cells that carry a record
    pub graded_cells: usize,
}

impl ValidationReport {
    /// No errors (warnings allowed)
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error messages in report order
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Warning messages in report order
    #[must_use]
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!(
                "Validation passed: {} cells with metadata, {} total points, {} warning(s)",
                self.graded_cells,
                self.total_points,
                self.warnings.len()
            )
        } else {
            format!(
                "Validation failed: {} error(s), {} warning(s), {} total points",
                self.errors.len(),
                self.warnings.len(),
                self.total_points
            )
        }
    }

    fn push(&mut self, issue: Issue) {
        match issue.kind.severity() {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

/// Stateless document validator
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate every record of a document
    ///
    /// Cells without a record are skipped. The result is deterministic:
    /// per-cell findings in input order, then one error per shared
    /// `grade_id` in order of first use.
    #[must_use]
    pub fn validate(&self, cells: &[CellRecord]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut owners: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

        for cell in cells {
            let Some(record) = &cell.record else {
                continue;
            };
            report.graded_cells += 1;

            for kind in Self::check_record(record, cell.is_code) {
                report.push(Issue::at(cell.index, kind));
            }

            if let Some(points) = record.points.filter(|p| record.is_graded() && p.is_finite()) {
                report.total_points += points;
            }

            if let Some(id) = record.grade_id.as_deref() {
                match owners.get(id) {
                    Some(&slot) => groups[slot].1.push(cell.index),
                    None => {
                        owners.insert(id, groups.len());
                        groups.push((id, vec![cell.index]));
                    }
                }
            }
        }

        for (id, mut indices) in groups {
            if indices.len() > 1 {
                indices.sort_unstable();
                report.push(Issue {
                    cells: indices,
                    kind: IssueKind::DuplicateGradeId { id: id.to_string() },
                });
            }
        }

        tracing::debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validated {} cells",
            cells.len()
        );
        report
    }

    /// Findings for a single record, in a fixed order
    #[must_use]
    pub fn check_record(record: &GradingRecord, is_code: bool) -> Vec<IssueKind> {
        let mut issues = Vec::new();

        if !record.has_supported_version() {
            issues.push(IssueKind::UnsupportedSchemaVersion {
                found: record.schema_version,
            });
        }

        match record.grade_id.as_deref() {
            None if record.needs_grade_id() => issues.push(IssueKind::MissingGradeId),
            Some(id) if record.needs_grade_id() && !is_valid_grade_id(id) => {
                issues.push(IssueKind::InvalidGradeId { id: id.to_string() });
            }
            _ => {}
        }

        if record.is_graded() {
            match record.points {
                None => issues.push(IssueKind::MissingPoints),
                Some(points) if points < 0.0 => issues.push(IssueKind::NegativePoints { points }),
                Some(points) if points == 0.0 => issues.push(IssueKind::ZeroPoints),
                Some(_) => {}
            }
        } else if record.points.is_some() {
            issues.push(IssueKind::PointsIgnored);
        }

        let code_shape = CellType::derive(Some(record), true);
        if !is_code && code_shape.is_code_only() {
            issues.push(IssueKind::CodeOnlyOnNonCode {
                cell_type: code_shape,
            });
        }

        if record.is_task() && (!record.is_graded() || record.is_solution() || record.is_locked()) {
            issues.push(IssueKind::InconsistentTask);
        }

        if code_shape == CellType::None {
            issues.push(IssueKind::NoEffect);
        }

        issues
    }
}
