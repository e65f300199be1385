//! Cell grading types
//!
//! A [`CellType`] is never stored; it is derived from the flags of a
//! [`GradingRecord`] together with whether the owning cell is a code cell.
//! [`build_record`] goes the other way and produces the canonical record for
//! a type.

use crate::error::SchemaError;
use crate::grade_id::GradeId;
use crate::record::{GradingRecord, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Derived grading classification of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Not graded
    #[default]
    #[serde(rename = "")]
    None,
    /// Manually graded answer
    #[serde(rename = "manual")]
    Manual,
    /// Manually graded task
    #[serde(rename = "task")]
    Task,
    /// Autograded answer (code cells only)
    #[serde(rename = "solution")]
    Solution,
    /// Autograded tests (code cells only)
    #[serde(rename = "tests")]
    Tests,
    /// Read-only
    #[serde(rename = "readonly")]
    Readonly,
}

impl CellType {
    /// Every type, in menu order
    pub const ALL: [CellType; 6] = [
        CellType::None,
        CellType::Manual,
        CellType::Task,
        CellType::Readonly,
        CellType::Solution,
        CellType::Tests,
    ];

    /// Derive the type of a cell from its record
    ///
    /// First match wins:
    /// 1. `task` → [`CellType::Task`]
    /// 2. `solution && grade` → [`CellType::Manual`]
    /// 3. `solution && !grade` on code → [`CellType::Solution`]
    /// 4. `grade && !solution` on code → [`CellType::Tests`]
    /// 5. `locked` with every other flag clear → [`CellType::Readonly`]
    /// 6. otherwise [`CellType::None`]
    #[must_use]
    pub fn derive(record: Option<&GradingRecord>, is_code: bool) -> Self {
        let Some(record) = record else {
            return Self::None;
        };

        let grade = record.is_graded();
        let solution = record.is_solution();
        let task = record.is_task();

        if task {
            Self::Task
        } else if solution && grade {
            Self::Manual
        } else if solution && is_code {
            Self::Solution
        } else if grade && !solution && is_code {
            Self::Tests
        } else if record.is_locked() && !solution && !grade {
            Self::Readonly
        } else {
            Self::None
        }
    }

    /// Tag used in the original metadata vocabulary (`""` for none)
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Manual => "manual",
            Self::Task => "task",
            Self::Solution => "solution",
            Self::Tests => "tests",
            Self::Readonly => "readonly",
        }
    }

    /// Human-readable menu label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "-",
            Self::Manual => "Manually graded answer",
            Self::Task => "Manually graded task",
            Self::Solution => "Autograded answer",
            Self::Tests => "Autograded tests",
            Self::Readonly => "Read-only",
        }
    }

    /// Reverse of [`CellType::label`]
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Types that carry points
    #[inline]
    #[must_use]
    pub const fn is_gradable(self) -> bool {
        matches!(self, Self::Manual | Self::Task | Self::Tests)
    }

    /// Types only meaningful on code cells
    #[inline]
    #[must_use]
    pub const fn is_code_only(self) -> bool {
        matches!(self, Self::Solution | Self::Tests)
    }

    /// Whether the type may be assigned to a cell of the given kind
    #[inline]
    #[must_use]
    pub const fn allowed_on(self, is_code: bool) -> bool {
        is_code || !self.is_code_only()
    }
}

impl Display for CellType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CellType {
    type Err = SchemaError;

    /// Accepts the tag (`"tests"`), the label (`"Autograded tests"`) or
    /// `"none"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::None);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == trimmed || t.label() == trimmed)
            .ok_or_else(|| SchemaError::UnknownCellType(s.to_string()))
    }
}

/// Types offered for a cell of the given kind, in menu order
#[must_use]
pub fn available_types(is_code: bool) -> Vec<CellType> {
    CellType::ALL
        .into_iter()
        .filter(|t| t.allowed_on(is_code))
        .collect()
}

/// Build the canonical record for a cell type
///
/// Returns `None` for [`CellType::None`], which signals deletion of the
/// record. All four flags are always written; `points` only for gradable
/// types.
#[must_use]
pub fn build_record(cell_type: CellType, points: f64, grade_id: &GradeId) -> Option<GradingRecord> {
    let (grade, solution, locked, task) = match cell_type {
        CellType::None => return None,
        CellType::Manual => (true, true, false, false),
        CellType::Task => (true, false, false, true),
        CellType::Solution => (false, true, false, false),
        CellType::Tests => (true, false, true, false),
        CellType::Readonly => (false, false, true, false),
    };

    Some(GradingRecord {
        schema_version: Some(SCHEMA_VERSION),
        grade_id: Some(grade_id.to_string()),
        grade: Some(grade),
        solution: Some(solution),
        locked: Some(locked),
        task: Some(task),
        points: cell_type.is_gradable().then_some(points),
        ..GradingRecord::default()
    })
}

/// Status text for a cell: `"Not graded"` or the label, with points for
/// gradable types
#[must_use]
pub fn describe(record: Option<&GradingRecord>, is_code: bool) -> String {
    let cell_type = CellType::derive(record, is_code);
    if cell_type == CellType::None {
        return "Not graded".to_string();
    }

    match record.and_then(|r| r.points) {
        Some(points) if cell_type.is_gradable() => {
            format!("{} ({} pts)", cell_type.label(), points)
        }
        _ => cell_type.label().to_string(),
    }
}
