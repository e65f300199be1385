//! The per-cell grading record
//!
//! A [`GradingRecord`] is the strongly-typed view of the JSON object stored
//! under the `nbgrader` key of a cell's metadata. Parsing is lenient: a field
//! that is absent or carries the wrong JSON type reads as `None`, so that the
//! validator can report it and the repair engine can rewrite it.

use serde_json::{Map, Number, Value};

/// Metadata key under which grading records are stored
pub const NBGRADER_KEY: &str = "nbgrader";

/// The only schema version this crate reads and writes
pub const SCHEMA_VERSION: i64 = 3;

/// Keys owned by the record schema; everything else passes through untouched
pub const SCHEMA_KEYS: [&str; 7] = [
    "schema_version",
    "grade_id",
    "grade",
    "solution",
    "locked",
    "task",
    "points",
];

/// Largest integer an f64 can hold exactly (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// nbgrader metadata for a single cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradingRecord {
    /// Must equal [`SCHEMA_VERSION`] for the record to be valid
    pub schema_version: Option<i64>,
    /// Identifier, required when `grade`, `solution` or `locked` is set
    pub grade_id: Option<String>,
    /// Cell contributes to the score
    pub grade: Option<bool>,
    /// Cell holds a student answer region
    pub solution: Option<bool>,
    /// Cell is read-only to students
    pub locked: Option<bool>,
    /// Cell is a manually graded task
    pub task: Option<bool>,
    /// Score weight, required and non-negative when `grade` is set
    pub points: Option<f64>,
    /// Keys outside the schema (`checksum`, `cell_type`, ...) kept as stored
    pub extra: Map<String, Value>,
}

impl GradingRecord {
    /// Empty record at the supported schema version
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_version: Some(SCHEMA_VERSION),
            ..Self::default()
        }
    }

    /// Parse a record from an untyped JSON value
    ///
    /// Returns `None` when the value is not a JSON object. Fields of the wrong
    /// type are dropped to `None`; keys outside [`SCHEMA_KEYS`] land in `extra`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            schema_version: map.get("schema_version").and_then(integral),
            grade_id: map
                .get("grade_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            grade: map.get("grade").and_then(Value::as_bool),
            solution: map.get("solution").and_then(Value::as_bool),
            locked: map.get("locked").and_then(Value::as_bool),
            task: map.get("task").and_then(Value::as_bool),
            points: map
                .get("points")
                .and_then(Value::as_f64)
                .filter(|p| p.is_finite()),
            extra: map
                .iter()
                .filter(|(key, _)| !SCHEMA_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        })
    }

    /// Serialize the defined subset of fields
    ///
    /// Integral points are written as JSON integers, so a stored `5` reads
    /// back and re-serializes as `5` rather than `5.0`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        if let Some(grade) = self.grade {
            map.insert("grade".to_string(), Value::Bool(grade));
        }
        if let Some(id) = &self.grade_id {
            map.insert("grade_id".to_string(), Value::String(id.clone()));
        }
        if let Some(locked) = self.locked {
            map.insert("locked".to_string(), Value::Bool(locked));
        }
        if let Some(points) = self.points.and_then(points_value) {
            map.insert("points".to_string(), points);
        }
        if let Some(version) = self.schema_version {
            map.insert("schema_version".to_string(), Value::from(version));
        }
        if let Some(solution) = self.solution {
            map.insert("solution".to_string(), Value::Bool(solution));
        }
        if let Some(task) = self.task {
            map.insert("task".to_string(), Value::Bool(task));
        }
        Value::Object(map)
    }

    /// `grade` flag, absent reads as false
    #[inline]
    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.grade.unwrap_or(false)
    }

    /// `solution` flag, absent reads as false
    #[inline]
    #[must_use]
    pub fn is_solution(&self) -> bool {
        self.solution.unwrap_or(false)
    }

    /// `locked` flag, absent reads as false
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    /// `task` flag, absent reads as false
    #[inline]
    #[must_use]
    pub fn is_task(&self) -> bool {
        self.task.unwrap_or(false)
    }

    /// Whether the record must carry a `grade_id`
    #[inline]
    #[must_use]
    pub fn needs_grade_id(&self) -> bool {
        self.is_graded() || self.is_solution() || self.is_locked()
    }

    /// Whether the schema version is the supported one
    #[inline]
    #[must_use]
    pub fn has_supported_version(&self) -> bool {
        self.schema_version == Some(SCHEMA_VERSION)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0 && v.abs() < MAX_EXACT_INTEGER)
            .map(|v| v as i64)
    })
}

#[allow(clippy::cast_possible_truncation)]
fn points_value(points: f64) -> Option<Value> {
    if !points.is_finite() {
        return None;
    }
    if points.fract() == 0.0 && points.abs() < MAX_EXACT_INTEGER {
        return Some(Value::from(points as i64));
    }
    Number::from_f64(points).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_complete_record() {
        let value = json!({
            "schema_version": 3,
            "grade_id": "cell-0123456789ab",
            "grade": true,
            "solution": false,
            "locked": true,
            "points": 2.5
        });

        let record = GradingRecord::from_value(&value).unwrap();
        assert_eq!(record.schema_version, Some(3));
        assert_eq!(record.grade_id.as_deref(), Some("cell-0123456789ab"));
        assert!(record.is_graded());
        assert!(!record.is_solution());
        assert!(record.is_locked());
        assert_eq!(record.task, None);
        assert_eq!(record.points, Some(2.5));
    }

    #[test]
    fn wrong_types_read_as_absent() {
        let value = json!({
            "schema_version": "3",
            "grade_id": 7,
            "grade": "yes",
            "points": "ten"
        });

        let record = GradingRecord::from_value(&value).unwrap();
        assert_eq!(record, GradingRecord::default());
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let value = json!({
            "schema_version": 3,
            "grade": false,
            "checksum": "9f2c",
            "cell_type": "markdown"
        });

        let record = GradingRecord::from_value(&value).unwrap();
        assert_eq!(record.extra.len(), 2);
        assert_eq!(record.extra["checksum"], json!("9f2c"));
        assert_eq!(record.to_value(), value);
    }

    #[test]
    fn non_object_is_not_a_record() {
        assert!(GradingRecord::from_value(&json!("nbgrader")).is_none());
        assert!(GradingRecord::from_value(&json!(null)).is_none());
        assert!(GradingRecord::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn float_schema_version_accepted_when_integral() {
        let record = GradingRecord::from_value(&json!({"schema_version": 3.0})).unwrap();
        assert!(record.has_supported_version());

        let record = GradingRecord::from_value(&json!({"schema_version": 2.5})).unwrap();
        assert_eq!(record.schema_version, None);
    }

    #[test]
    fn to_value_omits_absent_fields() {
        let record = GradingRecord {
            schema_version: Some(3),
            locked: Some(true),
            ..GradingRecord::default()
        };
        assert_eq!(record.to_value(), json!({"schema_version": 3, "locked": true}));
    }

    #[test]
    fn integral_points_serialize_as_integers() {
        let record = GradingRecord {
            points: Some(5.0),
            ..GradingRecord::default()
        };
        assert_eq!(record.to_value(), json!({"points": 5}));

        let record = GradingRecord {
            points: Some(1.5),
            ..GradingRecord::default()
        };
        assert_eq!(record.to_value(), json!({"points": 1.5}));
    }

    #[test]
    fn non_finite_points_are_not_emitted() {
        let record = GradingRecord {
            points: Some(f64::NAN),
            ..GradingRecord::default()
        };
        assert_eq!(record.to_value(), json!({}));
    }

    #[test]
    fn needs_grade_id_follows_flags() {
        let mut record = GradingRecord::new();
        assert!(!record.needs_grade_id());

        record.task = Some(true);
        assert!(!record.needs_grade_id());

        record.locked = Some(true);
        assert!(record.needs_grade_id());
    }
}
