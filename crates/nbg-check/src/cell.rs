//! Per-cell input to the validator and repair engine

use nbg_metadata::StoredRecord;
use nbg_schema::{CellType, GradingRecord};
use serde_json::Value;

/// One cell of a document as seen by the checks
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// Position of the cell in the document
    pub index: usize,
    /// Code cell (as opposed to markdown/raw)
    pub is_code: bool,
    /// Parsed record, `None` when the cell is not graded
    pub record: Option<GradingRecord>,
    /// JSON as stored; repair compares against it to detect changes
    pub raw: Option<Value>,
}

impl CellRecord {
    /// Cell whose stored JSON is exactly the serialized record
    #[must_use]
    pub fn new(index: usize, is_code: bool, record: Option<GradingRecord>) -> Self {
        let raw = record.as_ref().map(GradingRecord::to_value);
        Self {
            index,
            is_code,
            record,
            raw,
        }
    }

    /// Cell built from untyped stored JSON
    ///
    /// A value that is not an object yields an ungraded cell.
    #[must_use]
    pub fn from_raw(index: usize, is_code: bool, raw: Option<Value>) -> Self {
        let record = raw.as_ref().and_then(GradingRecord::from_value);
        Self {
            index,
            is_code,
            raw: record.as_ref().and(raw),
            record,
        }
    }

    /// Cell built from an accessor read
    #[must_use]
    pub fn from_stored(index: usize, is_code: bool, stored: Option<StoredRecord>) -> Self {
        match stored {
            Some(stored) => Self {
                index,
                is_code,
                record: Some(stored.record),
                raw: Some(stored.raw),
            },
            None => Self::new(index, is_code, None),
        }
    }

    /// Derived grading type
    #[inline]
    #[must_use]
    pub fn cell_type(&self) -> CellType {
        CellType::derive(self.record.as_ref(), self.is_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_uses_serialized_record_as_raw() {
        let record = GradingRecord::new();
        let cell = CellRecord::new(0, true, Some(record.clone()));
        assert_eq!(cell.raw, Some(record.to_value()));
    }

    #[test]
    fn from_raw_keeps_original_json() {
        let raw = json!({"schema_version": 3, "grade": "yes"});
        let cell = CellRecord::from_raw(2, false, Some(raw.clone()));
        assert_eq!(cell.raw, Some(raw));
        assert_eq!(cell.record.unwrap().grade, None);
    }

    #[test]
    fn from_raw_non_object_is_ungraded() {
        let cell = CellRecord::from_raw(0, true, Some(json!(5)));
        assert!(cell.record.is_none());
        assert!(cell.raw.is_none());
        assert_eq!(cell.cell_type(), CellType::None);
    }
}
