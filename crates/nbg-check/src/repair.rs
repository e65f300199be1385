//! Idempotent auto-repair of grading records
//!
//! Rewrites every record into a schema-valid state without asking the user
//! anything. Running the engine on its own output changes nothing.
//!
//! # Per-cell steps
//!
//! 1. skip cells without a record
//! 2. force `schema_version = 3`
//! 3. default missing or non-boolean flags to `false`
//! 4. demote autograded shapes on non-code cells to a manually graded answer
//! 5. `task` forces `grade=true, solution=false, locked=false`
//! 6. graded cells get `points >= 0`; ungraded cells lose `points`
//! 7. keep, sanitize or mint a `grade_id`, resolving collisions so the first
//!    cell holding an identifier keeps it
//! 8. persist only when the repaired record differs from what was stored;
//!    numbers compare by value and keys outside the schema are carried over

use crate::cell::CellRecord;
use nbg_schema::{
    coerce_points, is_valid_grade_id, sanitize, CellType, GradeId, GradingRecord, IdSource,
    RandomIds, SCHEMA_VERSION,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Fresh identifiers tried before falling back to a numbered suffix
const MAX_ID_ATTEMPTS: usize = 64;

/// Receives each repaired record for persistence
pub trait RecordSink {
    /// Persist the record of cell `index`
    ///
    /// # Errors
    /// A human-readable reason; the engine logs it and moves on
    fn persist(&mut self, index: usize, record: &GradingRecord) -> Result<(), String>;
}

impl<F> RecordSink for F
where
    F: FnMut(usize, &GradingRecord) -> Result<(), String>,
{
    fn persist(&mut self, index: usize, record: &GradingRecord) -> Result<(), String> {
        self(index, record)
    }
}

/// Sink that accepts everything and stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl RecordSink for DryRun {
    fn persist(&mut self, _index: usize, _record: &GradingRecord) -> Result<(), String> {
        Ok(())
    }
}

/// Sink that queues writes for a caller that persists asynchronously
#[derive(Debug, Clone, Default)]
pub struct PendingWrites {
    /// Queued `(cell index, record)` pairs in repair order
    pub writes: Vec<(usize, GradingRecord)>,
}

impl RecordSink for PendingWrites {
    fn persist(&mut self, index: usize, record: &GradingRecord) -> Result<(), String> {
        self.writes.push((index, record.clone()));
        Ok(())
    }
}

/// Outcome of a repair pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Cells rewritten and persisted
    pub fixed: Vec<usize>,
    /// Cells whose rewrite could not be persisted, with the reason
    pub failed: Vec<(usize, String)>,
}

impl RepairReport {
    /// Number of cells changed
    #[inline]
    #[must_use]
    pub fn fix_count(&self) -> usize {
        self.fixed.len()
    }

    /// Nothing needed fixing and nothing failed
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fixed.is_empty() && self.failed.is_empty()
    }

    /// Move a cell from `fixed` to `failed`
    ///
    /// Used by callers that persist queued writes after the pass.
    pub fn mark_failed(&mut self, index: usize, reason: impl Into<String>) {
        self.fixed.retain(|&i| i != index);
        self.failed.push((index, reason.into()));
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.fixed.len(), self.failed.len()) {
            (0, 0) => "No issues to fix".to_string(),
            (fixed, 0) => format!("Fixed {fixed} cell(s)"),
            (fixed, failed) => format!("Fixed {fixed} cell(s), {failed} failed"),
        }
    }
}

/// The repair engine
#[derive(Debug, Clone)]
pub struct RepairEngine<S = RandomIds> {
    ids: S,
}

impl RepairEngine<RandomIds> {
    /// Engine minting random `cell-` identifiers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_source(RandomIds::new())
    }
}

impl Default for RepairEngine<RandomIds> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: IdSource> RepairEngine<S> {
    /// Engine with a specific identifier source
    #[inline]
    #[must_use]
    pub fn with_id_source(ids: S) -> Self {
        Self { ids }
    }

    /// Repair every record of a document in place
    ///
    /// Changed records are handed to `sink`. A sink failure is recorded and
    /// the scan continues; the in-memory cell keeps its previous state.
    pub fn repair<K>(&mut self, cells: &mut [CellRecord], sink: &mut K) -> RepairReport
    where
        K: RecordSink + ?Sized,
    {
        let normalized: Vec<Option<GradingRecord>> = cells
            .iter()
            .map(|cell| {
                cell.record
                    .as_ref()
                    .map(|record| normalize(record, cell.raw.as_ref(), cell.is_code))
            })
            .collect();

        let mut owners = claim_existing_ids(cells, &normalized);
        let mut report = RepairReport::default();

        for (cell, repaired) in cells.iter_mut().zip(normalized) {
            let Some(mut repaired) = repaired else {
                continue;
            };

            repaired.grade_id = if repaired.needs_grade_id() {
                let id = self.assign_id(cell.index, repaired.grade_id.as_deref(), &owners);
                owners.insert(id.to_string(), cell.index);
                Some(id.into_string())
            } else {
                None
            };

            let original = match &cell.raw {
                Some(raw) => raw.clone(),
                None => cell
                    .record
                    .as_ref()
                    .map(GradingRecord::to_value)
                    .unwrap_or_default(),
            };
            if matches_stored(&repaired, &original) {
                continue;
            }

            let value = repaired.to_value();
            match sink.persist(cell.index, &repaired) {
                Ok(()) => {
                    tracing::info!(cell = cell.index, "Fixed record: {} -> {}", original, value);
                    cell.record = Some(repaired);
                    cell.raw = Some(value);
                    report.fixed.push(cell.index);
                }
                Err(reason) => {
                    tracing::warn!(cell = cell.index, "Failed to fix record: {}", reason);
                    report.failed.push((cell.index, reason));
                }
            }
        }

        report
    }

    /// Report what [`RepairEngine::repair`] would change, without persisting
    pub fn preview(&mut self, cells: &[CellRecord]) -> RepairReport {
        let mut scratch = cells.to_vec();
        self.repair(&mut scratch, &mut DryRun)
    }

    fn assign_id(
        &mut self,
        index: usize,
        existing: Option<&str>,
        owners: &HashMap<String, usize>,
    ) -> GradeId {
        let candidate = existing.and_then(sanitize);
        match candidate {
            Some(id) if owners.get(id.as_str()).map_or(true, |&owner| owner == index) => id,
            Some(id) => {
                tracing::debug!(cell = index, "grade_id '{}' collides", id);
                self.fresh_id(owners)
            }
            None => self.fresh_id(owners),
        }
    }

    fn fresh_id(&mut self, owners: &HashMap<String, usize>) -> GradeId {
        let mut last = self.ids.next_id();
        for _ in 1..MAX_ID_ATTEMPTS {
            if !owners.contains_key(last.as_str()) {
                return last;
            }
            last = self.ids.next_id();
        }
        if !owners.contains_key(last.as_str()) {
            return last;
        }

        // A source stuck on used identifiers still terminates
        (1usize..)
            .filter_map(|n| GradeId::parse(&format!("{last}-{n}")).ok())
            .find(|id| !owners.contains_key(id.as_str()))
            .unwrap_or(last)
    }
}

/// Steps 2 to 6: everything except the identifier
fn normalize(record: &GradingRecord, raw: Option<&Value>, is_code: bool) -> GradingRecord {
    let mut repaired = GradingRecord {
        schema_version: Some(SCHEMA_VERSION),
        grade_id: record.grade_id.clone(),
        grade: Some(record.is_graded()),
        solution: Some(record.is_solution()),
        locked: Some(record.is_locked()),
        task: Some(record.is_task()),
        points: record.points,
        extra: record.extra.clone(),
    };

    if !is_code && CellType::derive(Some(&repaired), true).is_code_only() {
        repaired.grade = Some(true);
        repaired.solution = Some(true);
        repaired.locked = Some(false);
        repaired.task = Some(false);
    }

    if repaired.is_task() {
        repaired.grade = Some(true);
        repaired.solution = Some(false);
        repaired.locked = Some(false);
    }

    repaired.points = if repaired.is_graded() {
        match repaired.points {
            Some(points) if points >= 0.0 => Some(points),
            _ => Some(coerce_points(raw.and_then(|r| r.get("points")))),
        }
    } else {
        None
    };

    repaired
}

/// Step 8: the stored JSON already holds exactly `repaired`
///
/// Parsed fields compare by value, so a stored `2.0` matches `2`. A schema
/// key of the wrong JSON type parses to nothing and is not re-emitted, so the
/// key counts differ and the record is rewritten.
fn matches_stored(repaired: &GradingRecord, raw: &Value) -> bool {
    let Some(stored) = GradingRecord::from_value(raw) else {
        return false;
    };
    let key_count = |value: &Value| value.as_object().map_or(0, serde_json::Map::len);
    stored == *repaired && key_count(&stored.to_value()) == key_count(raw)
}

/// Pre-pass: the first cell holding each valid identifier owns it
fn claim_existing_ids(
    cells: &[CellRecord],
    normalized: &[Option<GradingRecord>],
) -> HashMap<String, usize> {
    let mut owners = HashMap::new();
    for (cell, repaired) in cells.iter().zip(normalized) {
        let Some(repaired) = repaired else {
            continue;
        };
        if !repaired.needs_grade_id() {
            continue;
        }
        if let Some(id) = repaired.grade_id.as_deref().filter(|id| is_valid_grade_id(id)) {
            owners.entry(id.to_string()).or_insert(cell.index);
        }
    }
    owners
}
