//! User-facing grading commands
//!
//! A [`GradingSession`] wraps a [`NotebookHost`] and runs the commands the
//! editor exposes: set the type of a cell, clear it, validate or repair the
//! whole document, and dump a cell's metadata.

use crate::config::NbgConfig;
use crate::document::NotebookCell;
use crate::error::{CommandError, CommandResult};
use crate::host::NotebookHost;
use nbg_check::{
    CellRecord, PendingWrites, RepairEngine, RepairReport, ValidationReport, Validator,
};
use nbg_metadata::{read, write_with, MetadataBag, NamespaceMode, WriteOptions};
use nbg_schema::{
    build_record, describe, sanitize, CellType, GradeId, GradingRecord, IdSource, RandomIds,
    SchemaError,
};

/// Command runner over one open document
#[derive(Debug)]
pub struct GradingSession<H> {
    host: H,
    config: NbgConfig,
    ids: RandomIds,
}

impl<H: NotebookHost> GradingSession<H> {
    /// Create a session
    #[must_use]
    pub fn new(host: H, config: NbgConfig) -> Self {
        let ids = RandomIds::with_prefix(&config.id_prefix);
        Self { host, config, ids }
    }

    /// The host document
    #[inline]
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Give back the host document
    #[inline]
    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &NbgConfig {
        &self.config
    }

    #[inline]
    fn mode(&self) -> NamespaceMode {
        self.config.namespace
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            mirror_backup_tag: self.config.mirror_backup_tags,
        }
    }

    fn cell_at(&self, index: usize) -> CommandResult<&NotebookCell> {
        self.host.cell(index).ok_or(CommandError::NoSuchCell {
            index,
            count: self.host.cell_count(),
        })
    }

    /// Record of one cell, if any
    ///
    /// # Errors
    /// [`CommandError::NoSuchCell`] for an out-of-range index
    pub fn record(&self, index: usize) -> CommandResult<Option<GradingRecord>> {
        let cell = self.cell_at(index)?;
        Ok(read(&cell.metadata, self.mode()).map(|stored| stored.record))
    }

    /// Every cell as seen by the validator and repair engine
    #[must_use]
    pub fn records(&self) -> Vec<CellRecord> {
        (0..self.host.cell_count())
            .filter_map(|index| {
                let cell = self.host.cell(index)?;
                let stored = read(&cell.metadata, self.mode());
                Some(CellRecord::from_stored(index, cell.is_code(), stored))
            })
            .collect()
    }

    /// Set the grading type of a cell
    ///
    /// Gradable types take `points`, falling back to the cell's current
    /// points and then to zero. An existing identifier is kept; otherwise a
    /// new one is generated. [`CellType::None`] clears the record.
    ///
    /// # Errors
    /// - [`CommandError::NoSuchCell`] for an out-of-range index
    /// - [`CommandError::CodeOnlyType`] for an autograded type on a
    ///   non-code cell
    /// - [`CommandError::InvalidPoints`] for negative or non-finite points
    /// - [`CommandError::Host`] when the edit is rejected
    pub async fn set_cell_type(
        &mut self,
        index: usize,
        cell_type: CellType,
        points: Option<f64>,
    ) -> CommandResult<String> {
        let cell = self.cell_at(index)?;
        if !cell.is_code() && cell_type.is_code_only() {
            return Err(CommandError::CodeOnlyType { cell_type });
        }

        let current = read(&cell.metadata, self.mode()).map(|stored| stored.record);
        if cell_type == CellType::None {
            self.store(index, None).await?;
            return Ok("nbgrader metadata cleared".to_string());
        }

        let points = if cell_type.is_gradable() {
            let points = points
                .or_else(|| current.as_ref().and_then(|r| r.points))
                .unwrap_or(0.0);
            check_points(points)?
        } else {
            0.0
        };

        let grade_id = self.existing_or_new_id(current.as_ref());
        let record = build_record(cell_type, points, &grade_id);
        self.store(index, record.as_ref()).await?;

        tracing::info!(cell = index, "Set to {} ({})", cell_type.as_str(), grade_id);
        Ok(if cell_type.is_gradable() {
            format!("Cell type set to \"{}\" ({} points)", cell_type.label(), points)
        } else {
            format!("Cell type set to \"{}\"", cell_type.label())
        })
    }

    /// Remove the grading record of a cell
    ///
    /// Returns `false` when the cell had no record.
    ///
    /// # Errors
    /// [`CommandError::NoSuchCell`] or a rejected host edit
    pub async fn clear_metadata(&mut self, index: usize) -> CommandResult<bool> {
        if self.record(index)?.is_none() {
            tracing::info!(cell = index, "No nbgrader metadata to clear");
            return Ok(false);
        }
        self.store(index, None).await?;
        tracing::info!(cell = index, "Cleared nbgrader metadata");
        Ok(true)
    }

    /// Validate the whole document
    ///
    /// Every finding is logged, followed by the one-line summary.
    #[must_use]
    pub fn validate_notebook(&self) -> ValidationReport {
        let report = Validator::new().validate(&self.records());
        for error in &report.errors {
            tracing::warn!("{}", error);
        }
        for warning in &report.warnings {
            tracing::info!("Warning: {}", warning);
        }
        tracing::info!("{}", report.summary());
        report
    }

    /// Repair every record and persist the changes through the host
    ///
    /// A cell whose edit fails is counted in [`RepairReport::failed`]; the
    /// remaining cells are still written.
    pub async fn fix_notebook(&mut self) -> RepairReport {
        let mut cells = self.records();
        let mut engine = self.repair_engine();
        let mut pending = PendingWrites::default();
        let mut report = engine.repair(&mut cells, &mut pending);

        for (index, record) in pending.writes {
            if let Err(err) = self.store(index, Some(&record)).await {
                tracing::error!(cell = index, "Failed to write repaired record: {}", err);
                report.mark_failed(index, err.to_string());
            }
        }

        tracing::info!("{}", report.summary());
        report
    }

    /// What [`GradingSession::fix_notebook`] would change
    #[must_use]
    pub fn preview_fix(&self) -> RepairReport {
        self.repair_engine().preview(&self.records())
    }

    /// Pretty JSON of a cell's full metadata bag
    ///
    /// # Errors
    /// [`CommandError::NoSuchCell`] for an out-of-range index
    pub fn debug_metadata(&self, index: usize) -> CommandResult<String> {
        let cell = self.cell_at(index)?;
        let text = serde_json::to_string_pretty(&cell.metadata)?;
        tracing::debug!(cell = index, "Metadata: {}", text);
        Ok(text)
    }

    /// Status text for a cell: "Not graded" or the type label with points
    ///
    /// # Errors
    /// [`CommandError::NoSuchCell`] for an out-of-range index
    pub fn describe_cell(&self, index: usize) -> CommandResult<String> {
        let is_code = self.cell_at(index)?.is_code();
        Ok(describe(self.record(index)?.as_ref(), is_code))
    }

    fn existing_or_new_id(&mut self, current: Option<&GradingRecord>) -> GradeId {
        current
            .and_then(|r| r.grade_id.as_deref())
            .and_then(sanitize)
            .unwrap_or_else(|| self.ids.next_id())
    }

    fn repair_engine(&self) -> RepairEngine<RandomIds> {
        RepairEngine::with_id_source(RandomIds::with_prefix(&self.config.id_prefix))
    }

    async fn store(&mut self, index: usize, record: Option<&GradingRecord>) -> CommandResult<()> {
        let bag: MetadataBag = {
            let cell = self.cell_at(index)?;
            write_with(&cell.metadata, record, self.mode(), self.write_options())?
        };
        self.host.update_cell_metadata(index, bag).await?;
        Ok(())
    }
}

fn check_points(points: f64) -> Result<f64, SchemaError> {
    if !points.is_finite() {
        Err(SchemaError::NonNumericPoints)
    } else if points < 0.0 {
        Err(SchemaError::NegativePoints)
    } else {
        Ok(points)
    }
}
