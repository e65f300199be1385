//! Post-save file patch
//!
//! Some hosts drop unknown cell metadata when they serialize a notebook, and
//! the external grading toolchain only reads `cells[i].metadata.nbgrader`.
//! After every save the patcher waits for the host to finish writing, reads
//! the file back and injects each in-memory record at that path.
//!
//! If the host's flush is slower than the delay the patch reads stale
//! content; that race is accepted and only logged.

use crate::config::NbgConfig;
use crate::document::NotebookDocument;
use crate::error::SavePatchError;
use nbg_metadata::NamespaceMode;
use nbg_schema::NBGRADER_KEY;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

/// Result of one save patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// File rewritten with records injected into these cells
    Patched {
        /// Injected cell indices
        cells: Vec<usize>,
    },
    /// No cell carried a record; file left alone
    NothingToPatch,
    /// Document of another notebook type
    Skipped,
    /// Read, parse or write failed; file left alone
    Failed {
        /// Why
        reason: String,
    },
}

/// Patches saved `.ipynb` files with in-memory grading records
#[derive(Debug, Clone)]
pub struct SavePatcher {
    delay: Duration,
    notebook_type: String,
}

impl SavePatcher {
    /// Patcher waiting `delay` before reading documents of `notebook_type`
    #[must_use]
    pub fn new(delay: Duration, notebook_type: impl Into<String>) -> Self {
        Self {
            delay,
            notebook_type: notebook_type.into(),
        }
    }

    /// Patcher configured from [`NbgConfig`]
    #[must_use]
    pub fn from_config(config: &NbgConfig) -> Self {
        Self::new(config.save_patch_delay(), config.notebook_type.clone())
    }

    /// Handle a save notification for `document`, stored at `path`
    ///
    /// Failures are logged and reported in the outcome; nothing is
    /// propagated to the host.
    pub async fn on_did_save(
        &self,
        path: impl AsRef<Path>,
        document: &NotebookDocument,
        mode: NamespaceMode,
    ) -> PatchOutcome {
        if document.notebook_type != self.notebook_type {
            tracing::debug!("Skipping save patch for {}", document.notebook_type);
            return PatchOutcome::Skipped;
        }

        let path = path.as_ref();
        tracing::info!("Notebook saved, patching {}", path.display());
        tokio::time::sleep(self.delay).await;

        match self.patch(path, document, mode).await {
            Ok(cells) if cells.is_empty() => {
                tracing::info!("No metadata to persist");
                PatchOutcome::NothingToPatch
            }
            Ok(cells) => {
                tracing::info!("Persisted metadata of {} cell(s)", cells.len());
                PatchOutcome::Patched { cells }
            }
            Err(err) => {
                tracing::error!("Failed to persist metadata: {}", err);
                PatchOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn patch(
        &self,
        path: &Path,
        document: &NotebookDocument,
        mode: NamespaceMode,
    ) -> Result<Vec<usize>, SavePatchError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut notebook: Value = serde_json::from_str(&content)?;
        let file_cells = notebook
            .get_mut("cells")
            .and_then(Value::as_array_mut)
            .ok_or(SavePatchError::MissingCells)?;

        let mut injected = Vec::new();
        for (index, cell) in document.cells.iter().enumerate() {
            let Some(record) = in_memory_record(cell.metadata.get_path(&mode.record_path()))
                .or_else(|| in_memory_record(cell.metadata.get_path(NBGRADER_KEY)))
            else {
                continue;
            };

            let Some(Value::Object(file_cell)) = file_cells.get_mut(index) else {
                tracing::error!(cell = index, "Cell missing in saved file");
                continue;
            };

            let metadata = file_cell
                .entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()));
            if !metadata.is_object() {
                *metadata = Value::Object(Map::new());
            }
            if let Value::Object(metadata) = metadata {
                metadata.insert(NBGRADER_KEY.to_string(), record.clone());
                tracing::debug!(cell = index, "Injected record: {}", record);
                injected.push(index);
            }
        }

        if !injected.is_empty() {
            let text = serde_json::to_string_pretty(&notebook)?;
            tokio::fs::write(path, text).await?;
        }
        Ok(injected)
    }
}

fn in_memory_record(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.is_object())
}
