//! Host document model seam
//!
//! The grading commands only see a cell list with a code flag and an opaque
//! metadata bag per cell, and replace a bag through one atomic edit.

use crate::document::{NotebookCell, NotebookDocument};
use crate::error::HostError;
use nbg_metadata::MetadataBag;

/// A notebook editor that owns the document
#[async_trait::async_trait]
pub trait NotebookHost: Send + Sync {
    /// Number of cells
    fn cell_count(&self) -> usize;

    /// Cell at `index`
    fn cell(&self, index: usize) -> Option<&NotebookCell>;

    /// Replace the metadata bag of one cell as a single edit
    async fn update_cell_metadata(
        &mut self,
        index: usize,
        metadata: MetadataBag,
    ) -> Result<(), HostError>;
}

#[async_trait::async_trait]
impl NotebookHost for NotebookDocument {
    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, index: usize) -> Option<&NotebookCell> {
        self.cells.get(index)
    }

    async fn update_cell_metadata(
        &mut self,
        index: usize,
        metadata: MetadataBag,
    ) -> Result<(), HostError> {
        let count = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(HostError::NoSuchCell { index, count })?;
        cell.metadata = metadata;
        Ok(())
    }
}
