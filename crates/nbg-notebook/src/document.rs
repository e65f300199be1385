//! In-memory notebook document
//!
//! Models the host's view of an `.ipynb` file: each cell's on-disk
//! `metadata` object sits inside an opaque [`MetadataBag`] under the host
//! namespace (`custom.metadata` or `metadata`), and everything else about
//! the cell is carried through untouched.

use crate::config::DEFAULT_NOTEBOOK_TYPE;
use crate::error::DocumentError;
use nbg_metadata::{MetadataBag, NamespaceMode};
use nbg_schema::NBGRADER_KEY;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a cell as far as grading is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Code cell
    Code,
    /// Markdown or raw cell
    Markup,
}

impl CellKind {
    /// Classify an nbformat `cell_type`
    #[inline]
    #[must_use]
    pub fn from_cell_type(cell_type: &str) -> Self {
        if cell_type == "code" {
            Self::Code
        } else {
            Self::Markup
        }
    }

    /// Code cell
    #[inline]
    #[must_use]
    pub const fn is_code(self) -> bool {
        matches!(self, Self::Code)
    }
}

/// One cell of a document
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookCell {
    /// Code or markup
    pub kind: CellKind,
    /// Host metadata bag
    pub metadata: MetadataBag,
    /// All other cell fields (`cell_type`, `source`, `outputs`, ...)
    pub body: Map<String, Value>,
}

impl NotebookCell {
    /// Empty cell of the given kind
    #[must_use]
    pub fn new(kind: CellKind) -> Self {
        let cell_type = match kind {
            CellKind::Code => "code",
            CellKind::Markup => "markdown",
        };
        let mut body = Map::new();
        body.insert("cell_type".to_string(), Value::from(cell_type));
        Self {
            kind,
            metadata: MetadataBag::new(),
            body,
        }
    }

    /// Code cell
    #[inline]
    #[must_use]
    pub fn is_code(&self) -> bool {
        self.kind.is_code()
    }
}

/// Options for [`NotebookDocument::to_ipynb_value`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Behave like a host serializer that drops custom metadata fields,
    /// which loses the `nbgrader` key on save
    pub drop_custom_metadata: bool,
}

/// An open notebook
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookDocument {
    /// Host notebook type, e.g. `jupyter-notebook`
    pub notebook_type: String,
    /// Cells in document order
    pub cells: Vec<NotebookCell>,
    /// Top-level fields other than `cells`
    pub extra: Map<String, Value>,
}

impl NotebookDocument {
    /// Document of the given cells
    #[must_use]
    pub fn new(cells: Vec<NotebookCell>) -> Self {
        Self {
            notebook_type: DEFAULT_NOTEBOOK_TYPE.to_string(),
            cells,
            extra: Map::new(),
        }
    }

    /// With notebook type
    #[inline]
    #[must_use]
    pub fn with_notebook_type(mut self, notebook_type: impl Into<String>) -> Self {
        self.notebook_type = notebook_type.into();
        self
    }

    /// Load `.ipynb` text
    ///
    /// Each cell's `metadata` object is placed at the container path of
    /// `mode`, as the host does when it opens the file.
    ///
    /// # Errors
    /// [`DocumentError::Json`] for malformed JSON,
    /// [`DocumentError::NotANotebook`] when `cells` is missing or a cell or
    /// its metadata is not an object
    pub fn from_ipynb_str(json: &str, mode: NamespaceMode) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_ipynb_value(value, mode)
    }

    /// Load an already parsed `.ipynb` value
    ///
    /// # Errors
    /// See [`NotebookDocument::from_ipynb_str`]
    pub fn from_ipynb_value(value: Value, mode: NamespaceMode) -> Result<Self, DocumentError> {
        let Value::Object(mut extra) = value else {
            return Err(DocumentError::NotANotebook("top level is not an object".to_string()));
        };
        let Some(Value::Array(raw_cells)) = extra.remove("cells") else {
            return Err(DocumentError::NotANotebook("missing cells array".to_string()));
        };

        let cells = raw_cells
            .into_iter()
            .enumerate()
            .map(|(index, raw)| load_cell(index, raw, mode))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded notebook with {} cells ({})", cells.len(), mode);
        Ok(Self {
            notebook_type: DEFAULT_NOTEBOOK_TYPE.to_string(),
            cells,
            extra,
        })
    }

    /// Serialize back to the on-disk shape
    ///
    /// The host namespace is unwrapped into each cell's `metadata`; with
    /// [`SaveOptions::drop_custom_metadata`] the `nbgrader` key is left out.
    #[must_use]
    pub fn to_ipynb_value(&self, mode: NamespaceMode, options: SaveOptions) -> Value {
        let cells: Vec<Value> = self
            .cells
            .iter()
            .map(|cell| {
                let mut metadata = cell
                    .metadata
                    .get_path(mode.container_path())
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                if options.drop_custom_metadata {
                    metadata.remove(NBGRADER_KEY);
                }

                let mut body = cell.body.clone();
                body.insert("metadata".to_string(), Value::Object(metadata));
                Value::Object(body)
            })
            .collect();

        let mut root = Map::new();
        root.insert("cells".to_string(), Value::Array(cells));
        for (key, value) in &self.extra {
            root.insert(key.clone(), value.clone());
        }
        Value::Object(root)
    }

    /// Serialize to pretty `.ipynb` text
    ///
    /// # Errors
    /// [`DocumentError::Json`] if serialization fails
    pub fn to_ipynb_string(
        &self,
        mode: NamespaceMode,
        options: SaveOptions,
    ) -> Result<String, DocumentError> {
        let mut text = serde_json::to_string_pretty(&self.to_ipynb_value(mode, options))?;
        text.push('\n');
        Ok(text)
    }
}

fn load_cell(index: usize, raw: Value, mode: NamespaceMode) -> Result<NotebookCell, DocumentError> {
    let Value::Object(mut body) = raw else {
        return Err(DocumentError::NotANotebook(format!("cell {index} is not an object")));
    };

    let kind = CellKind::from_cell_type(
        body.get("cell_type")
            .and_then(Value::as_str)
            .unwrap_or_default(),
    );
    let metadata = match body.remove("metadata") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(DocumentError::NotANotebook(format!(
                "metadata of cell {index} is not an object"
            )))
        }
    };

    let mut bag = MetadataBag::new();
    bag.set_path(mode.container_path(), Value::Object(metadata))?;

    Ok(NotebookCell {
        kind,
        metadata: bag,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbg_test_utils::{code, markdown, notebook_text, tests_json};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn load_wraps_metadata_in_host_namespace() {
        let text = notebook_text(&[code(Some(tests_json("t1", 2.0))), markdown(None)]);

        let doc = NotebookDocument::from_ipynb_str(&text, NamespaceMode::Custom).unwrap();
        assert_eq!(doc.cells.len(), 2);
        assert!(doc.cells[0].is_code());
        assert!(!doc.cells[1].is_code());
        assert_eq!(
            doc.cells[0].metadata.get_path("custom.metadata.nbgrader.grade_id"),
            Some(&json!("t1"))
        );
        assert_eq!(doc.extra.get("nbformat"), Some(&json!(4)));
    }

    #[test]
    fn plain_mode_uses_metadata_container() {
        let text = notebook_text(&[code(Some(tests_json("t1", 2.0)))]);
        let doc = NotebookDocument::from_ipynb_str(&text, NamespaceMode::Plain).unwrap();
        assert!(doc.cells[0].metadata.get_path("metadata.nbgrader").is_some());
        assert!(doc.cells[0].metadata.get_path("custom").is_none());
    }

    #[test]
    fn round_trip_preserves_file() {
        let text = notebook_text(&[code(Some(tests_json("t1", 2.0))), markdown(None)]);
        let original: Value = serde_json::from_str(&text).unwrap();

        let doc = NotebookDocument::from_ipynb_str(&text, NamespaceMode::Custom).unwrap();
        let saved = doc.to_ipynb_value(NamespaceMode::Custom, SaveOptions::default());
        assert_eq!(saved, original);
    }

    #[test]
    fn dropping_custom_metadata_loses_the_record() {
        let text = notebook_text(&[code(Some(tests_json("t1", 2.0)))]);
        let doc = NotebookDocument::from_ipynb_str(&text, NamespaceMode::Custom).unwrap();

        let saved = doc.to_ipynb_value(
            NamespaceMode::Custom,
            SaveOptions {
                drop_custom_metadata: true,
            },
        );
        assert_eq!(saved["cells"][0]["metadata"], json!({}));
    }

    #[test]
    fn rejects_documents_without_cells() {
        let err = NotebookDocument::from_ipynb_str("{\"nbformat\": 4}", NamespaceMode::Custom)
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotANotebook(_)));

        let err = NotebookDocument::from_ipynb_str("not json", NamespaceMode::Custom).unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
    }

    #[test]
    fn rejects_non_object_metadata() {
        let text = r#"{"cells": [{"cell_type": "code", "metadata": []}]}"#;
        let err = NotebookDocument::from_ipynb_str(text, NamespaceMode::Custom).unwrap_err();
        assert!(err.to_string().contains("cell 0"));
    }

    #[test]
    fn missing_metadata_becomes_empty() {
        let text = r#"{"cells": [{"cell_type": "raw", "source": []}]}"#;
        let doc = NotebookDocument::from_ipynb_str(text, NamespaceMode::Custom).unwrap();
        assert_eq!(doc.cells[0].kind, CellKind::Markup);
        assert_eq!(doc.cells[0].metadata.get_path("custom.metadata"), Some(&json!({})));
    }
}
