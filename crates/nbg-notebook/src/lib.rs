//! nbgrader Notebook Glue
//!
//! Connects the grading record model to a notebook editor.
//!
//! # Components
//!
//! - **NotebookDocument**: in-memory host loaded from and saved to `.ipynb`
//! - **NotebookHost**: the seam a real editor implements
//! - **GradingSession**: set-type, clear, validate, fix and debug commands
//! - **SavePatcher**: re-injects records into the saved file for hosts that
//!   drop custom metadata
//! - **NbgConfig**: TOML configuration
//!
//! # Example
//!
//! ```rust
//! use nbg_notebook::{GradingSession, NbgConfig, NotebookDocument};
//! use nbg_schema::CellType;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NbgConfig::default();
//! let text = r#"{"cells": [{"cell_type": "code", "metadata": {}, "source": []}], "nbformat": 4}"#;
//! let doc = NotebookDocument::from_ipynb_str(text, config.namespace)?;
//!
//! let mut session = GradingSession::new(doc, config);
//! session.set_cell_type(0, CellType::Tests, Some(5.0)).await?;
//! assert!(session.validate_notebook().is_valid());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod document;
pub mod error;
pub mod host;
pub mod save_patch;
pub mod session;

// Re-exports for convenience
pub use config::{NbgConfig, DEFAULT_NOTEBOOK_TYPE};
pub use document::{CellKind, NotebookCell, NotebookDocument, SaveOptions};
pub use error::{CommandError, CommandResult, ConfigError, DocumentError, HostError, SavePatchError};
pub use host::NotebookHost;
pub use save_patch::{PatchOutcome, SavePatcher};
pub use session::GradingSession;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
