//! Error types for the schema crate

/// Errors raised while constructing schema values from user input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Identifier does not match `[A-Za-z0-9_-]+`
    #[error("invalid grade_id '{0}': only letters, digits, '_' and '-' are allowed")]
    InvalidGradeId(String),

    /// Points input was blank
    #[error("Points cannot be empty")]
    EmptyPoints,

    /// Points input is not a number
    #[error("Points must be a number")]
    NonNumericPoints,

    /// Points input is below zero
    #[error("Points must be non-negative")]
    NegativePoints,

    /// Unknown cell type tag or label
    #[error("unknown cell type: '{0}'")]
    UnknownCellType(String),
}
