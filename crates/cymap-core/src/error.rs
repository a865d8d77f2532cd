//! Centralized error types for result mapping.

use thiserror::Error;

/// Errors raised while mapping wire results onto target types.
///
/// All variants are deterministic functions of (input, target type) and
/// surface synchronously; there is no retry semantics at this layer.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("cannot map a {found} value into {expected}")]
    StructuralMismatch { found: &'static str, expected: String },

    #[error("column '{0}' is not present in the result; check the RETURN clause aliases")]
    MissingColumn(String),

    #[error("row has {got} values but the result declares {expected} columns")]
    RowArity { got: usize, expected: usize },

    #[error("set-mode results must have exactly one column, got {0}")]
    SetModeColumns(usize),

    #[error("cannot map a {0}-column row onto a single-value target")]
    ScalarColumns(usize),

    #[error("unrecognized date/time text: '{0}'")]
    UnparseableDate(String),

    #[error("converter '{converter}' failed: {message}")]
    Converter { converter: String, message: String },

    #[error("{0}")]
    Message(String),
}

/// Result type for mapping operations.
pub type MapResult<T> = Result<T, MapError>;

impl MapError {
    /// Create a structural mismatch error from a wire value kind and a
    /// description of the expected destination.
    pub fn mismatch(found: &'static str, expected: impl Into<String>) -> Self {
        Self::StructuralMismatch {
            found,
            expected: expected.into(),
        }
    }
}

impl serde::de::Error for MapError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}
