//! Error types for the allotment analysis core.
//!
//! Malformed rank tokens are never errors (see [`crate::rank`]); everything
//! here is a condition the caller must see instead of a partially correct
//! table.

use thiserror::Error;

use crate::models::Community;

/// Top-level error type for the analysis core.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Input table does not carry the expected columns or values.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Seat matrix composition failed.
    #[error("seat matrix error: {0}")]
    Matrix(#[from] MatrixError),
}

/// A raw table could not be read into a typed structure.
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    /// Required columns are absent after renaming.
    #[error("{table} table is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Which kind of table was being read.
        table: &'static str,
        /// Canonical names of the absent columns.
        columns: Vec<String>,
    },

    /// A cell could not be parsed into the column's type.
    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        /// Zero-based data row index.
        row: usize,
        /// Canonical column name.
        column: String,
        /// The offending raw cell.
        value: String,
    },
}

/// Element-wise seat arithmetic between two matrices failed.
#[derive(Error, Debug, PartialEq)]
pub enum MatrixError {
    /// The operands have a different number of rows.
    #[error("seat matrices have {left} and {right} rows")]
    ShapeMismatch { left: usize, right: usize },

    /// Row `row` of the left operand has a (college, branch) key the right
    /// operand lacks; `right_*` name the right row at the same position.
    #[error("row {row}: key ({left_college}, {left_branch}) does not match ({right_college}, {right_branch})")]
    IncompatibleKeys {
        row: usize,
        left_college: u32,
        left_branch: String,
        right_college: u32,
        right_branch: String,
    },

    /// Subtraction would leave a community column negative.
    #[error("negative {community} seats for college {college_code} branch {branch_code}")]
    NegativeSeats {
        college_code: u32,
        branch_code: String,
        community: Community,
    },

    /// Addition overflowed the seat counter.
    #[error("{community} seat count overflow for college {college_code} branch {branch_code}")]
    SeatOverflow {
        college_code: u32,
        branch_code: String,
        community: Community,
    },
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
