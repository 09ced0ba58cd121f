//! I/O error types for docstrength-io.

use std::path::PathBuf;

use docstrength_core::ImportanceError;

/// Errors from pool loading and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a required leading header column is absent or misnamed.
    #[error("missing column \"{column}\" at position {position} of the header in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Expected column name.
        column: &'static str,
        /// Zero-based header position where it was expected.
        position: usize,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty pool (no data rows) in {path}")]
    EmptyPool {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} (document {doc_id}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Document ID of the offending row.
        doc_id: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the column.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a document weight is negative.
    #[error("negative weight {weight} in {path}: row {row_index}")]
    NegativeWeight {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// Returned when the same document ID appears more than once.
    #[error("duplicate document ID \"{doc_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateDocId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated document ID.
        doc_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when the pool's features cannot be turned into a scored pool.
    #[error("cannot build scored pool")]
    Pool {
        /// Underlying core error.
        #[from]
        source: ImportanceError,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result artifact cannot be encoded as JSON.
    #[error("cannot encode {path} as JSON")]
    SerializeJson {
        /// Path of the artifact being written.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
