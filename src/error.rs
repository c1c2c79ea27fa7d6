//! Error types for Excel export operations

use thiserror::Error;

/// Errors raised while building or exporting a workbook
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export request failed up-front validation; no output was produced
    #[error("invalid export request: {0}")]
    Validation(String),

    /// A row could not be written to the sheet
    #[error("failed to write row {row}: {message}")]
    RowWrite { row: u32, message: String },

    /// The sheet writer was used after it had already been finished
    #[error("sheet writer has already been finished")]
    AlreadyFinished,

    /// Error reported by the underlying workbook backend
    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// The finished workbook could not be serialized to bytes
    #[error("failed to serialize workbook: {0}")]
    Serialization(String),
}

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;
