use thiserror::Error;

/// Errors raised while reading the coupon table or the cursor file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// The workbook has no worksheet to read from.
    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    /// The sheet has no header row.
    #[error("Sheet has no header row")]
    MissingHeader,

    /// One or more required columns are absent from the header row.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The cursor file is not valid JSON.
    #[error("Cursor file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
