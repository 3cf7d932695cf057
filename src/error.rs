//! Error types for the auction-sheet pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the auction-sheet pipeline.
///
/// Every failure is detected at the boundary of the component responsible
/// for it and surfaced to the caller as one of these variants; the core
/// never substitutes defaults for missing data or emits a partial table.
#[derive(Error, Debug)]
pub enum Error {
    /// A column the schema requires is absent from the input table.
    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    /// A wide pivot cannot represent two bids at one (block, miner) cell.
    #[error("block {block} has more than one bid for miner '{miner}'")]
    DuplicateKey { block: u64, miner: String },

    /// The requested worksheet does not exist in the workbook.
    #[error("worksheet '{0}' not found in workbook")]
    SheetNotFound(String),

    /// An exchange rate that would be used as a divisor or multiplier is
    /// zero, negative, or not finite.
    #[error("exchange rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    /// The file cannot be read as a table (unsupported extension or
    /// corrupt content).
    #[error("cannot read '{path}' as a table: {reason}")]
    UnreadableFile { path: String, reason: String },

    /// A cell holds a value of an unexpected type (e.g. text in a bid
    /// column). Recoverable only by correcting the input file.
    #[error("malformed value '{value}' in column '{column}'")]
    BadCell { column: String, value: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing/writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet package (zip) error.
    #[error("spreadsheet package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Spreadsheet writer error.
    #[error("spreadsheet write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    /// Create a missing-column error.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Error::MissingColumn(name.into())
    }

    /// Create an unreadable-file error.
    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnreadableFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-cell error.
    pub fn bad_cell(column: impl Into<String>, value: impl Into<String>) -> Self {
        Error::BadCell {
            column: column.into(),
            value: value.into(),
        }
    }
}
