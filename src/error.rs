use thiserror::Error;

use crate::ledger::Rejection;

#[derive(Error, Debug)]
pub enum MilkbookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read file: {0}")]
    Spreadsheet(String),

    #[error("No sheets found")]
    NoSheets,

    #[error("Sheet empty")]
    EmptySheet,

    #[error("Spreadsheet export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("No data loaded. Please import a file first.")]
    NoRecords,

    #[error("From ID ({min}) cannot be greater than To ID ({max}).")]
    InvalidIdRange { min: i64, max: i64 },

    #[error("From Date ({from}) cannot be after To Date ({to}).")]
    FromAfterTo { from: String, to: String },

    #[error("Half-month reports must stay within one calendar month ({from} to {to}).")]
    SpansMonths { from: String, to: String },

    #[error("Unrecognised date: {0}")]
    InvalidDate(String),

    #[error("No rows found for the selected filters.")]
    NoMatchingRows,

    #[error("Please fix validation errors before saving ({} entr{} rejected).", .0.len(), if .0.len() == 1 { "y" } else { "ies" })]
    Rejected(Vec<Rejection>),

    #[error("No row {0} in the table")]
    RowOutOfRange(usize),

    #[error("Malformed entry '{0}': expected date,session,id,quantity,percentage")]
    MalformedEntry(String),

    #[error("PDF support is not available in this build")]
    PdfUnavailable,

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, MilkbookError>;
