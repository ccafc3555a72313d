use thiserror::Error;

/// Errors returned by the schedule importer.
///
/// Only structural problems with the workbook surface here; per-field data
/// problems are reported as [`crate::FieldError`] entries on each row.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The buffer could not be decoded as a spreadsheet.
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// The workbook decoded but contains no worksheets.
    #[error("workbook contains no worksheets")]
    NoWorksheets,
}
