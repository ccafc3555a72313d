//! Bulk Excel importer for campaign schedules.
//!
//! Converts an uploaded spreadsheet into validated schedule drafts. Field
//! problems never abort the parse: each row accumulates its own
//! `{field, message}` errors independently, so the caller always gets a full
//! per-row validity report. The only hard failure is a buffer that cannot be
//! decoded as a workbook at all.

mod error;
mod parser;
mod types;

pub use error::ImportError;
pub use parser::{parse_date_cell, parse_schedule_workbook, summarize};
pub use types::{
    FieldError, ImportSummary, InfluencerRef, ParsedScheduleRow, ScheduleDraft,
};
