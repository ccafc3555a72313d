use chrono::NaiveDate;
use serde::Serialize;

use campdb_core::Platform;

/// An influencer on the target campaign's roster, the universe the importer
/// matches the `Influencer` column against.
#[derive(Debug, Clone)]
pub struct InfluencerRef {
    pub id: i64,
    pub name: String,
}

/// A single field-level validation problem on one row.
///
/// `field` is the spreadsheet column header the problem belongs to, so the
/// report can be rendered next to the offending cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The fields successfully extracted from one row. Every field is optional:
/// an invalid cell leaves its slot empty and adds a [`FieldError`] instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleDraft {
    pub title: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub influencer_id: Option<i64>,
    pub influencer_name: Option<String>,
    pub platform: Option<Platform>,
    pub content_type: Option<String>,
    pub description: Option<String>,
}

/// One spreadsheet row's parse outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedScheduleRow {
    /// 1-based worksheet row number (the header is row 1, data starts at 2).
    pub row: u32,
    pub draft: ScheduleDraft,
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

/// Aggregate counts over a parsed workbook.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub valid_percent: f64,
}
