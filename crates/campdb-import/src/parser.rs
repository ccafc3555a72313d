//! Worksheet parsing and per-row field validation.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;

use campdb_core::Platform;

use crate::error::ImportError;
use crate::types::{FieldError, ImportSummary, InfluencerRef, ParsedScheduleRow, ScheduleDraft};

// Expected column headers, matched case-insensitively after trim.
const COL_TITLE: &str = "título";
const COL_DATE: &str = "fecha";
const COL_INFLUENCER: &str = "influencer";
const COL_PLATFORM: &str = "plataforma";
const COL_CONTENT_TYPE: &str = "tipo de contenido";
const COL_DESCRIPTION: &str = "descripción";

// Serial 1 is 1900-01-01 in the 1900 date system; the epoch is offset two
// days to absorb Excel's phantom 1900-02-29.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// The cells of one data row, keyed by the columns the importer understands.
#[derive(Debug, Default)]
struct RowCells<'a> {
    title: Option<&'a Data>,
    date: Option<&'a Data>,
    influencer: Option<&'a Data>,
    platform: Option<&'a Data>,
    content_type: Option<&'a Data>,
    description: Option<&'a Data>,
}

/// Parses the first worksheet of `bytes` into per-row schedule drafts.
///
/// Every data row produces exactly one [`ParsedScheduleRow`]; rows with
/// problems carry their field errors rather than aborting the parse.
///
/// # Errors
///
/// Returns [`ImportError::Workbook`] when the buffer is not a decodable
/// spreadsheet, or [`ImportError::NoWorksheets`] when it has no sheets.
pub fn parse_schedule_workbook(
    bytes: &[u8],
    roster: &[InfluencerRef],
) -> Result<Vec<ParsedScheduleRow>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::NoWorksheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        // An empty sheet simply has no rows to report on.
        return Ok(Vec::new());
    };
    let columns = map_columns(header_row);

    let mut parsed = Vec::new();
    for (i, row) in rows_iter.enumerate() {
        if row.iter().all(is_blank) {
            continue;
        }
        let cells = pick_cells(row, &columns);
        // Header is worksheet row 1; the first data row is row 2.
        let row_number = u32::try_from(i).unwrap_or(u32::MAX).saturating_add(2);
        parsed.push(validate_row(row_number, &cells, roster));
    }

    tracing::debug!(
        sheet = %sheet_name,
        rows = parsed.len(),
        "parsed schedule workbook"
    );

    Ok(parsed)
}

/// Aggregate valid/invalid counts and percentage over a parsed workbook.
#[must_use]
pub fn summarize(rows: &[ParsedScheduleRow]) -> ImportSummary {
    let total = rows.len();
    let valid = rows.iter().filter(|r| r.is_valid).count();
    #[allow(clippy::cast_precision_loss)] // row counts are far below 2^52
    let valid_percent = if total == 0 {
        0.0
    } else {
        valid as f64 / total as f64 * 100.0
    };

    ImportSummary {
        total,
        valid,
        invalid: total - valid,
        valid_percent,
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct ColumnMap {
    title: Option<usize>,
    date: Option<usize>,
    influencer: Option<usize>,
    platform: Option<usize>,
    content_type: Option<usize>,
    description: Option<usize>,
}

fn map_columns(header_row: &[Data]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (idx, cell) in header_row.iter().enumerate() {
        let Some(text) = cell_text(cell) else {
            continue;
        };
        match text.to_lowercase().as_str() {
            COL_TITLE => map.title = Some(idx),
            COL_DATE => map.date = Some(idx),
            COL_INFLUENCER => map.influencer = Some(idx),
            COL_PLATFORM => map.platform = Some(idx),
            COL_CONTENT_TYPE => map.content_type = Some(idx),
            COL_DESCRIPTION => map.description = Some(idx),
            _ => {}
        }
    }
    map
}

fn pick_cells<'a>(row: &'a [Data], columns: &ColumnMap) -> RowCells<'a> {
    let at = |idx: Option<usize>| idx.and_then(|i| row.get(i));
    RowCells {
        title: at(columns.title),
        date: at(columns.date),
        influencer: at(columns.influencer),
        platform: at(columns.platform),
        content_type: at(columns.content_type),
        description: at(columns.description),
    }
}

// ---------------------------------------------------------------------------
// Row validation
// ---------------------------------------------------------------------------

/// Validates all fields of one row independently, accumulating errors.
///
/// No check suppresses another except content type, whose allow-list depends
/// on the platform: an invalid platform leaves the allow-list empty ("n/a"),
/// so the content type is reported invalid too.
fn validate_row(
    row_number: u32,
    cells: &RowCells<'_>,
    roster: &[InfluencerRef],
) -> ParsedScheduleRow {
    let mut draft = ScheduleDraft::default();
    let mut errors = Vec::new();

    // Título
    match cells.title.and_then(cell_text) {
        Some(title) => draft.title = Some(title),
        None => errors.push(required("Título")),
    }

    // Fecha
    match cells.date {
        Some(cell) if !is_blank(cell) => match parse_date_cell(cell) {
            Ok(date) => draft.scheduled_date = Some(date),
            Err(message) => errors.push(FieldError {
                field: "Fecha".to_owned(),
                message,
            }),
        },
        _ => errors.push(required("Fecha")),
    }

    // Influencer — exact name match against the roster, case-insensitive.
    match cells.influencer.and_then(cell_text) {
        Some(name) => {
            let lowered = name.to_lowercase();
            match roster.iter().find(|i| i.name.to_lowercase() == lowered) {
                Some(hit) => {
                    draft.influencer_id = Some(hit.id);
                    draft.influencer_name = Some(hit.name.clone());
                }
                None => errors.push(FieldError {
                    field: "Influencer".to_owned(),
                    message: format!("influencer '{name}' is not on the campaign roster"),
                }),
            }
        }
        None => errors.push(required("Influencer")),
    }

    // Plataforma
    let platform = match cells.platform.and_then(cell_text) {
        Some(raw) => match Platform::parse(&raw) {
            Some(p) => {
                draft.platform = Some(p);
                Some(p)
            }
            None => {
                errors.push(FieldError {
                    field: "Plataforma".to_owned(),
                    message: format!(
                        "platform '{raw}' is not one of instagram, youtube, tiktok, twitter, facebook"
                    ),
                });
                None
            }
        },
        None => {
            errors.push(required("Plataforma"));
            None
        }
    };

    // Tipo de Contenido — allow-list depends on the platform outcome above.
    match cells.content_type.and_then(cell_text) {
        Some(raw) => {
            let normalized = raw.to_lowercase();
            let allowed: &[&str] = platform.map_or(&[], Platform::allowed_content_types);
            if allowed.contains(&normalized.as_str()) {
                draft.content_type = Some(normalized);
            } else {
                let platform_label =
                    platform.map_or_else(|| "n/a".to_owned(), |p| p.to_string());
                let allowed_label = if allowed.is_empty() {
                    "n/a".to_owned()
                } else {
                    allowed.join(", ")
                };
                errors.push(FieldError {
                    field: "Tipo de Contenido".to_owned(),
                    message: format!(
                        "content type '{raw}' is not valid for platform '{platform_label}' (allowed: {allowed_label})"
                    ),
                });
            }
        }
        None => errors.push(required("Tipo de Contenido")),
    }

    // Descripción — optional.
    draft.description = cells.description.and_then(cell_text);

    ParsedScheduleRow {
        row: row_number,
        is_valid: errors.is_empty(),
        draft,
        errors,
    }
}

fn required(field: &str) -> FieldError {
    FieldError {
        field: field.to_owned(),
        message: format!("{field} is required"),
    }
}

// ---------------------------------------------------------------------------
// Cell decoding
// ---------------------------------------------------------------------------

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Extracts trimmed, non-empty text from a cell. Numeric cells are rendered
/// as text so titles typed as numbers still import.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Data::Float(f) => {
            if f.fract() == 0.0 {
                #[allow(clippy::cast_possible_truncation)]
                Some(format!("{}", *f as i64))
            } else {
                Some(format!("{f}"))
            }
        }
        Data::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Parses a date cell: Excel serial numbers or `DD/MM/YYYY` / `DD-MM-YYYY`
/// strings. Impossible dates (`31/04/2024`) are rejected by chrono itself.
///
/// # Errors
///
/// Returns a human-readable message describing why the cell is not a date.
pub fn parse_date_cell(cell: &Data) -> Result<NaiveDate, String> {
    match cell {
        Data::Float(f) => excel_serial_to_date(*f),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::String(s) => parse_date_string(s.trim()),
        other => Err(format!("cell '{other}' is not a date")),
    }
}

fn parse_date_string(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .map_err(|_| format!("date '{raw}' must be DD/MM/YYYY or DD-MM-YYYY"))
}

fn excel_serial_to_date(serial: f64) -> Result<NaiveDate, String> {
    if !serial.is_finite() || serial < 1.0 {
        return Err(format!("invalid Excel date serial {serial}"));
    }
    #[allow(clippy::cast_possible_truncation)]
    let days = serial.trunc() as i64;
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|epoch| epoch.checked_add_days(chrono::Days::new(days.unsigned_abs())))
        .ok_or_else(|| format!("invalid Excel date serial {serial}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<InfluencerRef> {
        vec![
            InfluencerRef {
                id: 1,
                name: "Ana García".to_owned(),
            },
            InfluencerRef {
                id: 2,
                name: "Luis Pérez".to_owned(),
            },
        ]
    }

    fn full_row<'a>(cells: &'a [Data; 6]) -> RowCells<'a> {
        RowCells {
            title: Some(&cells[0]),
            date: Some(&cells[1]),
            influencer: Some(&cells[2]),
            platform: Some(&cells[3]),
            content_type: Some(&cells[4]),
            description: Some(&cells[5]),
        }
    }

    fn valid_cells() -> [Data; 6] {
        [
            Data::String("Lanzamiento de producto".to_owned()),
            Data::String("15/03/2024".to_owned()),
            Data::String("Ana García".to_owned()),
            Data::String("youtube".to_owned()),
            Data::String("video".to_owned()),
            Data::String("Primer video de la serie".to_owned()),
        ]
    }

    #[test]
    fn fully_valid_row_has_no_errors() {
        let cells = valid_cells();
        let parsed = validate_row(2, &full_row(&cells), &roster());
        assert!(parsed.is_valid, "errors: {:?}", parsed.errors);
        assert_eq!(parsed.row, 2);
        assert_eq!(parsed.draft.title.as_deref(), Some("Lanzamiento de producto"));
        assert_eq!(
            parsed.draft.scheduled_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(parsed.draft.influencer_id, Some(1));
        assert_eq!(parsed.draft.platform, Some(Platform::Youtube));
        assert_eq!(parsed.draft.content_type.as_deref(), Some("video"));
    }

    #[test]
    fn missing_title_still_validates_other_fields() {
        let mut cells = valid_cells();
        cells[0] = Data::Empty;
        let parsed = validate_row(2, &full_row(&cells), &roster());

        assert!(!parsed.is_valid);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, "Título");
        // The rest of the row parsed despite the missing title.
        assert!(parsed.draft.scheduled_date.is_some());
        assert_eq!(parsed.draft.influencer_id, Some(1));
        assert_eq!(parsed.draft.content_type.as_deref(), Some("video"));
    }

    #[test]
    fn errors_accumulate_independently_per_field() {
        let cells = [
            Data::Empty,
            Data::String("not-a-date".to_owned()),
            Data::String("Nadie Conocido".to_owned()),
            Data::String("insta".to_owned()),
            Data::String("video".to_owned()),
            Data::Empty,
        ];
        let parsed = validate_row(3, &full_row(&cells), &roster());

        assert!(!parsed.is_valid);
        let fields: Vec<&str> = parsed.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "Título",
                "Fecha",
                "Influencer",
                "Plataforma",
                "Tipo de Contenido"
            ]
        );
    }

    #[test]
    fn leap_day_parses_but_impossible_date_does_not() {
        assert_eq!(
            parse_date_string("29/02/2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(parse_date_string("31/04/2024").is_err());
    }

    #[test]
    fn date_accepts_both_separator_styles() {
        assert_eq!(
            parse_date_string("05-11-2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 11, 5).unwrap())
        );
        assert_eq!(
            parse_date_string("05/11/2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 11, 5).unwrap())
        );
    }

    #[test]
    fn excel_serial_45351_is_2024_02_29() {
        // 45351 days after 1899-12-30 lands on the 2024 leap day.
        assert_eq!(
            parse_date_cell(&Data::Float(45_351.0)),
            Ok(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }

    #[test]
    fn excel_serial_rejects_nonpositive() {
        assert!(parse_date_cell(&Data::Float(0.0)).is_err());
        assert!(parse_date_cell(&Data::Float(-12.0)).is_err());
    }

    #[test]
    fn platform_matching_trims_and_ignores_case() {
        let mut cells = valid_cells();
        cells[3] = Data::String(" INSTAGRAM ".to_owned());
        cells[4] = Data::String("reel".to_owned());
        let parsed = validate_row(2, &full_row(&cells), &roster());
        assert!(parsed.is_valid, "errors: {:?}", parsed.errors);
        assert_eq!(parsed.draft.platform, Some(Platform::Instagram));
    }

    #[test]
    fn content_type_is_cross_checked_against_platform() {
        // "video" is fine on youtube but not on instagram.
        let mut cells = valid_cells();
        cells[3] = Data::String("instagram".to_owned());
        let parsed = validate_row(2, &full_row(&cells), &roster());
        assert!(!parsed.is_valid);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, "Tipo de Contenido");
        assert!(parsed.errors[0].message.contains("instagram"));
    }

    #[test]
    fn invalid_platform_reports_content_type_against_na_list() {
        let mut cells = valid_cells();
        cells[3] = Data::String("myspace".to_owned());
        let parsed = validate_row(2, &full_row(&cells), &roster());

        let fields: Vec<&str> = parsed.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["Plataforma", "Tipo de Contenido"]);
        assert!(parsed.errors[1].message.contains("n/a"));
    }

    #[test]
    fn influencer_match_is_case_insensitive_exact() {
        let mut cells = valid_cells();
        cells[2] = Data::String("ana garcía".to_owned());
        let parsed = validate_row(2, &full_row(&cells), &roster());
        assert_eq!(parsed.draft.influencer_id, Some(1));
        // The canonical roster spelling is kept, not the cell's.
        assert_eq!(parsed.draft.influencer_name.as_deref(), Some("Ana García"));

        // A prefix is not a match.
        cells[2] = Data::String("Ana".to_owned());
        let parsed = validate_row(2, &full_row(&cells), &roster());
        assert!(!parsed.is_valid);
        assert_eq!(parsed.errors[0].field, "Influencer");
    }

    #[test]
    fn summarize_counts_and_percentage() {
        let cells = valid_cells();
        let good = validate_row(2, &full_row(&cells), &roster());
        let mut bad_cells = valid_cells();
        bad_cells[0] = Data::Empty;
        let bad = validate_row(3, &full_row(&bad_cells), &roster());

        let summary = summarize(&[good.clone(), bad, good]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.valid, 2);
        assert_eq!(summary.invalid, 1);
        assert!((summary.valid_percent - 66.666).abs() < 0.01);
    }

    #[test]
    fn summarize_empty_is_zero_percent() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert!((summary.valid_percent - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unreadable_buffer_is_a_workbook_error() {
        let result = parse_schedule_workbook(b"definitely not a spreadsheet", &roster());
        assert!(matches!(result, Err(ImportError::Workbook(_))));
    }
}
