use crate::config::Options;
use crate::error::RollforwardError;
use crate::error::ResultMessage;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::parse_range;
use crate::spreadsheet::reference::BoundingBox;
use crate::spreadsheet::Worksheet;
use crate::table::header::extract_header_columns;
use crate::table::Origin;
use crate::table::TableCandidate;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Rows and columns scanned by the heuristic detector.
pub const MAX_WINDOW_ROWS: usize = 1000;
pub const MAX_WINDOW_COLS: usize = 50;

pub const DECLARED_RANGE_CONFIDENCE: f64 = 0.8;
pub const MAX_HEURISTIC_CONFIDENCE: f64 = 0.95;

const MIN_HEADER_TEXT_CELLS: usize = 3;
const MIN_HEADER_TEXT_RATIO: f64 = 0.9;
const MAX_DATA_ROWS_CHECKED: usize = 15;
const MIN_DATA_ROW_FILL: f64 = 0.3;
const MIN_DATA_ROWS: usize = 2;

/// Builds a candidate from the sheet's declared auto-filter range.
///
/// The candidate is dropped when the reference does not parse or no header
/// survives extraction.
pub fn detect_declared_range(sheet: &dyn Worksheet, source_path: &str) -> Option<TableCandidate> {
    let reference = sheet.auto_filter()?;
    let range = match parse_range(reference) {
        Ok(range) => range,
        Err(error) => {
            warn!(sheet = sheet.name(), reference, %error, "skip declared filter range");
            return None;
        }
    };
    let (columns, headers): (Vec<usize>, Vec<String>) = extract_header_columns(sheet, &range).into_iter().unzip();
    let (Some(&start_col), Some(&end_col)) = (columns.first(), columns.last()) else {
        debug!(sheet = sheet.name(), reference, "declared filter range without headers");
        return None;
    };
    Some(TableCandidate {
        sheet_name: sheet.name().to_owned(),
        origin: Origin::DeclaredFilterRange,
        header_row: range.start_row,
        end_row: range.end_row,
        start_col,
        end_col,
        headers,
        columns,
        confidence: DECLARED_RANGE_CONFIDENCE,
        source_path: source_path.to_owned(),
    })
}

/// The region scanned by the heuristic detector, `None` for an empty sheet.
fn scan_window(sheet: &dyn Worksheet) -> Option<BoundingBox> {
    match sheet.dimension() {
        Ok(Some(occupied)) => Some(BoundingBox {
            end_row: occupied.end_row.min(occupied.start_row + MAX_WINDOW_ROWS - 1),
            end_col: occupied.end_col.min(occupied.start_col + MAX_WINDOW_COLS - 1),
            ..occupied
        }),
        Ok(None) => None,
        Err(error) => {
            debug!(sheet = sheet.name(), %error, "dimension unavailable, using default window");
            Some(BoundingBox {
                start_row: 1,
                end_row: MAX_WINDOW_ROWS,
                start_col: 1,
                end_col: MAX_WINDOW_COLS,
            })
        }
    }
}

fn read_cell(sheet: &dyn Worksheet, row: usize, col: usize) -> Option<&Cell> {
    sheet.cell(row, col).ok().flatten()
}

/// Finds header rows followed by dense data rows.
///
/// A header row has at least three text cells making up at least 90% of the
/// window width. At least two following rows must each be at least 30%
/// filled with non-blank, non-zero values; counting stops at the first row
/// that is not, and never looks past 15 rows.
pub fn detect_heuristic(sheet: &dyn Worksheet, source_path: &str) -> Vec<TableCandidate> {
    let mut candidates = Vec::new();
    let Some(window) = scan_window(sheet) else {
        return candidates;
    };
    let width = window.width();

    for row in window.start_row..=window.end_row {
        let (columns, texts): (Vec<usize>, Vec<String>) = (window.start_col..=window.end_col)
            .filter_map(|col| read_cell(sheet, row, col))
            .filter(|cell| cell.is_text())
            .filter_map(|cell| cell.trimmed().map(|text| (cell.col, text)))
            .unzip();
        let text_ratio = texts.len() as f64 / width as f64;
        if texts.len() < MIN_HEADER_TEXT_CELLS || text_ratio < MIN_HEADER_TEXT_RATIO {
            continue;
        }

        let last_row = (row + MAX_DATA_ROWS_CHECKED).min(window.end_row);
        let data_rows = (row + 1..=last_row)
            .take_while(|&data_row| {
                let filled = (window.start_col..=window.end_col)
                    .map(|col| read_cell(sheet, data_row, col))
                    .filter(|cell| cell.is_some_and(|it| !it.is_blank() && !it.is_zero()))
                    .count();
                filled as f64 / width as f64 >= MIN_DATA_ROW_FILL
            })
            .count();
        if data_rows < MIN_DATA_ROWS {
            continue;
        }

        let confidence = MAX_HEURISTIC_CONFIDENCE.min(text_ratio + 0.1 * data_rows as f64);
        debug!(
            sheet = sheet.name(),
            header_row = row,
            data_rows,
            confidence,
            "heuristic table candidate"
        );
        candidates.push(TableCandidate {
            sheet_name: sheet.name().to_owned(),
            origin: Origin::Heuristic,
            header_row: row,
            end_row: row + data_rows,
            start_col: columns[0],
            end_col: columns[columns.len() - 1],
            headers: texts,
            columns,
            confidence,
            source_path: source_path.to_owned(),
        });
    }
    candidates
}

/// Runs both detectors over every sheet, pooling the candidates and sorting
/// them by confidence, highest first. Equal confidences keep sheet order.
pub fn detect_tables<W: Worksheet>(sheets: &[W], source_path: &str) -> Vec<TableCandidate> {
    let mut candidates = Vec::new();
    for sheet in sheets {
        let sheet = sheet as &dyn Worksheet;
        candidates.extend(detect_declared_range(sheet, source_path));
        candidates.extend(detect_heuristic(sheet, source_path));
    }
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

/// [`detect_tables`] followed by overlap suppression when `options` enables it.
pub fn detect_tables_with<W: Worksheet>(sheets: &[W], source_path: &str, options: &Options) -> Vec<TableCandidate> {
    let candidates = detect_tables(sheets, source_path);
    match options.overlap_suppression {
        Some(fraction) => suppress_overlaps(candidates, fraction),
        None => candidates,
    }
}

/// Drops a candidate when a higher-ranked candidate of the other origin on the
/// same sheet overlaps it by at least `min_fraction` of the smaller area.
///
/// Expects candidates sorted by descending confidence.
pub fn suppress_overlaps(candidates: Vec<TableCandidate>, min_fraction: f64) -> Vec<TableCandidate> {
    let mut kept: Vec<TableCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let shadowed = kept.iter().any(|other| {
            other.sheet_name == candidate.sheet_name
                && other.origin != candidate.origin
                && other.bounds().overlap_fraction(&candidate.bounds()) >= min_fraction
        });
        if shadowed {
            debug!(
                sheet = candidate.sheet_name.as_str(),
                range = %candidate.bounds(),
                "suppress overlapping candidate"
            );
        } else {
            kept.push(candidate);
        }
    }
    kept
}

/// Opens a workbook and detects tables on the sheets accepted by `criteria`.
pub fn find_tables(path: &str, criteria: &Criteria, options: &Options) -> Result<Vec<TableCandidate>, RollforwardError> {
    let sheets = open_spreadsheet(path)
        .and_then(|mut spreadsheet| spreadsheet.read_sheets(criteria))
        .with_prefix(&format!("Cannot read tables from '{path}'"))?;
    let candidates = detect_tables_with(&sheets, path, options);
    info!(file = path, sheets = sheets.len(), tables = candidates.len(), "tables detected");
    Ok(candidates)
}
