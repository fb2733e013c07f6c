//! Header row extraction with merged-cell inference.
//!
//! Blank header cells are often the tail of a merged cell. When a worksheet
//! exposes its merged regions, [`MergedRegions`] resolves blanks exactly;
//! otherwise [`NeighborHeuristic`] guesses from the surrounding cells.
use crate::spreadsheet::reference::cell_reference;
use crate::spreadsheet::reference::BoundingBox;
use crate::spreadsheet::Worksheet;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Merge metadata unavailable for sheet '{0}'")]
    MetadataUnavailable(String),

    #[error("Cannot read merge anchor {reference} of sheet '{sheet}': {message}")]
    AnchorUnreadable {
        sheet: String,
        reference: String,
        message: String,
    },
}

/// Fills blank header cells that continue a merged header.
pub trait MergeInference {
    /// `values[i]` is the trimmed value at column `start_col + i` of `row`.
    fn fill(
        &self,
        sheet: &dyn Worksheet,
        row: usize,
        start_col: usize,
        values: &[Option<String>],
    ) -> Result<Vec<Option<String>>, ExtractionError>;
}

/// Uses the sheet's merged regions: a blank cell inside a region takes the
/// value of the region's top-left cell.
pub struct MergedRegions;

impl MergeInference for MergedRegions {
    fn fill(
        &self,
        sheet: &dyn Worksheet,
        row: usize,
        start_col: usize,
        values: &[Option<String>],
    ) -> Result<Vec<Option<String>>, ExtractionError> {
        let regions = sheet
            .merged_regions()
            .ok_or_else(|| ExtractionError::MetadataUnavailable(sheet.name().to_owned()))?;
        values
            .iter()
            .enumerate()
            .map(|(index, value)| match value {
                Some(_) => Ok(value.clone()),
                None => match regions.iter().find(|region| region.contains(row, start_col + index)) {
                    Some(region) => anchor_value(sheet, region),
                    None => Ok(None),
                },
            })
            .collect()
    }
}

/// Trimmed value of a region's top-left cell.
fn anchor_value(sheet: &dyn Worksheet, region: &BoundingBox) -> Result<Option<String>, ExtractionError> {
    sheet
        .cell(region.start_row, region.start_col)
        .map(|cell| cell.and_then(|it| it.trimmed()))
        .map_err(|error| ExtractionError::AnchorUnreadable {
            sheet: sheet.name().to_owned(),
            reference: cell_reference(region.start_row, region.start_col),
            message: error.to_string(),
        })
}

/// Guesses merge continuations without metadata.
///
/// A blank cell repeats the last seen header when the next cell is blank too,
/// or when one of the previous three cells holds a header and every cell
/// between that one and the blank is blank.
pub struct NeighborHeuristic;

impl MergeInference for NeighborHeuristic {
    fn fill(
        &self,
        _sheet: &dyn Worksheet,
        _row: usize,
        _start_col: usize,
        values: &[Option<String>],
    ) -> Result<Vec<Option<String>>, ExtractionError> {
        let mut filled = Vec::with_capacity(values.len());
        let mut last_valid: Option<&String> = None;
        for (index, value) in values.iter().enumerate() {
            match value {
                Some(header) => {
                    last_valid = Some(header);
                    filled.push(Some(header.clone()));
                }
                None => {
                    let inferred = last_valid.filter(|_| is_continuation(values, index));
                    filled.push(inferred.cloned());
                }
            }
        }
        Ok(filled)
    }
}

fn is_continuation(values: &[Option<String>], index: usize) -> bool {
    let next_blank = values.get(index + 1).map(Option::is_none).unwrap_or(false);
    if next_blank {
        return true;
    }
    (1..=index.min(3)).any(|back| {
        values[index - back].is_some() && values[index - back + 1..index].iter().all(Option::is_none)
    })
}

/// Picks the authoritative strategy when merge metadata is available.
pub fn select_strategy(sheet: &dyn Worksheet) -> &'static dyn MergeInference {
    if sheet.merged_regions().is_some() {
        &MergedRegions
    } else {
        &NeighborHeuristic
    }
}

/// Reads the trimmed header values of `range.start_row` over the range's columns.
fn read_row(sheet: &dyn Worksheet, range: &BoundingBox) -> Vec<Option<String>> {
    (range.start_col..=range.end_col)
        .map(|col| {
            sheet
                .cell(range.start_row, col)
                .ok()
                .flatten()
                .and_then(|cell| cell.trimmed())
        })
        .collect()
}

/// Extracts the non-empty headers of a range's first row, each with its
/// absolute column.
///
/// Falls back to a plain positional read when merge inference fails, such as
/// when a merged region's anchor cannot be read. A row without any header
/// yields an empty list.
pub fn extract_header_columns(sheet: &dyn Worksheet, range: &BoundingBox) -> Vec<(usize, String)> {
    let values = read_row(sheet, range);
    let strategy = select_strategy(sheet);
    let filled = match strategy.fill(sheet, range.start_row, range.start_col, &values) {
        Ok(filled) => filled,
        Err(error) => {
            debug!(sheet = sheet.name(), range = %range, %error, "header extraction degraded");
            values
        }
    };
    let headers: Vec<(usize, String)> = filled
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| value.map(|header| (range.start_col + index, header)))
        .collect();
    if headers.is_empty() {
        warn!(sheet = sheet.name(), range = %range, "no header found");
    }
    headers
}

/// Extracts the non-empty headers of a range's first row.
pub fn extract_headers(sheet: &dyn Worksheet, range: &BoundingBox) -> Vec<String> {
    extract_header_columns(sheet, range)
        .into_iter()
        .map(|(_, header)| header)
        .collect()
}
