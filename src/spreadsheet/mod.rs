//! # Spreadsheet Access
//!
//! Workbook readers and the worksheet handle consumed by table detection.
//! Every reader loads worksheets into [`Sheet`](sheet::Sheet), which exposes
//! cell values, the occupied dimension, the declared auto-filter range and
//! merged-cell regions through the [`Worksheet`] trait.
pub mod cell;
pub mod criteria;
mod excel;
pub mod reference;
pub mod sheet;
pub mod xlsx;

use crate::error::RollforwardError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::BoundingBox;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while opening workbooks or reading worksheets.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("File '{0}' not found or unreadable")]
    FileError(String),

    #[error("Access denied to '{0}'")]
    AccessDenied(String),

    #[error("Spreadsheet '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Cannot read cell {reference} of '{sheet}': {message}")]
    CellAccess {
        sheet: String,
        reference: String,
        message: String,
    },

    #[error("Cannot detect file format for '{0}'")]
    InvalidFileFormat(String),
}

/// Read-only view of one worksheet.
///
/// Coordinates are 1-based. Merge metadata is optional: a handle that cannot
/// provide it returns `None` and callers fall back to neighbour inference.
pub trait Worksheet {
    fn name(&self) -> &str;

    /// Cell at `(row, col)`, `None` when the cell holds nothing.
    fn cell(&self, row: usize, col: usize) -> Result<Option<&Cell>, SpreadsheetError>;

    /// Occupied bounding box. `Ok(None)` for a sheet without cells, `Err` when
    /// the extent cannot be determined.
    fn dimension(&self) -> Result<Option<BoundingBox>, SpreadsheetError>;

    /// The auto-filter reference declared on the sheet, e.g. `A6:V339`.
    fn auto_filter(&self) -> Option<&str>;

    /// Authoritative merged regions, when the source exposes them.
    fn merged_regions(&self) -> Option<&[BoundingBox]>;
}

/// A workbook file able to list and load its worksheets.
pub trait Spreadsheet {
    /// File name of the workbook.
    fn name(&self) -> String;

    /// Worksheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Loads the worksheets accepted by `criteria`.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, RollforwardError>;
}

/// Opens a workbook, choosing the reader from the file extension.
pub fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, RollforwardError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .unwrap_or_default();
    debug!(file = file_name, extension = extension.as_str(), "open spreadsheet");
    match extension.as_str() {
        "xlsx" | "xlsm" => Ok(Box::new(XlsxSpreadsheet::open(file_name)?)),
        _ => Err(SpreadsheetError::InvalidFileFormat(file_name.to_owned()))?,
    }
}

/// Loads every worksheet of a workbook.
pub fn read_workbook(file_name: &str) -> Result<Vec<Sheet>, RollforwardError> {
    open_spreadsheet(file_name)?.read_sheets(&Criteria::default())
}
