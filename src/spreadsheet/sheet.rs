use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::reference::BoundingBox;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Worksheet;
use std::collections::HashMap;

/// A worksheet loaded into memory from a spreadsheet file.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub file_name: String,
    /// Sheet name
    pub name: String,
    /// All non-empty cells in the sheet
    pub cells: Vec<Cell>,
    /// Index mapping from (row, col) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    /// Reference of the sheet's auto filter, if declared
    pub auto_filter: Option<String>,
    /// Merged regions; None when the source could not provide them
    pub merged_regions: Option<Vec<BoundingBox>>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    /// Creates an empty sheet without merge metadata.
    pub fn new(file_name: &str, name: &str) -> Self {
        Sheet {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Returns true if the sheet contains no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell, replacing any earlier cell at the same position.
    pub fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Builds a sheet from rows of values starting at `A1`.
    ///
    /// Empty strings are skipped, values parsing as numbers become numeric cells.
    pub fn from_rows(name: &str, rows: &[&[&str]]) -> Self {
        let mut sheet = Sheet::new("", name);
        for (row_index, row) in rows.iter().enumerate() {
            for (col_index, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let cell = match value.parse::<f64>() {
                    Ok(number) => Cell::number(row_index + 1, col_index + 1, number),
                    Err(_) => Cell::text(row_index + 1, col_index + 1, value),
                };
                sheet.push(cell);
            }
        }
        sheet
    }

    /// Looks up a cell by 1-based position.
    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes
            .get(&(row, col))
            .and_then(|index| self.cells.get(*index))
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }
}

impl Worksheet for Sheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, row: usize, col: usize) -> Result<Option<&Cell>, SpreadsheetError> {
        Ok(self.get(row, col))
    }

    fn dimension(&self) -> Result<Option<BoundingBox>, SpreadsheetError> {
        let rows = self.row_lower_bound.zip(self.row_upper_bound);
        let cols = self.col_lower_bound.zip(self.col_upper_bound);
        Ok(rows.zip(cols).map(|((start_row, end_row), (start_col, end_col))| BoundingBox {
            start_row,
            end_row,
            start_col,
            end_col,
        }))
    }

    fn auto_filter(&self) -> Option<&str> {
        self.auto_filter.as_deref()
    }

    fn merged_regions(&self) -> Option<&[BoundingBox]> {
        self.merged_regions.as_deref()
    }
}
