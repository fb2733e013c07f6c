use crate::spreadsheet::reference::cell_reference;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `1` / `0`
    Boolean,
    /// Numeric values
    Number,
    /// Inline or shared string values, already resolved
    Text,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Error values such as `#REF!`
    Error,
}

/// Represents a single cell in a worksheet with position, type, and value.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row number (1-based)
    pub row: usize,
    /// Column number (1-based)
    pub col: usize,
    /// Cell data type
    pub kind: CellType,
    /// Cell value as stored in the file
    pub value: String,
}

impl Cell {
    pub fn text(row: usize, col: usize, value: &str) -> Self {
        Cell {
            row,
            col,
            kind: CellType::Text,
            value: value.to_owned(),
        }
    }

    pub fn number(row: usize, col: usize, value: f64) -> Self {
        Cell {
            row,
            col,
            kind: CellType::Number,
            value: value.to_string(),
        }
    }

    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub fn reference(&self) -> String {
        cell_reference(self.row, self.col)
    }

    /// Empty cells and whitespace-only values count as blank.
    pub fn is_blank(&self) -> bool {
        self.kind == CellType::Empty || self.value.trim().is_empty()
    }

    /// True for non-blank string cells.
    pub fn is_text(&self) -> bool {
        self.kind == CellType::Text && !self.is_blank()
    }

    /// True for numeric cells whose value is zero.
    pub fn is_zero(&self) -> bool {
        self.kind == CellType::Number && self.value.trim().parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
    }

    /// Trimmed display value, None for blank cells.
    pub fn trimmed(&self) -> Option<String> {
        if self.is_blank() {
            None
        } else {
            Some(self.to_string().trim().to_owned())
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            CellType::Boolean => write!(f, "{}", if self.value == "1" { "TRUE" } else { "FALSE" }),
            CellType::IsoDateTime => write!(f, "{}", self.value.replace('T', " ")),
            _ => write!(f, "{}", self.value),
        }
    }
}

/// Blank check for an optional cell read, treating absence as blank.
pub(crate) fn is_blank(cell: Option<&Cell>) -> bool {
    cell.map(Cell::is_blank).unwrap_or(true)
}
