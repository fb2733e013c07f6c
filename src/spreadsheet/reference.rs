//! Excel-style cell and range addressing.
//!
//! All coordinates in this crate are 1-based: `A1` is `(1, 1)`.
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;
use thiserror::Error;

static CELL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]+)\$?(\d+)$").expect("Hardcode regex pattern"));

/// Errors related to Excel-style address parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressError {
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
}

/// Rectangular region of a worksheet, inclusive on both ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl BoundingBox {
    /// Returns true if `(row, col)` lies inside the box.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.start_row <= row && row <= self.end_row && self.start_col <= col && col <= self.end_col
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.end_col + 1 - self.start_col
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        self.end_row + 1 - self.start_row
    }

    /// Shared area divided by the area of the smaller box, 0.0 when disjoint.
    pub fn overlap_fraction(&self, other: &BoundingBox) -> f64 {
        let rows = self.end_row.min(other.end_row) as isize - self.start_row.max(other.start_row) as isize + 1;
        let cols = self.end_col.min(other.end_col) as isize - self.start_col.max(other.start_col) as isize + 1;
        if rows <= 0 || cols <= 0 {
            return 0.0;
        }
        let shared = (rows * cols) as f64;
        let smaller = (self.width() * self.height()).min(other.width() * other.height()) as f64;
        shared / smaller
    }
}

impl TryFrom<&str> for BoundingBox {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse_range(value)
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            cell_reference(self.start_row, self.start_col),
            cell_reference(self.end_row, self.end_col)
        )
    }
}

/// Converts column letters to a 1-based column number (`A` = 1, `AA` = 27).
pub fn column_letter_to_number(letters: &str) -> Result<usize, AddressError> {
    if letters.is_empty() {
        return Err(AddressError::InvalidAddress(letters.to_owned()));
    }
    letters.chars().try_fold(0usize, |number, letter| {
        if !letter.is_ascii_alphabetic() {
            return Err(AddressError::InvalidAddress(letters.to_owned()));
        }
        let digit = letter.to_ascii_uppercase() as usize - 'A' as usize + 1;
        number
            .checked_mul(26)
            .and_then(|number| number.checked_add(digit))
            .ok_or_else(|| AddressError::InvalidAddress(letters.to_owned()))
    })
}

/// Converts a 1-based column number back to its letters. Column 0 has no letters.
pub fn number_to_column_letter(number: usize) -> String {
    let mut column = number;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        letters.insert(0, (b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters
}

/// Parses a cell reference such as `B5` or `$B$5` into `(row, col)`.
pub fn parse_cell_reference(reference: &str) -> Result<(usize, usize), AddressError> {
    let invalid = || AddressError::InvalidAddress(reference.to_owned());
    let captures = CELL_REFERENCE.captures(reference.trim()).ok_or_else(invalid)?;
    let col = column_letter_to_number(&captures[1])?;
    let row = captures[2].parse::<usize>().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }
    Ok((row, col))
}

/// Parses an `A1:C10` range into a bounding box.
pub fn parse_range(range: &str) -> Result<BoundingBox, AddressError> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| AddressError::InvalidAddress(range.to_owned()))?;
    let (start_row, start_col) = parse_cell_reference(start)?;
    let (end_row, end_col) = parse_cell_reference(end)?;
    Ok(BoundingBox {
        start_row,
        end_row,
        start_col,
        end_col,
    })
}

/// Formats `(row, col)` as an Excel-style reference such as `B5`.
pub fn cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", number_to_column_letter(col), row)
}
