//! Table discovery inside worksheets.
//!
//! A table is a header row followed by data rows. [`detector`] finds
//! candidate tables, [`header`] turns a header row into clean names and
//! [`dimension`] measures how far a table's data extends.
pub mod detector;
pub mod dimension;
pub mod header;

use crate::spreadsheet::reference::BoundingBox;
use serde::Serialize;

/// How a table candidate was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// The sheet's declared auto-filter range
    DeclaredFilterRange,
    /// Header and data density scanning
    Heuristic,
}

/// A detected header-plus-data region.
///
/// `headers[i]` sits in column `columns[i]`. Columns increase strictly from
/// `start_col` to `end_col`; a blank header cell leaves a gap, so
/// `headers.len() <= end_col - start_col + 1`. `header_row <= end_row`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCandidate {
    pub sheet_name: String,
    pub origin: Origin,
    /// 1-based row holding the headers
    pub header_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub headers: Vec<String>,
    /// Absolute column of each header
    pub columns: Vec<usize>,
    pub confidence: f64,
    pub source_path: String,
}

impl TableCandidate {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox {
            start_row: self.header_row,
            end_row: self.end_row,
            start_col: self.start_col,
            end_col: self.end_col,
        }
    }

    /// Absolute column of the first header named `header`.
    pub fn column_of(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|it| it == header)
            .and_then(|index| self.columns.get(index).copied())
    }
}

#[cfg(test)]
pub(crate) fn candidate(sheet_name: &str, headers: &[&str]) -> TableCandidate {
    TableCandidate {
        sheet_name: sheet_name.to_owned(),
        origin: Origin::Heuristic,
        header_row: 1,
        end_row: 3,
        start_col: 1,
        end_col: headers.len(),
        headers: headers.iter().map(|it| it.to_string()).collect(),
        columns: (1..=headers.len()).collect(),
        confidence: 0.9,
        source_path: String::new(),
    }
}
