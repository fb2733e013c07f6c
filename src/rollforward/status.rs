use crate::rollforward::copy::AppliedMatch;
use crate::rollforward::report::RollforwardReport;
use crate::rollforward::CellMarker;
use crate::rollforward::Marker;
use crate::spreadsheet::Worksheet;
use crate::table::dimension::MAX_SCAN_ROWS;
use crate::table::TableCandidate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CellStatus {
    Pending,
    Completed,
    Failed,
}

/// A prior-period value waiting to be refreshed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackedCell {
    pub sheet: String,
    pub row: usize,
    pub col: usize,
    pub value: String,
    pub status: CellStatus,
}

/// Follows every destination data cell from pending to a terminal state.
///
/// Only `Pending -> Completed` and `Pending -> Failed` happen; terminal
/// cells are never touched again.
#[derive(Debug, Default)]
pub struct StatusTracker {
    cells: Vec<TrackedCell>,
    seen: HashSet<(String, usize, usize)>,
    empty_row_limit: usize,
}

impl StatusTracker {
    pub fn new(empty_row_limit: usize) -> Self {
        StatusTracker {
            empty_row_limit: empty_row_limit.max(1),
            ..Default::default()
        }
    }

    pub fn cells(&self) -> &[TrackedCell] {
        &self.cells
    }

    /// Tracks every non-blank data cell of the tables on `sheet` as pending.
    ///
    /// The header columns are scanned from the row below the header,
    /// at most [`MAX_SCAN_ROWS`] rows, stopping after the configured number of
    /// consecutive empty rows. Returns the number of newly tracked cells.
    pub fn mark_pending(
        &mut self,
        sheet: &dyn Worksheet,
        tables: &[TableCandidate],
        marker: &mut dyn CellMarker,
    ) -> usize {
        let before = self.cells.len();
        for table in tables.iter().filter(|table| table.sheet_name == sheet.name()) {
            let mut empty_rows = 0;
            for row in table.header_row + 1..=table.header_row + MAX_SCAN_ROWS {
                let mut row_has_data = false;
                for &col in &table.columns {
                    let Some(cell) = sheet.cell(row, col).ok().flatten().filter(|cell| !cell.is_blank()) else {
                        continue;
                    };
                    row_has_data = true;
                    if !self.seen.insert((sheet.name().to_owned(), row, col)) {
                        continue;
                    }
                    if let Err(error) = marker.mark(sheet.name(), row, col, Marker::Pending) {
                        warn!(sheet = sheet.name(), row, col, %error, "cannot mark pending cell");
                    }
                    self.cells.push(TrackedCell {
                        sheet: sheet.name().to_owned(),
                        row,
                        col,
                        value: cell.to_string(),
                        status: CellStatus::Pending,
                    });
                }
                if row_has_data {
                    empty_rows = 0;
                } else {
                    empty_rows += 1;
                    if empty_rows >= self.empty_row_limit {
                        break;
                    }
                }
            }
        }
        let tracked = self.cells.len() - before;
        debug!(sheet = sheet.name(), tracked, "pending cells marked");
        tracked
    }

    /// Settles every pending cell against the applied matches.
    ///
    /// A cell listed in a match's written coordinates is completed. A match
    /// without written coordinates covers every cell of its destination
    /// sheet that sits in one of the destination header columns. Anything
    /// else fails.
    pub fn update(&mut self, applied: &[AppliedMatch], marker: &mut dyn CellMarker) {
        let (mut completed, mut failed) = (0, 0);
        for cell in self.cells.iter_mut().filter(|cell| cell.status == CellStatus::Pending) {
            let covered = applied.iter().any(|it| match &it.written {
                Some(written) => written
                    .iter()
                    .any(|at| at.sheet == cell.sheet && at.row == cell.row && at.col == cell.col),
                None => {
                    let destination = it.header_match.destination_table;
                    destination.sheet_name == cell.sheet && destination.columns.contains(&cell.col)
                }
            });
            if covered {
                cell.status = CellStatus::Completed;
                completed += 1;
                if let Err(error) = marker.mark(&cell.sheet, cell.row, cell.col, Marker::Completed) {
                    warn!(sheet = cell.sheet.as_str(), row = cell.row, col = cell.col, %error, "cannot mark completed cell");
                }
            } else {
                cell.status = CellStatus::Failed;
                failed += 1;
            }
        }
        info!(completed, failed, "cell statuses updated");
    }

    pub fn report(&self) -> RollforwardReport {
        RollforwardReport::new(&self.cells, Vec::new())
    }
}
