//! # Rollforward
//!
//! Moves current-period values into the prior-period workbook's backdata
//! sheets and tracks which destination cells were refreshed.
//!
//! Writing cells, replacing worksheets, colouring cells and rendering the
//! final report are done by the caller through the collaborator traits below.
pub mod backup;
pub mod classify;
pub mod copy;
pub mod pipeline;
pub mod report;
pub mod status;

use crate::rollforward::report::RollforwardReport;
use crate::spreadsheet::cell::Cell;
use serde::Serialize;

/// Visual state of a destination cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Marker {
    /// Waiting for a value from the current period
    Pending,
    /// Refreshed by this run
    Completed,
}

/// Writes one value into the destination workbook.
pub trait CellWriter {
    fn write_cell(&mut self, sheet: &str, row: usize, col: usize, value: &Cell) -> anyhow::Result<()>;
}

/// Replaces a whole destination worksheet with a source worksheet.
///
/// Returns `Ok(false)` when the replacement did not happen but left the
/// destination intact.
pub trait WorksheetReplacer {
    fn replace_worksheet(
        &mut self,
        source_path: &str,
        source_sheet: &str,
        destination_path: &str,
        destination_sheet: &str,
    ) -> anyhow::Result<bool>;
}

/// Applies a visual marker to a destination cell.
pub trait CellMarker {
    fn mark(&mut self, sheet: &str, row: usize, col: usize, marker: Marker) -> anyhow::Result<()>;
}

/// Receives the final report.
pub trait ReportSink {
    fn render(&mut self, report: &RollforwardReport) -> anyhow::Result<()>;
}
