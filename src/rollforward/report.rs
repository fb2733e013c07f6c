use crate::error::ErrorKind;
use crate::error::RollforwardError;
use crate::rollforward::status::CellStatus;
use crate::rollforward::status::TrackedCell;
use crate::spreadsheet::reference::cell_reference;
use serde::Serialize;
use std::fmt::Write;

pub const ALL_SUCCEEDED_MESSAGE: &str = "All backdata was rolled forward successfully. No manual adjustment is needed.";

const REMEDIATION_STEPS: [&str; 3] = [
    "Open the prior-period workbook and review the cells still marked as pending.",
    "Find the matching values in the current-period files and copy them in manually.",
    "Or align the header names of both periods exactly and run the rollforward again.",
];

/// A destination cell that still holds a prior-period value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManualAdjustment {
    pub sheet: String,
    pub row: usize,
    pub col: usize,
    /// e.g. `Sheet1!B5`
    pub cell_address: String,
    pub value: String,
}

impl From<&TrackedCell> for ManualAdjustment {
    fn from(cell: &TrackedCell) -> Self {
        ManualAdjustment {
            sheet: cell.sheet.clone(),
            row: cell.row,
            col: cell.col,
            cell_address: format!("{}!{}", cell.sheet, cell_reference(cell.row, cell.col)),
            value: cell.value.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetFailures {
    pub sheet: String,
    pub cells: Vec<ManualAdjustment>,
}

/// A unit of work (a file, a sheet or a column) that was skipped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl UnitFailure {
    pub fn new(unit: &str, error: &RollforwardError) -> Self {
        UnitFailure {
            unit: unit.to_owned(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of a rollforward run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollforwardReport {
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    /// Failed cells grouped by sheet, sheets in first-seen order
    pub failures_by_sheet: Vec<SheetFailures>,
    pub unit_failures: Vec<UnitFailure>,
    pub message: String,
}

impl RollforwardReport {
    pub fn new(cells: &[TrackedCell], unit_failures: Vec<UnitFailure>) -> Self {
        let count = |status: CellStatus| cells.iter().filter(|cell| cell.status == status).count();
        let mut failures_by_sheet: Vec<SheetFailures> = Vec::new();
        for cell in cells.iter().filter(|cell| cell.status == CellStatus::Failed) {
            match failures_by_sheet.iter_mut().find(|group| group.sheet == cell.sheet) {
                Some(group) => group.cells.push(cell.into()),
                None => failures_by_sheet.push(SheetFailures {
                    sheet: cell.sheet.clone(),
                    cells: vec![cell.into()],
                }),
            }
        }
        let failed = count(CellStatus::Failed);
        let message = if failed == 0 && unit_failures.is_empty() {
            ALL_SUCCEEDED_MESSAGE.to_owned()
        } else if failed == 0 {
            format!("No cell needs manual adjustment, but {} unit(s) were skipped.", unit_failures.len())
        } else {
            format!(
                "{} cell(s) in {} sheet(s) need manual adjustment.",
                failed,
                failures_by_sheet.len()
            )
        };
        RollforwardReport {
            completed: count(CellStatus::Completed),
            failed,
            pending: count(CellStatus::Pending),
            failures_by_sheet,
            unit_failures,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unit_failures.is_empty()
    }

    pub fn manual_adjustments(&self) -> impl Iterator<Item = &ManualAdjustment> {
        self.failures_by_sheet.iter().flat_map(|group| group.cells.iter())
    }

    /// Plain-text rendering, with the remediation checklist when cells failed.
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "{}", self.message);
        let _ = writeln!(
            text,
            "Completed: {}, Failed: {}, Pending: {}",
            self.completed, self.failed, self.pending
        );
        for group in &self.failures_by_sheet {
            let _ = writeln!(text);
            let _ = writeln!(text, "[{}] {} cell(s)", group.sheet, group.cells.len());
            for cell in &group.cells {
                let _ = writeln!(text, "  {}: {}", cell.cell_address, cell.value);
            }
        }
        if !self.unit_failures.is_empty() {
            let _ = writeln!(text);
            let _ = writeln!(text, "Skipped:");
            for failure in &self.unit_failures {
                let _ = writeln!(text, "  {} ({:?}): {}", failure.unit, failure.kind, failure.message);
            }
        }
        if self.failed > 0 {
            let _ = writeln!(text);
            let _ = writeln!(text, "To fix:");
            for (index, step) in REMEDIATION_STEPS.iter().enumerate() {
                let _ = writeln!(text, "  {}. {}", index + 1, step);
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::SpreadsheetError;
    use pretty_assertions::assert_eq;

    fn tracked(sheet: &str, row: usize, col: usize, status: CellStatus) -> TrackedCell {
        TrackedCell {
            sheet: sheet.to_owned(),
            row,
            col,
            value: format!("v{row}{col}"),
            status,
        }
    }

    #[test]
    fn single_failed_cell() {
        let cells = vec![
            tracked("Sheet1", 4, 2, CellStatus::Completed),
            tracked("Sheet1", 5, 2, CellStatus::Failed),
        ];
        let report = RollforwardReport::new(&cells, Vec::new());
        let addresses: Vec<&str> = report.manual_adjustments().map(|it| it.cell_address.as_str()).collect();
        assert_eq!(addresses, vec!["Sheet1!B5"]);
        assert_eq!((report.completed, report.failed, report.pending), (1, 1, 0));
        assert!(!report.is_success());

        let text = report.render_text();
        assert!(text.contains("Sheet1!B5: v52"));
        assert!(text.contains("1. Open the prior-period workbook"));
        assert!(text.contains("3. Or align the header names"));
    }

    #[test]
    fn grouped_in_first_seen_order() {
        let cells = vec![
            tracked("Detail", 2, 1, CellStatus::Failed),
            tracked("Aging", 3, 1, CellStatus::Failed),
            tracked("Detail", 3, 1, CellStatus::Failed),
        ];
        let report = RollforwardReport::new(&cells, Vec::new());
        let groups: Vec<(&str, usize)> = report
            .failures_by_sheet
            .iter()
            .map(|group| (group.sheet.as_str(), group.cells.len()))
            .collect();
        assert_eq!(groups, vec![("Detail", 2), ("Aging", 1)]);
    }

    #[test]
    fn all_succeeded() {
        let report = RollforwardReport::new(&[tracked("Detail", 2, 1, CellStatus::Completed)], Vec::new());
        assert!(report.is_success());
        assert_eq!(report.message, ALL_SUCCEEDED_MESSAGE);
        assert!(!report.render_text().contains("To fix:"));
    }

    #[test]
    fn unit_failures_are_listed() {
        let error: RollforwardError = SpreadsheetError::SheetNotFound("Detail".into()).into();
        let report = RollforwardReport::new(&[], vec![UnitFailure::new("current.xlsx", &error)]);
        assert!(!report.is_success());
        assert_eq!(report.unit_failures[0].kind, ErrorKind::StructureNotFound);
        assert!(report
            .render_text()
            .contains("current.xlsx (StructureNotFound): Sheet 'Detail' not found"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["unit_failures"][0]["kind"], "StructureNotFound");
    }
}
