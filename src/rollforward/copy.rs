use crate::error::RollforwardError;
use crate::matching::header::HeaderMatch;
use crate::matching::worksheet::find_matching_worksheet;
use crate::matching::worksheet::WorksheetMatch;
use crate::rollforward::backup::restore_backup;
use crate::rollforward::report::UnitFailure;
use crate::rollforward::CellWriter;
use crate::rollforward::WorksheetReplacer;
use crate::spreadsheet::reference::cell_reference;
use crate::spreadsheet::Worksheet;
use crate::table::dimension::data_rows;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Sheet '{sheet}' not found in '{file}'")]
    SourceSheetNotFound { file: String, sheet: String },

    #[error("Header '{header}' not found in table on '{sheet}'")]
    HeaderNotFound { sheet: String, header: String },

    #[error("Cannot write {sheet}!{reference}: {message}")]
    WriteFailed {
        sheet: String,
        reference: String,
        message: String,
    },

    #[error("Cannot replace worksheet '{sheet}': {message}")]
    ReplaceFailed { sheet: String, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CellCoordinate {
    pub sheet: String,
    pub row: usize,
    pub col: usize,
}

impl CellCoordinate {
    pub fn new(sheet: &str, row: usize, col: usize) -> Self {
        CellCoordinate {
            sheet: sheet.to_owned(),
            row,
            col,
        }
    }
}

/// A header match the copy phase executed.
///
/// `written` lists the destination cells that received a value; `None` when
/// the writer could not report them.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedMatch<'a> {
    pub header_match: HeaderMatch<'a>,
    pub written: Option<Vec<CellCoordinate>>,
}

#[derive(Debug, Default)]
pub struct CopyOutcome<'a> {
    pub applied: Vec<AppliedMatch<'a>>,
    pub failures: Vec<UnitFailure>,
    pub written_cells: usize,
}

fn unit_name(header_match: &HeaderMatch) -> String {
    format!(
        "{}[{}]",
        header_match.destination_table.sheet_name, header_match.destination_header
    )
}

/// Copies one matched source column into its destination column.
///
/// The source column's values from its non-empty data rows are written to
/// consecutive rows below the destination header. Blank values are skipped.
/// Cells written before a write failure are still returned in `written`.
fn apply_match(
    header_match: &HeaderMatch,
    source: &dyn Worksheet,
    writer: &mut dyn CellWriter,
    empty_streak_limit: usize,
    written: &mut Vec<CellCoordinate>,
) -> Result<(), CopyError> {
    let source_table = header_match.source_table;
    let destination_table = header_match.destination_table;
    let source_col = source_table
        .column_of(header_match.source_header)
        .ok_or_else(|| CopyError::HeaderNotFound {
            sheet: source_table.sheet_name.clone(),
            header: header_match.source_header.to_owned(),
        })?;
    let destination_col = destination_table
        .column_of(header_match.destination_header)
        .ok_or_else(|| CopyError::HeaderNotFound {
            sheet: destination_table.sheet_name.clone(),
            header: header_match.destination_header.to_owned(),
        })?;

    let rows = data_rows(source, source_table.header_row, source_table.end_col, empty_streak_limit);
    for (index, row) in rows.into_iter().enumerate() {
        let Some(value) = source.cell(row, source_col).ok().flatten().filter(|cell| !cell.is_blank()) else {
            continue;
        };
        let destination_row = destination_table.header_row + 1 + index;
        let sheet = destination_table.sheet_name.as_str();
        writer
            .write_cell(sheet, destination_row, destination_col, value)
            .map_err(|error| CopyError::WriteFailed {
                sheet: sheet.to_owned(),
                reference: cell_reference(destination_row, destination_col),
                message: error.to_string(),
            })?;
        written.push(CellCoordinate::new(sheet, destination_row, destination_col));
    }
    Ok(())
}

/// Executes header matches against the loaded source worksheets.
///
/// A match whose source sheet is missing or whose write fails is recorded as
/// a failure; the remaining matches still run.
pub fn apply_matches<'a, W: Worksheet>(
    matches: Vec<HeaderMatch<'a>>,
    source_sheets: &[W],
    writer: &mut dyn CellWriter,
    empty_streak_limit: usize,
) -> CopyOutcome<'a> {
    let mut outcome = CopyOutcome::default();
    for header_match in matches {
        let source_table = header_match.source_table;
        let unit = unit_name(&header_match);
        let Some(source) = source_sheets
            .iter()
            .map(|sheet| sheet as &dyn Worksheet)
            .find(|sheet| sheet.name() == source_table.sheet_name)
        else {
            let error: RollforwardError = CopyError::SourceSheetNotFound {
                file: source_table.source_path.clone(),
                sheet: source_table.sheet_name.clone(),
            }
            .into();
            warn!(unit = unit.as_str(), %error, "skip match");
            outcome.failures.push(UnitFailure::new(&unit, &error));
            continue;
        };

        let mut written = Vec::new();
        let result = apply_match(&header_match, source, writer, empty_streak_limit, &mut written);
        debug!(unit = unit.as_str(), cells = written.len(), "match applied");
        if let Err(error) = result {
            let error: RollforwardError = error.into();
            warn!(unit = unit.as_str(), %error, "match partially applied");
            outcome.failures.push(UnitFailure::new(&unit, &error));
        }
        outcome.written_cells += written.len();
        outcome.applied.push(AppliedMatch {
            header_match,
            written: Some(written),
        });
    }
    info!(
        applied = outcome.applied.len(),
        failed = outcome.failures.len(),
        cells = outcome.written_cells,
        "copy finished"
    );
    outcome
}

#[derive(Debug, Default)]
pub struct ReplacementOutcome {
    pub replaced: Vec<WorksheetMatch>,
    pub failed: Vec<UnitFailure>,
    /// Destination sheets without a counterpart in any current file
    pub missing_source: Vec<String>,
}

/// Replaces each named destination worksheet with its best current-period
/// counterpart.
///
/// When the replacer errors and a backup is given, the destination file is
/// restored from it before moving on.
pub fn replace_worksheets<F>(
    sheet_names: &[String],
    destination_path: &str,
    current_files: &[String],
    backup: Option<&Path>,
    replacer: &mut dyn WorksheetReplacer,
    mut list_sheets: F,
) -> ReplacementOutcome
where
    F: FnMut(&str) -> Result<Vec<String>, RollforwardError>,
{
    let mut outcome = ReplacementOutcome::default();
    for sheet in sheet_names {
        let Some(found) = find_matching_worksheet(sheet, current_files, &mut list_sheets) else {
            info!(sheet = sheet.as_str(), "no current worksheet found");
            outcome.missing_source.push(sheet.to_owned());
            continue;
        };
        match replacer.replace_worksheet(&found.file_path, &found.sheet_name, destination_path, sheet) {
            Ok(true) => {
                info!(sheet = sheet.as_str(), source = found.sheet_name.as_str(), "worksheet replaced");
                outcome.replaced.push(found);
            }
            Ok(false) => {
                let error: RollforwardError = CopyError::ReplaceFailed {
                    sheet: sheet.to_owned(),
                    message: format!("replacement from '{}' was refused", found.file_path),
                }
                .into();
                warn!(sheet = sheet.as_str(), %error, "worksheet not replaced");
                outcome.failed.push(UnitFailure::new(sheet, &error));
            }
            Err(error) => {
                warn!(sheet = sheet.as_str(), %error, "worksheet replacement crashed");
                if let Some(backup) = backup {
                    if let Err(error) = restore_backup(backup, Path::new(destination_path)) {
                        warn!(sheet = sheet.as_str(), %error, "cannot restore backup");
                    }
                }
                let error: RollforwardError = CopyError::ReplaceFailed {
                    sheet: sheet.to_owned(),
                    message: error.to_string(),
                }
                .into();
                outcome.failed.push(UnitFailure::new(sheet, &error));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rollforward::testing::Recorder;
    use crate::spreadsheet::sheet::Sheet;
    use crate::table::candidate;
    use crate::table::detector::detect_tables;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn current() -> Sheet {
        Sheet::from_rows(
            "Current",
            &[
                &["ID", "Amount"],
                &["1", "150"],
                &[],
                &["2", ""],
                &["3", "350"],
            ],
        )
    }

    #[test]
    fn copies_into_destination_rows() {
        let mut source = candidate("Current", &["ID", "Amount"]);
        source.end_row = 5;
        let mut destination = candidate("Prior", &["Memo", "Amount"]);
        destination.header_row = 3;
        destination.start_col = 2;
        destination.end_col = 3;
        let matches = vec![HeaderMatch {
            source_table: &source,
            destination_table: &destination,
            source_header: "Amount",
            destination_header: "Amount",
            confidence: 1.0,
        }];

        let mut recorder = Recorder::default();
        let outcome = apply_matches(matches, &[current()], &mut recorder, 2);
        assert_eq!(
            recorder.writes,
            vec![
                ("Prior".to_string(), 4, 3, "150".to_string()),
                ("Prior".to_string(), 6, 3, "350".to_string()),
            ]
        );
        assert_eq!(outcome.written_cells, 2);
        assert!(outcome.failures.is_empty());
        assert_eq!(
            outcome.applied[0].written,
            Some(vec![CellCoordinate::new("Prior", 4, 3), CellCoordinate::new("Prior", 6, 3)])
        );
    }

    #[test]
    fn header_after_blank_column_lands_in_its_own_column() {
        let layout = |name: &str, first: &str, second: &str| {
            Sheet::from_rows(
                name,
                &[
                    &["A", "B", "C", "D", "", "F", "G", "H", "I", "J"],
                    &["1", "2", "3", "4", "note", first, "7", "8", "9", "10"],
                    &["1", "2", "3", "4", "note", second, "7", "8", "9", "10"],
                ],
            )
        };
        let sources = [layout("Current", "66", "77")];
        let source = detect_tables(&sources, "current.xlsx").remove(0);
        let destination = detect_tables(&[layout("Prior", "6", "6")], "prior.xlsx").remove(0);
        let matches = vec![HeaderMatch {
            source_table: &source,
            destination_table: &destination,
            source_header: "F",
            destination_header: "F",
            confidence: 1.0,
        }];

        let mut recorder = Recorder::default();
        apply_matches(matches, &sources, &mut recorder, 2);
        assert_eq!(
            recorder.writes,
            vec![
                ("Prior".to_string(), 2, 6, "66".to_string()),
                ("Prior".to_string(), 3, 6, "77".to_string()),
            ]
        );
    }

    #[test]
    fn missing_source_sheet() {
        let source = candidate("Gone", &["ID"]);
        let destination = candidate("Prior", &["ID"]);
        let matches = vec![HeaderMatch {
            source_table: &source,
            destination_table: &destination,
            source_header: "ID",
            destination_header: "ID",
            confidence: 1.0,
        }];
        let outcome = apply_matches(matches, &[current()], &mut Recorder::default(), 2);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.failures[0].kind, ErrorKind::StructureNotFound);
        assert_eq!(outcome.failures[0].unit, "Prior[ID]");
    }

    #[test]
    fn write_failure_keeps_other_matches() {
        let source = candidate("Current", &["ID", "Amount"]);
        let locked = candidate("Locked", &["ID"]);
        let open = candidate("Prior", &["ID"]);
        let matches = vec![
            HeaderMatch {
                source_table: &source,
                destination_table: &locked,
                source_header: "ID",
                destination_header: "ID",
                confidence: 1.0,
            },
            HeaderMatch {
                source_table: &source,
                destination_table: &open,
                source_header: "ID",
                destination_header: "ID",
                confidence: 1.0,
            },
        ];
        let mut recorder = Recorder {
            fail_writes_to: Some("Locked".into()),
            ..Default::default()
        };
        let outcome = apply_matches(matches, &[current()], &mut recorder, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].message.contains("Locked!A2"));
        assert_eq!(outcome.applied.len(), 2);
        assert_eq!(outcome.applied[0].written, Some(vec![]));
        assert_eq!(recorder.writes.len(), 3);
    }

    fn lister(file: &str) -> Result<Vec<String>, RollforwardError> {
        match file {
            "current.xlsx" => Ok(vec!["Sales Detail".into(), "Aging".into()]),
            _ => Err(crate::spreadsheet::SpreadsheetError::FileError(file.to_owned()).into()),
        }
    }

    #[test]
    fn replacement_outcomes() {
        let sheets = vec!["Sales Detail".to_string(), "Inventory".to_string()];
        let files = vec!["current.xlsx".to_string()];
        let mut recorder = Recorder {
            replace_result: Some(true),
            ..Default::default()
        };
        let outcome = replace_worksheets(&sheets, "prior.xlsx", &files, None, &mut recorder, lister);
        assert_eq!(outcome.replaced[0].sheet_name, "Sales Detail");
        assert_eq!(outcome.missing_source, vec!["Inventory".to_string()]);
        assert_eq!(
            recorder.replaced,
            vec![(
                "current.xlsx".to_string(),
                "Sales Detail".to_string(),
                "prior.xlsx".to_string(),
                "Sales Detail".to_string()
            )]
        );

        let mut refusing = Recorder {
            replace_result: Some(false),
            ..Default::default()
        };
        let outcome = replace_worksheets(&sheets[..1], "prior.xlsx", &files, None, &mut refusing, lister);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.replaced.is_empty());
    }

    #[test]
    fn crashed_replacement_restores_backup() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("prior.xlsx");
        let backup = dir.path().join("prior_backup.xlsx");
        fs::write(&destination, b"half written").unwrap();
        fs::write(&backup, b"original").unwrap();

        let sheets = vec!["Aging".to_string()];
        let files = vec!["current.xlsx".to_string()];
        let outcome = replace_worksheets(
            &sheets,
            destination.to_str().unwrap(),
            &files,
            Some(&backup),
            &mut Recorder::default(),
            lister,
        );
        assert_eq!(outcome.failed[0].unit, "Aging");
        assert!(outcome.failed[0].message.contains("replacement crashed"));
        assert_eq!(fs::read(&destination).unwrap(), b"original");
    }
}
