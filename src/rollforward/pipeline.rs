use crate::config::CompiledPatterns;
use crate::config::Options;
use crate::error::RollforwardError;
use crate::matching::header::match_headers;
use crate::matching::worksheet::list_sheet_names;
use crate::rollforward::backup::create_backup;
use crate::rollforward::backup::ensure_writable;
use crate::rollforward::classify::classify_backdata;
use crate::rollforward::copy::apply_matches;
use crate::rollforward::copy::replace_worksheets;
use crate::rollforward::copy::ReplacementOutcome;
use crate::rollforward::report::RollforwardReport;
use crate::rollforward::report::UnitFailure;
use crate::rollforward::status::StatusTracker;
use crate::rollforward::CellMarker;
use crate::rollforward::CellWriter;
use crate::rollforward::ReportSink;
use crate::rollforward::WorksheetReplacer;
use crate::spreadsheet::read_workbook;
use crate::spreadsheet::sheet::Sheet;
use crate::table::detector::detect_tables_with;
use crate::table::TableCandidate;
use std::path::Path;
use tracing::info;
use tracing::warn;

/// Side effects a run delegates to the caller.
pub struct Collaborators<'c> {
    pub writer: &'c mut dyn CellWriter,
    pub marker: &'c mut dyn CellMarker,
    pub sink: &'c mut dyn ReportSink,
}

/// Rolls a prior-period workbook forward with current-period data.
pub struct Rollforward {
    options: Options,
    rules: CompiledPatterns,
}

impl Rollforward {
    pub fn new(options: Options) -> Result<Self, RollforwardError> {
        let options = options.validated();
        let rules = options.patterns.compile()?;
        Ok(Rollforward { options, rules })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn detect(&self, sheets: &[Sheet], path: &str) -> Vec<TableCandidate> {
        detect_tables_with(sheets, path, &self.options)
    }

    /// Loads the prior workbook and keeps its backdata sheets only.
    fn backdata_sheets(&self, prior: &str) -> Result<Vec<Sheet>, RollforwardError> {
        let sheets = read_workbook(prior)?;
        let backdata = classify_backdata(&sheets, &self.rules, self.options.classification_threshold);
        Ok(sheets
            .into_iter()
            .filter(|sheet| backdata.iter().any(|it| it.name == sheet.name))
            .collect())
    }

    /// Backs up the prior workbook and checks it can be written.
    fn guard(&self, prior: &str) -> Result<(), RollforwardError> {
        let path = Path::new(prior);
        create_backup(path, &self.options.backup_dir_name)?;
        ensure_writable(path)?;
        Ok(())
    }

    /// Runs a full rollforward and hands the report to the sink.
    ///
    /// Failing to read, back up or unlock `prior` aborts the run. A current
    /// workbook that cannot be read is recorded in the report and skipped.
    /// A sink that fails to render is logged; the cells are already written,
    /// so the report is still returned.
    pub fn run(
        &self,
        prior: &str,
        currents: &[String],
        collaborators: Collaborators,
    ) -> Result<RollforwardReport, RollforwardError> {
        let Collaborators { writer, marker, sink } = collaborators;
        info!(prior, currents = currents.len(), "rollforward started");

        let backdata_sheets = self.backdata_sheets(prior)?;
        let destinations = self.detect(&backdata_sheets, prior);
        if destinations.is_empty() {
            warn!(prior, sheets = backdata_sheets.len(), "no table found on backdata sheets");
        }
        self.guard(prior)?;

        let mut tracker = StatusTracker::new(self.options.pending_empty_row_limit);
        for sheet in &backdata_sheets {
            tracker.mark_pending(sheet, &destinations, marker);
        }

        let mut unit_failures = Vec::new();
        let mut loaded = Vec::new();
        for current in currents {
            match read_workbook(current) {
                Ok(sheets) => {
                    let tables = self.detect(&sheets, current);
                    loaded.push((current, sheets, tables));
                }
                Err(error) => {
                    warn!(file = current.as_str(), %error, "skip current workbook");
                    unit_failures.push(UnitFailure::new(current, &error));
                }
            }
        }

        let mut applied = Vec::new();
        for (current, sheets, tables) in &loaded {
            let matches = match_headers(tables, &destinations, &self.options);
            if matches.is_empty() {
                info!(file = current.as_str(), "nothing to copy");
                continue;
            }
            let outcome = apply_matches(matches, sheets.as_slice(), writer, self.options.empty_streak_limit);
            unit_failures.extend(outcome.failures);
            applied.extend(outcome.applied);
        }

        tracker.update(&applied, marker);
        let report = RollforwardReport::new(tracker.cells(), unit_failures);
        if let Err(error) = sink.render(&report) {
            warn!(%error, "cannot render report");
        }
        info!(
            completed = report.completed,
            failed = report.failed,
            skipped = report.unit_failures.len(),
            "rollforward finished"
        );
        Ok(report)
    }

    /// Replaces every backdata sheet of `prior` with its counterpart from the
    /// current workbooks, restoring `prior` from its backup on a crash.
    pub fn replace_backdata_sheets(
        &self,
        prior: &str,
        currents: &[String],
        replacer: &mut dyn WorksheetReplacer,
    ) -> Result<ReplacementOutcome, RollforwardError> {
        let names: Vec<String> = self.backdata_sheets(prior)?.into_iter().map(|sheet| sheet.name).collect();
        let path = Path::new(prior);
        let backup = create_backup(path, &self.options.backup_dir_name)?;
        ensure_writable(path)?;
        let outcome = replace_worksheets(&names, prior, currents, Some(backup.as_path()), replacer, list_sheet_names);
        info!(
            prior,
            replaced = outcome.replaced.len(),
            failed = outcome.failed.len(),
            missing = outcome.missing_source.len(),
            "backdata sheets replaced"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternSet;
    use crate::error::ErrorKind;
    use crate::rollforward::testing::Recorder;
    use crate::rollforward::Marker;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const NAMES: [&str; 5] = ["Cash", "Bank", "Loan", "Bond", "Fund"];

    fn write_detail(workbook: &mut Workbook, rows: usize, base: f64) {
        let detail = workbook.add_worksheet();
        detail.set_name("Sales Detail").unwrap();
        for (col, header) in ["ID", "Name", "Amount", "Memo"].iter().enumerate() {
            detail.write_string(0, col as u16, *header).unwrap();
        }
        for index in 0..rows {
            let row = index as u32 + 1;
            detail.write_number(row, 0, index as f64 + 1.0).unwrap();
            detail.write_string(row, 1, NAMES[index]).unwrap();
            detail.write_number(row, 2, base * (index as f64 + 1.0)).unwrap();
        }
    }

    fn fixtures() -> (TempDir, String, String) {
        let dir = tempfile::tempdir().unwrap();

        let prior = dir.path().join("prior.xlsx");
        let mut workbook = Workbook::new();
        let statement = workbook.add_worksheet();
        statement.set_name("BS").unwrap();
        for (col, header) in ["Account", "Amount", "Note"].iter().enumerate() {
            statement.write_string(0, col as u16, *header).unwrap();
        }
        write_detail(&mut workbook, 5, 100.0);
        let cover = workbook.add_worksheet();
        cover.set_name("Cover").unwrap();
        cover.write_string(0, 0, "Closing package").unwrap();
        workbook.save(&prior).unwrap();

        let current = dir.path().join("current.xlsx");
        let mut workbook = Workbook::new();
        write_detail(&mut workbook, 4, 110.0);
        workbook.save(&current).unwrap();

        let path = |it: PathBuf| it.to_str().unwrap().to_owned();
        (dir, path(prior), path(current))
    }

    #[test]
    fn full_run() {
        let (dir, prior, current) = fixtures();
        let missing = dir.path().join("missing.xlsx").to_str().unwrap().to_owned();
        let (mut writer, mut marker, mut sink) = (Recorder::default(), Recorder::default(), Recorder::default());
        let rollforward = Rollforward::new(Options::default()).unwrap();

        let report = rollforward
            .run(
                &prior,
                &[current, missing.clone()],
                Collaborators {
                    writer: &mut writer,
                    marker: &mut marker,
                    sink: &mut sink,
                },
            )
            .unwrap();

        assert_eq!(writer.writes.len(), 12);
        assert!(writer.writes.contains(&("Sales Detail".to_string(), 5, 3, "440".to_string())));
        assert!(writer.writes.iter().all(|(sheet, _, _, _)| sheet == "Sales Detail"));

        assert_eq!((report.completed, report.failed, report.pending), (12, 3, 0));
        let addresses: Vec<&str> = report.manual_adjustments().map(|it| it.cell_address.as_str()).collect();
        assert_eq!(addresses, vec!["Sales Detail!A6", "Sales Detail!B6", "Sales Detail!C6"]);
        assert_eq!(report.unit_failures.len(), 1);
        assert_eq!(report.unit_failures[0].unit, missing);
        assert_eq!(report.unit_failures[0].kind, ErrorKind::UnexpectedIo);

        let pending = marker.marks.iter().filter(|it| it.3 == Marker::Pending).count();
        let completed = marker.marks.iter().filter(|it| it.3 == Marker::Completed).count();
        assert_eq!((pending, completed), (15, 12));
        assert_eq!(sink.reports, vec![report]);

        let backups: Vec<_> = std::fs::read_dir(dir.path().join("Backup")).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn render_failure_keeps_the_report() {
        let (_dir, prior, current) = fixtures();
        let (mut writer, mut marker) = (Recorder::default(), Recorder::default());
        let mut sink = Recorder {
            fail_render: true,
            ..Default::default()
        };
        let report = Rollforward::new(Options::default())
            .unwrap()
            .run(
                &prior,
                &[current],
                Collaborators {
                    writer: &mut writer,
                    marker: &mut marker,
                    sink: &mut sink,
                },
            )
            .unwrap();
        assert_eq!(writer.writes.len(), 12);
        assert_eq!((report.completed, report.failed), (12, 3));
        assert!(sink.reports.is_empty());
    }

    #[test]
    fn unreadable_prior_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let prior = dir.path().join("prior.xlsx");
        let mut recorders = (Recorder::default(), Recorder::default(), Recorder::default());
        let result = Rollforward::new(Options::default()).unwrap().run(
            prior.to_str().unwrap(),
            &[],
            Collaborators {
                writer: &mut recorders.0,
                marker: &mut recorders.1,
                sink: &mut recorders.2,
            },
        );
        assert!(result.is_err());
        assert!(recorders.2.reports.is_empty());
        assert!(!dir.path().join("Backup").exists());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let options = Options {
            patterns: PatternSet {
                backdata: vec!["(".into()],
                main: vec![],
            },
            ..Default::default()
        };
        assert!(Rollforward::new(options).is_err());
    }

    #[test]
    fn replace_backdata() {
        let (_dir, prior, current) = fixtures();
        let mut replacer = Recorder {
            replace_result: Some(true),
            ..Default::default()
        };
        let outcome = Rollforward::new(Options::default())
            .unwrap()
            .replace_backdata_sheets(&prior, &[current.clone()], &mut replacer)
            .unwrap();
        assert_eq!(outcome.replaced.len(), 1);
        assert_eq!(outcome.replaced[0].file_path, current);
        assert_eq!(outcome.replaced[0].sheet_name, "Sales Detail");
        assert!(outcome.missing_source.is_empty());
    }
}
