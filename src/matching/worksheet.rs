use crate::error::RollforwardError;
use crate::spreadsheet::open_spreadsheet;
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use tracing::info;
use tracing::warn;

const CASE_INSENSITIVE_SCORE: f64 = 0.95;
const SEPARATOR_INSENSITIVE_SCORE: f64 = 0.9;
const MIN_EDIT_SIMILARITY: f64 = 0.85;
const MIN_ACCEPTED_SCORE: f64 = 0.8;

/// A current-period worksheet paired with a prior-period sheet name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorksheetMatch {
    pub file_path: String,
    pub sheet_name: String,
    pub confidence: f64,
}

/// Lower-cased name without whitespace, `-` or `_`.
fn clean_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Scores how well `candidate` stands in for `target`, 0.0 when it does not.
pub fn score(target: &str, candidate: &str) -> f64 {
    if target == candidate {
        return 1.0;
    }
    if target.to_lowercase() == candidate.to_lowercase() {
        return CASE_INSENSITIVE_SCORE;
    }
    let target = clean_name(target);
    let candidate = clean_name(candidate);
    if target == candidate {
        return SEPARATOR_INSENSITIVE_SCORE;
    }
    if target.chars().count() > 2 && candidate.chars().count() > 2 {
        let similarity = strsim::normalized_levenshtein(&target, &candidate);
        if similarity >= MIN_EDIT_SIMILARITY {
            return MIN_ACCEPTED_SCORE + (similarity - MIN_EDIT_SIMILARITY) * 0.4;
        }
    }
    0.0
}

/// Orders files so that those whose name mentions the sheet come first.
fn prioritize<'a>(target: &str, files: &'a [String]) -> (Vec<&'a String>, usize) {
    let cleaned = clean_name(target);
    let (mut preferred, others): (Vec<&String>, Vec<&String>) = files.iter().partition(|file| {
        let stem = Path::new(file.as_str())
            .file_stem()
            .map(|stem| clean_name(&stem.to_string_lossy()))
            .unwrap_or_default();
        !cleaned.is_empty() && stem.contains(&cleaned)
    });
    let preferred_count = preferred.len();
    preferred.extend(others);
    (preferred, preferred_count)
}

/// Lists the worksheet names of a workbook.
pub fn list_sheet_names(path: &str) -> Result<Vec<String>, RollforwardError> {
    Ok(open_spreadsheet(path)?.sheet_names())
}

/// Finds the current-period worksheet that corresponds to `target`.
///
/// An exact name returns immediately. Otherwise the highest score of at
/// least 0.8 wins, the first one found on ties. Files that cannot be listed
/// are logged and skipped.
pub fn find_matching_worksheet<F>(target: &str, files: &[String], mut list_sheets: F) -> Option<WorksheetMatch>
where
    F: FnMut(&str) -> Result<Vec<String>, RollforwardError>,
{
    let (ordered, preferred_count) = prioritize(target, files);
    let mut best: Option<WorksheetMatch> = None;
    for (index, file) in ordered.into_iter().enumerate() {
        let names = match list_sheets(file.as_str()) {
            Ok(names) => names,
            Err(error) => {
                warn!(file = file.as_str(), %error, "skip unreadable workbook");
                continue;
            }
        };
        for name in names {
            let confidence = score(target, &name);
            if confidence == 1.0 {
                info!(target, file = file.as_str(), "exact worksheet match");
                return Some(WorksheetMatch {
                    file_path: file.to_owned(),
                    sheet_name: name,
                    confidence,
                });
            }
            if confidence > best.as_ref().map(|it| it.confidence).unwrap_or(0.0) {
                debug!(target, file = file.as_str(), sheet = name.as_str(), confidence, "worksheet candidate");
                best = Some(WorksheetMatch {
                    file_path: file.to_owned(),
                    sheet_name: name,
                    confidence,
                });
            }
        }
        let good_enough = best
            .as_ref()
            .map(|it| it.confidence >= SEPARATOR_INSENSITIVE_SCORE)
            .unwrap_or(false);
        if index < preferred_count && good_enough {
            break;
        }
    }
    best.filter(|it| it.confidence >= MIN_ACCEPTED_SCORE)
}
