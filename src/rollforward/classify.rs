use crate::config::PatternRules;
use crate::spreadsheet::cell::is_blank;
use crate::spreadsheet::Worksheet;
use serde::Serialize;
use tracing::debug;
use tracing::info;

const PATTERN_WEIGHT: f64 = 0.4;
const STRUCTURE_WEIGHT: f64 = 0.35;
const DENSITY_WEIGHT: f64 = 0.25;
const MAX_DENSITY_SAMPLES: usize = 100;
/// Score used when the occupied box of a sheet cannot be determined
const UNKNOWN_SCORE: f64 = 0.5;

/// A worksheet recognised as supporting detail.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackdataSheet {
    pub name: String,
    pub confidence: f64,
    pub matched_pattern: Option<String>,
    pub structure_score: f64,
    pub density_score: f64,
}

/// Scores the shape of the occupied box: tiny boxes are titles or notes.
pub fn structure_score(sheet: &dyn Worksheet) -> f64 {
    match sheet.dimension() {
        Ok(Some(occupied)) if occupied.height() < 4 || occupied.width() < 3 => 0.3,
        Ok(Some(_)) => 0.8,
        Ok(None) => 0.0,
        Err(_) => UNKNOWN_SCORE,
    }
}

/// Scores how full the occupied box is, from at most 100 evenly strided samples.
pub fn density_score(sheet: &dyn Worksheet) -> f64 {
    let occupied = match sheet.dimension() {
        Ok(Some(occupied)) => occupied,
        Ok(None) => return 0.0,
        Err(_) => return UNKNOWN_SCORE,
    };
    let width = occupied.width();
    let total = width * occupied.height();
    let samples = total.min(MAX_DENSITY_SAMPLES);
    let step = (total / samples).max(1);
    let filled = (0..samples)
        .map(|index| index * step)
        .filter(|position| {
            let row = occupied.start_row + position / width;
            let col = occupied.start_col + position % width;
            !is_blank(sheet.cell(row, col).ok().flatten())
        })
        .count();
    let density = filled as f64 / samples as f64;
    if (0.3..=0.8).contains(&density) {
        0.9
    } else if (0.1..=0.9).contains(&density) {
        0.6
    } else {
        0.2
    }
}

/// Picks the backdata sheets of a workbook, best first.
///
/// Main statements are never backdata. Other sheets score 0.4 for a backdata
/// name pattern plus weighted structure and density scores, and are kept at
/// or above `threshold`.
pub fn classify_backdata<W: Worksheet>(sheets: &[W], rules: &dyn PatternRules, threshold: f64) -> Vec<BackdataSheet> {
    let mut backdata = Vec::new();
    for sheet in sheets {
        let sheet = sheet as &dyn Worksheet;
        if rules.is_main(sheet.name()) {
            debug!(sheet = sheet.name(), "main statement excluded");
            continue;
        }
        let matched_pattern = rules.backdata_match(sheet.name()).map(str::to_owned);
        let pattern_score = if matched_pattern.is_some() { PATTERN_WEIGHT } else { 0.0 };
        let structure = structure_score(sheet);
        let density = density_score(sheet);
        let confidence = pattern_score + STRUCTURE_WEIGHT * structure + DENSITY_WEIGHT * density;
        debug!(sheet = sheet.name(), confidence, structure, density, "backdata score");
        if confidence >= threshold {
            backdata.push(BackdataSheet {
                name: sheet.name().to_owned(),
                confidence,
                matched_pattern,
                structure_score: structure,
                density_score: density,
            });
        }
    }
    backdata.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    info!(sheets = sheets.len(), backdata = backdata.len(), "backdata classified");
    backdata
}
