//! Options controlling detection, matching and status tracking.
//!
//! Options deserialize from JSON with every field optional; missing fields
//! take their defaults. Call [`Options::validated`] before use so that
//! out-of-range values are reset instead of silently misbehaving.
use crate::error::RollforwardError;
use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_EMPTY_STREAK_LIMIT: usize = 2;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_CLASSIFICATION_THRESHOLD: f64 = 0.7;
pub const DEFAULT_PENDING_EMPTY_ROW_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid sheet pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// How header matching compares names.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Exact string equality
    #[default]
    Exact,
    /// Word-overlap similarity scoring above a threshold
    Similarity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Consecutive blank rows that end a table, valid in `1..=10`
    pub empty_streak_limit: usize,
    pub match_mode: MatchMode,
    pub similarity_threshold: f64,
    /// Minimum overlap fraction for dropping overlapping candidates; off when `None`
    pub overlap_suppression: Option<f64>,
    pub classification_threshold: f64,
    /// Consecutive empty rows that end pending-cell scanning
    pub pending_empty_row_limit: usize,
    /// Name of the backup directory created next to a target workbook
    pub backup_dir_name: String,
    pub patterns: PatternSet,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            empty_streak_limit: DEFAULT_EMPTY_STREAK_LIMIT,
            match_mode: MatchMode::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            overlap_suppression: None,
            classification_threshold: DEFAULT_CLASSIFICATION_THRESHOLD,
            pending_empty_row_limit: DEFAULT_PENDING_EMPTY_ROW_LIMIT,
            backup_dir_name: "Backup".to_owned(),
            patterns: PatternSet::default(),
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Options, RollforwardError> {
        Ok(serde_json::from_str::<Options>(json)?.validated())
    }

    pub fn load(path: &Path) -> Result<Options, RollforwardError> {
        let json = std::fs::read_to_string(path)?;
        Options::from_json(&json)
    }

    /// Resets out-of-range values to their defaults, logging each correction.
    pub fn validated(mut self) -> Options {
        self.empty_streak_limit = validate_streak_limit(self.empty_streak_limit);
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            warn!(value = self.similarity_threshold, "similarity threshold out of range, reset to default");
            self.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        if !(0.0..=1.0).contains(&self.classification_threshold) {
            warn!(value = self.classification_threshold, "classification threshold out of range, reset to default");
            self.classification_threshold = DEFAULT_CLASSIFICATION_THRESHOLD;
        }
        if let Some(fraction) = self.overlap_suppression {
            if !(fraction > 0.0 && fraction <= 1.0) {
                warn!(value = fraction, "overlap fraction out of range, suppression disabled");
                self.overlap_suppression = None;
            }
        }
        if self.pending_empty_row_limit == 0 {
            warn!("pending empty row limit is zero, reset to default");
            self.pending_empty_row_limit = DEFAULT_PENDING_EMPTY_ROW_LIMIT;
        }
        if self.backup_dir_name.trim().is_empty() {
            self.backup_dir_name = Options::default().backup_dir_name;
        }
        self
    }
}

/// Clamps an empty-streak limit to `1..=10`, falling back to the default.
pub fn validate_streak_limit(limit: usize) -> usize {
    if (1..=10).contains(&limit) {
        limit
    } else {
        warn!(limit, default = DEFAULT_EMPTY_STREAK_LIMIT, "empty streak limit out of range, reset to default");
        DEFAULT_EMPTY_STREAK_LIMIT
    }
}

/// Sheet name patterns as written in configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSet {
    /// Names that look like supporting detail sheets
    pub backdata: Vec<String>,
    /// Names of primary statements, never rolled forward
    pub main: Vec<String>,
}

impl Default for PatternSet {
    fn default() -> Self {
        let backdata = [
            r"별도.*",
            r".*백.*데이터.*",
            r".*분석.*",
            r".*명세.*",
            r".*내역.*",
            r".*상세.*",
            r".*조정.*",
            r"backdata|back data",
            r"detail|breakdown",
            r"analysis|schedule",
            r"adjust",
        ];
        let main = [
            r"^BS$",
            r"^PL$",
            r"^CF$",
            r"^재무상태표$",
            r"^손익계산서$",
            r"^현금흐름표$",
            r"^대차대조표$",
            r"^포괄손익계산서$",
        ];
        PatternSet {
            backdata: backdata.iter().map(|it| it.to_string()).collect(),
            main: main.iter().map(|it| it.to_string()).collect(),
        }
    }
}

impl PatternSet {
    pub fn compile(&self) -> Result<CompiledPatterns, RollforwardError> {
        Ok(CompiledPatterns {
            backdata: compile_all(&self.backdata)?,
            main: compile_all(&self.main)?,
        })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|error| ConfigError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    message: error.to_string(),
                })
        })
        .collect()
}

/// Provides the named sheet rules used by backdata classification.
pub trait PatternRules {
    /// True when the sheet is a primary statement.
    fn is_main(&self, sheet_name: &str) -> bool;

    /// The first backdata pattern the name matches.
    fn backdata_match(&self, sheet_name: &str) -> Option<&str>;
}

#[derive(Clone, Debug)]
pub struct CompiledPatterns {
    backdata: Vec<Regex>,
    main: Vec<Regex>,
}

impl PatternRules for CompiledPatterns {
    fn is_main(&self, sheet_name: &str) -> bool {
        self.main.iter().any(|pattern| pattern.is_match(sheet_name))
    }

    fn backdata_match(&self, sheet_name: &str) -> Option<&str> {
        self.backdata
            .iter()
            .find(|pattern| pattern.is_match(sheet_name))
            .map(|pattern| pattern.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_from_empty_json() {
        let options = Options::from_json("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.empty_streak_limit, 2);
        assert_eq!(options.match_mode, MatchMode::Exact);
        assert_eq!(options.overlap_suppression, None);
    }

    #[test]
    fn partial_json() {
        let options = Options::from_json(r#"{"match_mode": "similarity", "similarity_threshold": 0.6}"#).unwrap();
        assert_eq!(options.match_mode, MatchMode::Similarity);
        assert_eq!(options.similarity_threshold, 0.6);
        assert_eq!(options.backup_dir_name, "Backup");
    }

    #[test]
    fn out_of_range_values_reset() {
        let options = Options::from_json(
            r#"{"empty_streak_limit": 0, "similarity_threshold": 1.5, "overlap_suppression": 2.0}"#,
        )
        .unwrap();
        assert_eq!(options.empty_streak_limit, 2);
        assert_eq!(options.similarity_threshold, 0.7);
        assert_eq!(options.overlap_suppression, None);
        assert_eq!(validate_streak_limit(11), 2);
        assert_eq!(validate_streak_limit(10), 10);
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            Options::from_json("{").unwrap_err(),
            RollforwardError::JsonError(_)
        ));
    }

    #[test]
    fn default_patterns() {
        let patterns = PatternSet::default().compile().unwrap();
        assert!(patterns.is_main("BS"));
        assert!(patterns.is_main("bs"));
        assert!(!patterns.is_main("BS detail"));
        assert!(patterns.is_main("현금흐름표"));
        assert!(patterns.backdata_match("매출분석").is_some());
        assert!(patterns.backdata_match("Revenue Detail").is_some());
        assert_eq!(patterns.backdata_match("Cover"), None);
    }

    #[test]
    fn invalid_pattern() {
        let set = PatternSet {
            backdata: vec!["(".to_owned()],
            main: vec![],
        };
        let error = set.compile().unwrap_err();
        assert!(matches!(error, RollforwardError::ConfigError(ConfigError::InvalidPattern { .. })));
    }
}
