use glob::Pattern;

/// Criteria for selecting which sheets of a spreadsheet are loaded.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns for filtering which sheets to process.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to read.
    pub sheet_limit: Option<usize>,

    /// Rows beyond this 1-based row number are not loaded.
    pub rows_limit: Option<usize>,
}

impl Criteria {
    /// Criteria selecting exactly the named sheets.
    pub fn sheets<S: AsRef<str>>(names: &[S]) -> Self {
        let patterns = names
            .iter()
            .map(|name| Pattern::new(&Pattern::escape(name.as_ref())))
            .collect::<Result<Vec<_>, _>>()
            .ok();
        Criteria {
            sheet_name_patterns: patterns,
            ..Default::default()
        }
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }

    /// Checks if a row lies beyond the row limit.
    pub fn after_rows_limit(&self, row: usize) -> bool {
        self.rows_limit.map(|limit| row > limit).unwrap_or(false)
    }
}
