use crate::config::validate_streak_limit;
use crate::spreadsheet::cell::is_blank;
use crate::spreadsheet::Worksheet;

/// Hard cap on rows scanned below a header row.
pub const MAX_SCAN_ROWS: usize = 1000;

/// Measures the data extent of a table below `header_row`.
///
/// Only columns `1..=headers.len()` are inspected. Scanning stops after
/// `empty_streak_limit` consecutive blank rows or [`MAX_SCAN_ROWS`] rows.
/// A limit outside `1..=10` is reset to 2. Cell read errors count as blank.
///
/// Returns `(actual_max_row, max_col)`; `actual_max_row == header_row` when
/// no data row exists.
pub fn calculate_dimensions(
    sheet: &dyn Worksheet,
    header_row: usize,
    headers: &[String],
    empty_streak_limit: usize,
) -> (usize, usize) {
    let max_col = headers.len();
    let rows = data_rows(sheet, header_row, max_col, empty_streak_limit);
    (rows.last().copied().unwrap_or(header_row), max_col)
}

/// Non-blank rows below `header_row`, in order, under the same scan rules as
/// [`calculate_dimensions`].
pub fn data_rows(sheet: &dyn Worksheet, header_row: usize, max_col: usize, empty_streak_limit: usize) -> Vec<usize> {
    let limit = validate_streak_limit(empty_streak_limit);
    let mut rows = Vec::new();
    let mut streak = 0usize;
    for row in header_row + 1..=header_row + MAX_SCAN_ROWS {
        let filled = (1..=max_col).any(|col| !is_blank(sheet.cell(row, col).ok().flatten()));
        if filled {
            rows.push(row);
            streak = 0;
        } else {
            streak += 1;
            if streak >= limit {
                break;
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::Sheet;

    fn headers() -> Vec<String> {
        vec!["ID".into(), "Name".into(), "Amount".into()]
    }

    #[test]
    fn stops_after_blank_streak() {
        let sheet = Sheet::from_rows(
            "Detail",
            &[
                &["ID", "Name", "Amount"],
                &["1", "a", "10"],
                &["2", "b", "20"],
                &["", "", ""],
                &["", "", ""],
                &["3", "c", "30"],
            ],
        );
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 2), (3, 3));
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 3), (6, 3));
    }

    #[test]
    fn single_gap_is_bridged() {
        let sheet = Sheet::from_rows("Detail", &[&["ID"], &["1"], &[""], &["2"], &[""], &[""], &["9"]]);
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 2), (4, 3));
        assert_eq!(data_rows(&sheet, 1, 3, 2), vec![2, 4]);
    }

    #[test]
    fn only_header_columns_are_checked() {
        let sheet = Sheet::from_rows("Detail", &[&["ID", "Name"], &["", "", "outside"], &["", "", "outside"]]);
        let headers = vec!["ID".to_string(), "Name".to_string()];
        assert_eq!(calculate_dimensions(&sheet, 1, &headers, 2), (1, 2));
    }

    #[test]
    fn whitespace_counts_as_blank() {
        let sheet = Sheet::from_rows("Detail", &[&["ID"], &["   "], &["  "], &["1"]]);
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 2), (1, 3));
    }

    #[test]
    fn invalid_limit_resets_to_default() {
        let sheet = Sheet::from_rows("Detail", &[&["ID"], &["1"], &[""], &["2"], &[""], &[""], &["3"]]);
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 0), (4, 3));
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 42), (4, 3));
    }

    #[test]
    fn idempotent() {
        let sheet = Sheet::from_rows("Detail", &[&["ID"], &["1"], &["2"]]);
        let first = calculate_dimensions(&sheet, 1, &headers(), 2);
        assert_eq!(first, calculate_dimensions(&sheet, 1, &headers(), 2));
    }

    #[test]
    fn streak_termination_ignores_data_further_down() {
        for k in 1..6usize {
            for limit in 1..=4usize {
                let mut sheet = Sheet::new("", "Detail");
                for row in 2..=1 + k {
                    sheet.push(crate::spreadsheet::cell::Cell::number(row, 1, row as f64));
                }
                sheet.push(crate::spreadsheet::cell::Cell::text(1 + k + limit + 1, 2, "far below"));
                assert_eq!(calculate_dimensions(&sheet, 1, &headers(), limit).0, 1 + k);
            }
        }
    }

    #[test]
    fn bounded_scan() {
        let mut sheet = Sheet::new("", "Detail");
        for row in 2..=1500 {
            sheet.push(crate::spreadsheet::cell::Cell::number(row, 1, 1.0));
        }
        assert_eq!(calculate_dimensions(&sheet, 1, &headers(), 2), (1001, 3));
    }
}
