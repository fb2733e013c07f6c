use crate::config::MatchMode;
use crate::config::Options;
use crate::table::TableCandidate;
use std::collections::HashSet;
use tracing::debug;
use tracing::info;

pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;
const SUBSTRING_SCORE: f64 = 0.8;

/// A source column paired with a destination column.
///
/// Borrows the tables it was built from; matches never outlive detection.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderMatch<'a> {
    /// Current-period table
    pub source_table: &'a TableCandidate,
    /// Prior-period table
    pub destination_table: &'a TableCandidate,
    pub source_header: &'a str,
    pub destination_header: &'a str,
    pub confidence: f64,
}

/// Pairs headers by exact string equality, with no trimming or case folding.
///
/// Iterates destination tables, then source tables, then source headers.
pub fn match_exact<'a>(
    sources: &'a [TableCandidate],
    destinations: &'a [TableCandidate],
) -> Vec<HeaderMatch<'a>> {
    let mut matches = Vec::new();
    for destination in destinations {
        for source in sources {
            for header in &source.headers {
                if let Some(destination_header) = destination.headers.iter().find(|it| *it == header) {
                    matches.push(HeaderMatch {
                        source_table: source,
                        destination_table: destination,
                        source_header: header,
                        destination_header,
                        confidence: EXACT_MATCH_CONFIDENCE,
                    });
                }
            }
        }
    }
    matches
}

/// Scores two header names in `[0, 1]`.
///
/// Names are compared trimmed and lower-cased: equal names score 1.0, a name
/// contained in the other 0.8, otherwise the shared word count over the larger
/// word count.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return SUBSTRING_SCORE;
    }
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / words_a.len().max(words_b.len()) as f64
}

/// Pairs each destination header with its best-scoring source header.
///
/// The best source header is searched across every source table; the first
/// one wins a tie. Scores below `threshold` produce no match.
pub fn match_similar<'a>(
    sources: &'a [TableCandidate],
    destinations: &'a [TableCandidate],
    threshold: f64,
) -> Vec<HeaderMatch<'a>> {
    let mut matches = Vec::new();
    for destination in destinations {
        for destination_header in &destination.headers {
            let mut best: Option<(&TableCandidate, &String, f64)> = None;
            for source in sources {
                for source_header in &source.headers {
                    let score = similarity(source_header, destination_header);
                    if best.map(|(_, _, best_score)| score > best_score).unwrap_or(true) {
                        best = Some((source, source_header, score));
                    }
                }
            }
            if let Some((source, source_header, score)) = best.filter(|(_, _, score)| *score >= threshold) {
                matches.push(HeaderMatch {
                    source_table: source,
                    destination_table: destination,
                    source_header,
                    destination_header,
                    confidence: score,
                });
            }
        }
    }
    matches
}

/// Matches headers with the configured mode.
pub fn match_headers<'a>(
    sources: &'a [TableCandidate],
    destinations: &'a [TableCandidate],
    options: &Options,
) -> Vec<HeaderMatch<'a>> {
    let matches = match options.match_mode {
        MatchMode::Exact => match_exact(sources, destinations),
        MatchMode::Similarity => match_similar(sources, destinations, options.similarity_threshold),
    };
    if matches.is_empty() {
        debug!(sources = sources.len(), destinations = destinations.len(), "no header matched");
    } else {
        info!(mode = ?options.match_mode, matches = matches.len(), "headers matched");
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::candidate;
    use pretty_assertions::assert_eq;

    #[test]
    fn exact_symmetry() {
        let sources = vec![candidate("Current", &["Date", "Revenue"])];
        let destinations = vec![candidate("Prior", &["Revenue", "Cost"])];
        let matches = match_exact(&sources, &destinations);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_header, "Revenue");
        assert_eq!(matches[0].destination_header, "Revenue");
        assert_eq!(matches[0].confidence, 1.0);
        assert_eq!(matches[0].source_table.sheet_name, "Current");
        assert_eq!(matches[0].destination_table.sheet_name, "Prior");
    }

    #[test]
    fn no_false_matches() {
        let sources = vec![candidate("Current", &["A", "B"])];
        let destinations = vec![candidate("Prior", &["C", "D"])];
        assert!(match_exact(&sources, &destinations).is_empty());
    }

    #[test]
    fn exact_is_case_and_space_sensitive() {
        let sources = vec![candidate("Current", &["revenue", "Cost "])];
        let destinations = vec![candidate("Prior", &["Revenue", "Cost"])];
        assert!(match_exact(&sources, &destinations).is_empty());
    }

    #[test]
    fn exact_iteration_order() {
        let sources = vec![candidate("S1", &["B", "A"]), candidate("S2", &["A"])];
        let destinations = vec![candidate("D1", &["A"]), candidate("D2", &["A", "B"])];
        let pairs: Vec<(&str, &str, &str)> = match_exact(&sources, &destinations)
            .iter()
            .map(|it| {
                (
                    it.destination_table.sheet_name.as_str(),
                    it.source_table.sheet_name.as_str(),
                    it.source_header,
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("D1", "S1", "A"),
                ("D1", "S2", "A"),
                ("D2", "S1", "B"),
                ("D2", "S1", "A"),
                ("D2", "S2", "A"),
            ]
        );
    }

    #[test]
    fn similarity_scores() {
        assert_eq!(similarity(" Revenue ", "revenue"), 1.0);
        assert_eq!(similarity("Net Revenue", "revenue"), 0.8);
        assert_eq!(similarity("total cost amount", "cost total"), 2.0 / 3.0);
        assert_eq!(similarity("alpha", "beta"), 0.0);
        assert_eq!(similarity("", "beta"), 0.0);
    }

    #[test]
    fn similar_keeps_best_above_threshold() {
        let sources = vec![
            candidate("S1", &["Customer Name", "Amt"]),
            candidate("S2", &["Name", "Amount Due"]),
        ];
        let destinations = vec![candidate("Prior", &["name", "Amount", "Memo"])];
        let matches = match_similar(&sources, &destinations, 0.7);
        let pairs: Vec<(&str, &str, &str, f64)> = matches
            .iter()
            .map(|it| {
                (
                    it.destination_header,
                    it.source_table.sheet_name.as_str(),
                    it.source_header,
                    it.confidence,
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![("name", "S2", "Name", 1.0), ("Amount", "S2", "Amount Due", 0.8)]
        );
    }

    #[test]
    fn similar_tie_goes_to_first_source() {
        let sources = vec![candidate("S1", &["Gross Amount"]), candidate("S2", &["Net Amount"])];
        let destinations = vec![candidate("Prior", &["Amount"])];
        let matches = match_similar(&sources, &destinations, 0.7);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_table.sheet_name, "S1");
    }

    #[test]
    fn mode_selection() {
        let sources = vec![candidate("Current", &["Net Revenue"])];
        let destinations = vec![candidate("Prior", &["Revenue"])];
        assert!(match_headers(&sources, &destinations, &Options::default()).is_empty());
        let options = Options {
            match_mode: MatchMode::Similarity,
            ..Default::default()
        };
        assert_eq!(match_headers(&sources, &destinations, &options).len(), 1);
    }
}
