use std::sync::LazyLock;

use covgate_core::{CovgateError, Result};
use regex::Regex;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+)%").expect("percent pattern is valid"));

const TOTAL_MARKER: &str = "total:";

/// Extract whole-codebase coverage from a `go tool cover -func` table.
///
/// Reads the last row containing `total:` and returns its `NN.NN%` value.
///
/// # Errors
///
/// Returns [`CovgateError::MissingTotal`] when no row contains `total:`,
/// and [`CovgateError::Parse`] when that row carries no percentage.
///
/// # Examples
///
/// ```
/// use covgate_profile::extract_total_percent;
///
/// let summary = "\
/// github.com/acme/app/main.go:12:\tmain\t\t100.0%
/// total:\t\t\t\t(statements)\t87.65%
/// ";
/// assert_eq!(extract_total_percent(summary).unwrap(), 87.65);
/// ```
pub fn extract_total_percent(summary: &str) -> Result<f64> {
    let row = summary
        .lines()
        .rev()
        .find(|line| line.contains(TOTAL_MARKER))
        .ok_or(CovgateError::MissingTotal)?;

    let caps = PERCENT.captures(row).ok_or_else(|| {
        CovgateError::Parse(format!("no percentage in summary total row: {}", row.trim()))
    })?;

    caps[1]
        .parse()
        .map_err(|e| CovgateError::Parse(format!("bad total percentage '{}': {e}", &caps[1])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_total_row() {
        assert_eq!(
            extract_total_percent("total: (statements) 87.65%").unwrap(),
            87.65
        );
    }

    #[test]
    fn ignores_per_function_percentages() {
        let summary = "\
pkg/a.go:3:\tAlpha\t\t12.50%
pkg/b.go:9:\tBeta\t\t0.00%
total:\t\t\t(statements)\t91.30%
";
        assert_eq!(extract_total_percent(summary).unwrap(), 91.3);
    }

    #[test]
    fn last_total_row_wins() {
        let summary = "pkg/total.go:1:\ttotal:\t50.00%\ntotal: (statements) 75.00%\n";
        assert_eq!(extract_total_percent(summary).unwrap(), 75.0);
    }

    #[test]
    fn missing_total_row_is_fatal() {
        let err = extract_total_percent("pkg/a.go:3:\tAlpha\t12.50%\n").unwrap_err();
        assert!(matches!(err, CovgateError::MissingTotal));

        let err = extract_total_percent("").unwrap_err();
        assert!(matches!(err, CovgateError::MissingTotal));
    }

    #[test]
    fn total_row_without_percentage_is_a_parse_error() {
        let err = extract_total_percent("total: (statements) n/a\n").unwrap_err();
        assert!(matches!(err, CovgateError::Parse(_)));
    }

    #[test]
    fn full_coverage_parses() {
        assert_eq!(
            extract_total_percent("total:\t(statements)\t100.0%").unwrap(),
            100.0
        );
    }
}
