use std::collections::BTreeSet;
use std::fmt;

use covgate_core::{OutputFormat, Result};

use crate::pipeline::CheckOutcome;

/// Render `outcome` in `format`.
///
/// # Errors
///
/// Returns [`CovgateError::Serialization`](covgate_core::CovgateError::Serialization) if JSON encoding fails.
pub fn render(outcome: &CheckOutcome, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => outcome.to_string(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&JsonReport::from(outcome))?;
            json.push('\n');
            json
        }
        OutputFormat::Markdown => outcome.to_markdown(),
    })
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    passed: bool,
    #[serde(flatten)]
    outcome: &'a CheckOutcome,
}

impl<'a> From<&'a CheckOutcome> for JsonReport<'a> {
    fn from(outcome: &'a CheckOutcome) -> Self {
        Self {
            passed: outcome.passed(),
            outcome,
        }
    }
}

/// Collapse sorted line numbers into `a-b` runs.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use covgate_check::report::line_runs;
///
/// let lines = BTreeSet::from([3, 4, 5, 9, 11, 12]);
/// assert_eq!(line_runs(&lines), "3-5, 9, 11-12");
/// ```
pub fn line_runs(lines: &BTreeSet<u32>) -> String {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &line in lines {
        match runs.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(line) => *end = line,
            _ => runs.push((line, line)),
        }
    }
    runs.iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Absolute Coverage: {:.2}%", self.absolute)?;
        writeln!(f, "Incremental Coverage: {:.2}%", self.incremental.percent)?;
        writeln!(
            f,
            "  {} of {} changed-line hits covered across {} file(s)",
            self.incremental.covered_changed,
            self.incremental.total_changed,
            self.incremental.files.len()
        )?;

        let uncovered: Vec<_> = self
            .incremental
            .files
            .iter()
            .filter(|file| !file.uncovered_lines.is_empty())
            .collect();
        if !uncovered.is_empty() {
            writeln!(f, "\nUncovered changed lines:")?;
            for file in uncovered {
                writeln!(f, "  {}: {}", file.path, line_runs(&file.uncovered_lines))?;
            }
        }

        if !self.change.skipped.is_empty() {
            writeln!(f, "\nSkipped {} file(s) by pattern:", self.change.skipped.len())?;
            for skipped in &self.change.skipped {
                writeln!(f, "  {} ({})", skipped.path, skipped.pattern)?;
            }
        }

        writeln!(f)?;
        if self.passed() {
            writeln!(f, "✅ Coverage health checks passed!")
        } else {
            for check in self.gate.failures() {
                writeln!(f, "❌ {}", check.message())?;
            }
            Ok(())
        }
    }
}

impl CheckOutcome {
    /// Render the outcome as GitHub-flavored markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Coverage Report\n\n");

        match &self.change.baseline {
            Some(baseline) => out.push_str(&format!("**Baseline:** {baseline}\n\n")),
            None => out.push_str("**Baseline:** supplied diff\n\n"),
        }

        out.push_str("| Metric | Coverage | Threshold | Status |\n");
        out.push_str("|--------|----------|-----------|--------|\n");
        for check in self.gate.checks() {
            out.push_str(&format!(
                "| {} | {:.2}% | {}% | {} |\n",
                check.metric,
                check.actual,
                check.threshold,
                if check.passed { "✅" } else { "❌" },
            ));
        }
        out.push('\n');

        if !self.incremental.files.is_empty() {
            out.push_str("| File | Covered | Changed | Uncovered lines |\n");
            out.push_str("|------|---------|---------|-----------------|\n");
            for file in &self.incremental.files {
                out.push_str(&format!(
                    "| `{}` | {} | {} | {} |\n",
                    file.path,
                    file.covered_changed,
                    file.total_changed,
                    line_runs(&file.uncovered_lines),
                ));
            }
            out.push('\n');
        }

        if self.passed() {
            out.push_str("**Result:** passed\n");
        } else {
            out.push_str("**Result:** failed\n\n");
            for check in self.gate.failures() {
                out.push_str(&format!("- {}\n", check.message()));
            }
        }
        out
    }
}
