//! Incremental coverage: intersecting profiled ranges with changed lines.
//!
//! Every range is scanned on its own. A changed line spanned by two
//! overlapping ranges is counted once per range in both counters, matching
//! the raw profile rather than a merged view of it.

use std::collections::{BTreeMap, BTreeSet};

use covgate_core::{ChangedLines, CoverageRange};
use serde::Serialize;

use crate::paths::PathNormalizer;
use crate::profile::{parse_profile, ProfileMode};

/// Result of correlating a profile with a change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalCoverage {
    /// Changed-line hits inside executed ranges.
    pub covered_changed: u64,
    /// Changed-line hits inside any profiled range.
    pub total_changed: u64,
    /// `covered_changed / total_changed * 100`, or 100 when nothing testable changed.
    pub percent: f64,
    /// Files with at least one hit, in path order.
    pub files: Vec<FileIncremental>,
    /// Mode declared by the profile header, if it was read.
    pub mode: Option<ProfileMode>,
    /// Profile body lines that were not coverage ranges.
    pub skipped_profile_lines: usize,
}

impl IncrementalCoverage {
    /// Coverage of a change with nothing testable in it.
    pub fn vacuous() -> Self {
        Self {
            covered_changed: 0,
            total_changed: 0,
            percent: 100.0,
            files: Vec::new(),
            mode: None,
            skipped_profile_lines: 0,
        }
    }

    /// Every uncovered changed line as `(path, line)`, in path order.
    pub fn uncovered(&self) -> impl Iterator<Item = (&str, u32)> {
        self.files.iter().flat_map(|f| {
            f.uncovered_lines
                .iter()
                .map(move |line| (f.path.as_str(), *line))
        })
    }
}

/// Per-file share of [`IncrementalCoverage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIncremental {
    /// Diff-relative path.
    pub path: String,
    pub covered_changed: u64,
    pub total_changed: u64,
    /// Changed lines that only appear in unexecuted ranges.
    pub uncovered_lines: BTreeSet<u32>,
}

impl FileIncremental {
    pub fn percent(&self) -> f64 {
        percent(self.covered_changed, self.total_changed)
    }
}

fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        covered as f64 / total as f64 * 100.0
    }
}

#[derive(Default)]
struct FileTally {
    covered: u64,
    total: u64,
    executed: BTreeSet<u32>,
    unexecuted: BTreeSet<u32>,
}

/// Intersect profiled `ranges` with `changed`.
///
/// Range paths go through `normalizer` before lookup. Ranges whose file is
/// not in the changed map contribute nothing.
///
/// # Examples
///
/// ```
/// use covgate_core::{ChangedLines, CoverageRange};
/// use covgate_profile::{correlate, PathNormalizer};
///
/// let mut changed = ChangedLines::new();
/// changed.insert("p.go", 5);
/// let range = CoverageRange {
///     file: "p.go".into(),
///     start_line: 5,
///     start_col: 1,
///     end_line: 5,
///     end_col: 10,
///     statements: 1,
///     count: 1,
/// };
/// let result = correlate(&[range], &changed, &PathNormalizer::default());
/// assert_eq!(result.percent, 100.0);
/// ```
pub fn correlate(
    ranges: &[CoverageRange],
    changed: &ChangedLines,
    normalizer: &PathNormalizer,
) -> IncrementalCoverage {
    let mut tallies: BTreeMap<&str, FileTally> = BTreeMap::new();

    for range in ranges {
        let path = normalizer.normalize(&range.file);
        let Some(lines) = changed.lines(path) else {
            continue;
        };

        for line in range.lines() {
            if !lines.contains(&line) {
                continue;
            }
            let tally = tallies.entry(path).or_default();
            tally.total += 1;
            if range.is_executed() {
                tally.covered += 1;
                tally.executed.insert(line);
            } else {
                tally.unexecuted.insert(line);
            }
        }
    }

    let files: Vec<FileIncremental> = tallies
        .into_iter()
        .map(|(path, tally)| FileIncremental {
            path: path.to_string(),
            covered_changed: tally.covered,
            total_changed: tally.total,
            uncovered_lines: tally.unexecuted.difference(&tally.executed).copied().collect(),
        })
        .collect();

    let covered_changed = files.iter().map(|f| f.covered_changed).sum();
    let total_changed = files.iter().map(|f| f.total_changed).sum();

    if total_changed == 0 {
        tracing::info!("No testable changed lines detected.");
    }

    IncrementalCoverage {
        covered_changed,
        total_changed,
        percent: percent(covered_changed, total_changed),
        files,
        mode: None,
        skipped_profile_lines: 0,
    }
}

/// Parse `profile_text` and correlate it with `changed`.
///
/// An empty changed map yields exactly 100% without reading the profile.
///
/// # Examples
///
/// ```
/// use covgate_core::ChangedLines;
/// use covgate_profile::{incremental_coverage, PathNormalizer};
///
/// let mut changed = ChangedLines::new();
/// changed.insert("p.go", 5);
///
/// let miss = incremental_coverage("mode: set\np.go:5.1,5.10 1 0\n", &changed, &PathNormalizer::default());
/// assert_eq!(miss.percent, 0.0);
///
/// let hit = incremental_coverage("mode: set\np.go:5.1,5.10 1 1\n", &changed, &PathNormalizer::default());
/// assert_eq!(hit.percent, 100.0);
/// ```
pub fn incremental_coverage(
    profile_text: &str,
    changed: &ChangedLines,
    normalizer: &PathNormalizer,
) -> IncrementalCoverage {
    if changed.is_empty() {
        tracing::info!("No changed lines detected.");
        return IncrementalCoverage::vacuous();
    }

    let profile = parse_profile(profile_text);
    tracing::debug!(
        ranges = profile.ranges.len(),
        files = changed.file_count(),
        "correlating profile with changed lines"
    );

    IncrementalCoverage {
        mode: profile.mode,
        skipped_profile_lines: profile.skipped_lines,
        ..correlate(&profile.ranges, changed, normalizer)
    }
}
