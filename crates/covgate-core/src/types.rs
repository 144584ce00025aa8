use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lines added or modified by a change, keyed by root-relative file path.
///
/// Line numbers are 1-indexed positions in the new version of each file.
/// A file can be present with an empty set (it had a `+++` header but only
/// pure-deletion hunks).
///
/// # Examples
///
/// ```
/// use covgate_core::ChangedLines;
///
/// let mut changed = ChangedLines::new();
/// changed.add_range("internal/api.go", 10, 3);
/// assert!(changed.contains("internal/api.go", 12));
/// assert!(!changed.contains("internal/api.go", 13));
/// assert_eq!(changed.total_lines(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedLines {
    files: BTreeMap<String, BTreeSet<u32>>,
}

impl ChangedLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` with no lines if it is not already present.
    pub fn touch_file(&mut self, path: impl Into<String>) {
        self.files.entry(path.into()).or_default();
    }

    /// Add `count` lines starting at `start`. A zero count only registers
    /// the file.
    pub fn add_range(&mut self, path: impl Into<String>, start: u32, count: u32) {
        let lines = self.files.entry(path.into()).or_default();
        lines.extend(start..start.saturating_add(count));
    }

    pub fn insert(&mut self, path: impl Into<String>, line: u32) {
        self.files.entry(path.into()).or_default().insert(line);
    }

    pub fn contains(&self, path: &str, line: u32) -> bool {
        self.files
            .get(path)
            .is_some_and(|lines| lines.contains(&line))
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn lines(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(path)
    }

    /// Iterate files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.files.iter().map(|(path, lines)| (path.as_str(), lines))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of changed lines across all files.
    pub fn total_lines(&self) -> usize {
        self.files.values().map(BTreeSet::len).sum()
    }

    /// `true` when no file has a `+++` header.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Keep only files for which `keep` returns `true`.
    pub fn retain_files(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.files.retain(|path, _| keep(path));
    }
}

/// One profiled block from a line-range coverage profile.
///
/// Ranges are kept exactly as the profile lists them: overlapping ranges for
/// the same file are not merged.
///
/// # Examples
///
/// ```
/// use covgate_core::CoverageRange;
///
/// let range = CoverageRange {
///     file: "internal/api.go".into(),
///     start_line: 5,
///     start_col: 1,
///     end_line: 7,
///     end_col: 10,
///     statements: 2,
///     count: 0,
/// };
/// assert!(!range.is_executed());
/// assert_eq!(range.lines().count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    /// File path as written in the profile (before normalization).
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    /// Number of statements in the block.
    pub statements: u32,
    /// Execution count (0 means not executed).
    pub count: u64,
}

impl CoverageRange {
    pub fn is_executed(&self) -> bool {
        self.count > 0
    }

    /// Every line in `[start_line, end_line]`.
    pub fn lines(&self) -> std::ops::RangeInclusive<u32> {
        self.start_line..=self.end_line
    }
}

/// The comparison point for the diff.
///
/// # Examples
///
/// ```
/// use covgate_core::Baseline;
///
/// let base = Baseline::Revision("origin/main".into());
/// assert_eq!(base.to_string(), "origin/main");
/// assert_eq!(Baseline::WorkingTree.to_string(), "uncommitted changes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "revision")]
pub enum Baseline {
    /// A revision that resolved; the diff is taken from its merge base to HEAD.
    Revision(String),
    /// No candidate resolved; only uncommitted local changes are compared.
    WorkingTree,
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Baseline::Revision(rev) => write!(f, "{rev}"),
            Baseline::WorkingTree => write!(f, "uncommitted changes"),
        }
    }
}

/// Output format for command results.
///
/// # Examples
///
/// ```
/// use covgate_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable status lines.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output, e.g. for CI job summaries.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_range_covers_inclusive_span() {
        let mut changed = ChangedLines::new();
        changed.add_range("p", 10, 3);
        let lines: Vec<u32> = changed.lines("p").unwrap().iter().copied().collect();
        assert_eq!(lines, vec![10, 11, 12]);
    }

    #[test]
    fn zero_count_registers_file_without_lines() {
        let mut changed = ChangedLines::new();
        changed.add_range("gone.go", 4, 0);
        assert!(changed.contains_file("gone.go"));
        assert_eq!(changed.total_lines(), 0);
        assert!(!changed.is_empty());
    }

    #[test]
    fn ranges_for_same_file_accumulate() {
        let mut changed = ChangedLines::new();
        changed.add_range("a.go", 1, 2);
        changed.add_range("a.go", 2, 2);
        changed.add_range("a.go", 20, 1);
        assert_eq!(changed.total_lines(), 4);
        assert!(changed.contains("a.go", 3));
        assert!(changed.contains("a.go", 20));
    }

    #[test]
    fn retain_files_drops_rejected_paths() {
        let mut changed = ChangedLines::new();
        changed.insert("keep.go", 1);
        changed.insert("gen.pb.go", 1);
        changed.retain_files(|p| !p.ends_with(".pb.go"));
        assert_eq!(changed.file_count(), 1);
        assert!(changed.contains_file("keep.go"));
    }

    #[test]
    fn changed_lines_serializes_as_plain_map() {
        let mut changed = ChangedLines::new();
        changed.add_range("a.go", 3, 2);
        let json = serde_json::to_string(&changed).unwrap();
        assert_eq!(json, r#"{"a.go":[3,4]}"#);
    }

    #[test]
    fn single_line_range_has_one_line() {
        let range = CoverageRange {
            file: "p".into(),
            start_line: 5,
            start_col: 1,
            end_line: 5,
            end_col: 10,
            statements: 1,
            count: 3,
        };
        assert!(range.is_executed());
        assert_eq!(range.lines().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn baseline_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Baseline::Revision("main".into())).unwrap();
        assert_eq!(json, r#"{"kind":"revision","revision":"main"}"#);
        let json = serde_json::to_string(&Baseline::WorkingTree).unwrap();
        assert_eq!(json, r#"{"kind":"workingTree"}"#);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }
}
