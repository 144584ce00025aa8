use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use covgate_core::CoverageRange;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `<path>:<line>.<col>,<line>.<col> <numStatements> <execCount>`
static RANGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+):(\d+)\.(\d+),(\d+)\.(\d+)\s+(\d+)\s+(\d+)\s*$")
        .expect("profile line pattern is valid")
});

/// Counter mode declared on the first line of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    /// Each block records whether it ran (count is 0 or 1).
    Set,
    /// Each block records how many times it ran.
    Count,
    /// Like `count`, safe for parallel tests.
    Atomic,
}

impl fmt::Display for ProfileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileMode::Set => write!(f, "set"),
            ProfileMode::Count => write!(f, "count"),
            ProfileMode::Atomic => write!(f, "atomic"),
        }
    }
}

impl FromStr for ProfileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "set" => Ok(ProfileMode::Set),
            "count" => Ok(ProfileMode::Count),
            "atomic" => Ok(ProfileMode::Atomic),
            other => Err(format!("unknown profile mode: {other}")),
        }
    }
}

/// A parsed coverage profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageProfile {
    /// Mode from the header line, when it could be read.
    pub mode: Option<ProfileMode>,
    /// Profiled blocks in file order, unmerged.
    pub ranges: Vec<CoverageRange>,
    /// Body lines that did not match the range format.
    pub skipped_lines: usize,
}

/// Parse line-range profile text.
///
/// The first line is the mode declaration and never yields a range. Body
/// lines that do not match the range format are counted in
/// [`CoverageProfile::skipped_lines`] and otherwise ignored.
///
/// # Examples
///
/// ```
/// use covgate_profile::profile::{parse_profile, ProfileMode};
///
/// let text = "mode: set\n\
///             example.com/app/main.go:5.1,5.10 1 0\n\
///             example.com/app/main.go:7.2,9.3 2 1\n";
/// let profile = parse_profile(text);
/// assert_eq!(profile.mode, Some(ProfileMode::Set));
/// assert_eq!(profile.ranges.len(), 2);
/// assert_eq!(profile.ranges[1].end_line, 9);
/// ```
pub fn parse_profile(text: &str) -> CoverageProfile {
    let mut lines = text.lines();
    let mode = lines.next().and_then(parse_mode_line);

    let mut profile = CoverageProfile {
        mode,
        ..CoverageProfile::default()
    };

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        match parse_range_line(line) {
            Some(range) => profile.ranges.push(range),
            None => profile.skipped_lines += 1,
        }
    }

    if profile.skipped_lines > 0 {
        tracing::debug!(
            skipped = profile.skipped_lines,
            "ignored profile lines that are not coverage ranges"
        );
    }
    profile
}

fn parse_mode_line(line: &str) -> Option<ProfileMode> {
    line.trim().strip_prefix("mode:")?.parse().ok()
}

/// Parse one `<path>:<l>.<c>,<l>.<c> <stmts> <count>` line.
pub fn parse_range_line(line: &str) -> Option<CoverageRange> {
    let caps = RANGE_LINE.captures(line.trim_end())?;
    Some(CoverageRange {
        file: caps[1].to_string(),
        start_line: caps[2].parse().ok()?,
        start_col: caps[3].parse().ok()?,
        end_line: caps[4].parse().ok()?,
        end_col: caps[5].parse().ok()?,
        statements: caps[6].parse().ok()?,
        count: caps[7].parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_is_never_a_range() {
        let text = "example.com/a.go:1.1,2.2 1 1\nexample.com/a.go:3.1,4.2 1 0\n";
        let profile = parse_profile(text);
        assert_eq!(profile.mode, None);
        assert_eq!(profile.ranges.len(), 1);
        assert_eq!(profile.ranges[0].start_line, 3);
    }

    #[test]
    fn header_modes_are_recognised() {
        assert_eq!(parse_profile("mode: count\n").mode, Some(ProfileMode::Count));
        assert_eq!(parse_profile("mode: atomic").mode, Some(ProfileMode::Atomic));
        assert_eq!(parse_profile("mode: bogus\n").mode, None);
    }

    #[test]
    fn range_fields_are_parsed() {
        let range = parse_range_line("github.com/acme/tool/internal/x.go:12.34,15.2 3 27").unwrap();
        assert_eq!(range.file, "github.com/acme/tool/internal/x.go");
        assert_eq!(range.start_line, 12);
        assert_eq!(range.start_col, 34);
        assert_eq!(range.end_line, 15);
        assert_eq!(range.end_col, 2);
        assert_eq!(range.statements, 3);
        assert_eq!(range.count, 27);
    }

    #[test]
    fn path_containing_colon_is_kept_whole() {
        let range = parse_range_line("C:/src/app/main.go:1.1,1.5 1 1").unwrap();
        assert_eq!(range.file, "C:/src/app/main.go");
    }

    #[test]
    fn malformed_lines_are_counted_and_skipped() {
        let text = "mode: set\nnot a range\np.go:1.1,1.2 1 1\np.go:1.1,1.2 one 1\n\n";
        let profile = parse_profile(text);
        assert_eq!(profile.ranges.len(), 1);
        assert_eq!(profile.skipped_lines, 2);
    }

    #[test]
    fn overlapping_ranges_are_not_merged() {
        let text = "mode: set\np.go:5.1,5.10 1 1\np.go:5.1,5.10 1 0\n";
        let profile = parse_profile(text);
        assert_eq!(profile.ranges.len(), 2);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let profile = parse_profile("mode: set\r\np.go:2.1,3.4 2 5\r\n");
        assert_eq!(profile.mode, Some(ProfileMode::Set));
        assert_eq!(profile.ranges[0].count, 5);
    }
}
