//! Path filtering for changed files that should not count toward
//! incremental coverage (generated code, mocks, fixtures).

use covgate_core::{ChangedLines, FilterConfig, Result};

/// Glob-based skip list applied to a [`ChangedLines`] map.
///
/// # Examples
///
/// ```
/// use covgate_core::ChangedLines;
/// use covgate_difflens::filter::PathFilter;
///
/// let filter = PathFilter::new(&["*.pb.go".to_string()]).unwrap();
/// assert!(filter.should_skip("api/v1/service.pb.go"));
/// assert!(!filter.should_skip("api/v1/service.go"));
/// ```
#[derive(Debug, Default)]
pub struct PathFilter {
    skip_patterns: Vec<glob::Pattern>,
}

impl PathFilter {
    /// Compile `patterns` into a filter.
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Pattern`](covgate_core::CovgateError::Pattern) if any pattern is not a valid glob.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let skip_patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { skip_patterns })
    }

    /// Create a filter from the `[filter]` configuration section.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(&config.skip_patterns)
    }

    pub fn is_empty(&self) -> bool {
        self.skip_patterns.is_empty()
    }

    /// Check if a single file path matches any skip pattern.
    pub fn should_skip(&self, path: &str) -> bool {
        self.matching_pattern(path).is_some()
    }

    fn matching_pattern(&self, path: &str) -> Option<&glob::Pattern> {
        self.skip_patterns.iter().find(|pat| pat.matches(path))
    }

    /// Remove skipped files from `changed`, returning what was removed and why.
    ///
    /// # Examples
    ///
    /// ```
    /// use covgate_core::ChangedLines;
    /// use covgate_difflens::filter::PathFilter;
    ///
    /// let mut changed = ChangedLines::new();
    /// changed.insert("internal/mocks/store.go", 3);
    /// changed.insert("internal/store.go", 3);
    ///
    /// let filter = PathFilter::new(&["**/mocks/*".to_string()]).unwrap();
    /// let skipped = filter.apply(&mut changed);
    /// assert_eq!(skipped.len(), 1);
    /// assert!(changed.contains_file("internal/store.go"));
    /// ```
    pub fn apply(&self, changed: &mut ChangedLines) -> Vec<SkippedFile> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut skipped = Vec::new();
        for (path, _) in changed.iter() {
            if let Some(pat) = self.matching_pattern(path) {
                skipped.push(SkippedFile {
                    path: path.to_string(),
                    pattern: pat.to_string(),
                });
            }
        }

        changed.retain_files(|path| !self.should_skip(path));
        for file in &skipped {
            tracing::debug!(path = %file.path, pattern = %file.pattern, "skipping changed file");
        }
        skipped
    }
}

/// A changed file excluded by a skip pattern.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedFile {
    pub path: String,
    /// The pattern that matched.
    pub pattern: String,
}
