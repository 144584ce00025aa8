use std::path::PathBuf;

/// Errors that can occur while computing coverage for a change.
///
/// Library crates use this type directly; the binary crate converts to
/// `miette::Report` at the boundary, where the `help` hints are shown.
///
/// # Examples
///
/// ```
/// use covgate_core::CovgateError;
///
/// let err = CovgateError::Config("unknown baseline".into());
/// assert!(err.to_string().contains("unknown baseline"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CovgateError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Malformed diff, profile, or summary text.
    #[error("parse error: {0}")]
    Parse(String),

    /// An external command could not be started or failed.
    #[error("command `{command}` failed: {message}")]
    Command {
        /// The command line that was run.
        command: String,
        /// What went wrong.
        message: String,
    },

    /// The test step did not produce a coverage profile.
    #[diagnostic(help("check the test command's output, or pass --profile <file>"))]
    #[error("coverage profile not found: {}", .0.display())]
    MissingProfile(PathBuf),

    /// The coverage profile exists but has no content.
    #[diagnostic(help("check the test command's output, or pass --profile <file>"))]
    #[error("coverage profile is empty: {}", .0.display())]
    EmptyProfile(PathBuf),

    /// The coverage summary has no `total:` row.
    #[diagnostic(help("check the summary command in .covgate.toml, or pass --summary <file>"))]
    #[error("could not find total coverage in summary output")]
    MissingTotal,

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid glob pattern in the path filter.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CovgateError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn missing_profile_shows_path() {
        let err = CovgateError::MissingProfile(PathBuf::from("coverage.out"));
        assert_eq!(err.to_string(), "coverage profile not found: coverage.out");
    }

    #[test]
    fn command_error_names_the_command() {
        let err = CovgateError::Command {
            command: "go tool cover -func=coverage.out".into(),
            message: "exit status 1".into(),
        };
        assert!(err.to_string().starts_with("command `go tool cover"));
        assert!(err.to_string().ends_with("exit status 1"));
    }

    #[test]
    fn bad_glob_converts_to_pattern_error() {
        let err: CovgateError = glob::Pattern::new("[").unwrap_err().into();
        assert!(matches!(err, CovgateError::Pattern(_)));
    }
}
