use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CovgateError;
use crate::Result;

/// Token in command arguments that is replaced with the profile path.
pub const PROFILE_PLACEHOLDER: &str = "{profile}";

/// Top-level configuration loaded from `.covgate.toml`.
///
/// Every field defaults to the built-in gate settings, so an empty or absent
/// file gives the standard 90% absolute / 95% incremental check.
///
/// # Examples
///
/// ```
/// use covgate_core::CovgateConfig;
///
/// let config = CovgateConfig::default();
/// assert_eq!(config.thresholds.absolute, 90.0);
/// assert_eq!(config.thresholds.incremental, 95.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CovgateConfig {
    /// Pass/fail floors.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Comparison point selection.
    #[serde(default)]
    pub baseline: BaselineConfig,
    /// Coverage profile location and path normalization.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// External commands that produce the profile and its summary.
    #[serde(default)]
    pub commands: CommandConfig,
    /// Paths excluded from incremental coverage.
    #[serde(default)]
    pub filter: FilterConfig,
}

impl CovgateConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Io`] if the file cannot be read, or
    /// [`CovgateError::Toml`] / [`CovgateError::Config`] if the content is
    /// invalid.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Toml`] if parsing fails, or
    /// [`CovgateError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use covgate_core::CovgateConfig;
    ///
    /// let toml = r#"
    /// [thresholds]
    /// incremental = 80.0
    /// "#;
    /// let config = CovgateConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.thresholds.incremental, 80.0);
    /// assert_eq!(config.thresholds.absolute, 90.0);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("thresholds.absolute", self.thresholds.absolute),
            ("thresholds.incremental", self.thresholds.incremental),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(CovgateError::Config(format!(
                    "{name} must be between 0 and 100, got {value}"
                )));
            }
        }
        if self.commands.test.is_empty() {
            return Err(CovgateError::Config("commands.test must not be empty".into()));
        }
        if self.commands.summary.is_empty() {
            return Err(CovgateError::Config(
                "commands.summary must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Minimum coverage percentages, compared with `>=`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Floor for whole-codebase statement coverage (default: 90.0).
    #[serde(default = "default_absolute")]
    pub absolute: f64,
    /// Floor for coverage of changed lines (default: 95.0).
    #[serde(default = "default_incremental")]
    pub incremental: f64,
}

fn default_absolute() -> f64 {
    90.0
}

fn default_incremental() -> f64 {
    95.0
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            absolute: default_absolute(),
            incremental: default_incremental(),
        }
    }
}

/// Ordered baseline candidates; the first one that resolves wins.
///
/// # Examples
///
/// ```
/// use covgate_core::BaselineConfig;
///
/// let config = BaselineConfig::default();
/// assert_eq!(config.candidates, vec!["origin/main", "main", "HEAD~1"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,
}

fn default_candidates() -> Vec<String> {
    vec!["origin/main".into(), "main".into(), "HEAD~1".into()]
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
        }
    }
}

/// Where the coverage profile lives and how its paths are normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile file written by the test command (default: `coverage.out`).
    #[serde(default = "default_profile_path")]
    pub path: PathBuf,
    /// Qualifying prefix stripped from profile paths. Read from `go.mod`
    /// when unset.
    pub module_prefix: Option<String>,
}

fn default_profile_path() -> PathBuf {
    PathBuf::from("coverage.out")
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            path: default_profile_path(),
            module_prefix: None,
        }
    }
}

/// External commands as argument vectors. `{profile}` is substituted with
/// the profile path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default = "default_test_command")]
    pub test: Vec<String>,
    #[serde(default = "default_summary_command")]
    pub summary: Vec<String>,
}

fn default_test_command() -> Vec<String> {
    ["go", "test", "./...", "-coverprofile={profile}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_summary_command() -> Vec<String> {
    ["go", "tool", "cover", "-func={profile}"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            test: default_test_command(),
            summary: default_summary_command(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Glob patterns for changed files that do not count toward
    /// incremental coverage.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}
