//! The check pipeline.
//!
//! Baseline resolution feeds the diff, the diff feeds the changed-line map,
//! and the profile text is passed in memory from the runner to the
//! correlator. Every external command runs at most once.

use std::path::{Path, PathBuf};

use covgate_baseline::diff::load_diff;
use covgate_baseline::resolver::{require_revision, resolve_baseline, GitProbe};
use covgate_core::{Baseline, ChangedLines, CovgateConfig, Result};
use covgate_difflens::filter::{PathFilter, SkippedFile};
use covgate_difflens::parser::parse_changed_lines;
use covgate_profile::{extract_total_percent, incremental_coverage, IncrementalCoverage, PathNormalizer};
use serde::Serialize;

use crate::gate::{evaluate, GateResult, Thresholds};
use crate::runner::{read_profile, CommandRunner};

/// Where the diff comes from.
#[derive(Debug, Clone)]
pub enum DiffSource {
    /// Ask git, against `base` or the first resolving configured candidate.
    Git { base: Option<String> },
    /// Unified diff stored in a file.
    File(PathBuf),
    /// Unified diff already in memory.
    Text(String),
}

/// Where the coverage summary comes from.
#[derive(Debug, Clone)]
pub enum SummarySource {
    /// Run the configured summary command.
    Command,
    /// Summary table stored in a file.
    File(PathBuf),
}

/// Everything a single check needs.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Directory commands run in and relative paths resolve against.
    pub workdir: PathBuf,
    pub config: CovgateConfig,
    pub diff: DiffSource,
    pub summary: SummarySource,
    /// Run the test command before reading the profile.
    pub run_tests: bool,
    pub show_progress: bool,
}

impl CheckOptions {
    /// Options that run everything the way a CI job would.
    pub fn new(workdir: impl Into<PathBuf>, config: CovgateConfig) -> Self {
        Self {
            workdir: workdir.into(),
            config,
            diff: DiffSource::Git { base: None },
            summary: SummarySource::Command,
            run_tests: true,
            show_progress: false,
        }
    }

    fn profile_path(&self) -> PathBuf {
        self.workdir.join(&self.config.profile.path)
    }
}

/// The changed-line map for one check, after path filtering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// `None` when the diff was supplied rather than computed.
    pub baseline: Option<Baseline>,
    pub lines: ChangedLines,
    pub skipped: Vec<SkippedFile>,
}

/// Resolve the diff for `source` and turn it into a filtered [`Change`].
///
/// Outside a git repository, and without an explicit base, no candidate can
/// resolve: the baseline is the working tree and the change is empty.
///
/// # Errors
///
/// Returns an error if an explicit base cannot be resolved, git cannot be
/// started, the diff is malformed, or a skip pattern is invalid.
pub fn load_change(
    source: &DiffSource,
    workdir: &Path,
    config: &CovgateConfig,
) -> Result<Change> {
    let filter = PathFilter::from_config(&config.filter)?;

    let (baseline, diff) = match source {
        DiffSource::Git { base } => {
            let probe = match (GitProbe::discover(workdir), base) {
                (Ok(probe), _) => probe,
                (Err(err), Some(_)) => return Err(err),
                (Err(err), None) => {
                    tracing::debug!(error = %err, "no repository at {}", workdir.display());
                    tracing::warn!("No base commit found for diff. Checking all local changes.");
                    return Ok(Change {
                        baseline: Some(Baseline::WorkingTree),
                        lines: ChangedLines::new(),
                        skipped: Vec::new(),
                    });
                }
            };
            let baseline = match base {
                Some(rev) => require_revision(rev, &probe)?,
                None => resolve_baseline(&config.baseline.candidates, &probe),
            };
            let root = probe.workdir().unwrap_or_else(|| workdir.to_path_buf());
            let diff = load_diff(&root, &baseline)?;
            (Some(baseline), diff)
        }
        DiffSource::File(path) => (None, std::fs::read_to_string(workdir.join(path))?),
        DiffSource::Text(text) => (None, text.clone()),
    };

    let mut lines = parse_changed_lines(&diff)?;
    let skipped = filter.apply(&mut lines);

    Ok(Change {
        baseline,
        lines,
        skipped,
    })
}

/// Result of a full check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub absolute: f64,
    pub incremental: IncrementalCoverage,
    pub change: Change,
    pub gate: GateResult,
    /// Module prefix stripped from profile paths, if any.
    pub module_prefix: Option<String>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.gate.passed()
    }
}

/// Run the whole check described by `options`.
///
/// Threshold misses are part of a successful outcome; only missing or
/// unusable inputs are errors.
///
/// # Errors
///
/// Returns a missing-profile, empty-profile or missing-total error when coverage data is unusable, and
/// propagates diff, git, and command failures.
pub fn run_check(options: &CheckOptions) -> Result<CheckOutcome> {
    let config = &options.config;
    let change = load_change(&options.diff, &options.workdir, config)?;

    let runner = CommandRunner::new(&options.workdir, config.commands.clone())
        .with_progress(options.show_progress);
    if options.run_tests {
        runner.run_tests(&config.profile.path)?;
    }
    let profile = read_profile(&options.profile_path())?;

    let summary = match &options.summary {
        SummarySource::Command => runner.run_summary(&config.profile.path)?,
        SummarySource::File(path) => std::fs::read_to_string(options.workdir.join(path))?,
    };
    let absolute = extract_total_percent(&summary)?;

    let normalizer =
        PathNormalizer::resolve(config.profile.module_prefix.as_deref(), &options.workdir)?;
    let incremental = incremental_coverage(&profile, &change.lines, &normalizer);

    let gate = evaluate(
        absolute,
        incremental.percent,
        &Thresholds::from(&config.thresholds),
    );

    Ok(CheckOutcome {
        absolute,
        incremental,
        change,
        gate,
        module_prefix: normalizer.prefix().map(str::to_string),
    })
}
