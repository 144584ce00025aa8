use std::path::{Path, PathBuf};

use covgate_core::{Baseline, CovgateError, Result};
use git2::Repository;

/// Something that can tell whether a revision name resolves to a commit.
///
/// A failed probe is a clean miss, never an error.
pub trait RevisionProbe {
    fn resolves(&self, revision: &str) -> bool;
}

/// [`RevisionProbe`] backed by a git2 repository handle.
pub struct GitProbe {
    repo: Repository,
}

impl GitProbe {
    /// Discover the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Git`] if `path` is not inside a git repository.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use covgate_baseline::resolver::{GitProbe, RevisionProbe};
    ///
    /// let probe = GitProbe::discover(Path::new(".")).unwrap();
    /// println!("HEAD resolves: {}", probe.resolves("HEAD"));
    /// ```
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            CovgateError::Git(format!(
                "failed to find git repository at {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self { repo })
    }

    /// Root of the working tree, where `git diff` paths are relative to.
    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }
}

impl RevisionProbe for GitProbe {
    fn resolves(&self, revision: &str) -> bool {
        self.repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_commit())
            .is_ok()
    }
}

/// Pick the first candidate that resolves, in order.
///
/// Returns [`Baseline::WorkingTree`] when none resolve; the caller then
/// diffs uncommitted changes only.
///
/// # Examples
///
/// ```
/// use covgate_baseline::resolver::{resolve_baseline, RevisionProbe};
/// use covgate_core::Baseline;
///
/// struct Known(&'static [&'static str]);
/// impl RevisionProbe for Known {
///     fn resolves(&self, rev: &str) -> bool {
///         self.0.contains(&rev)
///     }
/// }
///
/// let candidates = vec!["origin/main".to_string(), "main".to_string()];
/// let base = resolve_baseline(&candidates, &Known(&["main"]));
/// assert_eq!(base, Baseline::Revision("main".into()));
/// ```
pub fn resolve_baseline<P: RevisionProbe + ?Sized>(candidates: &[String], probe: &P) -> Baseline {
    for candidate in candidates {
        if probe.resolves(candidate) {
            tracing::info!("Comparing against base: {candidate}");
            return Baseline::Revision(candidate.clone());
        }
        tracing::debug!(candidate = %candidate, "baseline candidate does not resolve");
    }

    tracing::warn!("No base commit found for diff. Checking all local changes.");
    Baseline::WorkingTree
}

/// Use `revision` as the baseline, failing if it does not resolve.
///
/// # Errors
///
/// Returns [`CovgateError::Config`] when `revision` is unknown.
pub fn require_revision<P: RevisionProbe + ?Sized>(
    revision: &str,
    probe: &P,
) -> Result<Baseline> {
    if probe.resolves(revision) {
        tracing::info!("Comparing against base: {revision}");
        Ok(Baseline::Revision(revision.to_string()))
    } else {
        Err(CovgateError::Config(format!(
            "base revision '{revision}' does not resolve to a commit"
        )))
    }
}
