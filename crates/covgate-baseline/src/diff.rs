use std::path::Path;
use std::process::Command;

use covgate_core::{Baseline, CovgateError, Result};

/// Arguments for `git diff` against `baseline`, with zero context lines.
///
/// A revision baseline compares its merge base with `HEAD`
/// (`<base>...HEAD`); the working-tree fallback lists uncommitted changes.
///
/// # Examples
///
/// ```
/// use covgate_baseline::diff::diff_args;
/// use covgate_core::Baseline;
///
/// assert_eq!(
///     diff_args(&Baseline::Revision("main".into())),
///     vec!["diff", "-U0", "main...HEAD"]
/// );
/// assert_eq!(diff_args(&Baseline::WorkingTree), vec!["diff", "-U0"]);
/// ```
pub fn diff_args(baseline: &Baseline) -> Vec<String> {
    let mut args = vec!["diff".to_string(), "-U0".to_string()];
    if let Baseline::Revision(rev) = baseline {
        args.push(format!("{rev}...HEAD"));
    }
    args
}

/// Run `git diff` in `repo_root` and return its output.
///
/// A failing `git diff` (for example no merge base in a shallow clone) is
/// logged and yields an empty diff, which counts as no changed lines.
///
/// # Errors
///
/// Returns [`CovgateError::Command`] if git cannot be started.
pub fn load_diff(repo_root: &Path, baseline: &Baseline) -> Result<String> {
    let args = diff_args(baseline);
    let cmdline = format!("git {}", args.join(" "));
    tracing::debug!(command = %cmdline, root = %repo_root.display(), "loading diff");

    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(&args)
        .output()
        .map_err(|e| CovgateError::Command {
            command: cmdline.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            command = %cmdline,
            status = %output.status,
            "{}; treating the change as empty",
            stderr.trim()
        );
        return Ok(String::new());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
