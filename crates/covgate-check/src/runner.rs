//! External tool invocation: the test command that writes the profile and
//! the summary command that reports whole-codebase coverage.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use covgate_core::{CommandConfig, CovgateError, Result, PROFILE_PLACEHOLDER};

/// Replace every `{profile}` in `args` with `profile`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use covgate_check::runner::substitute_profile;
///
/// let args = vec!["go".to_string(), "test".into(), "-coverprofile={profile}".into()];
/// let out = substitute_profile(&args, Path::new("cover.out"));
/// assert_eq!(out, vec!["go", "test", "-coverprofile=cover.out"]);
/// ```
pub fn substitute_profile(args: &[String], profile: &Path) -> Vec<String> {
    let profile = profile.to_string_lossy();
    args.iter()
        .map(|arg| arg.replace(PROFILE_PLACEHOLDER, &profile))
        .collect()
}

/// Runs the configured commands from a working directory.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    workdir: PathBuf,
    commands: CommandConfig,
    show_progress: bool,
}

impl CommandRunner {
    pub fn new(workdir: impl Into<PathBuf>, commands: CommandConfig) -> Self {
        Self {
            workdir: workdir.into(),
            commands,
            show_progress: false,
        }
    }

    /// Show a spinner on stderr while the test command runs.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the test command so it writes `profile`.
    ///
    /// A failing exit status is logged and otherwise ignored: test runners
    /// can exit non-zero after writing a usable profile. Whether the profile
    /// is usable is decided by [`read_profile`].
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Command`] if the command cannot be started.
    pub fn run_tests(&self, profile: &Path) -> Result<()> {
        tracing::info!("Running tests and generating coverage profile...");

        let spinner = self.show_progress.then(|| {
            let pb = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
                pb.set_style(style);
            }
            pb.set_message("Running tests...");
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        let result = self.run(&self.commands.test, profile);

        if let Some(pb) = spinner {
            match &result {
                Ok(_) => pb.finish_and_clear(),
                Err(_) => pb.finish_with_message("Failed"),
            }
        }

        let (cmdline, output) = result?;
        if !output.status.success() {
            tracing::warn!(
                command = %cmdline,
                status = %output.status,
                "test command failed; continuing with whatever profile it wrote"
            );
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(last) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                tracing::debug!("{last}");
            }
        }
        Ok(())
    }

    /// Run the summary command over `profile` and return its stdout.
    ///
    /// # Errors
    ///
    /// Returns [`CovgateError::Command`] if the command cannot be started
    /// or exits with a failure status.
    pub fn run_summary(&self, profile: &Path) -> Result<String> {
        let (cmdline, output) = self.run(&self.commands.summary, profile)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CovgateError::Command {
                command: cmdline,
                message: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run(&self, template: &[String], profile: &Path) -> Result<(String, Output)> {
        let args = substitute_profile(template, profile);
        let cmdline = args.join(" ");
        let (program, rest) = args.split_first().ok_or_else(|| {
            CovgateError::Config("command must name a program".into())
        })?;

        tracing::debug!(command = %cmdline, workdir = %self.workdir.display(), "running");
        let output = Command::new(program)
            .args(rest)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| CovgateError::Command {
                command: cmdline.clone(),
                message: e.to_string(),
            })?;
        Ok((cmdline, output))
    }
}

/// Read the profile into memory, rejecting a missing or empty file.
///
/// # Errors
///
/// Returns [`CovgateError::MissingProfile`] or [`CovgateError::EmptyProfile`],
/// or [`CovgateError::Io`] if the file cannot be read.
pub fn read_profile(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CovgateError::MissingProfile(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Err(CovgateError::EmptyProfile(path.to_path_buf()));
    }
    Ok(content)
}
