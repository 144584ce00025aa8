//! Baseline selection and diff acquisition.
//!
//! Probes an ordered list of candidate revisions with git2 and picks the
//! first that resolves, then asks `git` for a zero-context diff against it
//! (or against the working tree when nothing resolves).

pub mod diff;
pub mod resolver;
