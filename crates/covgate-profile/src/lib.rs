//! Coverage correlation: profile parsing, path normalization, summary
//! extraction, and incremental coverage over changed lines.
//!
//! Consumes the line-range text profile written by `go test -coverprofile`
//! and the table printed by `go tool cover -func`.

pub mod correlate;
pub mod paths;
pub mod profile;
pub mod summary;

pub use correlate::{correlate, incremental_coverage, FileIncremental, IncrementalCoverage};
pub use paths::PathNormalizer;
pub use profile::{parse_profile, CoverageProfile, ProfileMode};
pub use summary::extract_total_percent;
