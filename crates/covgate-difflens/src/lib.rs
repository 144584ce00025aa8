//! Unified diff analysis for incremental coverage.
//!
//! Turns `git diff` output into the set of new-side line numbers each file
//! gained or modified, and filters out paths that should not count toward
//! incremental coverage.

pub mod filter;
pub mod parser;
