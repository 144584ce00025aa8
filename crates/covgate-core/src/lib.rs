//! Core types, configuration, and error handling for covgate.
//!
//! This crate provides the shared foundation used by all other covgate crates:
//! - [`CovgateError`]: unified error type using `thiserror`
//! - [`CovgateConfig`]: configuration loaded from `.covgate.toml`
//! - Shared types: [`ChangedLines`], [`CoverageRange`], [`Baseline`],
//!   [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    BaselineConfig, CommandConfig, CovgateConfig, FilterConfig, ProfileConfig, ThresholdConfig,
    PROFILE_PLACEHOLDER,
};
pub use error::CovgateError;
pub use types::{Baseline, ChangedLines, CoverageRange, OutputFormat};

/// A convenience `Result` type for covgate operations.
pub type Result<T> = std::result::Result<T, CovgateError>;
