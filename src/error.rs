// src/error.rs

//! Error types shared across the engine.
//!
//! Probe-level faults are not errors here: they are folded into
//! [`ProbeResult::ProbeFailed`](crate::probe::ProbeResult::ProbeFailed) at the strategy boundary.

use std::path::PathBuf;
use thiserror::Error;

/// A version string or number that cannot be represented as a version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The input is not a well-formed version.
    #[error("malformed version {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },
    /// A component, or a raw packed value, is outside the encodable range.
    #[error("version value {value} out of range (max {max})")]
    Range { value: u64, max: u64 },
}

/// Failure to run a command sequence in a privileged context.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The root context could not be acquired or did not answer in time.
    #[error("privileged context unavailable: {0}")]
    PrivilegeUnavailable(String),
}

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid expected kernel version: {0}")]
    ExpectedKernel(#[from] VersionError),
}
