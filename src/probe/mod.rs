// src/probe/mod.rs

//! Strategies for finding out whether a patch layer is installed and at which version.
//!
//! Every strategy answers with a [`ProbeResult`]. Faults inside a strategy (I/O errors, a root
//! shell that cannot be acquired, a kernel interface reporting an error) are folded into
//! [`ProbeResult::ProbeFailed`] at the strategy boundary, so one broken probe can never abort a
//! whole resolution.
//!
//! - [`NativeProbe`]: asks the already-loaded KernelPatch interface directly.
//! - [`ShellProbe`]: runs the helper binary's version flag in a root shell.
//! - [`FsFallbackProbe`]: inspects the installation paths when the shell is inconclusive.

mod fs_fallback;
mod native;
mod shell;

pub use fs_fallback::FsFallbackProbe;
pub use native::{KernelInterface, NativeProbe, SupercallInterface};
pub use shell::ShellProbe;

use crate::version::PackedVersion;
use std::fmt;

/// A version as reported by a probe, before the resolver maps it into a layer's domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reported {
    /// A packed value read from the kernel interface.
    Packed(PackedVersion),
    /// Text scraped from helper output or a version file.
    Raw(String),
}

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reported::Packed(v) => write!(f, "{}", v),
            Reported::Raw(s) => write!(f, "{:?}", s),
        }
    }
}

/// The answer of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// The layer is installed and reported this version.
    Resolved(Reported),
    /// The layer is confirmed absent.
    NotInstalled,
    /// The probe ran but its evidence was not enough to decide.
    Inconclusive(String),
    /// The probe itself broke.
    ProbeFailed(String),
}

/// One way of determining a layer's installed version.
pub trait Probe: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn probe(&self) -> ProbeResult;
}
