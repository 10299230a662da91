// src/resolver.rs

//! Running a layer's probes in order and turning the winner into a typed version.
//!
//! Probes run in a fixed fallback order. The first `Resolved` or `NotInstalled` answer ends the
//! chain; `Inconclusive` and `ProbeFailed` fall through to the next probe. If every probe falls
//! through, the layer is `Unknown`, which callers must keep apart from `NotInstalled`.

use crate::error::VersionError;
use crate::probe::{Probe, ProbeResult, Reported};
use crate::utils::first_digit_run;
use crate::version::{ApdVersion, PackedVersion};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One of the two managed patch layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// KernelPatch, living in the boot image.
    Kernel,
    /// AndroidPatch, the userspace `apd` daemon.
    Android,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Kernel => f.write_str("KernelPatch"),
            Layer::Android => f.write_str("AndroidPatch"),
        }
    }
}

/// A version domain a resolver can produce.
///
/// Each layer has its own domain; versions from different layers have different types and can
/// not be compared.
pub trait LayerVersion: Copy + Ord + fmt::Display + Send {
    const LAYER: Layer;

    fn from_reported(reported: &Reported) -> Result<Self, VersionError>;
}

impl LayerVersion for PackedVersion {
    const LAYER: Layer = Layer::Kernel;

    fn from_reported(reported: &Reported) -> Result<Self, VersionError> {
        match reported {
            Reported::Packed(version) => Ok(*version),
            Reported::Raw(s) if s.contains('.') => PackedVersion::parse(s),
            Reported::Raw(s) => {
                // A bare digit run from the kernel side is the packed integer itself.
                let digits = first_digit_run(s).filter(|d| d.len() == s.trim().len());
                let raw = digits
                    .and_then(|d| d.parse::<u32>().ok())
                    .ok_or_else(|| VersionError::Parse {
                        input: s.clone(),
                        reason: "expected a packed version",
                    })?;
                PackedVersion::from_raw(raw)
            }
        }
    }
}

impl LayerVersion for ApdVersion {
    const LAYER: Layer = Layer::Android;

    fn from_reported(reported: &Reported) -> Result<Self, VersionError> {
        match reported {
            Reported::Raw(s) => ApdVersion::parse(s),
            Reported::Packed(version) => Err(VersionError::Parse {
                input: version.to_string(),
                reason: "packed kernel version reported for the android layer",
            }),
        }
    }
}

/// What the resolver concluded about one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<V> {
    /// Every probe was inconclusive or failed, or the resolve was cancelled.
    Unknown,
    /// A probe confirmed the layer is absent.
    NotInstalled,
    Installed(V),
}

/// Cooperative cancellation, checked between probes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An ordered chain of probes for one layer.
pub struct VersionResolver {
    probes: Vec<Box<dyn Probe>>,
}

impl VersionResolver {
    pub fn new(probes: Vec<Box<dyn Probe>>) -> Self {
        Self { probes }
    }

    /// Names of the probes in the order they run.
    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// Runs the chain. A cancelled resolve returns `Unknown`.
    pub fn resolve<V: LayerVersion>(&self, cancel: &CancelToken) -> Resolution<V> {
        for probe in &self.probes {
            if cancel.is_cancelled() {
                info!("{}: resolve cancelled before {} probe", V::LAYER, probe.name());
                return Resolution::Unknown;
            }

            let result = probe.probe();
            debug!("{}: {} probe answered {:?}", V::LAYER, probe.name(), result);

            let resolution = match result {
                ProbeResult::Resolved(reported) => match V::from_reported(&reported) {
                    Ok(version) => Resolution::Installed(version),
                    Err(e) => {
                        warn!(
                            "{}: {} probe reported unusable version {}: {}",
                            V::LAYER,
                            probe.name(),
                            reported,
                            e
                        );
                        continue;
                    }
                },
                ProbeResult::NotInstalled => Resolution::NotInstalled,
                ProbeResult::Inconclusive(reason) => {
                    debug!("{}: {} probe inconclusive: {}", V::LAYER, probe.name(), reason);
                    continue;
                }
                ProbeResult::ProbeFailed(cause) => {
                    warn!("{}: {} probe failed: {}", V::LAYER, probe.name(), cause);
                    continue;
                }
            };

            // A cancel that raced the last probe discards its answer.
            if cancel.is_cancelled() {
                info!("{}: resolve cancelled after {} probe", V::LAYER, probe.name());
                return Resolution::Unknown;
            }
            info!("{}: resolved by {} probe", V::LAYER, probe.name());
            return resolution;
        }

        info!("{}: no probe could decide", V::LAYER);
        Resolution::Unknown
    }
}
