// src/state.rs

//! Reducing resolved versions to the state shown for each layer.

use crate::resolver::Resolution;
use crate::version::{ApdVersion, PackedVersion};
use std::fmt;

/// The externally visible state of one patch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState<V> {
    /// The layer's state could not be determined. Offer a retry, never a reinstall.
    Unknown,
    NotInstalled,
    Installed(V),
    NeedsUpdate { installed: V, expected: V },
    /// Up to date, but the new version only takes effect after a reboot.
    NeedsReboot,
    /// An install of this layer is in progress.
    Installing,
}

impl<V> LayerState<V> {
    /// Whether the state should be presented as "try again" rather than as a conclusion.
    pub fn is_actionable_retry(&self) -> bool {
        matches!(self, LayerState::Unknown)
    }
}

impl<V: fmt::Display> fmt::Display for LayerState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerState::Unknown => f.write_str("unknown"),
            LayerState::NotInstalled => f.write_str("not installed"),
            LayerState::Installed(v) => write!(f, "installed ({})", v),
            LayerState::NeedsUpdate {
                installed,
                expected,
            } => write!(f, "needs update ({} -> {})", installed, expected),
            LayerState::NeedsReboot => f.write_str("needs reboot"),
            LayerState::Installing => f.write_str("installing"),
        }
    }
}

/// Per-layer facts the probes cannot see, supplied by whoever drives installs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerFlags {
    /// An update was applied but is not active until reboot.
    pub reboot_pending: bool,
    pub installing: bool,
}

/// Flags for both layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingFlags {
    pub kernel: LayerFlags,
    pub android: LayerFlags,
}

/// Reduces one layer.
///
/// Only a strictly older installed version needs an update; an equal or newer one (for example
/// a dev build) is treated as current. An install in progress overrides every answer except
/// `Unknown`, which always stays a retry.
pub fn reduce_layer<V: Ord + Copy>(
    resolved: Resolution<V>,
    expected: V,
    flags: LayerFlags,
) -> LayerState<V> {
    match resolved {
        Resolution::Unknown => LayerState::Unknown,
        _ if flags.installing => LayerState::Installing,
        Resolution::NotInstalled => LayerState::NotInstalled,
        Resolution::Installed(installed) if installed < expected => LayerState::NeedsUpdate {
            installed,
            expected,
        },
        Resolution::Installed(_) if flags.reboot_pending => LayerState::NeedsReboot,
        Resolution::Installed(installed) => LayerState::Installed(installed),
    }
}

/// Reduces both layers. Each layer is compared only against its own expected version.
pub fn reduce(
    kernel: Resolution<PackedVersion>,
    android: Resolution<ApdVersion>,
    expected_kernel: PackedVersion,
    expected_android: ApdVersion,
    flags: PendingFlags,
) -> (LayerState<PackedVersion>, LayerState<ApdVersion>) {
    (
        reduce_layer(kernel, expected_kernel, flags.kernel),
        reduce_layer(android, expected_android, flags.android),
    )
}
