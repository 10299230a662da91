// src/lib.rs

//! Patch state and version resolution for the KernelPatch and AndroidPatch layers.
//!
//! ```ascii
//!                 +------------------+
//!                 |   state::reduce  |  <- expected versions, pending flags (Config)
//!                 +--------^---------+
//!                          |
//!                 +--------+---------+
//!                 |  VersionResolver |  one chain per layer, first decisive answer wins
//!                 +--------^---------+
//!          +---------------+------------------+
//!   +------+------+  +------+------+  +--------+--------+
//!   | NativeProbe |  | ShellProbe  |  | FsFallbackProbe |
//!   | (supercall) |  | (`apd -V`)  |  | (paths, files)  |
//!   +-------------+  +------+------+  +-----------------+
//!                           |
//!                  +--------+--------+
//!                  | PrivilegedExec. |  `su`, bounded by a timeout
//!                  +-----------------+
//! ```
//!
//! The kernel layer is read through the KernelPatch supercall interface only. The android
//! layer asks the `apd` binary first and falls back to the filesystem. Probing is synchronous
//! and blocking; run it off any interactive thread. The two layers may be resolved in parallel.

pub mod config;
pub mod constants;
pub mod error;
pub mod executor;
pub mod probe;
pub mod resolver;
pub mod state;
pub mod update;
pub mod utils;
pub mod version;

use crate::config::Config;
use crate::error::VersionError;
use crate::executor::{PrivilegedExecutor, SuExecutor};
use crate::probe::{FsFallbackProbe, KernelInterface, NativeProbe, ShellProbe, SupercallInterface};
use crate::resolver::{CancelToken, Layer, Resolution, VersionResolver};
use crate::state::LayerState;
use crate::version::{ApdVersion, PackedVersion};
use log::info;
use std::fmt;
use std::sync::Arc;
use std::thread;

/// The state of one layer, tagged with the layer it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    Kernel(LayerState<PackedVersion>),
    Android(LayerState<ApdVersion>),
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerStatus::Kernel(state) => write!(f, "{}: {}", Layer::Kernel, state),
            LayerStatus::Android(state) => write!(f, "{}: {}", Layer::Android, state),
        }
    }
}

/// Both layers' states from one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchState {
    pub kernel: LayerState<PackedVersion>,
    pub android: LayerState<ApdVersion>,
}

/// Wires the probes, resolver and reducer together for one configuration.
pub struct Engine {
    config: Config,
    expected_kernel: PackedVersion,
    kernel: Arc<dyn KernelInterface>,
    executor: Arc<dyn PrivilegedExecutor>,
}

impl Engine {
    /// Builds an engine talking to the real kernel interface and `su`.
    pub fn new(config: Config) -> Result<Self, VersionError> {
        let expected_kernel = config.expected_kernel_version()?;
        let kernel = Arc::new(SupercallInterface::new(&config.superkey, expected_kernel));
        let executor = Arc::new(SuExecutor::new(&config.su_path, config.exec_timeout()));
        Self::with_backends(config, kernel, executor)
    }

    /// Builds an engine over the given kernel interface and executor.
    pub fn with_backends(
        config: Config,
        kernel: Arc<dyn KernelInterface>,
        executor: Arc<dyn PrivilegedExecutor>,
    ) -> Result<Self, VersionError> {
        let expected_kernel = config.expected_kernel_version()?;
        Ok(Self {
            config,
            expected_kernel,
            kernel,
            executor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The kernel layer's probe chain.
    pub fn kernel_resolver(&self) -> VersionResolver {
        VersionResolver::new(vec![Box::new(NativeProbe::new(self.kernel.clone()))])
    }

    /// The android layer's probe chain.
    pub fn android_resolver(&self) -> VersionResolver {
        VersionResolver::new(vec![
            Box::new(ShellProbe::new(
                self.executor.clone(),
                &self.config.apd_path,
            )),
            Box::new(FsFallbackProbe::new(
                &self.config.apd_path,
                &self.config.version_file,
                &self.config.install_dir,
            )),
        ])
    }

    pub fn resolve_kernel(&self, cancel: &CancelToken) -> Resolution<PackedVersion> {
        self.kernel_resolver().resolve(cancel)
    }

    pub fn resolve_android(&self, cancel: &CancelToken) -> Resolution<ApdVersion> {
        self.android_resolver().resolve(cancel)
    }

    /// Resolves and reduces a single layer.
    pub fn resolve(&self, layer: Layer, cancel: &CancelToken) -> LayerStatus {
        let flags = self.config.pending_flags();
        match layer {
            Layer::Kernel => LayerStatus::Kernel(state::reduce_layer(
                self.resolve_kernel(cancel),
                self.expected_kernel,
                flags.kernel,
            )),
            Layer::Android => LayerStatus::Android(state::reduce_layer(
                self.resolve_android(cancel),
                self.config.expected_android_version(),
                flags.android,
            )),
        }
    }

    /// Resolves both layers in parallel and reduces them.
    pub fn current_state(&self, cancel: &CancelToken) -> PatchState {
        let (kernel, android) = thread::scope(|s| {
            let kernel = s.spawn(|| self.resolve_kernel(cancel));
            let android = self.resolve_android(cancel);
            // A panicking probe thread counts as "could not determine".
            (kernel.join().unwrap_or(Resolution::Unknown), android)
        });
        let (kernel, android) = state::reduce(
            kernel,
            android,
            self.expected_kernel,
            self.config.expected_android_version(),
            self.config.pending_flags(),
        );
        info!(
            "Current state: {}, {}",
            LayerStatus::Kernel(kernel),
            LayerStatus::Android(android)
        );
        PatchState { kernel, android }
    }

    /// The build time of the loaded KernelPatch image, if it can be read.
    pub fn kernel_build_time(&self) -> Option<String> {
        let time = self.kernel.build_time();
        if time.starts_with(constants::NATIVE_ERROR_PREFIX) {
            None
        } else {
            Some(time)
        }
    }
}
