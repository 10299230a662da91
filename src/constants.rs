// src/constants.rs

//! Defines build-time versions, well-known on-device paths, and logging defaults.

use konst::primitive::parse_u32;
use konst::unwrap_ctx;
use log::LevelFilter;

// --- Versioning Constants ---
// Set at compile time from environment variables, with the versions this tree ships as fallback.

/// The KernelPatch version bundled with the manager, in dotted form (e.g. `0.11.1` or `0.11.1-dev`).
pub const BUILD_KPV: &str = match option_env!("APSTATE_BUILD_KPV") {
    Some(v) => v,
    None => "0.11.1",
};

/// The manager's own version code. The bundled `apd` reports the same code from `apd -V`.
pub const MANAGER_VERSION_CODE: u32 = unwrap_ctx!(parse_u32(match option_env!(
    "APSTATE_VERSION_CODE"
) {
    Some(v) => v,
    None => "11039",
}));

/// The version of this tool.
pub const APSTATE_VERSION: &str = env!("CARGO_PKG_VERSION");

// --- Well-known Paths ---

/// The AndroidPatch helper binary.
pub const APD_PATH: &str = "/data/adb/apd";
/// The AndroidPatch installation directory.
pub const APATCH_FOLDER: &str = "/data/adb/ap/";
/// The version file written next to the helper binary on install.
pub const APATCH_VERSION_PATH: &str = "/data/adb/ap/version";
/// The binary used to acquire a root shell.
pub const SU_PATH: &str = "su";

// --- Probe Constants ---

/// Flag passed to a helper binary to make it print its version code.
pub const VERSION_FLAG: &str = "-V";
/// Low-confidence "installed, version unknown" marker returned by the filesystem fallback.
pub const INSTALLED_UNKNOWN_VERSION: &str = "1";
/// Prefix the native interface uses to report a failed read instead of a value.
pub const NATIVE_ERROR_PREFIX: &str = "ERROR_";
/// Default wall-clock bound for acquiring a root shell and running a command sequence.
pub const DEFAULT_EXEC_TIMEOUT_MS: u64 = 10_000;

// --- Configuration Constants ---

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_ENV: &str = "APSTATE_CONFIG";

/// The maximum log level. `Trace` for debug builds and `Info` for release builds.
#[cfg(debug_assertions)]
pub const MAX_LOG_LEVEL: LevelFilter = LevelFilter::Trace;
#[cfg(not(debug_assertions))]
pub const MAX_LOG_LEVEL: LevelFilter = LevelFilter::Info;
