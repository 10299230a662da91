// src/config.rs

//! The explicit context passed to the engine: paths, credentials, timeouts and expectations.
//!
//! Every field has a default, so a config file only needs to name what differs. Example:
//!
//! ```toml
//! superkey = "my-super-key"
//! exec_timeout_ms = 5000
//! android_reboot_pending = true
//! ```

use crate::constants::{
    APATCH_FOLDER, APATCH_VERSION_PATH, APD_PATH, BUILD_KPV, CONFIG_ENV, DEFAULT_EXEC_TIMEOUT_MS,
    MANAGER_VERSION_CODE, SU_PATH,
};
use crate::error::{ConfigError, VersionError};
use crate::state::{LayerFlags, PendingFlags};
use crate::version::{ApdVersion, PackedVersion};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Binary used to acquire a root shell.
    pub su_path: PathBuf,
    /// The AndroidPatch helper binary.
    pub apd_path: PathBuf,
    pub version_file: PathBuf,
    pub install_dir: PathBuf,
    /// Authenticates KernelPatch supercalls. Empty disables the native probe.
    pub superkey: String,
    pub exec_timeout_ms: u64,
    /// The KernelPatch version this manager ships, dotted.
    pub expected_kernel: String,
    /// The AndroidPatch version code this manager ships.
    pub expected_android: u32,
    pub kernel_reboot_pending: bool,
    pub android_reboot_pending: bool,
    pub android_installing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            su_path: PathBuf::from(SU_PATH),
            apd_path: PathBuf::from(APD_PATH),
            version_file: PathBuf::from(APATCH_VERSION_PATH),
            install_dir: PathBuf::from(APATCH_FOLDER),
            superkey: String::new(),
            exec_timeout_ms: DEFAULT_EXEC_TIMEOUT_MS,
            expected_kernel: BUILD_KPV.to_string(),
            expected_android: MANAGER_VERSION_CODE,
            kernel_reboot_pending: false,
            android_reboot_pending: false,
            android_installing: false,
        }
    }
}

// Hand-written so the superkey never ends up in a log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("su_path", &self.su_path)
            .field("apd_path", &self.apd_path)
            .field("version_file", &self.version_file)
            .field("install_dir", &self.install_dir)
            .field("superkey", &if self.superkey.is_empty() { "" } else { "<redacted>" })
            .field("exec_timeout_ms", &self.exec_timeout_ms)
            .field("expected_kernel", &self.expected_kernel)
            .field("expected_android", &self.expected_android)
            .field("kernel_reboot_pending", &self.kernel_reboot_pending)
            .field("android_reboot_pending", &self.android_reboot_pending)
            .field("android_installing", &self.android_installing)
            .finish()
    }
}

impl Config {
    /// Loads a TOML config file. The expected kernel version is validated eagerly.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.expected_kernel_version()?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Loads the file named by `APSTATE_CONFIG`, or falls back to the defaults.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_millis(self.exec_timeout_ms)
    }

    pub fn expected_kernel_version(&self) -> Result<PackedVersion, VersionError> {
        PackedVersion::parse(&self.expected_kernel)
    }

    pub fn expected_android_version(&self) -> ApdVersion {
        ApdVersion(self.expected_android)
    }

    pub fn pending_flags(&self) -> PendingFlags {
        PendingFlags {
            kernel: LayerFlags {
                reboot_pending: self.kernel_reboot_pending,
                installing: false,
            },
            android: LayerFlags {
                reboot_pending: self.android_reboot_pending,
                installing: self.android_installing,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.apd_path, PathBuf::from("/data/adb/apd"));
        assert_eq!(config.exec_timeout(), Duration::from_secs(10));
        assert!(config.expected_kernel_version().is_ok());
        assert_eq!(config.pending_flags(), PendingFlags::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apstate.toml");
        fs::write(
            &path,
            "superkey = \"k\"\nexpected_kernel = \"0.12.0-dev\"\nandroid_installing = true\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.superkey, "k");
        assert_eq!(config.su_path, PathBuf::from(SU_PATH));
        assert_eq!(
            config.expected_kernel_version().unwrap(),
            PackedVersion::parse("0.12.0").unwrap()
        );
        assert!(config.pending_flags().android.installing);
        assert!(!format!("{:?}", config).contains("\"k\""));
    }

    #[test]
    fn bad_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.toml");
        fs::write(&path, "exec_timeout_ms = \"soon\"").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "expected_kernel = \"1.2\"").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ExpectedKernel(_))
        ));
    }
}
