// src/probe/fs_fallback.rs

//! Inferring installation state from well-known paths.
//!
//! Used after the shell probe came back inconclusive or failed. The checks run in order and the
//! first match wins:
//!
//! 1. binary present, version file readable with a digit run: that digit run;
//! 2. binary present, no usable version file: `"1"`;
//! 3. binary absent, installation directory present: `"1"`;
//! 4. neither present: not installed.
//!
//! The `"1"` answers are a deliberate low-confidence positive meaning "installed, version
//! unknown". They compare below any real version code, so a caller expecting a real version
//! sees the layer as needing an update rather than as missing.

use super::{Probe, ProbeResult, Reported};
use crate::constants::INSTALLED_UNKNOWN_VERSION;
use crate::utils::{first_digit_run, read_optional};
use log::{debug, info, warn};
use rustix::fs::FileType;
use rustix::io::Errno;
use std::path::{Path, PathBuf};

pub struct FsFallbackProbe {
    binary: PathBuf,
    version_file: PathBuf,
    install_dir: PathBuf,
}

impl FsFallbackProbe {
    pub fn new(
        binary: impl Into<PathBuf>,
        version_file: impl Into<PathBuf>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            version_file: version_file.into(),
            install_dir: install_dir.into(),
        }
    }

    /// Reads the version file, returning its first digit run if it has one.
    fn version_from_file(&self) -> Option<String> {
        match read_optional(&self.version_file) {
            Ok(Some(text)) => {
                let text = text.trim();
                info!("Version file {} reads {:?}", self.version_file.display(), text);
                first_digit_run(text).map(str::to_string)
            }
            Ok(None) => {
                debug!("No version file at {}", self.version_file.display());
                None
            }
            Err(e) => {
                warn!(
                    "Version file {} unreadable: {}",
                    self.version_file.display(),
                    e
                );
                None
            }
        }
    }
}

/// Returns the file type at `path`, or `None` if nothing is there.
fn file_type(path: &Path) -> Result<Option<FileType>, Errno> {
    match rustix::fs::stat(path) {
        Ok(st) => Ok(Some(FileType::from_raw_mode(st.st_mode as _))),
        Err(Errno::NOENT) | Err(Errno::NOTDIR) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Probe for FsFallbackProbe {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn probe(&self) -> ProbeResult {
        match file_type(&self.binary) {
            Ok(Some(_)) => {
                if let Some(version) = self.version_from_file() {
                    info!("{} present, version {} from file", self.binary.display(), version);
                    return ProbeResult::Resolved(Reported::Raw(version));
                }
                info!(
                    "{} present but version unknown, treating as installed",
                    self.binary.display()
                );
                return ProbeResult::Resolved(Reported::Raw(INSTALLED_UNKNOWN_VERSION.to_string()));
            }
            Ok(None) => debug!("{} absent", self.binary.display()),
            Err(e) => {
                warn!("Cannot stat {}: {}", self.binary.display(), e);
                return ProbeResult::ProbeFailed(format!(
                    "stat {}: {}",
                    self.binary.display(),
                    e
                ));
            }
        }

        match file_type(&self.install_dir) {
            Ok(Some(FileType::Directory)) => {
                info!(
                    "{} exists without binary, treating as partial installation",
                    self.install_dir.display()
                );
                ProbeResult::Resolved(Reported::Raw(INSTALLED_UNKNOWN_VERSION.to_string()))
            }
            Ok(_) => {
                info!("No installation detected");
                ProbeResult::NotInstalled
            }
            Err(e) => {
                warn!("Cannot stat {}: {}", self.install_dir.display(), e);
                ProbeResult::ProbeFailed(format!(
                    "stat {}: {}",
                    self.install_dir.display(),
                    e
                ))
            }
        }
    }
}
