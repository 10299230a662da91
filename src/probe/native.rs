// src/probe/native.rs

//! Reading the KernelPatch version straight from the kernel.
//!
//! KernelPatch exposes its state through a "supercall": a hooked syscall number that only
//! answers callers presenting the configured superkey. This module provides safe wrappers
//! around the two supercalls the engine needs, and the probe built on top of them.

use super::{Probe, ProbeResult, Reported};
use crate::constants::NATIVE_ERROR_PREFIX;
use crate::version::PackedVersion;
use log::{debug, info, warn};
use std::ffi::CString;
use std::sync::Arc;

// --- KernelPatch Supercall Interface Constants ---

/// The syscall number KernelPatch hooks for supercalls.
#[cfg_attr(
    not(all(target_os = "android", target_pointer_width = "64")),
    allow(dead_code)
)]
const NR_SUPERCALL: libc::c_long = 45;
/// Magic carried in bits 16..32 of every supercall command word.
const SUPERCALL_MAGIC: i64 = 0x1158;
/// Supercall to read the compile time of the running KernelPatch image.
const SUPERCALL_BUILD_TIME: i64 = 0x1007;
/// Supercall to read the packed KernelPatch version.
const SUPERCALL_KERNELPATCH_VER: i64 = 0x1008;
/// Size of the buffer handed to the kernel for the build-time string.
const BUILD_TIME_LEN: usize = 64;

/// Builds a supercall command word: caller version in the upper half, magic and command below.
fn ver_and_cmd(caller: PackedVersion, cmd: i64) -> i64 {
    (i64::from(caller.raw()) << 32) | (SUPERCALL_MAGIC << 16) | (cmd & 0xffff)
}

/// Access to an already-loaded privileged kernel interface.
pub trait KernelInterface: Send + Sync {
    /// The raw packed version, or a negative errno.
    fn version(&self) -> i64;

    /// The build timestamp of the loaded image. Failures are reported in-band with an
    /// `ERROR_` prefix.
    fn build_time(&self) -> String;
}

/// The real KernelPatch interface, authenticated with a superkey.
pub struct SupercallInterface {
    superkey: Option<CString>,
    caller: PackedVersion,
}

impl SupercallInterface {
    /// `caller` is the KernelPatch version this tool was built against.
    ///
    /// An empty superkey, or one containing NUL, leaves the interface unauthenticated and every
    /// call fails.
    pub fn new(superkey: &str, caller: PackedVersion) -> Self {
        let superkey = if superkey.is_empty() {
            None
        } else {
            CString::new(superkey).ok()
        };
        Self { superkey, caller }
    }

    #[cfg(all(target_os = "android", target_pointer_width = "64"))]
    fn supercall(&self, cmd: i64, buf: Option<&mut [u8]>) -> i64 {
        let Some(key) = self.superkey.as_ref() else {
            return -i64::from(libc::EINVAL);
        };
        let word = ver_and_cmd(self.caller, cmd);
        // Safety: `syscall` is FFI. The key is a valid NUL-terminated string that outlives the
        // call, and the optional buffer pointer/length pair describes writable memory we own.
        let ret = unsafe {
            match buf {
                Some(buf) => libc::syscall(
                    NR_SUPERCALL,
                    key.as_ptr(),
                    word as libc::c_long,
                    buf.as_mut_ptr(),
                    buf.len() as libc::c_long,
                ),
                None => libc::syscall(NR_SUPERCALL, key.as_ptr(), word as libc::c_long),
            }
        };
        if ret < 0 {
            let errno = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO);
            return -i64::from(errno);
        }
        ret as i64
    }

    #[cfg(not(all(target_os = "android", target_pointer_width = "64")))]
    fn supercall(&self, cmd: i64, _buf: Option<&mut [u8]>) -> i64 {
        debug!(
            "Supercall {:#x} unavailable on this platform (key set: {}, caller {})",
            ver_and_cmd(self.caller, cmd),
            self.superkey.is_some(),
            self.caller
        );
        -i64::from(libc::ENOSYS)
    }
}

impl KernelInterface for SupercallInterface {
    fn version(&self) -> i64 {
        self.supercall(SUPERCALL_KERNELPATCH_VER, None)
    }

    fn build_time(&self) -> String {
        let mut buf = [0u8; BUILD_TIME_LEN];
        let ret = self.supercall(SUPERCALL_BUILD_TIME, Some(&mut buf));
        if ret < 0 {
            return format!("{}{}", NATIVE_ERROR_PREFIX, -ret);
        }
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..len]).into_owned()
    }
}

/// Probes the kernel layer through a [`KernelInterface`].
pub struct NativeProbe {
    kernel: Arc<dyn KernelInterface>,
}

impl NativeProbe {
    pub fn new(kernel: Arc<dyn KernelInterface>) -> Self {
        Self { kernel }
    }
}

impl Probe for NativeProbe {
    fn name(&self) -> &'static str {
        "native"
    }

    fn probe(&self) -> ProbeResult {
        debug!("Querying KernelPatch supercall interface");
        let build_time = self.kernel.build_time();
        if build_time.starts_with(NATIVE_ERROR_PREFIX) {
            warn!("KernelPatch build time unreadable: {}", build_time);
            return ProbeResult::ProbeFailed(format!("kernel interface reported {}", build_time));
        }

        let raw = self.kernel.version();
        if raw < 0 {
            warn!("KernelPatch version supercall failed with errno {}", -raw);
            return ProbeResult::ProbeFailed(format!("supercall failed with errno {}", -raw));
        }
        if raw == 0 {
            return ProbeResult::Inconclusive("kernel interface reported version 0".to_string());
        }

        let version = u32::try_from(raw)
            .ok()
            .and_then(|r| PackedVersion::from_raw(r).ok());
        match version {
            Some(version) => {
                info!("KernelPatch {} (built {})", version, build_time);
                ProbeResult::Resolved(Reported::Packed(version))
            }
            None => {
                warn!("KernelPatch version {:#x} does not fit 24 bits", raw);
                ProbeResult::ProbeFailed(format!("raw version {:#x} out of range", raw))
            }
        }
    }
}
