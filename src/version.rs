// src/version.rs

//! Version representations for the two patch layers.
//!
//! The kernel layer exchanges versions with the kernel as a packed 24-bit integer,
//! `(major << 16) | (minor << 8) | patch`, so `0.9.0` is `0x000900`. Because the major
//! component is the most significant byte, plain integer comparison orders versions correctly.
//!
//! The android layer's helper binary reports a plain integer version code instead. The two
//! are kept as separate types so they can never be compared with each other.

use crate::error::VersionError;
use std::fmt;
use std::str::FromStr;

/// Largest value a single packed component can hold.
const COMPONENT_MAX: u32 = 0xff;
/// Largest value a packed version can hold.
const PACKED_MAX: u32 = 0xff_ffff;

/// A KernelPatch version packed into 24 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackedVersion(u32);

impl PackedVersion {
    /// Packs three components. Fails if any component is above 255.
    pub fn encode(major: u32, minor: u32, patch: u32) -> Result<Self, VersionError> {
        for component in [major, minor, patch] {
            check_component(component.into())?;
        }
        Ok(Self((major << 16) | (minor << 8) | patch))
    }

    /// Splits the packed value back into `(major, minor, patch)`.
    pub fn decode(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & COMPONENT_MAX) as u8,
            ((self.0 >> 8) & COMPONENT_MAX) as u8,
            (self.0 & COMPONENT_MAX) as u8,
        )
    }

    /// Wraps a raw integer reported by the kernel interface.
    pub fn from_raw(raw: u32) -> Result<Self, VersionError> {
        if raw > PACKED_MAX {
            return Err(VersionError::Range {
                value: raw.into(),
                max: PACKED_MAX.into(),
            });
        }
        Ok(Self(raw))
    }

    /// The packed integer.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Parses `major.minor.patch`, optionally followed by a `-suffix` which is discarded.
    ///
    /// Components after the third are ignored, so `1.2.3.4` is `1.2.3`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parse_err = |reason| VersionError::Parse {
            input: s.to_string(),
            reason,
        };

        let prefix = s.trim().split('-').next().unwrap_or_default();
        let parts: Vec<&str> = prefix.split('.').collect();
        if parts.len() < 3 {
            return Err(parse_err("expected major.minor.patch"));
        }

        let mut components = [0u32; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(parse_err("non-numeric component"));
            }
            // All digits, so the only possible failure is overflow, which is a range problem.
            let value = part.parse::<u64>().unwrap_or(u64::MAX);
            check_component(value)?;
            *slot = value as u32;
        }
        let [major, minor, patch] = components;
        Self::encode(major, minor, patch)
    }

    /// Formats as `major.minor.patch` without padding.
    pub fn format(self) -> String {
        self.to_string()
    }
}

fn check_component(value: u64) -> Result<(), VersionError> {
    if value > COMPONENT_MAX.into() {
        return Err(VersionError::Range {
            value,
            max: COMPONENT_MAX.into(),
        });
    }
    Ok(())
}

impl fmt::Display for PackedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor, patch) = self.decode();
        write!(f, "{}.{}.{}", major, minor, patch)
    }
}

impl FromStr for PackedVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The version code reported by the AndroidPatch helper binary (e.g. `11039`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApdVersion(pub u32);

impl ApdVersion {
    /// Parses a bare run of decimal digits.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VersionError::Parse {
                input: s.to_string(),
                reason: "expected a decimal version code",
            });
        }
        s.parse::<u32>().map(Self).map_err(|_| VersionError::Range {
            value: u64::MAX,
            max: u32::MAX.into(),
        })
    }
}

impl fmt::Display for ApdVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
