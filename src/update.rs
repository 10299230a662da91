// src/update.rs

//! Interpreting the manager's update-check endpoint.
//!
//! The endpoint answers a plain GET with a single integer version code, possibly preceded by
//! a byte-order mark and padded with whitespace. Fetching the body is left to the caller.

use crate::utils::strip_bom_and_trim;
use log::{debug, error};

/// Outcome of comparing the published version code with the local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCheck {
    /// A strictly newer version is published.
    Available { remote: u32 },
    UpToDate { remote: u32 },
    /// The body did not contain a version code.
    Unparseable,
}

/// Extracts the version code from an endpoint body.
pub fn parse_version_code(body: &str) -> Option<u32> {
    strip_bom_and_trim(body).parse().ok()
}

impl UpdateCheck {
    pub fn evaluate(body: &str, local: u32) -> Self {
        let Some(remote) = parse_version_code(body) else {
            error!("Failed to parse version code from {:?}", body);
            return UpdateCheck::Unparseable;
        };
        debug!("Remote: {}, Local: {}", remote, local);
        if remote > local {
            UpdateCheck::Available { remote }
        } else {
            UpdateCheck::UpToDate { remote }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, UpdateCheck::Available { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_bom_body() {
        assert_eq!(parse_version_code("\u{feff}11040\n"), Some(11040));
        assert_eq!(parse_version_code("  11040  "), Some(11040));
        assert_eq!(parse_version_code("v11040"), None);
        assert_eq!(parse_version_code(""), None);
    }

    #[test]
    fn only_newer_is_available() {
        assert_eq!(
            UpdateCheck::evaluate("11040", 11039),
            UpdateCheck::Available { remote: 11040 }
        );
        assert!(!UpdateCheck::evaluate("11039", 11039).is_available());
        assert!(!UpdateCheck::evaluate("11000", 11039).is_available());
        assert_eq!(
            UpdateCheck::evaluate("<html>", 11039),
            UpdateCheck::Unparseable
        );
    }
}
