// src/utils.rs

//! Small text helpers shared by the probes and the update check.
//!
//! This module provides helpers for:
//! - Extracting version codes from free-form helper output.
//! - Normalizing short text payloads (BOM and whitespace).
//! - Quoting words for a POSIX shell command line.

use std::fs;
use std::io;
use std::path::Path;

/// Byte-order mark some servers and editors prepend to UTF-8 text.
const BOM: char = '\u{feff}';

/// Returns the first maximal run of ASCII decimal digits in `text`, if any.
///
/// `"apd 11039\n"` yields `"11039"`, `"v0.11.1"` yields `"0"`.
pub fn first_digit_run(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

/// Removes every byte-order mark and surrounding whitespace.
pub fn strip_bom_and_trim(text: &str) -> String {
    text.replace(BOM, "").trim().to_string()
}

/// Quotes `word` so a POSIX shell reads it back as one literal word.
pub fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Reads a small text file, mapping "not found" to `Ok(None)`.
pub fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_run_extraction() {
        assert_eq!(first_digit_run("apd 11039\n"), Some("11039"));
        assert_eq!(first_digit_run("11039"), Some("11039"));
        assert_eq!(first_digit_run("[10762, 2]"), Some("10762"));
        assert_eq!(first_digit_run("v0.11.1"), Some("0"));
        assert_eq!(first_digit_run("no digits here"), None);
        assert_eq!(first_digit_run(""), None);
        // Non-ASCII digits do not count.
        assert_eq!(first_digit_run("١٢٣ 42"), Some("42"));
    }

    #[test]
    fn bom_and_whitespace() {
        assert_eq!(strip_bom_and_trim("\u{feff} 11040 \r\n"), "11040");
        assert_eq!(strip_bom_and_trim("11040"), "11040");
    }

    #[test]
    fn quoting() {
        assert_eq!(shell_quote("/data/adb/apd"), "'/data/adb/apd'");
        assert_eq!(shell_quote("a b;c"), "'a b;c'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn optional_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version");
        assert_eq!(read_optional(&path).unwrap(), None);
        fs::write(&path, "11039\n").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("11039\n"));
    }
}
