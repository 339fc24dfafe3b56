//! Percent-escaping of paths and queries

use crate::error::{Result, ValidationError};

/// Unescape a query string; `+` stands for a space
pub fn unescape_query(raw: &str) -> Result<String> {
    unescape(raw, true)
}

/// Unescape one path segment; `+` is literal
pub fn unescape_path(raw: &str) -> Result<String> {
    unescape(raw, false)
}

/// Escape text for use as one path segment
///
/// Only unreserved characters pass through; everything else, including
/// `/`, is percent-encoded as UTF-8.
pub fn escape_path(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for b in text.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn unescape(raw: &str, plus_is_space: bool) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| hex_value(*b));
                let lo = bytes.get(i + 2).and_then(|b| hex_value(*b));
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(bad_escape(raw));
                };
                out.push(hi << 4 | lo);
                i += 3;
            }
            b'+' if plus_is_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| bad_escape(raw))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn bad_escape(raw: &str) -> crate::error::LarigotError {
    ValidationError::BadInput(format!("invalid escape in {:?}", raw)).into()
}
