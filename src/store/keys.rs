//! Fixed-width id keys
//!
//! Every sequence id is stored as 16 lowercase hex digits, zero padded, so
//! byte order equals numeric order. This is an on-disk contract.

/// Width of an encoded id
pub const ID_WIDTH: usize = 16;

/// Render an id as its 16-digit key
pub fn encode_id(id: u64) -> String {
    format!("{:016x}", id)
}

/// Parse a 16-digit lowercase hex key back into an id
pub fn parse_id(key: &str) -> Option<u64> {
    let well_formed = key.len() == ID_WIDTH
        && key
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return None;
    }
    u64::from_str_radix(key, 16).ok()
}

/// Parse an id key given as raw bytes
pub fn parse_id_bytes(key: &[u8]) -> Option<u64> {
    std::str::from_utf8(key).ok().and_then(parse_id)
}
