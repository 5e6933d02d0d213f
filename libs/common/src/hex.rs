//! Hex payload utilities
//!
//! Register payloads are stored as uppercase hex strings. Input is accepted in
//! either case and normalized with [`normalize_upper`].

/// True iff `s` is non-empty and every character is an ASCII hex digit
///
/// Whitespace, signs and `0x` prefixes are all rejected.
pub fn is_valid_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Uppercase a hex string without otherwise changing it
pub fn normalize_upper(s: &str) -> String {
    s.to_ascii_uppercase()
}

/// Decode a hex string into bytes
///
/// Returns `None` for odd length or any non-hex character.
pub fn decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    s.as_bytes()
        .chunks_exact(2)
        .map(|pair| Some((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

#[inline]
fn nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
