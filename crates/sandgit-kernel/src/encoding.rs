//! Base64 helpers for storage content.
//!
//! Device storage plugins hand file content back as base64 text, except
//! for the plugins that hand back plain text. These helpers tell the two
//! apart and convert between stored text and bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// True when `s` is canonical, padded standard base64.
///
/// Canonical means decoding and re-encoding reproduces `s` exactly, so
/// whitespace, missing padding and non-zero trailing bits all fail. The
/// empty string counts as base64.
pub fn is_base64(s: &str) -> bool {
    match STANDARD.decode(s) {
        Ok(bytes) => STANDARD.encode(bytes) == s,
        Err(_) => false,
    }
}

/// Decode stored content to text: base64 is decoded, anything else
/// passes through untouched.
///
/// Content that looks like base64 but does not decode to UTF-8 (`"abcd"`,
/// say) is treated as plain text.
pub fn raw_text(s: &str) -> String {
    if is_base64(s)
        && let Ok(bytes) = STANDARD.decode(s)
        && let Ok(text) = String::from_utf8(bytes)
    {
        return text;
    }
    s.to_string()
}

/// Encode `s` unless it already is base64. Empty input stays empty.
pub fn always_base64(s: &str) -> String {
    if s.is_empty() || is_base64(s) {
        s.to_string()
    } else {
        STANDARD.encode(s)
    }
}

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_to_bytes(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(s)
}
