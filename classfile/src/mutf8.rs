//! Modified UTF-8, as used by `CONSTANT_Utf8` entries (JVMS §4.4.7).
//!
//! It differs from standard UTF-8 in two ways: the NUL codepoint is written
//! as the overlong pair `C0 80`, and supplementary characters are written as
//! two three-byte encoded surrogates instead of one four-byte sequence.
//!
//! Java strings may hold unpaired surrogates, and compilers write them out
//! as-is. Those can't be represented in a Rust `String`, so each one decodes
//! to U+FFFD.

use crate::{ClassError, ClassResult};
use std::borrow::Cow;

/// Decodes a modified UTF-8 byte string. Strings that are already plain UTF-8
/// (the overwhelming majority) are borrowed rather than copied.
pub fn parse_mutf8(bytes: &[u8]) -> ClassResult<Cow<'_, str>> {
    decode_at(bytes, 0)
}

/// Like [`parse_mutf8`], but reports error offsets relative to `base`.
pub(crate) fn decode_at(bytes: &[u8], base: usize) -> ClassResult<Cow<'_, str>> {
    if !bytes.iter().any(|&b| b == 0 || b >= 0xf0) {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok(Cow::Borrowed(text));
        }
    }

    decode_slow(bytes, base).map(Cow::Owned)
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}

fn decode_slow(bytes: &[u8], base: usize) -> ClassResult<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut pos = 0;

    let invalid = |at: usize| ClassError::InvalidModifiedUtf8 {
        offset: base + at,
        byte: bytes.get(at).copied().unwrap_or(0),
    };
    let cont = |at: usize| match bytes.get(at) {
        Some(&b) if is_continuation(b) => Ok(b as u32 & 0x3f),
        _ => Err(invalid(at)),
    };

    while pos < bytes.len() {
        let b1 = bytes[pos];

        if b1 == 0 || b1 >= 0xf0 {
            return Err(invalid(pos));
        }

        if b1 & 0x80 == 0 {
            // 0xxxxxxx
            out.push(b1 as char);
            pos += 1;
        } else if b1 & 0xe0 == 0xc0 {
            // 110xxxxx 10xxxxxx, including the overlong NUL
            let scalar = ((b1 as u32 & 0x1f) << 6) | cont(pos + 1)?;
            out.push(char::from_u32(scalar).ok_or_else(|| invalid(pos))?);
            pos += 2;
        } else if b1 & 0xf0 == 0xe0 {
            // 1110xxxx 10xxxxxx 10xxxxxx
            let high = ((b1 as u32 & 0x0f) << 12) | (cont(pos + 1)? << 6) | cont(pos + 2)?;

            if (0xd800..0xdc00).contains(&high) {
                let low = match bytes.get(pos + 3..pos + 6) {
                    Some(&[0xed, b2, b3]) if is_continuation(b2) && is_continuation(b3) => {
                        Some(0xd000 | ((b2 as u32 & 0x3f) << 6) | (b3 as u32 & 0x3f))
                    }
                    _ => None,
                };
                match low.filter(|low| (0xdc00..0xe000).contains(low)) {
                    Some(low) => {
                        let scalar = 0x10000 + ((high - 0xd800) << 10) + (low - 0xdc00);
                        out.push(char::from_u32(scalar).ok_or_else(|| invalid(pos))?);
                        pos += 6;
                    }
                    None => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pos += 3;
                    }
                }
            } else {
                // Unpaired low surrogates have no `char` either.
                out.push(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER));
                pos += 3;
            }
        } else {
            return Err(invalid(pos));
        }
    }

    Ok(out)
}
