//! Compact, NUL-free byte encoding of Unicode text used for gram keys.
//!
//! Every codepoint becomes one *unit* of 1 to 5 bytes:
//!
//! | codepoint                | bytes                                      |
//! |--------------------------|--------------------------------------------|
//! | `U+0000`                 | `E0`                                       |
//! | `U+0001..U+007F`         | the ASCII byte                             |
//! | `U+4000..U+9FFF`, lo ≠ 0 | `(u >> 8) + 0x40`, `u & 0xFF`              |
//! | `U+4000..U+9FFF`, lo = 0 | `E1`, `(u >> 8) + 0x40`                    |
//! | everything else          | `E0 | n`, then `n` 7-bit groups, MSB first, |
//! |                          | each with the high bit set                 |
//!
//! A unit's length is recoverable from its first byte alone, so encoded
//! strings can be walked one codepoint at a time with [`next_unit`].
//!
//! # Example
//! ```
//! use octagram_core::encoding;
//!
//! let bytes = encoding::encode("好的");
//! assert!(!bytes.contains(&0));
//! assert_eq!(encoding::unicode_length(&bytes), 2);
//! ```

/// Maximum number of codepoints taken from each side of a query.
pub const MAX_ENCODED_UNICODE: usize = 8;

/// Escape byte standing in for `U+0000`, and the base of all escape units.
const ESCAPE: u8 = 0xE0;
/// Two-byte escape for mid-range codepoints whose low byte is zero.
const ESCAPE_LOW_ZERO: u8 = 0xE1;

/// Mid-range fast-path bucket. Opaque policy constant.
const MID_RANGE_START: u32 = 0x4000;
const MID_RANGE_END: u32 = 0xA000;
const MID_RANGE_OFFSET: u32 = 0x40;

/// Encode a string into gram-key bytes.
pub fn encode(text: &str) -> Vec<u8> {
    encode_chars(text.chars())
}

/// Encode a sequence of characters into gram-key bytes.
pub fn encode_chars<I: IntoIterator<Item = char>>(chars: I) -> Vec<u8> {
    let mut out = Vec::new();
    for ch in chars {
        push_unit(&mut out, ch as u32);
    }
    out
}

/// Append the encoded unit of a single codepoint to `out`.
pub fn push_unit(out: &mut Vec<u8>, u: u32) {
    match u {
        0 => out.push(ESCAPE),
        1..=0x7F => out.push(u as u8),
        MID_RANGE_START..=0x9FFF => {
            let hi = ((u >> 8) + MID_RANGE_OFFSET) as u8;
            let lo = (u & 0xFF) as u8;
            if lo == 0 {
                out.extend_from_slice(&[ESCAPE_LOW_ZERO, hi]);
            } else {
                out.extend_from_slice(&[hi, lo]);
            }
        }
        _ => {
            let groups = escape_groups(u);
            out.push(ESCAPE | groups as u8);
            for i in (0..groups).rev() {
                out.push((((u >> (7 * i)) & 0x7F) as u8) | 0x80);
            }
        }
    }
}

/// Number of 7-bit groups needed to hold `u` in the general escape form.
fn escape_groups(u: u32) -> u32 {
    let bits = u32::BITS - u.leading_zeros();
    bits.div_ceil(7).max(1)
}

/// Length in bytes of the unit starting with `lead`.
#[inline]
pub fn unit_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xF0 == ESCAPE {
        (lead & 0x0F) as usize + 1
    } else {
        2
    }
}

/// Skip one encoded unit.
///
/// Returns the remainder of `encoded` after its first unit, or an empty slice
/// when `encoded` is empty or ends inside the unit.
#[inline]
pub fn next_unit(encoded: &[u8]) -> &[u8] {
    match encoded.first() {
        Some(&lead) => encoded.get(unit_len(lead)..).unwrap_or(&[]),
        None => encoded,
    }
}

/// Number of codepoints represented by `encoded`.
pub fn unicode_length(encoded: &[u8]) -> usize {
    let mut rest = encoded;
    let mut len = 0;
    while !rest.is_empty() {
        rest = next_unit(rest);
        len += 1;
    }
    len
}
