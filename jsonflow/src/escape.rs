// SPDX-License-Identifier: Apache-2.0

//! JSON string escaping and quoting.
//!
//! Pure functions shared by the literal, object-key and text-source paths.
//! The escapable set covers the JSON-mandated control characters plus the
//! code points that are unsafe to embed verbatim in transported JSON
//! (C1 controls, bidi/joiner controls, line/paragraph separators, BOM and
//! the specials block).

use bytes::{BufMut, BytesMut};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Whether `c` must be written as an escape sequence.
fn needs_escape(c: char) -> bool {
    matches!(c,
        '"' | '\\'
        | '\u{0000}'..='\u{001f}'
        | '\u{007f}'..='\u{009f}'
        | '\u{00ad}'
        | '\u{0600}'..='\u{0604}'
        | '\u{070f}'
        | '\u{17b4}'
        | '\u{17b5}'
        | '\u{200c}'..='\u{200f}'
        | '\u{2028}'..='\u{202f}'
        | '\u{2060}'..='\u{206f}'
        | '\u{feff}'
        | '\u{fff0}'..='\u{ffff}')
}

/// Append `s` to `out` with every escapable character replaced.
///
/// Clean spans are copied through in one piece; a string with no
/// escapable characters is appended unchanged.
pub fn escape_into(s: &str, out: &mut BytesMut) {
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if !needs_escape(c) {
            continue;
        }
        out.extend_from_slice(&bytes[start..i]);
        match c {
            '\u{0008}' => out.extend_from_slice(b"\\b"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\u{000c}' => out.extend_from_slice(b"\\f"),
            '\r' => out.extend_from_slice(b"\\r"),
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            _ => {
                // Everything else in the set sits in the BMP, so four
                // hex digits always suffice.
                let cp = c as u32;
                out.extend_from_slice(&[
                    b'\\',
                    b'u',
                    HEX[((cp >> 12) & 0xf) as usize],
                    HEX[((cp >> 8) & 0xf) as usize],
                    HEX[((cp >> 4) & 0xf) as usize],
                    HEX[(cp & 0xf) as usize],
                ]);
            }
        }
        start = i + c.len_utf8();
    }
    out.extend_from_slice(&bytes[start..]);
}

/// Append `s` as a complete JSON string literal, quotes included.
pub fn quote_into(s: &str, out: &mut BytesMut) {
    out.put_u8(b'"');
    escape_into(s, out);
    out.put_u8(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str) -> String {
        let mut out = BytesMut::new();
        escape_into(s, &mut out);
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn test_clean_string_unchanged() {
        assert_eq!(escaped("plain ascii, no controls"), "plain ascii, no controls");
        assert_eq!(escaped(""), "");
    }

    #[test]
    fn test_short_escapes() {
        assert_eq!(escaped("a\nb"), "a\\nb");
        assert_eq!(escaped("\t\r\u{0008}\u{000c}"), "\\t\\r\\b\\f");
        assert_eq!(escaped("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escaped("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(escaped("\u{0000}"), "\\u0000");
        assert_eq!(escaped("\u{001f}"), "\\u001f");
        assert_eq!(escaped("\u{2028}\u{2029}"), "\\u2028\\u2029");
        assert_eq!(escaped("\u{feff}"), "\\ufeff");
        assert_eq!(escaped("\u{007f}#\u{0600}"), "\\u007f#\\u0600");
    }

    #[test]
    fn test_non_bmp_passthrough() {
        // Astral-plane characters are not in the escapable set.
        assert_eq!(escaped("crab \u{1f980}"), "crab \u{1f980}");
    }

    #[test]
    fn test_quote_into() {
        let mut out = BytesMut::new();
        quote_into("line1\nline2", &mut out);
        assert_eq!(&out[..], br#""line1\nline2""#);
    }
}
