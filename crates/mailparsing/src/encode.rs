//! Component A: string classification and header/body transfer encodings.
//!
//! Grounded on `mailparsing::mimepart`'s `ContentTransferEncoding` and its
//! own ad-hoc base64 alphabet (`BASE64_RFC2045`); the quoted-printable/base64
//! wrapping rules here are rewritten to the widths this crate's wire format
//! requires rather than reusing the teacher's `quoted_printable`/`data_encoding`
//! wrap options directly, since the column widths and continuation markers
//! differ per field (header vs. body).

use data_encoding::BASE64;

/// One of the three ways a header value or body can be carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Base64,
    QuotedPrintable,
}

/// True for any byte that quoted-printable/base64 selection must treat as
/// "not safely printable ASCII": control bytes, non-ASCII, `=`, `?`.
pub fn is_special(b: u8) -> bool {
    b < 0x20 || b > 0x7e || b == b'=' || b == b'?'
}

/// Classify a string for header/body transfer purposes.
pub fn guess_encoding(s: &str) -> Encoding {
    let is_ascii_clean = !s.contains("=?") && s.chars().all(|c| (c as u32) < 0x80);
    if is_ascii_clean {
        return Encoding::Ascii;
    }

    let sample_len = s.chars().count().min(100);
    let specials = s
        .chars()
        .take(sample_len)
        .filter(|&c| {
            let cp = c as u32;
            cp < 0x20 || cp > 0x7e || cp == b'=' as u32 || cp == b'?' as u32
        })
        .count();

    if specials > 20 {
        Encoding::Base64
    } else {
        Encoding::QuotedPrintable
    }
}

/// Encode a UTF-8 string into latin-1 bytes, assuming every code point is
/// `< 0x80` (callers only do this after `guess_encoding` returned `Ascii`).
pub fn to_latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u32 as u8).collect()
}

fn qp_encode_byte(out: &mut String, b: u8) {
    out.push_str(&format!("={:02X}", b));
}

/// Emit one header field (`key: value\r\n`, possibly wrapped across several
/// lines) following the rules in SPEC_FULL.md §4.1.
pub fn create_entity(key: &str, value: &str, prefix: &str) -> String {
    match guess_encoding(value) {
        Encoding::Ascii => create_entity_ascii(key, value, prefix),
        Encoding::Base64 => create_entity_base64(key, value, prefix),
        Encoding::QuotedPrintable => create_entity_qp(key, value, prefix),
    }
}

fn create_entity_ascii(key: &str, value: &str, prefix: &str) -> String {
    let mut out = format!("{key}: {prefix}");
    let mut line_len = out.len();

    let mut first = true;
    for word in value.split(' ') {
        let extra = if first { 0 } else { 1 } + word.len();
        if !first && line_len + extra > 78 {
            out.push_str("\r\n");
            line_len = 0;
            out.push_str(word);
            line_len += word.len();
        } else {
            if !first {
                out.push(' ');
                line_len += 1;
            }
            out.push_str(word);
            line_len += word.len();
        }
        first = false;
    }
    out.push_str("\r\n");
    out
}

fn create_entity_base64(key: &str, value: &str, prefix: &str) -> String {
    let encoded = BASE64.encode(value.as_bytes());
    let header_prefix = format!("=?utf-8?b?{prefix}");
    let mut out = format!("{key}: {header_prefix}");
    // column counts from the start of the encoded-word body, i.e. excluding
    // "key: " and the leading "=?utf-8?b?".
    let mut col = prefix.len();

    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let take = 4.min(bytes.len() - i);
        let chunk = &encoded[i..i + take];
        if col + chunk.len() > 72 {
            out.push_str("?=\r\n =?utf-8?b?");
            col = 0;
        }
        out.push_str(chunk);
        col += chunk.len();
        i += take;
    }
    out.push_str("?=\r\n");
    out
}

fn create_entity_qp(key: &str, value: &str, prefix: &str) -> String {
    let mut out = format!("{key}: =?utf-8?q?{prefix}");
    let mut col = prefix.len();

    for b in value.as_bytes() {
        let piece = if is_special(*b) || *b == b' ' {
            format!("={:02X}", b)
        } else {
            (*b as char).to_string()
        };
        if col + piece.len() > 73 {
            out.push_str("?=\r\n =?utf-8?q?");
            col = 0;
        }
        out.push_str(&piece);
        col += piece.len();
    }
    out.push_str("?=\r\n");
    out
}

/// Base64-encode `data` wrapped into 76-byte CRLF-terminated lines, each
/// covering 57 bytes of source data (the MIME body-part convention).
pub fn base64_wrap_body(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(57) {
        out.extend_from_slice(BASE64.encode(chunk).as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Base64-encode `data` wrapped into 78-byte CRLF-terminated lines, used for
/// a base64-encoded message/part body (as opposed to an attachment, which
/// always uses the 57/76 framing of [`base64_wrap_body`]).
pub fn base64_wrap_text(data: &[u8]) -> Vec<u8> {
    let encoded = BASE64.encode(data);
    let mut out = Vec::new();
    for chunk in encoded.as_bytes().chunks(78) {
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii_is_ascii() {
        assert_eq!(guess_encoding("hello world"), Encoding::Ascii);
        assert_eq!(guess_encoding(""), Encoding::Ascii);
    }

    #[test]
    fn unicode_picks_qp_or_base64() {
        assert_eq!(guess_encoding("Héllo"), Encoding::QuotedPrintable);
        let mostly_binary: String = (0..50).map(|_| '\u{2603}').collect();
        assert_eq!(guess_encoding(&mostly_binary), Encoding::Base64);
    }

    #[test]
    fn contains_encoded_word_marker_forces_non_ascii() {
        assert_ne!(guess_encoding("literally =? here"), Encoding::Ascii);
    }

    #[test]
    fn entity_line_bound() {
        let long = "word ".repeat(200);
        let entity = create_entity("Subject", long.trim(), "");
        for line in entity.split("\r\n") {
            assert!(line.len() <= 78, "line too long: {line:?}");
        }
    }

    #[test]
    fn qp_header_round_trip_shape() {
        let entity = create_entity("Subject", "Héllo", "");
        assert!(entity.starts_with("Subject: =?utf-8?q?"));
        assert!(entity.contains("H=C3=A9llo?="));
    }
}
