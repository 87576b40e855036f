//! Component D: RFC 2822 parse, encoded-word decode and one-level
//! multipart/attachment extraction (§4.4).
//!
//! Grounded on `original_source/src/Rfc2822.cpp`'s header-folding walk and
//! `MailNya.cpp`'s multipart boundary splitting, redone around this
//! crate's [`Mail`]/[`Attachment`] value types instead of the original's
//! mutable header-list-of-pairs. Malformed input never produces an `Err`
//! (§7): the worst outcome is an empty decoded string or a body left
//! un-decoded, never a panic or parse failure.

use crate::attachment::Attachment;
use crate::mail::Mail;
use data_encoding::BASE64;
use std::sync::atomic::{AtomicUsize, Ordering};

static ATTACHMENT_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Parse a raw RFC 2822 / MIME byte stream into an editable [`Mail`].
pub fn parse(raw: &[u8]) -> Mail {
    let (header_block, body_block) = split_headers_and_body(raw);
    let headers = parse_headers(header_block);

    let mut mail = Mail::default();
    for (name, value) in &headers {
        match name.as_str() {
            "from" => mail.set_sender(value.clone()),
            "to" => {
                for addr in split_address_list(value) {
                    mail.add_to(addr);
                }
            }
            "cc" => {
                for addr in split_address_list(value) {
                    mail.add_cc(addr);
                }
            }
            "subject" => mail.set_subject(value.clone()),
            _ => {
                // extra_headers keys are stored case-folded; duplicate
                // header lines (malformed or repeated) keep the first.
                let _ = mail.set_extra_header(name, value.clone().into_bytes());
            }
        }
    }

    let body_text = String::from_utf8_lossy(body_block).into_owned();
    mail.set_body_text(body_text);

    let content_type = headers
        .iter()
        .find(|(n, _)| n == "content-type")
        .map(|(_, v)| v.as_str())
        .unwrap_or("");

    if starts_with_multipart(content_type) {
        if let Some(boundary) = extract_parameter(content_type, "boundary") {
            extract_multipart_attachments(&mut mail, &boundary);
        }
    }

    mail
}

fn split_headers_and_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find_subslice(raw, b"\r\n\r\n") {
        (&raw[..pos], &raw[pos + 4..])
    } else if let Some(pos) = find_subslice(raw, b"\n\n") {
        (&raw[..pos], &raw[pos + 2..])
    } else {
        (raw, b"")
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    memchr::memmem::find(haystack, needle)
}

fn is_header_name_byte(b: u8) -> bool {
    (0x21..=0x7e).contains(&b) && b != b':'
}

/// Walk the header block, unfolding continuation lines and decoding
/// encoded-words, returning `(lower-cased name, decoded value)` pairs.
fn parse_headers(block: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(block);
    let mut out: Vec<(String, Vec<String>)> = Vec::new();

    for line in split_lines(&text) {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = out.last_mut() {
                last.1.push(line.to_string());
            }
            continue;
        }
        let Some(colon) = line.find(':') else {
            continue;
        };
        let name = &line[..colon];
        if name.is_empty() || !name.bytes().all(is_header_name_byte) {
            continue;
        }
        let rest = &line[colon + 1..];
        let value = match rest.strip_prefix(' ').or_else(|| rest.strip_prefix('\t')) {
            Some(v) => v,
            None => continue,
        };
        out.push((name.to_ascii_lowercase(), vec![value.to_string()]));
    }

    out.into_iter()
        .map(|(name, pieces)| {
            let decoded: String = pieces.iter().map(|p| decode_encoded_words(p)).collect();
            (name, decoded)
        })
        .collect()
}

/// Split on `\r\n` or bare `\n`, without a trailing empty element.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            let mut end = i;
            if end > start && bytes[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(&text[start..end]);
            start = i + 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn split_address_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Repeatedly find `=?<charset>?[qQbB]?<encoded-text>?=` in `s` and replace
/// each occurrence with its decoded Unicode text.
fn decode_encoded_words(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' && bytes.get(i + 1) == Some(&b'?') {
            if let Some((decoded, consumed)) = try_decode_word(&s[i..]) {
                out.push_str(&decoded);
                i += consumed;
                continue;
            }
        }
        // advance by one char, not one byte, to stay on UTF-8 boundaries.
        let ch_len = s[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        out.push_str(&s[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Try to parse `=?charset?enc?payload?=` starting at the beginning of
/// `s`. Returns the decoded text and the number of bytes consumed.
fn try_decode_word(s: &str) -> Option<(String, usize)> {
    let rest = s.strip_prefix("=?")?;
    let (charset, rest) = rest.split_once('?')?;
    let (enc, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let payload = &rest[..end];
    let consumed = 2 + charset.len() + 1 + enc.len() + 1 + payload.len() + 2;

    let raw = match enc.to_ascii_lowercase().as_str() {
        "q" => decode_quoted_printable_word(payload),
        "b" => BASE64.decode(payload.as_bytes()).ok()?,
        _ => return None,
    };

    Some((decode_charset(&charset.to_ascii_lowercase(), &raw), consumed))
}

fn decode_quoted_printable_word(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&payload[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn decode_charset(charset: &str, raw: &[u8]) -> String {
    match charset {
        "utf-8" | "utf8" | "" => String::from_utf8_lossy(raw).into_owned(),
        "us-ascii" | "ascii" => raw.iter().map(|&b| (b & 0x7f) as char).collect(),
        "iso-8859-1" | "latin1" | "iso8859-1" => raw.iter().map(|&b| b as char).collect(),
        _ => String::new(),
    }
}

fn starts_with_multipart(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("multipart")
}

/// Extract `name="value"` or `name=value` from a header parameter string.
fn extract_parameter(header_value: &str, name: &str) -> Option<String> {
    let lower = header_value.to_ascii_lowercase();
    let needle = format!("{name}=");
    let idx = lower.find(&needle)?;
    let rest = &header_value[idx + needle.len()..];
    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest
            .find(|c: char| c == ';' || c.is_whitespace())
            .unwrap_or(rest.len());
        let value = rest[..end].trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

struct BoundaryMatch {
    /// Byte offset of the start of the delimiter line.
    start: usize,
    /// Byte offset right after the line's terminator (or end of body).
    end: usize,
    is_final: bool,
}

fn find_boundary_matches(body: &[u8], boundary: &str) -> Vec<BoundaryMatch> {
    let needle = format!("--{boundary}");
    let needle = needle.as_bytes();
    let mut matches = Vec::new();

    let n = body.len();
    let mut start = 0usize;
    for i in memchr::memchr_iter(b'\n', body) {
        let mut content_end = i;
        if content_end > start && body[content_end - 1] == b'\r' {
            content_end -= 1;
        }
        check_and_push(body, start, content_end, i + 1, needle, &mut matches);
        start = i + 1;
    }
    if start < n {
        check_and_push(body, start, n, n, needle, &mut matches);
    }

    matches
}

fn check_and_push(
    body: &[u8],
    line_start: usize,
    content_end: usize,
    line_end: usize,
    needle: &[u8],
    matches: &mut Vec<BoundaryMatch>,
) {
    let mut content = &body[line_start..content_end];
    while content.last().is_some_and(|&b| b == b' ' || b == b'\t') {
        content = &content[..content.len() - 1];
    }
    if !content.starts_with(needle) {
        return;
    }
    let rest = &content[needle.len()..];
    if rest.is_empty() {
        matches.push(BoundaryMatch {
            start: line_start,
            end: line_end,
            is_final: false,
        });
    } else if rest == b"--" {
        matches.push(BoundaryMatch {
            start: line_start,
            end: line_end,
            is_final: true,
        });
    }
}

fn extract_multipart_attachments(mail: &mut Mail, boundary: &str) {
    let body_bytes = mail.body_text().as_bytes().to_vec();
    let matches = find_boundary_matches(&body_bytes, boundary);
    if matches.len() < 2 {
        return;
    }

    let mut removal_ranges: Vec<(usize, usize)> = Vec::new();

    for window in matches.windows(2) {
        let first = &window[0];
        let second = &window[1];
        if first.is_final {
            break;
        }
        let part_bytes = &body_bytes[first.end..second.start];
        if part_bytes.is_empty() {
            continue;
        }

        let (part_headers_block, part_body) = split_headers_and_body(part_bytes);
        let headers = parse_headers(part_headers_block);
        let disposition = headers
            .iter()
            .find(|(n, _)| n == "content-disposition")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        if disposition.trim_start().to_ascii_lowercase().starts_with("attachment;")
            || disposition.trim().eq_ignore_ascii_case("attachment")
        {
            let name = extract_parameter(&disposition, "filename").unwrap_or_else(|| {
                format!("attachment{}", ATTACHMENT_COUNTER.fetch_add(1, Ordering::Relaxed))
            });
            let content_type = headers
                .iter()
                .find(|(n, _)| n == "content-type")
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let cte = headers
                .iter()
                .find(|(n, _)| n == "content-transfer-encoding")
                .map(|(_, v)| v.to_ascii_lowercase())
                .unwrap_or_default();

            let decoded = decode_attachment_body(part_body, &cte, &content_type);
            let mut attachment = Attachment::from_bytes(decoded);
            attachment.set_content_type(content_type.clone().into_bytes());
            for (name, value) in &headers {
                if matches!(
                    name.as_str(),
                    "content-type" | "content-transfer-encoding" | "content-disposition"
                ) {
                    continue;
                }
                let _ = attachment.set_extra_header(name, value.clone().into_bytes());
            }

            mail.add_attachment(&name, attachment);
            removal_ranges.push((first.end, second.start));
        }

        if second.is_final {
            break;
        }
    }

    if removal_ranges.is_empty() {
        return;
    }

    let mut remaining = Vec::with_capacity(body_bytes.len());
    let mut last_end = 0usize;
    for (start, end) in removal_ranges {
        remaining.extend_from_slice(&body_bytes[last_end..start]);
        last_end = end;
    }
    remaining.extend_from_slice(&body_bytes[last_end..]);
    mail.set_body_text(String::from_utf8_lossy(&remaining).into_owned());
}

fn is_textual_content_type(content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    let ct = ct.split(';').next().unwrap_or("").trim();
    if ct.starts_with("text/") || ct == "image/svg+xml" {
        return true;
    }
    if let Some(subtype) = ct.strip_prefix("application/") {
        return matches!(
            subtype,
            "x-sh" | "sh" | "xml" | "xhtml+xml" | "pgp-signature" | "javascript" | "ecmascript" | "x-javascript"
        );
    }
    false
}

fn decode_attachment_body(body: &[u8], cte: &str, content_type: &str) -> Vec<u8> {
    match cte {
        "base64" => {
            let filtered: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !matches!(b, b'\r' | b'\n'))
                .collect();
            BASE64.decode(&filtered).unwrap_or_default()
        }
        "quoted-printable" => decode_quoted_printable_body(body),
        _ => {
            if is_textual_content_type(content_type) {
                normalize_newlines(body)
            } else {
                body.to_vec()
            }
        }
    }
}

/// Decode a quoted-printable attachment body (§4.4). Soft-break and `=HH`
/// handling is delegated to the `quoted_printable` crate in robust mode
/// (malformed input degrades rather than erroring, per §7); the crate
/// leaves line endings alone, so CRLF is folded to LF afterwards to match
/// the spec's "becomes a single newline" rule.
fn decode_quoted_printable_body(body: &[u8]) -> Vec<u8> {
    match quoted_printable::decode(body, quoted_printable::ParseMode::Robust) {
        Ok(decoded) => normalize_newlines(&decoded),
        Err(_) => decode_quoted_printable_body_lenient(body),
    }
}

fn decode_quoted_printable_body_lenient(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    let n = body.len();
    while i < n {
        match body[i] {
            b'=' if body.get(i + 1) == Some(&b'\r') && body.get(i + 2) == Some(&b'\n') => {
                i += 3; // soft break
            }
            b'=' if body.get(i + 1) == Some(&b'\n') => {
                i += 2; // lenient soft break without CR
            }
            b'=' if i + 2 < n => {
                let hex = std::str::from_utf8(&body[i + 1..i + 3]).ok();
                if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'=');
                    i += 1;
                }
            }
            b'\r' if body.get(i + 1) == Some(&b'\n') => {
                out.push(b'\n');
                i += 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn normalize_newlines(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    let n = body.len();
    while i < n {
        if body[i] == b'\r' && body.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(body[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip_a_plain_ascii() {
        let mut mail = Mail::new("a@x");
        mail.add_to("b@y");
        mail.set_subject("Hi");
        mail.set_body_text("hello");
        let bytes = mail.to_bytes().unwrap();
        let parsed = parse(&bytes);
        assert_eq!(parsed.subject(), Some("Hi"));
        assert_eq!(parsed.body_text().trim_end(), "hello");
        assert_eq!(parsed.sender(), Some("a@x"));
        assert_eq!(parsed.to(), &["b@y".to_string()]);
    }

    #[test]
    fn decodes_qp_encoded_subject() {
        let headers = b"Subject: =?utf-8?q?H=C3=A9llo?=\r\n\r\nbody\r\n";
        let parsed = parse(headers);
        assert_eq!(parsed.subject(), Some("Héllo"));
    }

    #[test]
    fn decodes_base64_encoded_subject() {
        let encoded = BASE64.encode("Héllo".as_bytes());
        let raw = format!("Subject: =?utf-8?b?{encoded}?=\r\n\r\nbody\r\n");
        let parsed = parse(raw.as_bytes());
        assert_eq!(parsed.subject(), Some("Héllo"));
    }

    #[test]
    fn unknown_charset_yields_empty_text() {
        let raw = b"Subject: =?unknown-9999?q?hi?=\r\n\r\nbody\r\n";
        let parsed = parse(raw);
        assert_eq!(parsed.subject(), Some(""));
    }

    #[test]
    fn continuation_lines_are_unfolded() {
        let raw = b"Subject: line one\r\n line two\r\n\r\nbody\r\n";
        let parsed = parse(raw);
        assert_eq!(parsed.subject(), Some("line one line two"));
    }

    #[test]
    fn malformed_header_line_is_silently_ignored() {
        let raw = b"NotAHeaderNoColon\r\nSubject: ok\r\n\r\nbody\r\n";
        let parsed = parse(raw);
        assert_eq!(parsed.subject(), Some("ok"));
    }

    #[test]
    fn s6_multipart_round_trip() {
        let mut mail = Mail::new("a@x");
        mail.set_body_text("see file");
        let mut attachment = Attachment::from_bytes(b"%PDF-1.4\nhello".to_vec());
        attachment.set_content_type("application/pdf");
        mail.add_attachment("report.pdf", attachment);

        let bytes = mail.to_bytes().unwrap();
        let parsed = parse(&bytes);
        assert!(parsed.body_text().contains("see file"));
        let (name, att) = parsed.attachments().next().expect("one attachment");
        assert_eq!(name, "report.pdf");
        assert_eq!(att.content_type(), b"application/pdf");
    }

    #[test]
    fn round_trip_b_binary_attachment() {
        let mut mail = Mail::new("a@x");
        mail.set_body_text("body");
        let content: Vec<u8> = (0..=255u8).collect();
        let mut attachment = Attachment::from_bytes(content.clone());
        attachment.set_content_type("application/octet-stream");
        mail.add_attachment("data.bin", attachment);

        let bytes = mail.to_bytes().unwrap();
        let parsed = parse(&bytes);
        let (_, att) = parsed.attachments().next().expect("one attachment");
        let decoded = decode_attachment_body(
            &strip_mime_data_to_content(&att.mime_data().unwrap()),
            "base64",
            "application/octet-stream",
        );
        assert_eq!(decoded, content);
    }

    // helper for the test above: pull just the base64 body out of a
    // freshly-generated mime_data() blob, mirroring what the real
    // multipart extractor does from the parsed part body.
    fn strip_mime_data_to_content(mime_data: &[u8]) -> Vec<u8> {
        let pos = find_subslice(mime_data, b"\r\n\r\n").unwrap();
        mime_data[pos + 4..].to_vec()
    }

    #[test]
    fn bcc_never_appears_and_is_not_parsed_back() {
        let mut mail = Mail::new("a@x");
        mail.add_to("b@y");
        mail.add_bcc("secret@example.com");
        mail.set_body_text("hi");
        let bytes = mail.to_bytes().unwrap();
        let parsed = parse(&bytes);
        assert!(parsed.bcc().is_empty());
        assert!(parsed.to().contains(&"b@y".to_string()));
    }
}
