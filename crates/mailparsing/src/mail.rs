//! Component C: the Mail value and its emission to an RFC 2822 byte stream.
//!
//! Grounded on `mailparsing::mimepart::MimePart`'s `new_text`/`new_multipart`
//! assembly (envelope headers, then a blank line, then body/parts), redone
//! around the spec's simpler header-map-plus-fields model instead of a
//! recursive MIME tree, since nested multipart is explicitly out of scope.

use crate::attachment::Attachment;
use crate::encode::{self, base64_wrap_text, create_entity, guess_encoding, is_special, Encoding};
use crate::error::{MailParsingError, Result};
use std::collections::HashMap;

const DEFAULT_WORD_WRAP: usize = 78;

#[derive(Debug, Clone, Default)]
pub struct Mail {
    sender: Option<String>,
    subject: Option<String>,
    body_text: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    extra_headers: HashMap<String, Vec<u8>>,
    attachments: Vec<(String, Attachment)>,
    word_wrap: Option<usize>,
    keep_indentation: bool,
    boundary: Option<String>,
}

impl Mail {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            word_wrap: None,
            ..Default::default()
        }
    }

    pub fn word_wrap(&self) -> usize {
        self.word_wrap.unwrap_or(DEFAULT_WORD_WRAP)
    }

    pub fn set_word_wrap(&mut self, width: usize) {
        self.word_wrap = Some(width);
    }

    pub fn set_keep_indentation(&mut self, keep: bool) {
        self.keep_indentation = keep;
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn set_sender(&mut self, sender: impl Into<String>) {
        self.sender = Some(sender.into());
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    pub fn set_body_text(&mut self, text: impl Into<String>) {
        self.body_text = text.into();
    }

    pub fn body_text(&self) -> &str {
        &self.body_text
    }

    pub fn add_to(&mut self, addr: impl Into<String>) {
        self.to.push(addr.into());
    }

    pub fn add_cc(&mut self, addr: impl Into<String>) {
        self.cc.push(addr.into());
    }

    pub fn add_bcc(&mut self, addr: impl Into<String>) {
        self.bcc.push(addr.into());
    }

    /// Remove every occurrence of `addr` across to/cc/bcc.
    pub fn remove_recipient(&mut self, addr: &str) {
        self.to.retain(|a| a != addr);
        self.cc.retain(|a| a != addr);
        self.bcc.retain(|a| a != addr);
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    /// All recipients flattened in `to ++ cc ++ bcc` order, the order the
    /// SMTP client addresses them in.
    pub fn all_recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .cloned()
            .collect()
    }

    pub fn set_extra_header(&mut self, name: &str, value: impl Into<Vec<u8>>) -> Result<()> {
        let key = name.to_ascii_lowercase();
        if self.extra_headers.contains_key(&key) {
            return Err(MailParsingError::DuplicateHeader(name.to_string()));
        }
        self.extra_headers.insert(key, value.into());
        Ok(())
    }

    pub fn extra_header(&self, name: &str) -> Option<&[u8]> {
        self.extra_headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_slice())
    }

    /// Add an attachment under `name`. If `name` is already taken, the new
    /// attachment is renamed `<base> (n).<ext>` (first free `n`) and the
    /// resulting display name is returned.
    pub fn add_attachment(&mut self, name: &str, attachment: Attachment) -> String {
        let final_name = self.dedupe_attachment_name(name);
        self.attachments.push((final_name.clone(), attachment));
        final_name
    }

    pub fn remove_attachment(&mut self, name: &str) -> Option<Attachment> {
        let idx = self.attachments.iter().position(|(n, _)| n == name)?;
        Some(self.attachments.remove(idx).1)
    }

    pub fn attachments(&self) -> impl Iterator<Item = (&str, &Attachment)> {
        self.attachments.iter().map(|(n, a)| (n.as_str(), a))
    }

    fn dedupe_attachment_name(&self, name: &str) -> String {
        if !self.attachments.iter().any(|(n, _)| n == name) {
            return name.to_string();
        }
        let (base, ext) = split_base_ext(name);
        let mut n = 1usize;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{base} ({n}).{ext}"),
                None => format!("{base} ({n})"),
            };
            if !self.attachments.iter().any(|(nm, _)| nm == &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn chosen_encoding(&self) -> Encoding {
        match self.extra_header("Content-Transfer-Encoding") {
            Some(v) => {
                let v = String::from_utf8_lossy(v).to_ascii_lowercase();
                if v == "base64" {
                    Encoding::Base64
                } else if v == "quoted-printable" {
                    Encoding::QuotedPrintable
                } else {
                    guess_encoding(&self.body_text)
                }
            }
            None => guess_encoding(&self.body_text),
        }
    }

    /// Serialise this Mail to a full RFC 2822 byte stream (§4.3). Takes
    /// `&mut self` because the MIME boundary is materialised lazily on
    /// first emission and must stay stable across repeated calls.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let has_attachments = !self.attachments.is_empty();
        let enc = self.chosen_encoding();
        let mut out = Vec::new();

        if let Some(sender) = &self.sender {
            if self.extra_header("From").is_none() {
                out.extend_from_slice(create_entity("From", sender, "").as_bytes());
            }
        }
        if !self.to.is_empty() {
            out.extend_from_slice(create_entity("To", &self.to.join(", "), "").as_bytes());
        }
        if !self.cc.is_empty() {
            out.extend_from_slice(create_entity("Cc", &self.cc.join(", "), "").as_bytes());
        }
        if let Some(subject) = self.subject.clone() {
            out.extend_from_slice(create_entity("Subject", &subject, "").as_bytes());
        }

        let has_mime_version = self.extra_header("MIME-Version").is_some();
        if enc != Encoding::Ascii && !has_mime_version && !has_attachments {
            out.extend_from_slice(b"MIME-Version: 1.0\r\n");
        }

        if has_attachments {
            if self.boundary.is_none() {
                self.boundary = Some(uuid::Uuid::new_v4().to_string());
            }
            if !has_mime_version {
                out.extend_from_slice(b"MIME-Version: 1.0\r\n");
            }
            if self.extra_header("Content-Type").is_none() {
                out.extend_from_slice(
                    format!(
                        "Content-Type: multipart/mixed; boundary={}\r\n",
                        self.boundary.as_ref().unwrap()
                    )
                    .as_bytes(),
                );
            }
        } else if enc == Encoding::Base64 {
            out.extend_from_slice(b"Content-Transfer-Encoding: base64\r\n");
        } else if enc == Encoding::QuotedPrintable {
            out.extend_from_slice(b"Content-Transfer-Encoding: quoted-printable\r\n");
        }

        for (name, value) in &self.extra_headers {
            if has_attachments
                && (name == "content-type" || name == "content-transfer-encoding")
            {
                continue;
            }
            let display_name = restore_header_case(name);
            let value = String::from_utf8_lossy(value);
            out.extend_from_slice(create_entity(&display_name, &value, "").as_bytes());
        }

        out.extend_from_slice(b"\r\n");

        if has_attachments {
            out.extend_from_slice(
                b"This is a message with multiple parts in MIME format.\r\n",
            );
            let boundary = self.boundary.clone().unwrap();
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());

            let content_type = self
                .extra_header("Content-Type")
                .map(|v| String::from_utf8_lossy(v).to_string())
                .unwrap_or_else(|| "text/plain; charset=UTF-8".to_string());
            out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());

            let cte = self
                .extra_header("Content-Transfer-Encoding")
                .map(|v| String::from_utf8_lossy(v).to_string())
                .or_else(|| match enc {
                    Encoding::Base64 => Some("base64".to_string()),
                    Encoding::QuotedPrintable => Some("quoted-printable".to_string()),
                    Encoding::Ascii => None,
                });
            if let Some(cte) = cte {
                out.extend_from_slice(format!("Content-Transfer-Encoding: {cte}\r\n").as_bytes());
            }
            out.extend_from_slice(b"\r\n");

            out.extend_from_slice(&encode_body(&self.body_text, enc, self.word_wrap(), self.keep_indentation));

            for (name, attachment) in &self.attachments {
                out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                let base_name = base_name(name);
                out.extend_from_slice(
                    create_entity(
                        "Content-Disposition",
                        &format!("attachment; filename={base_name}"),
                        "",
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(&attachment.mime_data()?);
            }
            out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        } else {
            out.extend_from_slice(&encode_body(&self.body_text, enc, self.word_wrap(), self.keep_indentation));
        }

        Ok(out)
    }
}

/// extra_headers keys are case-folded to lowercase for storage; recover a
/// presentable form (`Content-Type`-style) for emission.
fn restore_header_case(lower: &str) -> String {
    lower
        .split('-')
        .map(|part| {
            let mut c = part.chars();
            match c.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn split_base_ext(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Last path segment of a (possibly path-shaped) file name.
pub(crate) fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn dot_stuff(line: &mut Vec<u8>) {
    if line.first() == Some(&b'.') {
        line.insert(0, b'.');
    }
}

fn encode_body(text: &str, enc: Encoding, word_wrap: usize, keep_indentation: bool) -> Vec<u8> {
    match enc {
        Encoding::Ascii => encode_body_ascii(&encode::to_latin1(text), word_wrap, keep_indentation),
        Encoding::Base64 => base64_wrap_text(text.as_bytes()),
        Encoding::QuotedPrintable => encode_body_qp(text),
    }
}

/// §4.3 ascii body word-wrap with dot-stuffing.
fn encode_body_ascii(latin1: &[u8], word_wrap: usize, keep_indentation: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    let mut word: Vec<u8> = Vec::new();
    let mut spaces: Vec<u8> = Vec::new();
    let mut start_spaces: Vec<u8> = Vec::new();

    let n = latin1.len();
    let mut i = 0usize;

    let flush_line = |out: &mut Vec<u8>, line: &[u8]| {
        let mut line = line.to_vec();
        dot_stuff(&mut line);
        out.extend_from_slice(&line);
        out.extend_from_slice(b"\r\n");
    };

    loop {
        let b = if i < n { Some(latin1[i]) } else { None };
        match b {
            Some(c) if c != b' ' && c != b'\t' && c != b'\r' && c != b'\n' => {
                word.push(c);
                i += 1;
            }
            _ => {
                if !word.is_empty() {
                    if line.len() + spaces.len() + word.len() > word_wrap {
                        flush_line(&mut out, &line);
                        line = if keep_indentation {
                            start_spaces.clone()
                        } else {
                            Vec::new()
                        };
                    } else if line.is_empty() {
                        start_spaces = spaces.clone();
                        line.extend_from_slice(&spaces);
                    } else {
                        line.extend_from_slice(&spaces);
                    }
                    line.extend_from_slice(&word);
                    word.clear();
                    spaces.clear();
                }

                match b {
                    Some(b' ') | Some(b'\t') => {
                        spaces.push(b.unwrap());
                        i += 1;
                    }
                    Some(b'\r') => {
                        flush_line(&mut out, &line);
                        line.clear();
                        spaces.clear();
                        start_spaces.clear();
                        i += 1;
                        if i < n && latin1[i] == b'\n' {
                            i += 1;
                        }
                    }
                    Some(b'\n') => {
                        flush_line(&mut out, &line);
                        line.clear();
                        spaces.clear();
                        start_spaces.clear();
                        i += 1;
                        if i < n && latin1[i] == b'\r' {
                            i += 1;
                        }
                    }
                    None => {
                        if !line.is_empty() {
                            flush_line(&mut out, &line);
                        }
                        break;
                    }
                    _ => unreachable!(),
                }
            }
        }
    }

    out
}

/// §4.3 quoted-printable body encoding with soft breaks and dot-stuffing.
fn encode_body_qp(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    let bytes = text.as_bytes();
    let n = bytes.len();
    let mut i = 0usize;

    let flush_line = |out: &mut Vec<u8>, line: &mut Vec<u8>| {
        let mut l = std::mem::take(line);
        dot_stuff(&mut l);
        out.extend_from_slice(&l);
        out.extend_from_slice(b"\r\n");
    };

    while i < n {
        let b = bytes[i];
        if b == b'\r' || b == b'\n' {
            flush_line(&mut out, &mut line);
            i += 1;
            let other = if b == b'\r' { b'\n' } else { b'\r' };
            if i < n && bytes[i] == other {
                i += 1;
            }
            continue;
        }
        if is_special(b) {
            line.extend_from_slice(format!("={:02X}", b).as_bytes());
        } else {
            line.push(b);
        }
        if line.len() > 74 {
            out.extend_from_slice(&line);
            out.extend_from_slice(b"=\r\n");
            line.clear();
        }
        i += 1;
    }
    if !line.is_empty() {
        flush_line(&mut out, &mut line);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s1_plain_ascii() {
        let mut mail = Mail::new("a@x");
        mail.add_to("b@y");
        mail.set_subject("Hi");
        mail.set_body_text("hello");
        let bytes = mail.to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "From: a@x\r\nTo: b@y\r\nSubject: Hi\r\n\r\nhello\r\n");
    }

    #[test]
    fn s2_utf8_subject() {
        let mut mail = Mail::new("a@x");
        mail.set_subject("Héllo");
        mail.set_body_text("hi");
        let bytes = mail.to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Subject: =?utf-8?q?"));
        assert!(text.contains("H=C3=A9llo?="));
    }

    #[test]
    fn s3_dot_stuffing() {
        let mut mail = Mail::new("a@x");
        mail.set_body_text("hi\n.secret\n");
        let bytes = mail.to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("..secret\r\n"));
    }

    #[test]
    fn bcc_never_emitted() {
        let mut mail = Mail::new("a@x");
        mail.add_to("b@y");
        mail.add_bcc("secret@example.com");
        mail.set_body_text("hi");
        let bytes = mail.to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("secret@example.com"));
        assert!(!text.contains("Bcc"));
    }

    #[test]
    fn attachment_name_dedupe() {
        let mut mail = Mail::new("a@x");
        let n1 = mail.add_attachment("report.pdf", Attachment::from_bytes(b"1".to_vec()));
        let n2 = mail.add_attachment("report.pdf", Attachment::from_bytes(b"2".to_vec()));
        let n3 = mail.add_attachment("report.pdf", Attachment::from_bytes(b"3".to_vec()));
        assert_eq!(n1, "report.pdf");
        assert_eq!(n2, "report (1).pdf");
        assert_eq!(n3, "report (2).pdf");
    }

    #[test]
    fn boundary_stable_across_emissions() {
        let mut mail = Mail::new("a@x");
        mail.set_body_text("see file");
        mail.add_attachment("report.pdf", Attachment::from_bytes(b"%PDF-1.4".to_vec()));
        let first = mail.to_bytes().unwrap();
        let second = mail.to_bytes().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn remove_recipient_removes_all_occurrences() {
        let mut mail = Mail::new("a@x");
        mail.add_to("dup@example.com");
        mail.add_cc("dup@example.com");
        mail.add_bcc("dup@example.com");
        mail.remove_recipient("dup@example.com");
        assert!(mail.all_recipients().is_empty());
    }
}
