//! Component B: attachment values.
//!
//! Grounded on `mailparsing::mimepart::MimePart::new_binary` for the MIME
//! framing shape (`Content-Type` / `Content-Transfer-Encoding` /
//! `Content-Disposition`), adapted to the spec's map-of-headers model
//! instead of a full `HeaderMap`.

use crate::encode::{base64_wrap_body, create_entity};
use crate::error::{MailParsingError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A byte source that can be opened repeatedly; each emission of the owning
/// [`crate::Mail`] opens and fully reads it once.
pub trait AttachmentSource: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>>;
}

struct BytesSource(Vec<u8>);

impl AttachmentSource for BytesSource {
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(io::Cursor::new(self.0.as_slice())))
    }
}

struct FileSource(PathBuf);

impl AttachmentSource for FileSource {
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(File::open(&self.0)?))
    }
}

#[derive(Clone)]
pub struct Attachment {
    pub content_type: Vec<u8>,
    extra_headers: HashMap<String, Vec<u8>>,
    content: Arc<dyn AttachmentSource>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("content_type", &String::from_utf8_lossy(&self.content_type))
            .field("extra_headers", &self.extra_headers)
            .finish()
    }
}

impl Attachment {
    fn new(content: Arc<dyn AttachmentSource>) -> Self {
        Self {
            content_type: b"application/octet-stream".to_vec(),
            extra_headers: HashMap::new(),
            content,
        }
    }

    /// Build an attachment backed by an in-memory buffer.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Arc::new(BytesSource(data.into())))
    }

    /// Build an attachment that re-reads a file from disk on every emission.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileSource(path.as_ref().to_path_buf())))
    }

    /// Build an attachment backed by a caller-provided, re-openable source.
    pub fn from_source(source: impl AttachmentSource + 'static) -> Self {
        Self::new(Arc::new(source))
    }

    pub fn set_content_type(&mut self, content_type: impl Into<Vec<u8>>) {
        self.content_type = content_type.into();
    }

    pub fn content_type(&self) -> &[u8] {
        &self.content_type
    }

    pub fn extra_headers(&self) -> &HashMap<String, Vec<u8>> {
        &self.extra_headers
    }

    pub fn set_extra_header(&mut self, name: &str, value: impl Into<Vec<u8>>) -> Result<()> {
        let key = name.to_ascii_lowercase();
        if self.extra_headers.contains_key(&key) {
            return Err(MailParsingError::DuplicateHeader(name.to_string()));
        }
        self.extra_headers.insert(key, value.into());
        Ok(())
    }

    /// Render this attachment as one MIME body part: its own headers,
    /// a blank line, then the base64-framed content (§4.2).
    pub fn mime_data(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(b"Content-Type: ");
        out.extend_from_slice(&self.content_type);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(b"Content-Transfer-Encoding: base64\r\n");

        for (name, value) in &self.extra_headers {
            let value = String::from_utf8_lossy(value);
            out.extend_from_slice(create_entity(name, &value, "").as_bytes());
        }

        out.extend_from_slice(b"\r\n");

        let mut reader = self
            .content
            .open()
            .map_err(|e| MailParsingError::AttachmentIo(e.to_string()))?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| MailParsingError::AttachmentIo(e.to_string()))?;

        out.extend_from_slice(&base64_wrap_body(&data));
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mime_data_shape() {
        let mut att = Attachment::from_bytes(b"%PDF-1.4\nhello".to_vec());
        att.set_content_type("application/pdf");
        let data = att.mime_data().unwrap();
        let text = String::from_utf8(data).unwrap();
        assert!(text.starts_with("Content-Type: application/pdf\r\n"));
        assert!(text.contains("Content-Transfer-Encoding: base64\r\n"));
    }

    #[test]
    fn reopens_for_each_emission() {
        let att = Attachment::from_bytes(b"abc".to_vec());
        let first = att.mime_data().unwrap();
        let second = att.mime_data().unwrap();
        assert_eq!(first, second);
    }
}
