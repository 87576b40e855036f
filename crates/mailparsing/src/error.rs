use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MailParsingError {
    #[error("duplicate extra header: {0}")]
    DuplicateHeader(String),
    #[error("error reading attachment content: {0}")]
    AttachmentIo(String),
}

pub type Result<T> = std::result::Result<T, MailParsingError>;
