mod attachment;
mod encode;
mod error;
mod mail;
mod parser;

pub use attachment::{Attachment, AttachmentSource};
pub use encode::{
    base64_wrap_body, base64_wrap_text, create_entity, guess_encoding, is_special, to_latin1,
    Encoding,
};
pub use error::{MailParsingError, Result};
pub use mail::Mail;
pub use parser::parse;
