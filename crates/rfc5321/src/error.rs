use crate::reply::Reply;
use thiserror::Error;

/// Error kinds surfaced to the caller (§7). Fatal variants are always
/// followed by a transition to `State::Disconnected`; non-fatal variants
/// only drop the in-flight mail and advance the queue.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("malformed response line: {0:?}")]
    MalformedResponse(String),
    #[error("greeting rejected: {0:?}")]
    GreetingRejected(Reply),
    #[error("EHLO and HELO both rejected: {0:?}")]
    HeloRejected(Reply),
    #[error("authentication rejected: {0:?}")]
    AuthFailed(Reply),
    #[error("sender rejected: {0:?}")]
    SenderRejected(Reply),
    #[error("recipient rejected: {0:?}")]
    RecipientRejected(Reply),
    #[error("no recipients set on message")]
    NoRecipients,
    #[error("no recipients were accepted by the server")]
    NoValidRecipients,
    #[error("DATA rejected: {0:?}")]
    DataRejected(Reply),
    #[error("message body rejected: {0:?}")]
    BodyRejected(Reply),
    #[error("RSET rejected: {0:?}")]
    ResetRejected(Reply),
    #[error("error building message: {0}")]
    Mail(#[from] mailparsing::MailParsingError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
