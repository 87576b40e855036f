mod address;
mod auth;
mod client;
mod error;
mod reply;
mod transport;

pub use address::extract_address;
pub use auth::{AuthConfig, AuthMechanism};
pub use client::{SmtpClient, State};
pub use error::{ClientError, Result};
pub use reply::Reply;
pub use transport::{SmtpEvents, Transport};
