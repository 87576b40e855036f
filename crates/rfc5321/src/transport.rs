//! The transport and event contracts component F is built against.
//!
//! §1 scopes the TCP/TLS transport itself out: "any implementation of that
//! contract is acceptable". [`Transport`] is that contract — an ordered,
//! byte-stream socket with explicit connect/write/start_tls/disconnect.
//! [`SmtpEvents`] is the matching outbound contract: `error`/`done`/
//! `all_done`, the three events §6 says are "delivered back to the caller,
//! mechanism unspecified".

use mailparsing::Mail;

/// Driven by [`crate::SmtpClient`] to perform the actual I/O. Calls made to
/// a `Transport` are requests; the corresponding outcome is reported back
/// to the client via `on_connected`/`on_data`/`on_tls_ready`/
/// `on_disconnected` (see `SmtpClient`'s inherent methods of those names).
pub trait Transport {
    /// Open the TCP connection (TLS-wrapped up front when `use_tls` is
    /// true, i.e. implicit TLS on the submission port).
    fn connect(&mut self, host: &str, port: u16, use_tls: bool);

    /// Write a command or message payload to the socket.
    fn write(&mut self, data: &[u8]);

    /// Upgrade the already-connected plain socket to TLS in place
    /// (STARTTLS). Completion is reported via `on_tls_ready`.
    fn start_tls(&mut self, host: &str);

    /// Close the connection. `on_disconnected` need not be reported back
    /// for a disconnect the client itself requested.
    fn disconnect(&mut self);
}

/// Outbound notifications a submission session reports to its caller.
pub trait SmtpEvents {
    /// A non-fatal or fatal error occurred; see `ClientError` for which.
    fn on_error(&mut self, message: String);
    /// One mail in the queue finished (successfully or not); the mail is
    /// handed back so the caller can inspect or discard it.
    fn on_done(&mut self, mail: Mail);
    /// The pending queue has drained completely.
    fn on_all_done(&mut self);
}
