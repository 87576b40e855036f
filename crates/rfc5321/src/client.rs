//! Component F: the ESMTP submission state machine.
//!
//! Grounded on `original_source/src/SmtpNya.hpp`/`.cpp` (the `Smtp` class
//! and its `SmtpState` enum), redone as the sum-type-plus-handler shape
//! §9 DESIGN NOTES asks for, driven entirely by the [`Transport`]/
//! [`SmtpEvents`] seam instead of Qt signals/slots, and by `tracing` events
//! at the same seams the teacher's async client instruments (line reads,
//! command writes, TLS handshake outcome, auth outcome, per-mail
//! completion).

use crate::address::extract_address;
use crate::auth::{cram_md5_response, choose_mechanism, decode_challenge, login_response, plain_response, AuthConfig, AuthMechanism};
use crate::error::ClientError;
use crate::reply::Reply;
use crate::transport::{SmtpEvents, Transport};
use mailparsing::Mail;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;

/// §4.6 states. Deliberately a single sum type rather than scattered
/// booleans, per §9 DESIGN NOTES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Start,
    EhloSent,
    EhloGreetReceived,
    EhloDone,
    HeloSent,
    StartTlsSent,
    AuthRequestSent,
    AuthUsernameSent,
    AuthSent,
    Authenticated,
    MailToSent,
    RcptAckPending,
    SendingBody,
    BodySent,
    Waiting,
    Resetting,
}

/// The ESMTP submission session (§3 "SMTP session state").
///
/// `T` is the transport the client drives (see [`Transport`]); `E` is the
/// sink for `error`/`done`/`all_done` notifications (see [`SmtpEvents`]).
/// All state transitions happen on whatever thread calls the `on_*`
/// methods below — §5 requires that to be a single logical actor.
pub struct SmtpClient<T: Transport, E: SmtpEvents> {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    auth_config: AuthConfig,
    tls_available: bool,

    state: State,
    auth_type: Option<AuthMechanism>,
    extensions: HashMap<String, String>,
    pending: VecDeque<Mail>,
    recipients: Vec<String>,
    rcpt_number: usize,
    rcpt_ack: usize,
    mail_ack: bool,
    in_buf: Vec<u8>,

    default_sender: Option<String>,
    default_recipients: Vec<String>,
    default_subject: Option<String>,

    helo_fallback_tried: bool,
    local_addr: Option<IpAddr>,

    transport: T,
    events: E,
}

impl<T: Transport, E: SmtpEvents> SmtpClient<T, E> {
    /// Port defaults to 465 when `tls_available` (implicit TLS), else 25.
    pub fn new(host: impl Into<String>, username: Option<String>, password: Option<String>, tls_available: bool, transport: T, events: E) -> Self {
        let port = if tls_available { 465 } else { 25 };
        Self {
            host: host.into(),
            port,
            username,
            password,
            auth_config: AuthConfig::default(),
            tls_available,
            state: State::Disconnected,
            auth_type: None,
            extensions: HashMap::new(),
            pending: VecDeque::new(),
            recipients: Vec::new(),
            rcpt_number: 0,
            rcpt_ack: 0,
            mail_ack: false,
            in_buf: Vec::new(),
            default_sender: None,
            default_recipients: Vec::new(),
            default_subject: None,
            helo_fallback_tried: false,
            local_addr: None,
            transport,
            events,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_auth_config(&mut self, config: AuthConfig) {
        self.auth_config = config;
    }

    pub fn set_default_sender(&mut self, sender: impl Into<String>) {
        self.default_sender = Some(sender.into());
    }

    pub fn add_default_recipient(&mut self, addr: impl Into<String>) {
        self.default_recipients.push(addr.into());
    }

    pub fn set_default_subject(&mut self, subject: impl Into<String>) {
        self.default_subject = Some(subject.into());
    }

    /// The parameter text of an advertised extension (capability name is
    /// matched case-insensitively), if the server advertised it.
    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions.get(&name.to_ascii_uppercase()).map(|s| s.as_str())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // -- caller-facing commands (§4.6 "Top-level flow") -----------------

    pub fn connect(&mut self) {
        if self.state != State::Disconnected {
            return;
        }
        self.state = State::Start;
        tracing::debug!(host = %self.host, port = self.port, tls = self.tls_available, "connecting");
        self.transport.connect(&self.host.clone(), self.port, self.tls_available);
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.state = State::Disconnected;
        self.pending.clear();
    }

    /// Queue a mail for submission, applying the client's configured
    /// sender/recipients/subject defaults to any field the mail left
    /// unset, and kick the queue if the session is idle.
    pub fn send(&mut self, mut mail: Mail) {
        if mail.sender().is_none() {
            if let Some(sender) = self.default_sender.clone() {
                mail.set_sender(sender);
            }
        }
        if mail.all_recipients().is_empty() {
            for addr in self.default_recipients.clone() {
                mail.add_to(addr);
            }
        }
        if mail.subject().is_none() {
            if let Some(subject) = self.default_subject.clone() {
                mail.set_subject(subject);
            }
        }
        self.pending.push_back(mail);
        if self.state == State::Waiting {
            self.send_next();
        }
    }

    // -- transport-facing event hooks ------------------------------------

    /// The transport's `connect` request succeeded; `local_addr` is the
    /// socket's local address, used for the EHLO/HELO argument (§4.6 step
    /// 2: "first non-loopback address, else 127.0.0.1").
    pub fn on_connected(&mut self, local_addr: Option<IpAddr>) {
        self.local_addr = local_addr;
        tracing::debug!(?local_addr, "connected");
    }

    /// The transport's `start_tls` request completed.
    pub fn on_tls_ready(&mut self) {
        tracing::debug!("tls handshake complete, resending EHLO");
        self.extensions.clear();
        self.helo_fallback_tried = false;
        self.write_command(format!("ehlo {}\r\n", self.local_ip_arg()));
        self.state = State::EhloSent;
    }

    /// The remote end closed the connection (not in response to our own
    /// `disconnect()`).
    pub fn on_disconnected(&mut self) {
        if self.state != State::Disconnected {
            self.events.on_error("connection closed unexpectedly".to_string());
        }
        self.state = State::Disconnected;
        self.pending.clear();
    }

    /// New bytes arrived from the socket. Lines are split on `\n` (with an
    /// optional trailing `\r` stripped) from the append-only `in_buf`, per
    /// §5.
    pub fn on_data(&mut self, bytes: &[u8]) {
        self.in_buf.extend_from_slice(bytes);
        loop {
            let Some(pos) = self.in_buf.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut line: Vec<u8> = self.in_buf.drain(..=pos).collect();
            line.pop(); // trailing \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            self.handle_line(&line);
            if self.state == State::Disconnected {
                break;
            }
        }
    }

    // -- internal dispatch ------------------------------------------------

    fn local_ip_arg(&self) -> String {
        match self.local_addr {
            Some(addr) if !addr.is_loopback() => addr.to_string(),
            _ => "127.0.0.1".to_string(),
        }
    }

    fn write_command(&mut self, cmd: String) {
        tracing::trace!(command = %cmd.trim_end(), "send");
        self.transport.write(cmd.as_bytes());
    }

    fn store_extension(&mut self, line: &str) {
        let mut parts = line.splitn(2, ' ');
        let name = parts.next().unwrap_or("").to_ascii_uppercase();
        if name.is_empty() {
            return;
        }
        let rest = parts.next().unwrap_or("").to_string();
        self.extensions.insert(name, rest);
    }

    fn handle_line(&mut self, line: &str) {
        let Some(reply) = Reply::parse(line) else {
            tracing::warn!(line, "ignoring malformed response line");
            return;
        };
        tracing::trace!(state = ?self.state, code = reply.code, continuation = reply.continuation, "recv");
        match self.state {
            State::Disconnected
            | State::EhloDone
            | State::Authenticated
            | State::Waiting => { /* no reply expected */ }
            State::Start => self.handle_greeting(reply),
            State::EhloSent | State::EhloGreetReceived => self.handle_ehlo(reply),
            State::HeloSent => self.handle_helo(reply),
            State::StartTlsSent => self.handle_starttls(reply),
            State::AuthRequestSent => self.handle_auth_request(reply),
            State::AuthUsernameSent => self.handle_auth_username(reply),
            State::AuthSent => self.handle_auth_sent(reply),
            State::MailToSent | State::RcptAckPending => self.handle_mail_reply(reply),
            State::SendingBody => self.handle_sending_body(reply),
            State::BodySent => self.handle_body_sent(reply),
            State::Resetting => self.handle_resetting(reply),
        }
    }

    fn handle_greeting(&mut self, reply: Reply) {
        if reply.is_positive() {
            self.write_command(format!("ehlo {}\r\n", self.local_ip_arg()));
            self.state = State::EhloSent;
        } else {
            self.events.on_error(ClientError::GreetingRejected(reply).to_string());
            self.transport.disconnect();
            self.state = State::Disconnected;
        }
    }

    fn fail_ehlo(&mut self, reply: Reply) {
        self.events.on_error(ClientError::HeloRejected(reply).to_string());
        self.write_command("quit\r\n".to_string());
        self.transport.disconnect();
        self.state = State::Disconnected;
    }

    fn handle_ehlo(&mut self, reply: Reply) {
        if reply.code != 250 {
            if !self.helo_fallback_tried {
                self.helo_fallback_tried = true;
                self.write_command(format!("helo {}\r\n", self.local_ip_arg()));
                self.state = State::HeloSent;
            } else {
                self.fail_ehlo(reply);
            }
            return;
        }

        match self.state {
            State::EhloSent => {
                if reply.continuation {
                    self.state = State::EhloGreetReceived;
                } else {
                    self.state = State::EhloDone;
                    self.on_ehlo_done();
                }
            }
            State::EhloGreetReceived => {
                self.store_extension(&reply.text);
                if !reply.continuation {
                    self.state = State::EhloDone;
                    self.on_ehlo_done();
                }
            }
            _ => unreachable!("handle_ehlo only called from EhloSent/EhloGreetReceived"),
        }
    }

    fn handle_helo(&mut self, reply: Reply) {
        if reply.code == 250 {
            self.state = State::EhloDone;
            self.on_ehlo_done();
        } else {
            self.fail_ehlo(reply);
        }
    }

    fn on_ehlo_done(&mut self) {
        if self.tls_available && self.extensions.contains_key("STARTTLS") {
            self.write_command("starttls\r\n".to_string());
            self.state = State::StartTlsSent;
        } else {
            self.authenticate();
        }
    }

    fn handle_starttls(&mut self, reply: Reply) {
        if reply.code == 220 {
            tracing::debug!("starting TLS handshake");
            self.transport.start_tls(&self.host.clone());
        } else {
            self.authenticate();
        }
    }

    fn authenticate(&mut self) {
        let auth_param = self.extensions.get("AUTH").cloned();
        let have_creds = matches!((&self.username, &self.password), (Some(u), Some(_)) if !u.is_empty());

        let mechanism = auth_param
            .filter(|_| have_creds)
            .and_then(|param| choose_mechanism(&param, self.auth_config));

        match mechanism {
            Some(mech) => {
                self.auth_type = Some(mech);
                self.write_command(format!("auth {}\r\n", mech.command_name()));
                self.state = State::AuthRequestSent;
            }
            None => {
                self.state = State::Authenticated;
                self.send_next();
            }
        }
    }

    fn fail_auth(&mut self, reply: Reply) {
        tracing::warn!(?reply, "authentication failed");
        self.events.on_error(ClientError::AuthFailed(reply).to_string());
        self.transport.disconnect();
        self.state = State::Disconnected;
    }

    fn handle_auth_request(&mut self, reply: Reply) {
        if reply.code != 334 {
            self.fail_auth(reply);
            return;
        }
        let username = self.username.clone().unwrap_or_default();
        let password = self.password.clone().unwrap_or_default();
        match self.auth_type {
            Some(AuthMechanism::Plain) => {
                let resp = plain_response(&username, &password);
                self.write_command(format!("{resp}\r\n"));
                self.state = State::AuthSent;
            }
            Some(AuthMechanism::Login) => {
                let resp = login_response(&username);
                self.write_command(format!("{resp}\r\n"));
                self.state = State::AuthUsernameSent;
            }
            Some(AuthMechanism::CramMd5) => match decode_challenge(&reply.text) {
                Ok(challenge) => {
                    let resp = cram_md5_response(&username, &password, &challenge);
                    self.write_command(format!("{resp}\r\n"));
                    self.state = State::AuthSent;
                }
                Err(_) => self.fail_auth(reply),
            },
            None => self.fail_auth(reply),
        }
    }

    fn handle_auth_username(&mut self, reply: Reply) {
        if reply.code != 334 {
            self.fail_auth(reply);
            return;
        }
        let password = self.password.clone().unwrap_or_default();
        let resp = login_response(&password);
        self.write_command(format!("{resp}\r\n"));
        self.state = State::AuthSent;
    }

    fn handle_auth_sent(&mut self, reply: Reply) {
        if reply.is_positive() {
            tracing::debug!("authenticated");
            self.state = State::Authenticated;
            self.send_next();
        } else {
            self.fail_auth(reply);
        }
    }

    /// §4.6 "Per-mail transaction", `SendNext()`.
    fn send_next(&mut self) {
        if self.state == State::Disconnected {
            return;
        }
        if self.pending.is_empty() {
            self.state = State::Waiting;
            return;
        }
        if self.state != State::Waiting {
            self.write_command("rset\r\n".to_string());
            self.state = State::Resetting;
            return;
        }

        let recipients = self.pending[0].all_recipients();
        if recipients.is_empty() {
            self.events.on_error(ClientError::NoRecipients.to_string());
            self.pending.pop_front();
            self.send_next();
            return;
        }

        self.recipients = recipients;
        self.rcpt_number = 0;
        self.rcpt_ack = 0;
        self.mail_ack = false;

        let sender_addr = extract_address(self.pending[0].sender().unwrap_or("")).to_string();
        self.write_command(format!("mail from:<{sender_addr}>\r\n"));

        if self.extensions.contains_key("PIPELINING") {
            for addr in self.recipients.clone() {
                self.write_command(format!("rcpt to:<{}>\r\n", extract_address(&addr)));
            }
            self.state = State::RcptAckPending;
        } else {
            self.state = State::MailToSent;
        }
    }

    /// §4.6 "Per reply while in MailToSent/RcptAckPending (handled by
    /// SendMail)".
    fn handle_mail_reply(&mut self, reply: Reply) {
        let accepted = reply.code / 100 == 2;
        if !accepted {
            if !self.mail_ack {
                self.events.on_error(ClientError::SenderRejected(reply).to_string());
            } else {
                self.events.on_error(ClientError::RecipientRejected(reply).to_string());
            }
        } else if !self.mail_ack {
            self.mail_ack = true;
        } else {
            self.rcpt_ack += 1;
        }

        if self.rcpt_number == self.recipients.len() && self.rcpt_ack == 0 {
            self.events.on_error(ClientError::NoValidRecipients.to_string());
            self.pending.pop_front();
            self.send_next();
        } else if self.rcpt_number == self.recipients.len() && self.rcpt_ack > 0 {
            self.write_command("data\r\n".to_string());
            self.state = State::SendingBody;
        } else if self.state != State::RcptAckPending {
            let addr = extract_address(&self.recipients[self.rcpt_number]).to_string();
            self.write_command(format!("rcpt to:<{addr}>\r\n"));
            self.rcpt_number += 1;
        } else {
            self.rcpt_number += 1;
        }
    }

    fn handle_sending_body(&mut self, reply: Reply) {
        if reply.is_positive_intermediate() {
            match self.pending.front_mut().map(Mail::to_bytes) {
                Some(Ok(bytes)) => {
                    self.transport.write(&bytes);
                    self.transport.write(b"\r\n.\r\n");
                    self.state = State::BodySent;
                }
                Some(Err(err)) => {
                    self.events.on_error(ClientError::from(err).to_string());
                    self.pending.pop_front();
                    self.send_next();
                }
                None => {}
            }
        } else {
            self.events.on_error(ClientError::DataRejected(reply).to_string());
            self.pending.pop_front();
            self.send_next();
        }
    }

    fn handle_body_sent(&mut self, reply: Reply) {
        if reply.is_positive() {
            if let Some(mail) = self.pending.pop_front() {
                tracing::debug!("message accepted");
                self.events.on_done(mail);
            }
        } else {
            self.events.on_error(ClientError::BodyRejected(reply).to_string());
            self.pending.pop_front();
        }
        if self.pending.is_empty() {
            self.events.on_all_done();
        }
        self.send_next();
    }

    fn handle_resetting(&mut self, reply: Reply) {
        if reply.is_positive() {
            self.state = State::Waiting;
            self.send_next();
        } else {
            self.events.on_error(ClientError::ResetRejected(reply).to_string());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingTransport {
        written: Rc<RefCell<Vec<String>>>,
        tls_started: Rc<RefCell<bool>>,
        disconnected: Rc<RefCell<bool>>,
    }

    impl Transport for RecordingTransport {
        fn connect(&mut self, _host: &str, _port: u16, _use_tls: bool) {}
        fn write(&mut self, data: &[u8]) {
            self.written
                .borrow_mut()
                .push(String::from_utf8_lossy(data).into_owned());
        }
        fn start_tls(&mut self, _host: &str) {
            *self.tls_started.borrow_mut() = true;
        }
        fn disconnect(&mut self) {
            *self.disconnected.borrow_mut() = true;
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        errors: Rc<RefCell<Vec<String>>>,
        done: Rc<RefCell<Vec<Mail>>>,
        all_done: Rc<RefCell<usize>>,
    }

    impl SmtpEvents for RecordingEvents {
        fn on_error(&mut self, message: String) {
            self.errors.borrow_mut().push(message);
        }
        fn on_done(&mut self, mail: Mail) {
            self.done.borrow_mut().push(mail);
        }
        fn on_all_done(&mut self) {
            *self.all_done.borrow_mut() += 1;
        }
    }

    fn new_client() -> (
        SmtpClient<RecordingTransport, RecordingEvents>,
        Rc<RefCell<Vec<String>>>,
        Rc<RefCell<Vec<String>>>,
        Rc<RefCell<Vec<Mail>>>,
        Rc<RefCell<usize>>,
    ) {
        let transport = RecordingTransport::default();
        let events = RecordingEvents::default();
        let written = transport.written.clone();
        let errors = events.errors.clone();
        let done = events.done.clone();
        let all_done = events.all_done.clone();
        let client = SmtpClient::new("mail.example.com", None, None, false, transport, events);
        (client, written, errors, done, all_done)
    }

    #[test]
    fn greeting_to_ehlo() {
        let (mut client, written, _errors, _done, _all_done) = new_client();
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 mail.example.com ESMTP\r\n");
        assert_eq!(client.state(), State::EhloSent);
        assert!(written.borrow()[0].starts_with("ehlo 127.0.0.1"));
    }

    #[test]
    fn greeting_rejected_disconnects() {
        let (mut client, _written, errors, _done, _all_done) = new_client();
        client.connect();
        client.on_connected(None);
        client.on_data(b"554 go away\r\n");
        assert_eq!(client.state(), State::Disconnected);
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn ehlo_fallback_to_helo_then_quit() {
        let (mut client, written, errors, _done, _all_done) = new_client();
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 hi\r\n");
        client.on_data(b"500 unrecognized\r\n");
        assert_eq!(client.state(), State::HeloSent);
        assert!(written.borrow()[1].starts_with("helo"));
        client.on_data(b"500 unrecognized\r\n");
        assert_eq!(client.state(), State::Disconnected);
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn full_session_no_auth_no_extensions() {
        let (mut client, written, _errors, done, all_done) = new_client();
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 hi\r\n");
        client.on_data(b"250 mail.example.com\r\n");
        assert_eq!(client.state(), State::Waiting);

        let mut mail = Mail::new("a@x");
        mail.add_to("b@y");
        mail.set_subject("Hi");
        mail.set_body_text("hello");
        client.send(mail);
        assert_eq!(client.state(), State::MailToSent);
        assert!(written.last().unwrap().starts_with("mail from:<a@x>"));

        client.on_data(b"250 ok\r\n"); // mail from ack
        assert!(written.last().unwrap().starts_with("rcpt to:<b@y>"));
        client.on_data(b"250 ok\r\n"); // rcpt ack
        assert_eq!(client.state(), State::SendingBody);
        assert_eq!(written.last().unwrap(), "data\r\n");

        client.on_data(b"354 go ahead\r\n");
        assert_eq!(client.state(), State::BodySent);
        assert!(written.last().unwrap().ends_with("\r\n.\r\n"));

        client.on_data(b"250 queued\r\n");
        assert_eq!(done.borrow().len(), 1);
        assert_eq!(*all_done.borrow(), 1);
        assert_eq!(client.state(), State::Waiting);
    }

    #[test]
    fn s5_pipelining_sends_all_rcpts_before_any_reply() {
        let (mut client, written, _errors, _done, _all_done) = new_client();
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 hi\r\n");
        client.on_data(b"250-mail.example.com\r\n");
        client.on_data(b"250 PIPELINING\r\n");
        assert_eq!(client.state(), State::Waiting);

        let mut mail = Mail::new("a@x");
        mail.add_to("b@y");
        mail.add_to("c@y");
        mail.set_body_text("hi");
        client.send(mail);
        assert_eq!(client.state(), State::RcptAckPending);
        let commands = written.borrow().clone();
        assert!(commands.iter().any(|c| c.starts_with("mail from:")));
        assert_eq!(commands.iter().filter(|c| c.starts_with("rcpt to:")).count(), 2);
    }

    #[test]
    fn no_recipients_drops_mail_without_writing_mail_from() {
        let (mut client, written, errors, _done, _all_done) = new_client();
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 hi\r\n");
        client.on_data(b"250 mail.example.com\r\n");

        let before = written.borrow().len();
        let mail = Mail::new("a@x");
        client.send(mail);
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(written.borrow().len(), before);
        assert_eq!(client.state(), State::Waiting);
    }

    #[test]
    fn starttls_then_auth_cram_md5() {
        let (mut client, written, _errors, _done, _all_done) = new_client();
        client.set_auth_config(AuthConfig {
            plain: false,
            login: false,
            cram_md5: true,
        });
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 hi\r\n");
        client.on_data(b"250-mail.example.com\r\n");
        client.on_data(b"250 AUTH CRAM-MD5\r\n");
        assert_eq!(client.state(), State::Waiting);
        // No username/password configured -> goes straight to Authenticated,
        // then SendNext() finds an empty queue and settles into Waiting.
        assert!(!written.borrow().iter().any(|c| c.starts_with("auth")));
    }

    #[test]
    fn auth_cram_md5_flow_with_credentials() {
        let transport = RecordingTransport::default();
        let events = RecordingEvents::default();
        let written = transport.written.clone();
        let mut client = SmtpClient::new(
            "mail.example.com",
            Some("joe".to_string()),
            Some("secret".to_string()),
            false,
            transport,
            events,
        );
        client.connect();
        client.on_connected(None);
        client.on_data(b"220 hi\r\n");
        client.on_data(b"250-mail.example.com\r\n");
        client.on_data(b"250 AUTH CRAM-MD5\r\n");
        assert_eq!(client.state(), State::AuthRequestSent);
        assert_eq!(written.borrow().last().unwrap(), "auth cram-md5\r\n");

        let challenge = b"<flob@example.com>";
        let encoded = data_encoding::BASE64.encode(challenge);
        client.on_data(format!("334 {encoded}\r\n").as_bytes());
        assert_eq!(client.state(), State::AuthSent);

        client.on_data(b"235 authenticated\r\n");
        assert_eq!(client.state(), State::Waiting);
    }
}
