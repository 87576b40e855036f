//! Inbound SMTP reply lines: a three-digit status code, a separator
//! (`' '` for the final line of a reply, `'-'` for a continuation), and
//! free text (§4.6 "Commands and observations").

/// One line of a (possibly multi-line) server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub continuation: bool,
    pub text: String,
}

impl Reply {
    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_positive_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// Parse one CRLF-stripped line into a `Reply`. Returns `None` if the
    /// line does not start with a three-digit code followed by `' '` or
    /// `'-'`.
    pub fn parse(line: &str) -> Option<Reply> {
        let bytes = line.as_bytes();
        if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let code: u16 = line[..3].parse().ok()?;
        let (continuation, text) = match bytes.get(3) {
            Some(b'-') => (true, &line[4..]),
            Some(b' ') => (false, &line[4..]),
            None => (false, ""),
            _ => return None,
        };
        Some(Reply {
            code,
            continuation,
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_final_line() {
        let reply = Reply::parse("250 OK").unwrap();
        assert_eq!(reply.code, 250);
        assert!(!reply.continuation);
        assert_eq!(reply.text, "OK");
    }

    #[test]
    fn parses_continuation_line() {
        let reply = Reply::parse("250-PIPELINING").unwrap();
        assert_eq!(reply.code, 250);
        assert!(reply.continuation);
        assert_eq!(reply.text, "PIPELINING");
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(Reply::parse("nope").is_none());
        assert!(Reply::parse("25 OK").is_none());
    }

    #[test]
    fn classifies_status_ranges() {
        assert!(Reply::parse("250 OK").unwrap().is_positive());
        assert!(Reply::parse("354 go ahead").unwrap().is_positive_intermediate());
        assert!(!Reply::parse("550 no").unwrap().is_positive());
    }
}
