//! AUTH mechanism selection and response encoding (§4.6 step 6-7).
//!
//! Grounded on `original_source/src/SmtpNya.hpp`'s `AuthType` enum and
//! `AuthenticateCramMD5`/`AuthenticatePlain`/`AuthenticateLogin` methods;
//! the CRAM-MD5 digest itself is delegated to the [`hmac_md5`] crate.

use data_encoding::BASE64;
use hmac_md5::{hmac_md5, to_hex_lower};

/// Which SASL mechanisms this client is willing to use (§6 config surface).
/// All three default to enabled, matching the reference client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    pub plain: bool,
    pub login: bool,
    pub cram_md5: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            plain: true,
            login: true,
            cram_md5: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    Plain,
    Login,
    CramMd5,
}

impl AuthMechanism {
    pub fn command_name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Login => "login",
            Self::CramMd5 => "cram-md5",
        }
    }
}

/// Choose the first supported-and-allowed mechanism, preferring
/// CRAM-MD5 > PLAIN > LOGIN, out of the space-separated tokens the server
/// advertised in its `AUTH` extension parameter.
pub fn choose_mechanism(advertised: &str, allowed: AuthConfig) -> Option<AuthMechanism> {
    let methods: Vec<String> = advertised
        .split_whitespace()
        .map(|s| s.to_ascii_uppercase())
        .collect();
    let has = |name: &str| methods.iter().any(|m| m == name);

    if allowed.cram_md5 && has("CRAM-MD5") {
        Some(AuthMechanism::CramMd5)
    } else if allowed.plain && has("PLAIN") {
        Some(AuthMechanism::Plain)
    } else if allowed.login && has("LOGIN") {
        Some(AuthMechanism::Login)
    } else {
        None
    }
}

/// Base64 of `\0<username>\0<password>`, the AUTH PLAIN initial response.
pub fn plain_response(username: &str, password: &str) -> String {
    let mut raw = Vec::with_capacity(username.len() + password.len() + 2);
    raw.push(0u8);
    raw.extend_from_slice(username.as_bytes());
    raw.push(0u8);
    raw.extend_from_slice(password.as_bytes());
    BASE64.encode(&raw)
}

/// Base64 of a bare string, used for both the AUTH LOGIN username and
/// password prompts.
pub fn login_response(value: &str) -> String {
    BASE64.encode(value.as_bytes())
}

/// Decode the base64 challenge carried in a `334 <base64>` continuation.
pub fn decode_challenge(reply_text: &str) -> std::result::Result<Vec<u8>, data_encoding::DecodeError> {
    BASE64.decode(reply_text.trim().as_bytes())
}

/// `base64("<username> <hex-lower(HMAC-MD5(password, challenge))>")`,
/// the CRAM-MD5 response (§4.6 step 7, S4).
pub fn cram_md5_response(username: &str, password: &str, challenge: &[u8]) -> String {
    let digest = hmac_md5(password.as_bytes(), challenge);
    let hex = to_hex_lower(&digest);
    BASE64.encode(format!("{username} {hex}").as_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefers_cram_md5_over_plain_and_login() {
        let mech = choose_mechanism("LOGIN PLAIN CRAM-MD5", AuthConfig::default());
        assert_eq!(mech, Some(AuthMechanism::CramMd5));
    }

    #[test]
    fn falls_back_to_plain_when_cram_md5_disabled() {
        let allowed = AuthConfig {
            cram_md5: false,
            ..AuthConfig::default()
        };
        let mech = choose_mechanism("LOGIN PLAIN CRAM-MD5", allowed);
        assert_eq!(mech, Some(AuthMechanism::Plain));
    }

    #[test]
    fn none_when_nothing_overlaps() {
        let allowed = AuthConfig {
            plain: false,
            login: false,
            cram_md5: false,
        };
        assert_eq!(choose_mechanism("PLAIN LOGIN", allowed), None);
    }

    #[test]
    fn s4_cram_md5_handshake() {
        // §8 S4: username "joe", password "secret".
        let challenge = b"<1896.697170952@postoffice.reston.mci.net>";
        let expected_digest = hmac_md5(b"secret", challenge);
        let expected_hex = to_hex_lower(&expected_digest);
        let response = cram_md5_response("joe", "secret", challenge);
        let decoded = BASE64.decode(response.as_bytes()).unwrap();
        let decoded = String::from_utf8(decoded).unwrap();
        assert_eq!(decoded, format!("joe {expected_hex}"));
    }

    #[test]
    fn plain_response_shape() {
        let encoded = plain_response("joe", "secret");
        let decoded = BASE64.decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, b"\0joe\0secret");
    }
}
