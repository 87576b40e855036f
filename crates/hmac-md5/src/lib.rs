//! Component E: a stand-alone HMAC-MD5 primitive for CRAM-MD5 (§4.5).
//!
//! Grounded on the block-cipher-style MAC construction documented in
//! `nya-smtp`'s CRAM-MD5 handshake (`original_source/src/SmtpNya.hpp`'s
//! `AuthenticateCramMD5`): HMAC over a 64-byte block size, built from the
//! `md-5` crate the teacher workspace already depends on rather than a
//! hand-rolled MD5 compression function.

use md5::{Digest, Md5};

const BLOCK_SIZE: usize = 64;
const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Incremental HMAC-MD5. Construct with [`HmacMd5::new`], feed data with
/// [`HmacMd5::add_data`], and read the digest with [`HmacMd5::result`].
///
/// The digest is cached after the first call to `result` and invalidated by
/// the next `add_data`, mirroring the "lazily computed, cached" contract in
/// §4.5.
pub struct HmacMd5 {
    ipad_key: [u8; BLOCK_SIZE],
    opad_key: [u8; BLOCK_SIZE],
    inner: Md5,
    cached: Option<[u8; 16]>,
}

impl HmacMd5 {
    pub fn new(key: &[u8]) -> Self {
        let mut block_key = [0u8; BLOCK_SIZE];
        if key.len() > BLOCK_SIZE {
            let digest = Md5::digest(key);
            block_key[..digest.len()].copy_from_slice(&digest);
        } else {
            block_key[..key.len()].copy_from_slice(key);
        }

        let mut ipad_key = [0u8; BLOCK_SIZE];
        let mut opad_key = [0u8; BLOCK_SIZE];
        for i in 0..BLOCK_SIZE {
            ipad_key[i] = block_key[i] ^ IPAD;
            opad_key[i] = block_key[i] ^ OPAD;
        }

        let mut inner = Md5::new();
        inner.update(ipad_key);

        Self {
            ipad_key,
            opad_key,
            inner,
            cached: None,
        }
    }

    /// Feed more message bytes into the MAC. Invalidates any cached result.
    pub fn add_data(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.cached = None;
    }

    /// `MD5(opad || MD5(ipad || m))`, cached until the next `add_data`.
    pub fn result(&mut self) -> [u8; 16] {
        if let Some(cached) = self.cached {
            return cached;
        }
        let inner_digest = self.inner.clone().finalize();
        let mut outer = Md5::new();
        outer.update(self.opad_key);
        outer.update(inner_digest);
        let digest: [u8; 16] = outer.finalize().into();
        self.cached = Some(digest);
        digest
    }

    /// Reset to a fresh MAC over the same key, discarding any fed data.
    pub fn reset(&mut self) {
        let mut inner = Md5::new();
        inner.update(self.ipad_key);
        self.inner = inner;
        self.cached = None;
    }
}

/// One-shot convenience wrapper: `HMAC-MD5(key, message)`.
pub fn hmac_md5(key: &[u8], message: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new(key);
    mac.add_data(message);
    mac.result()
}

/// Lower-case hex encoding, as used by the CRAM-MD5 response (§4.6 step 7).
pub fn to_hex_lower(digest: &[u8; 16]) -> String {
    let mut out = String::with_capacity(32);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc2104_test_vector() {
        // §8 property 7.
        let digest = hmac_md5(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(to_hex_lower(&digest), "750c783e6ab0b503eaa86e310a5db738");
    }

    #[test]
    fn key_longer_than_block_is_hashed_first() {
        let long_key = vec![0x61u8; 100];
        // Must not panic and must be stable across calls.
        let a = hmac_md5(&long_key, b"hello");
        let b = hmac_md5(&long_key, b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn add_data_invalidates_cache() {
        let mut mac = HmacMd5::new(b"key");
        mac.add_data(b"first");
        let first = mac.result();
        mac.add_data(b"second");
        let second = mac.result();
        assert_ne!(first, second);
    }

    #[test]
    fn incremental_add_data_matches_one_shot() {
        let mut incremental = HmacMd5::new(b"Jefe");
        incremental.add_data(b"what do ya want ");
        incremental.add_data(b"for nothing?");
        let one_shot = hmac_md5(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(incremental.result(), one_shot);
    }
}
