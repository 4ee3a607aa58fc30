//! belt-HMAC and the PBKDF2 password-based derivation over it
//!
//! The HMAC block size is 32 octets (one hash block); longer keys are
//! hashed down first. Pads are the usual `0x36` / `0x5C`.

use subtle::ConstantTimeEq;

use super::hash::Hash;
use crate::{Error, Result};

/// Streaming HMAC state.
#[derive(Clone)]
pub struct Hmac {
    inner: Hash,
    okey: [u8; 32],
}

impl Hmac {
    pub fn new(key: &[u8]) -> Self {
        let mut k = [0u8; 32];

        if key.len() <= 32 {
            k[..key.len()].copy_from_slice(key);
        } else {
            k.copy_from_slice(&Hash::hash(key));
        }

        let mut ikey = [0u8; 32];
        let mut okey = [0u8; 32];

        for i in 0..32 {
            ikey[i] = k[i] ^ 0x36;
            okey[i] = k[i] ^ 0x5C;
        }

        let mut inner = Hash::new();
        inner.step_h(&ikey);

        Hmac { inner, okey }
    }

    /// One-call tag over a whole message.
    pub fn hmac(key: &[u8], data: &[u8]) -> [u8; 32] {
        let mut st = Hmac::new(key);
        st.step_a(data);
        st.step_g()
    }

    /// Absorb message octets.
    pub fn step_a(&mut self, data: &[u8]) {
        self.inner.step_h(data);
    }

    /// Produce the 256-bit tag; the state may continue absorbing.
    pub fn step_g(&self) -> [u8; 32] {
        let inner_digest = self.inner.step_g();

        let mut outer = Hash::new();
        outer.step_h(&self.okey);
        outer.step_h(&inner_digest);

        outer.step_g()
    }

    /// Timing-safe verification of a full or truncated tag.
    pub fn step_v(&self, tag: &[u8]) -> Result<()> {
        if tag.is_empty() || tag.len() > 32 {
            return Err(Error::BadLength);
        }

        if bool::from(self.step_g()[..tag.len()].ct_eq(tag)) {
            Ok(())
        } else {
            Err(Error::BadMac)
        }
    }
}

/// PBKDF2 over belt-HMAC, first block only (256-bit output).
///
/// `iter >= 1`; the block index `1` is appended to the salt big-endian, per
/// the RFC convention.
pub fn pbkdf2(pwd: &[u8], salt: &[u8], iter: usize) -> Result<[u8; 32]> {
    if iter == 0 {
        return Err(Error::BadInput);
    }

    let mut st = Hmac::new(pwd);
    st.step_a(salt);
    st.step_a(&[0x00, 0x00, 0x00, 0x01]);

    let mut u = st.step_g();
    let mut out = u;

    for _ in 1..iter {
        u = Hmac::hmac(pwd, &u);

        for (o, v) in out.iter_mut().zip(u.iter()) {
            *o ^= v;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belt::h_table;

    #[test]
    fn chunking_invariance() {
        let key = &h_table()[..29];
        let data = &h_table()[32..130];

        let whole = Hmac::hmac(key, data);

        let mut st = Hmac::new(key);
        st.step_a(&data[..45]);
        st.step_a(&data[45..]);

        assert_eq!(st.step_g(), whole);
    }

    #[test]
    fn key_and_message_sensitivity() {
        let t = Hmac::hmac(b"key", b"message");

        assert_ne!(Hmac::hmac(b"kez", b"message"), t);
        assert_ne!(Hmac::hmac(b"key", b"messagf"), t);

        // a key longer than the block is hashed down
        let long = [0x42u8; 64];
        let short = Hash::hash(&long);

        assert_eq!(Hmac::hmac(&long, b"m"), Hmac::hmac(&short, b"m"));
    }

    #[test]
    fn verify_tags() {
        let mut st = Hmac::new(b"secret");
        st.step_a(b"data");

        let tag = st.step_g();

        assert!(st.step_v(&tag).is_ok());
        assert!(st.step_v(&tag[..16]).is_ok());

        let mut bad = tag;
        bad[0] ^= 1;
        assert_eq!(st.step_v(&bad), Err(Error::BadMac));
    }

    #[test]
    fn pbkdf2_iterates() {
        let one = pbkdf2(b"pwd", b"salt", 1).unwrap();
        let two = pbkdf2(b"pwd", b"salt", 2).unwrap();
        let two_again = pbkdf2(b"pwd", b"salt", 2).unwrap();

        assert_ne!(one, two);
        assert_eq!(two, two_again);

        // first iteration is hmac(pwd, salt || 0x00000001)
        let mut direct = Hmac::new(b"pwd");
        direct.step_a(b"salt");
        direct.step_a(&[0, 0, 0, 1]);
        assert_eq!(one, direct.step_g());

        assert!(pbkdf2(b"pwd", b"salt", 0).is_err());
    }
}
