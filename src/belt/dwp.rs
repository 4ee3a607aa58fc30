//! belt-DWP: authenticated encryption with associated data
//!
//! Confidentiality comes from the CTR keystream; authenticity from a
//! polynomial authenticator over GF(2¹²⁸) with the reduction
//! `x¹²⁸ + x⁷ + x² + x + 1`. The multiplier `r` is the encryption of the
//! initial counter. Associated data is absorbed first, then ciphertext;
//! finalization folds in the two bit lengths and encrypts the accumulator,
//! yielding a 64-bit tag.
//!
//! The step discipline is strict: once payload processing starts, more
//! associated data is refused with [`Error::BadLogic`].

use subtle::ConstantTimeEq;

use super::modes::Ctr;
use super::BeltKey;
use crate::util::{store_u64_le, xor_assign};
use crate::{Error, Result};

/// Carry-less multiply in GF(2¹²⁸), little-endian bit order, reduction
/// octet 0x87.
fn gf128_mul(a: &[u8; 16], b: &[u8; 16]) -> [u8; 16] {
    let mut v = u128::from_le_bytes(*a);
    let y = u128::from_le_bytes(*b);

    let mut z = 0u128;

    for i in 0..128 {
        let mask = (y >> i) & 1;
        z ^= v * mask;

        let carry = v >> 127;
        v = (v << 1) ^ (carry * 0x87);
    }

    z.to_le_bytes()
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Phase {
    Aad,
    Data,
}

/// Streaming AEAD state.
pub struct Dwp {
    ctr: Ctr,
    key: BeltKey,
    r: [u8; 16],
    t: [u8; 16],
    buf: [u8; 16],
    fill: usize,
    len_aad: u64,
    len_data: u64,
    phase: Phase,
}

impl Dwp {
    /// Start a unit under `key` with a fresh 128-bit synchro value.
    pub fn new(key: BeltKey, iv: &[u8; 16]) -> Self {
        let s = key.encrypt_copy(iv);
        let r = key.encrypt_copy(&s);

        Dwp {
            ctr: Ctr::from_state(key.clone(), s),
            key,
            r,
            t: [0; 16],
            buf: [0; 16],
            fill: 0,
            len_aad: 0,
            len_data: 0,
            phase: Phase::Aad,
        }
    }

    fn absorb(&mut self, data: &[u8]) {
        for &v in data {
            self.buf[self.fill] = v;
            self.fill += 1;

            if self.fill == 16 {
                xor_assign(&mut self.t, &self.buf);
                self.t = gf128_mul(&self.t, &self.r);
                self.fill = 0;
            }
        }
    }

    fn flush_partial(&mut self) {
        if self.fill > 0 {
            for i in self.fill..16 {
                self.buf[i] = 0;
            }

            let buf = self.buf;
            xor_assign(&mut self.t, &buf);
            self.t = gf128_mul(&self.t, &self.r);
            self.fill = 0;
        }
    }

    /// Absorb associated data. Only valid before any payload.
    pub fn step_i(&mut self, aad: &[u8]) -> Result<()> {
        if self.phase != Phase::Aad {
            return Err(Error::BadLogic);
        }

        self.len_aad = self.len_aad.wrapping_add(aad.len() as u64 * 8);
        self.absorb(aad);

        Ok(())
    }

    fn begin_data(&mut self) {
        if self.phase == Phase::Aad {
            // the associated data ends on a zero-padded block boundary
            self.flush_partial();
            self.phase = Phase::Data;
        }
    }

    /// Encrypt payload in place and authenticate the ciphertext.
    pub fn step_e(&mut self, buf: &mut [u8]) {
        self.begin_data();

        self.ctr.apply(buf);

        self.len_data = self.len_data.wrapping_add(buf.len() as u64 * 8);
        self.absorb(buf);
    }

    /// Authenticate ciphertext octets without transforming them.
    ///
    /// Pairs with [`Dwp::step_d`] in decrypt pipelines that authenticate
    /// before deciphering.
    pub fn step_a(&mut self, cipher: &[u8]) {
        self.begin_data();

        self.len_data = self.len_data.wrapping_add(cipher.len() as u64 * 8);
        self.absorb(cipher);
    }

    /// Decrypt payload in place, authenticating the ciphertext.
    pub fn step_d(&mut self, buf: &mut [u8]) {
        self.begin_data();

        self.len_data = self.len_data.wrapping_add(buf.len() as u64 * 8);
        self.absorb(buf);

        self.ctr.apply(buf);
    }

    fn tag(&self) -> [u8; 8] {
        let mut tail = Dwp {
            ctr: Ctr::from_state(self.key.clone(), self.ctr.state()),
            key: self.key.clone(),
            r: self.r,
            t: self.t,
            buf: self.buf,
            fill: self.fill,
            len_aad: self.len_aad,
            len_data: self.len_data,
            phase: self.phase,
        };

        tail.flush_partial();

        let mut lengths = [0u8; 16];
        store_u64_le(tail.len_aad, &mut lengths[..8]);
        store_u64_le(tail.len_data, &mut lengths[8..]);

        xor_assign(&mut tail.t, &lengths);
        tail.t = gf128_mul(&tail.t, &tail.r);

        let mut block = tail.t;
        tail.key.encrypt_block(&mut block);

        let mut tag = [0u8; 8];
        tag.copy_from_slice(&block[..8]);
        tag
    }

    /// Produce the 64-bit tag.
    pub fn step_g(&self) -> [u8; 8] {
        self.tag()
    }

    /// Timing-safe tag verification.
    pub fn step_v(&self, tag: &[u8]) -> Result<()> {
        if tag.len() != 8 {
            return Err(Error::BadLength);
        }

        if bool::from(self.tag().ct_eq(tag)) {
            Ok(())
        } else {
            Err(Error::BadMac)
        }
    }
}

/// One-call authenticated encryption: returns `cipher ‖ tag`.
pub fn dwp_wrap(key: BeltKey, iv: &[u8; 16], aad: &[u8], data: &[u8]) -> Vec<u8> {
    let mut st = Dwp::new(key, iv);

    st.step_i(aad).expect("fresh unit accepts aad");

    let mut out = data.to_vec();
    st.step_e(&mut out);

    out.extend_from_slice(&st.step_g());
    out
}

/// One-call authenticated decryption of `cipher ‖ tag`.
pub fn dwp_unwrap(key: BeltKey, iv: &[u8; 16], aad: &[u8], token: &[u8]) -> Result<Vec<u8>> {
    if token.len() < 8 {
        return Err(Error::BadLength);
    }

    let (cipher, tag) = token.split_at(token.len() - 8);

    let mut st = Dwp::new(key, iv);

    st.step_i(aad)?;
    st.step_a(cipher);
    st.step_v(tag)?;

    // tag verified; now decipher
    let mut out = cipher.to_vec();
    let mut dec = Ctr::from_state(st.key.clone(), st.key.encrypt_copy(iv));
    dec.apply(&mut out);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belt::h_table;

    fn key() -> BeltKey {
        BeltKey::new(&h_table()[128..160]).unwrap()
    }

    fn iv() -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&h_table()[192..208]);
        iv
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let aad = &h_table()[..27];
        let data = &h_table()[32..95];

        let token = dwp_wrap(key(), &iv(), aad, data);
        assert_eq!(token.len(), data.len() + 8);

        let back = dwp_unwrap(key(), &iv(), aad, &token).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn any_mutation_fails() {
        let aad = b"associated";
        let data = b"payload octets here";

        let token = dwp_wrap(key(), &iv(), aad, data);

        for idx in 0..token.len() {
            let mut bad = token.clone();
            bad[idx] ^= 0x01;

            assert_eq!(
                dwp_unwrap(key(), &iv(), aad, &bad),
                Err(Error::BadMac),
                "octet {}",
                idx
            );
        }

        // mutated aad
        assert_eq!(
            dwp_unwrap(key(), &iv(), b"Associated", &token),
            Err(Error::BadMac)
        );

        // mutated synchro
        let mut iv2 = iv();
        iv2[3] ^= 0x80;
        assert_eq!(dwp_unwrap(key(), &iv2, aad, &token), Err(Error::BadMac));
    }

    #[test]
    fn aad_after_data_is_refused() {
        let mut st = Dwp::new(key(), &iv());

        st.step_i(b"ok").unwrap();

        let mut payload = [0u8; 20];
        st.step_e(&mut payload);

        assert_eq!(st.step_i(b"late"), Err(Error::BadLogic));
    }

    #[test]
    fn decrypt_steps_match_encrypt() {
        let data = b"sixteen-plus octet message.....!";

        let mut st = Dwp::new(key(), &iv());
        let mut cipher = data.to_vec();
        st.step_e(&mut cipher);
        let tag = st.step_g();

        let mut st2 = Dwp::new(key(), &iv());
        let mut plain = cipher.clone();
        st2.step_d(&mut plain);

        assert_eq!(&plain, data);
        assert!(st2.step_v(&tag).is_ok());
    }

    #[test]
    fn empty_payload_is_a_mac() {
        let token = dwp_wrap(key(), &iv(), b"only aad", &[]);
        assert_eq!(token.len(), 8);

        assert!(dwp_unwrap(key(), &iv(), b"only aad", &token).is_ok());
        assert!(dwp_unwrap(key(), &iv(), b"other aad", &token).is_err());
    }

    #[test]
    fn gf_multiply_identities() {
        let one = {
            let mut b = [0u8; 16];
            b[0] = 1;
            b
        };
        let x = {
            let mut b = [0u8; 16];
            b[0] = 2;
            b
        };

        let a = *b"abcdefghijklmnop";

        assert_eq!(gf128_mul(&a, &one), a);

        // multiplication by x equals the doubling used for MAC subkeys
        assert_eq!(gf128_mul(&a, &x), super::super::mac::phi1(&a));

        // commutativity
        let b = *b"ABCDEFGHIJKLMNOP";
        assert_eq!(gf128_mul(&a, &b), gf128_mul(&b, &a));
    }
}
