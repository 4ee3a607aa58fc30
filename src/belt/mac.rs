//! belt-MAC: the CBC-MAC style authenticator
//!
//! Chaining runs `s ← belt-block(s ⊕ Xᵢ)` over complete blocks; the final
//! block is mixed with one of two subkeys derived from the encryption of the
//! zero block: `φ₁(r)` when the message length is a block multiple, `φ₂(r)`
//! after `0x80` padding otherwise. `φ₁` is doubling in GF(2¹²⁸) with the
//! reduction octet `0x87`, the same field the AEAD authenticator uses.
//!
//! The default tag is 64 bits; [`Mac::step_g2`] truncates further.

use subtle::ConstantTimeEq;

use super::BeltKey;
use crate::util::xor_assign;
use crate::{Error, Result};

/// Double in GF(2¹²⁸) over the little-endian interpretation.
pub(crate) fn phi1(block: &[u8; 16]) -> [u8; 16] {
    let v = u128::from_le_bytes(*block);

    let carry = (v >> 127) as u8;
    let mut d = v << 1;

    if carry == 1 {
        d ^= 0x87;
    }

    d.to_le_bytes()
}

fn phi2(block: &[u8; 16]) -> [u8; 16] {
    phi1(&phi1(block))
}

/// Streaming MAC state.
pub struct Mac {
    key: BeltKey,
    s: [u8; 16],
    r: [u8; 16],
    buf: [u8; 16],
    fill: usize,
}

impl Mac {
    pub fn new(key: BeltKey) -> Self {
        let r = key.encrypt_copy(&[0u8; 16]);

        Mac {
            key,
            s: [0; 16],
            r,
            buf: [0; 16],
            fill: 0,
        }
    }

    /// One-call MAC over a whole message.
    pub fn mac(key: BeltKey, data: &[u8]) -> [u8; 8] {
        let mut mac = Mac::new(key);
        mac.step_a(data);
        mac.step_g()
    }

    /// Absorb message octets.
    pub fn step_a(&mut self, data: &[u8]) {
        for &v in data {
            // the most recent block stays buffered so finalization can pick
            // the subkey branch
            if self.fill == 16 {
                xor_assign(&mut self.s, &self.buf);
                self.key.encrypt_block(&mut self.s);
                self.fill = 0;
            }

            self.buf[self.fill] = v;
            self.fill += 1;
        }
    }

    /// Produce the 64-bit tag. The state stays usable for further input.
    pub fn step_g(&self) -> [u8; 8] {
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&self.wide_tag()[..8]);
        tag
    }

    /// Produce a truncated tag of `len <= 8` octets.
    pub fn step_g2(&self, len: usize) -> Result<Vec<u8>> {
        if len == 0 || len > 8 {
            return Err(Error::BadLength);
        }

        Ok(self.wide_tag()[..len].to_vec())
    }

    /// Timing-safe verification of a tag of 1..=8 octets.
    pub fn step_v(&self, tag: &[u8]) -> Result<()> {
        if tag.is_empty() || tag.len() > 8 {
            return Err(Error::BadLength);
        }

        let wide = self.wide_tag();

        if bool::from(wide[..tag.len()].ct_eq(tag)) {
            Ok(())
        } else {
            Err(Error::BadMac)
        }
    }

    fn wide_tag(&self) -> [u8; 16] {
        let mut s = self.s;

        let mut last = [0u8; 16];

        if self.fill == 16 {
            last.copy_from_slice(&self.buf);
            xor_assign(&mut last, &phi1(&self.r));
        } else {
            last[..self.fill].copy_from_slice(&self.buf[..self.fill]);
            last[self.fill] = 0x80;
            xor_assign(&mut last, &phi2(&self.r));
        }

        xor_assign(&mut s, &last);
        self.key.encrypt_block(&mut s);

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belt::h_table;

    fn key() -> BeltKey {
        BeltKey::new(&h_table()[128..160]).unwrap()
    }

    #[test]
    fn deterministic_and_chunking_invariant() {
        let data = &h_table()[..47];

        let t1 = Mac::mac(key(), data);

        let mut mac = Mac::new(key());
        mac.step_a(&data[..13]);
        mac.step_a(&data[13..40]);
        mac.step_a(&data[40..]);

        assert_eq!(mac.step_g(), t1);
    }

    #[test]
    fn length_extension_changes_tag() {
        let t1 = Mac::mac(key(), &h_table()[..32]);
        let t2 = Mac::mac(key(), &h_table()[..33]);
        let t3 = Mac::mac(key(), &h_table()[..31]);

        assert_ne!(t1, t2);
        assert_ne!(t1, t3);

        // empty message is a valid input
        let t4 = Mac::mac(key(), &[]);
        assert_ne!(t4, t1);
    }

    #[test]
    fn padding_branches_differ() {
        // a block-aligned message and the same octets with an explicit 0x80
        // pad must not collide (distinct subkeys)
        let mut padded = h_table()[..16].to_vec();
        padded.push(0x80);
        while padded.len() < 32 {
            padded.push(0);
        }

        let aligned = Mac::mac(key(), &h_table()[..16]);
        let manual = Mac::mac(key(), &padded);

        assert_ne!(aligned, manual);
    }

    #[test]
    fn verify_and_truncate() {
        let mut mac = Mac::new(key());
        mac.step_a(b"the quick brown fox");

        let tag = mac.step_g();

        assert!(mac.step_v(&tag).is_ok());
        assert!(mac.step_v(&tag[..4]).is_ok());

        let mut bad = tag;
        bad[7] ^= 1;
        assert_eq!(mac.step_v(&bad), Err(Error::BadMac));

        let short = mac.step_g2(5).unwrap();
        assert_eq!(short, tag[..5].to_vec());
        assert!(mac.step_g2(9).is_err());
    }

    #[test]
    fn subkey_doubling() {
        // doubling is linear shift with conditional reduction
        let one = {
            let mut b = [0u8; 16];
            b[0] = 1;
            b
        };

        assert_eq!(phi1(&one)[0], 2);

        let mut top = [0u8; 16];
        top[15] = 0x80;

        // 2^127 doubled reduces to the polynomial tail
        assert_eq!(phi1(&top)[0], 0x87);
        assert_eq!(&phi1(&top)[1..], &[0u8; 15]);
    }
}
