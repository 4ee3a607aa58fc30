//! belt-hash: the 256-bit hash over the sigma compression
//!
//! The compression takes a 64-octet input split as `X ‖ h` (32 octets each)
//! and produces
//!
//! * `sigma1(X ‖ h) = F_X(h₀ ⊕ h₁) ⊕ h₀ ⊕ h₁`, the mixing value folded
//!   into the running checksum `s`, and
//! * `sigma2(X ‖ h)`, the next chaining value, built from two block
//!   encryptions keyed by `sigma1 ‖ h₁` and `¬sigma1 ‖ h₀`.
//!
//! Hashing initializes `h` with the first 32 octets of the substitution
//! table, runs every 32-octet block (the last zero-padded) through both
//! transforms, then derives the digest with one more `sigma2` over
//! `⟨len⟩₆₄ ‖ 0⁶⁴ ‖ s`.

use super::{h_table, BeltKey};
use crate::util::{store_u64_le, xor_assign};
use crate::{Error, Result};

/// `sigma1`: the checksum half of the compression.
pub(crate) fn sigma1(x: &[u8; 32], h: &[u8; 32]) -> [u8; 16] {
    let key = BeltKey::new(x).expect("32-octet key");

    let mut buf = [0u8; 16];
    buf.copy_from_slice(&h[..16]);
    xor_assign(&mut buf, &h[16..]);

    let mut enc = buf;
    key.encrypt_block(&mut enc);
    xor_assign(&mut enc, &buf);

    enc
}

/// `sigma2`: the chaining half of the compression.
pub(crate) fn sigma2(x: &[u8; 32], h: &[u8; 32]) -> [u8; 32] {
    let s1 = sigma1(x, h);

    let mut theta1 = [0u8; 32];
    theta1[..16].copy_from_slice(&s1);
    theta1[16..].copy_from_slice(&h[16..]);

    let mut theta2 = [0u8; 32];
    for (t, v) in theta2[..16].iter_mut().zip(s1.iter()) {
        *t = !v;
    }
    theta2[16..].copy_from_slice(&h[..16]);

    let k1 = BeltKey::new(&theta1).expect("32-octet key");
    let k2 = BeltKey::new(&theta2).expect("32-octet key");

    let mut y = [0u8; 32];

    let mut lo = [0u8; 16];
    lo.copy_from_slice(&x[..16]);
    k1.encrypt_block(&mut lo);
    xor_assign(&mut lo, &x[..16]);
    y[..16].copy_from_slice(&lo);

    let mut hi = [0u8; 16];
    hi.copy_from_slice(&x[16..]);
    k2.encrypt_block(&mut hi);
    xor_assign(&mut hi, &x[16..]);
    y[16..].copy_from_slice(&hi);

    y
}

/// Streaming hash state.
#[derive(Clone, Copy)]
pub struct Hash {
    h: [u8; 32],
    s: [u8; 16],
    len_bits: u64,
    buf: [u8; 32],
    fill: usize,
}

impl Default for Hash {
    fn default() -> Self {
        Self::new()
    }
}

impl Hash {
    pub fn new() -> Self {
        let mut h = [0u8; 32];
        h.copy_from_slice(&h_table()[..32]);

        Hash {
            h,
            s: [0; 16],
            len_bits: 0,
            buf: [0; 32],
            fill: 0,
        }
    }

    /// One-call digest of a whole message.
    pub fn hash(data: &[u8]) -> [u8; 32] {
        let mut st = Hash::new();
        st.step_h(data);
        st.step_g()
    }

    /// One-call digest of a concatenation, without materializing it.
    pub fn hash_parts(parts: &[&[u8]]) -> [u8; 32] {
        let mut st = Hash::new();
        for part in parts {
            st.step_h(part);
        }
        st.step_g()
    }

    fn compress_block(&mut self) {
        let x = self.buf;

        let d = sigma1(&x, &self.h);
        xor_assign(&mut self.s, &d);

        self.h = sigma2(&x, &self.h);
    }

    /// Absorb message octets.
    pub fn step_h(&mut self, data: &[u8]) {
        for &v in data {
            self.buf[self.fill] = v;
            self.fill += 1;

            if self.fill == 32 {
                self.compress_block();
                self.len_bits = self.len_bits.wrapping_add(256);
                self.fill = 0;
            }
        }
    }

    /// Produce the digest. The state may continue absorbing afterwards.
    pub fn step_g(&self) -> [u8; 32] {
        let mut tail = *self;

        if tail.fill > 0 {
            for i in tail.fill..32 {
                tail.buf[i] = 0;
            }

            let fill_bits = (tail.fill as u64) * 8;
            tail.compress_block();
            tail.len_bits = tail.len_bits.wrapping_add(fill_bits);
        }

        let mut fin = [0u8; 32];
        store_u64_le(tail.len_bits, &mut fin[..8]);
        fin[16..].copy_from_slice(&tail.s);

        sigma2(&fin, &tail.h)
    }

    /// Truncated digest: the first `len <= 32` octets.
    pub fn step_g2(&self, len: usize) -> Result<Vec<u8>> {
        if len == 0 || len > 32 {
            return Err(Error::BadLength);
        }

        Ok(self.step_g()[..len].to_vec())
    }
}
