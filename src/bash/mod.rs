//! The bash sponge family (STB 34.101.77)
//!
//! `bash-f` permutes a 1536-bit state held as 24 little-endian 64-bit words.
//! Each of the 24 rounds pushes every column triple `(w[j], w[j+8],
//! w[j+16])` through the keyed-rotation S transformation, shuffles the words
//! by a fixed permutation, and folds a round constant into the last word.
//! The constants walk an LFSR seeded from the belt substitution table.
//!
//! The hash of level `l ∈ {128, 192, 256}` absorbs through a rate of
//! `1536 - 4l` bits, pads with the domain octet `0x40`, and squeezes a
//! `2l`-bit digest.

use crate::{Error, Result};

/// Rotation quadruples `(m1, n1, m2, n2)` for the eight columns.
const ROT: [(u32, u32, u32, u32); 8] = [
    (8, 53, 14, 1),
    (56, 51, 34, 7),
    (8, 37, 46, 49),
    (56, 3, 2, 23),
    (8, 21, 14, 33),
    (56, 19, 34, 39),
    (8, 5, 46, 17),
    (56, 35, 2, 55),
];

/// Word shuffle applied after the S layer.
const PERM: [usize; 24] = [
    15, 10, 9, 12, 11, 14, 13, 8, 17, 16, 19, 18, 21, 20, 23, 22, 6, 3, 0, 5, 2, 7, 4, 1,
];

/// First round constant; successors step the LFSR.
const C1: u64 = 0x3BF5_080A_C8BA_94B1;

#[inline]
fn next_c(c: u64) -> u64 {
    if c & 1 == 1 {
        (c >> 1) ^ 0xDC2B_E199_7FE0_D8AE
    } else {
        c >> 1
    }
}

#[inline]
fn bash_s(
    w0: u64,
    w1: u64,
    w2: u64,
    m1: u32,
    n1: u32,
    m2: u32,
    n2: u32,
) -> (u64, u64, u64) {
    let t2 = w0.rotate_left(m1);

    let u0 = w0 ^ w1 ^ w2;

    let t1 = w1 ^ u0.rotate_left(n1);

    let u1 = t1 ^ t2;
    let u2 = w2 ^ w2.rotate_left(m2) ^ t1.rotate_left(n2);

    let v0 = u0 ^ (!u2 | u1);
    let v1 = u1 ^ (u0 | u2);
    let v2 = u2 ^ (u0 & u1);

    (v0, v1, v2)
}

/// The 1536-bit permutation over 192 state octets.
pub fn bash_f(state: &mut [u8; 192]) {
    let mut w = [0u64; 24];

    for (i, slot) in w.iter_mut().enumerate() {
        *slot = crate::util::load_u64_le(&state[8 * i..]);
    }

    let mut c = C1;

    for _round in 0..24 {
        for j in 0..8 {
            let (m1, n1, m2, n2) = ROT[j];

            let (a, b, d) = bash_s(w[j], w[j + 8], w[j + 16], m1, n1, m2, n2);

            w[j] = a;
            w[j + 8] = b;
            w[j + 16] = d;
        }

        let mut nw = [0u64; 24];
        for (i, slot) in nw.iter_mut().enumerate() {
            *slot = w[PERM[i]];
        }
        w = nw;

        w[23] ^= c;
        c = next_c(c);
    }

    for (i, v) in w.iter().enumerate() {
        crate::util::store_u64_le(*v, &mut state[8 * i..]);
    }
}

/// Streaming hash state for one security level.
#[derive(Clone)]
pub struct BashHash {
    state: [u8; 192],
    rate: usize,
    /// Digest length in octets (`l / 4`).
    digest_len: usize,
    pos: usize,
}

impl BashHash {
    /// Start a hash of level `l ∈ {128, 192, 256}`.
    pub fn new(l: usize) -> Result<Self> {
        match l {
            128 | 192 | 256 => (),
            _ => return Err(Error::BadParams),
        }

        let mut state = [0u8; 192];

        // the capacity tail encodes the level
        state[192 - 8] = (l / 4) as u8;

        Ok(BashHash {
            state,
            rate: 192 - l / 2,
            digest_len: l / 4,
            pos: 0,
        })
    }

    /// Level-128 (256-bit digest) convenience.
    pub fn bash256(data: &[u8]) -> [u8; 32] {
        let mut st = BashHash::new(128).expect("valid level");
        st.step_h(data);

        let mut out = [0u8; 32];
        out.copy_from_slice(&st.step_g());
        out
    }

    /// Level-192 (384-bit digest) convenience.
    pub fn bash384(data: &[u8]) -> [u8; 48] {
        let mut st = BashHash::new(192).expect("valid level");
        st.step_h(data);

        let mut out = [0u8; 48];
        out.copy_from_slice(&st.step_g());
        out
    }

    /// Level-256 (512-bit digest) convenience.
    pub fn bash512(data: &[u8]) -> [u8; 64] {
        let mut st = BashHash::new(256).expect("valid level");
        st.step_h(data);

        let mut out = [0u8; 64];
        out.copy_from_slice(&st.step_g());
        out
    }

    /// Absorb message octets.
    pub fn step_h(&mut self, data: &[u8]) {
        for &v in data {
            self.state[self.pos] ^= v;
            self.pos += 1;

            if self.pos == self.rate {
                bash_f(&mut self.state);
                self.pos = 0;
            }
        }
    }

    /// Produce the digest; the state may continue absorbing afterwards.
    pub fn step_g(&self) -> Vec<u8> {
        let mut tail = self.clone();

        // domain separation pad
        tail.state[tail.pos] ^= 0x40;
        bash_f(&mut tail.state);

        tail.state[..tail.digest_len].to_vec()
    }

    /// Truncated digest of `len` octets, `len <= l/4`.
    pub fn step_g2(&self, len: usize) -> Result<Vec<u8>> {
        if len == 0 || len > self.digest_len {
            return Err(Error::BadLength);
        }

        Ok(self.step_g()[..len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_changes_state() {
        let mut a = [0u8; 192];
        bash_f(&mut a);

        // the zero state must not be a fixed point
        assert_ne!(a, [0u8; 192]);

        // and the permutation must be deterministic
        let mut b = [0u8; 192];
        bash_f(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn avalanche() {
        let mut a = [0u8; 192];
        let mut b = [0u8; 192];
        b[0] = 1;

        bash_f(&mut a);
        bash_f(&mut b);

        let differing = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();

        assert!(differing > 96, "only {} differing octets", differing);
    }

    #[test]
    fn levels_and_lengths() {
        let data = b"bash sponge input";

        assert_eq!(BashHash::bash256(data).len(), 32);
        assert_eq!(BashHash::bash384(data).len(), 48);
        assert_eq!(BashHash::bash512(data).len(), 64);

        // levels must disagree even on equal input
        assert_ne!(
            BashHash::bash256(data)[..32].to_vec(),
            BashHash::bash512(data)[..32].to_vec()
        );

        assert!(BashHash::new(100).is_err());
    }

    #[test]
    fn chunking_invariance() {
        let data: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();

        for l in [128usize, 192, 256] {
            let mut whole = BashHash::new(l).unwrap();
            whole.step_h(&data);

            let mut pieces = BashHash::new(l).unwrap();
            pieces.step_h(&data[..77]);
            pieces.step_h(&data[77..200]);
            pieces.step_h(&data[200..]);

            assert_eq!(whole.step_g(), pieces.step_g(), "level {}", l);
        }
    }

    #[test]
    fn message_sensitivity() {
        assert_ne!(BashHash::bash256(b""), BashHash::bash256(b"\0"));
        assert_ne!(BashHash::bash256(b"abc"), BashHash::bash256(b"abd"));

        let t = BashHash::new(128).unwrap();
        assert!(t.step_g2(32).is_ok());
        assert!(t.step_g2(33).is_err());
    }
}
