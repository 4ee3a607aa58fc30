//! The belt block cipher (STB 34.101.31) and everything built over it
//!
//! The cipher proper is a 128-bit block, 256-bit key algorithm; shorter keys
//! (128/192 bits) are expanded by the schedule of the standard. A block is
//! viewed as four 32-bit words in little-endian order; each of the eight
//! rounds applies seven keyed sub-operations built from the S-box
//! transformation `G_r` (substitute octet-wise, then rotate by `r`).
//!
//! The substitution table doubles as the standard's shared test data: the
//! appendix vectors address octets of [`h_table`] directly, and the hash
//! initial value is its first 32 octets.

use zeroize::Zeroize;

use crate::{Error, Result};

pub mod modes;
pub mod mac;
pub mod dwp;
pub mod wbl;
pub mod hash;
pub mod hmac;
pub mod krp;

/// The belt substitution table H.
const H: [u8; 256] = [
    0xB1, 0x94, 0xBA, 0xC8, 0x0A, 0x08, 0xF5, 0x3B, 0x36, 0x6D, 0x00, 0x8E, 0x58, 0x4A, 0x5D, 0xE4,
    0x85, 0x04, 0xFA, 0x9D, 0x1B, 0xB6, 0xC7, 0xAC, 0x25, 0x2E, 0x72, 0xC2, 0x02, 0xFD, 0xCE, 0x0D,
    0x5B, 0xE3, 0xD6, 0x12, 0x17, 0xB9, 0x61, 0x81, 0xFE, 0x67, 0x86, 0xAD, 0x71, 0x6B, 0x89, 0x0B,
    0x5C, 0xB0, 0xC0, 0xFF, 0x33, 0xC3, 0x56, 0xB8, 0x35, 0xC4, 0x05, 0xAE, 0xD8, 0xE0, 0x7F, 0x99,
    0xE1, 0x2B, 0xDC, 0x1A, 0xE2, 0x82, 0x57, 0xEC, 0x70, 0x3F, 0xCC, 0xF0, 0x95, 0xEE, 0x8D, 0xF1,
    0xC1, 0xAB, 0x76, 0x38, 0x9F, 0xE6, 0x78, 0xCA, 0xF7, 0xC6, 0xF8, 0x60, 0xD5, 0xBB, 0x9C, 0x4F,
    0xF3, 0x3C, 0x65, 0x7B, 0x63, 0x7C, 0x30, 0x6A, 0xDD, 0x4E, 0xA7, 0x79, 0x9E, 0xB2, 0x3D, 0x31,
    0x3E, 0x98, 0xB5, 0x6E, 0x27, 0xD3, 0xBC, 0xCF, 0x59, 0x1E, 0x18, 0x1F, 0x4C, 0x5A, 0xB7, 0x93,
    0xE9, 0xDE, 0xE7, 0x2C, 0x8F, 0x0C, 0x0F, 0xA6, 0x2D, 0xDB, 0x49, 0xF4, 0x6F, 0x73, 0x96, 0x47,
    0x06, 0x07, 0x53, 0x16, 0xED, 0x24, 0x7A, 0x37, 0x39, 0xCB, 0xA3, 0x83, 0x03, 0xA9, 0x8B, 0xF6,
    0x92, 0xBD, 0x9B, 0x1C, 0xE5, 0xD1, 0x41, 0x01, 0x54, 0x45, 0xFB, 0xC9, 0x5E, 0x4D, 0x0E, 0xF2,
    0x68, 0x20, 0x80, 0xAA, 0x22, 0x7D, 0x64, 0x2F, 0x26, 0x87, 0xF9, 0x34, 0x90, 0x40, 0x55, 0x11,
    0xBE, 0x32, 0x97, 0x13, 0x43, 0xFC, 0x9A, 0x48, 0xA0, 0x2A, 0x88, 0x5F, 0x19, 0x4B, 0x09, 0xA1,
    0x7E, 0xCD, 0xA4, 0xD0, 0x15, 0x44, 0xAF, 0x8C, 0xA5, 0x84, 0x50, 0xBF, 0x66, 0xD2, 0xE8, 0x8A,
    0xA2, 0xD7, 0x46, 0x52, 0x42, 0xA8, 0xDF, 0xB3, 0x69, 0x74, 0xC5, 0x51, 0xEB, 0x23, 0x29, 0x21,
    0xD4, 0xEF, 0xD9, 0xB4, 0x3A, 0x62, 0x28, 0x75, 0x91, 0x14, 0x10, 0xEA, 0x77, 0x6C, 0xDA, 0x1D,
];

/// The substitution table, which is also the appendix test data string.
pub fn h_table() -> &'static [u8; 256] {
    &H
}

/// Substitute each octet of a word through H.
#[inline]
fn h_word(u: u32) -> u32 {
    let b = u.to_le_bytes();

    u32::from_le_bytes([
        H[b[0] as usize],
        H[b[1] as usize],
        H[b[2] as usize],
        H[b[3] as usize],
    ])
}

#[inline]
fn g5(u: u32) -> u32 {
    h_word(u).rotate_left(5)
}

#[inline]
fn g13(u: u32) -> u32 {
    h_word(u).rotate_left(13)
}

#[inline]
fn g21(u: u32) -> u32 {
    h_word(u).rotate_left(21)
}

/// An expanded belt key: eight 32-bit subkeys.
///
/// Zeroized on drop.
#[derive(Clone)]
pub struct BeltKey {
    k: [u32; 8],
}

impl Drop for BeltKey {
    fn drop(&mut self) {
        self.k.zeroize();
    }
}

impl BeltKey {
    /// Expand a 128-, 192- or 256-bit key.
    pub fn new(key: &[u8]) -> Result<Self> {
        let mut k = [0u32; 8];

        match key.len() {
            16 => {
                for i in 0..4 {
                    k[i] = crate::util::load_u32_le(&key[4 * i..]);
                    k[i + 4] = k[i];
                }
            }
            24 => {
                for i in 0..6 {
                    k[i] = crate::util::load_u32_le(&key[4 * i..]);
                }
                k[6] = k[0] ^ k[1] ^ k[2];
                k[7] = k[3] ^ k[4] ^ k[5];
            }
            32 => {
                for i in 0..8 {
                    k[i] = crate::util::load_u32_le(&key[4 * i..]);
                }
            }
            _ => return Err(Error::BadLength),
        }

        Ok(BeltKey { k })
    }

    /// Encrypt one 128-bit block in place.
    pub fn encrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), 16);

        let mut a = crate::util::load_u32_le(&block[0..]);
        let mut b = crate::util::load_u32_le(&block[4..]);
        let mut c = crate::util::load_u32_le(&block[8..]);
        let mut d = crate::util::load_u32_le(&block[12..]);

        for i in 1..=8u32 {
            let k = |j: u32| self.k[((7 * (i - 1) + j) % 8) as usize];

            b ^= g5(a.wrapping_add(k(0)));
            c ^= g21(d.wrapping_add(k(1)));
            a = a.wrapping_sub(g13(b.wrapping_add(k(2))));

            let e = g21(b.wrapping_add(c).wrapping_add(k(3))) ^ i;

            b = b.wrapping_add(e);
            c = c.wrapping_sub(e);

            d ^= g13(c.wrapping_add(k(4)));
            b ^= g21(a.wrapping_add(k(5)));
            c ^= g5(d.wrapping_add(k(6)));

            let (na, nb, nc, nd) = (b, d, a, c);
            a = na;
            b = nb;
            c = nc;
            d = nd;
        }

        crate::util::store_u32_le(a, &mut block[0..]);
        crate::util::store_u32_le(b, &mut block[4..]);
        crate::util::store_u32_le(c, &mut block[8..]);
        crate::util::store_u32_le(d, &mut block[12..]);
    }

    /// Decrypt one 128-bit block in place.
    pub fn decrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), 16);

        let mut a = crate::util::load_u32_le(&block[0..]);
        let mut b = crate::util::load_u32_le(&block[4..]);
        let mut c = crate::util::load_u32_le(&block[8..]);
        let mut d = crate::util::load_u32_le(&block[12..]);

        for i in (1..=8u32).rev() {
            let k = |j: u32| self.k[((7 * (i - 1) + j) % 8) as usize];

            let (na, nb, nc, nd) = (c, a, d, b);
            a = na;
            b = nb;
            c = nc;
            d = nd;

            c ^= g5(d.wrapping_add(k(6)));
            b ^= g21(a.wrapping_add(k(5)));
            d ^= g13(c.wrapping_add(k(4)));

            // b + c is invariant under the e-mixing, so e is recomputable
            let e = g21(b.wrapping_add(c).wrapping_add(k(3))) ^ i;

            b = b.wrapping_sub(e);
            c = c.wrapping_add(e);

            a = a.wrapping_add(g13(b.wrapping_add(k(2))));
            c ^= g21(d.wrapping_add(k(1)));
            b ^= g5(a.wrapping_add(k(0)));
        }

        crate::util::store_u32_le(a, &mut block[0..]);
        crate::util::store_u32_le(b, &mut block[4..]);
        crate::util::store_u32_le(c, &mut block[8..]);
        crate::util::store_u32_le(d, &mut block[12..]);
    }

    /// Encrypt a copy of a block.
    pub(crate) fn encrypt_copy(&self, block: &[u8]) -> [u8; 16] {
        let mut out = [0u8; 16];
        out.copy_from_slice(block);
        self.encrypt_block(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_encrypt_vector() {
        // appendix A: X = H[0..16], theta = H[128..160]
        let key = BeltKey::new(&h_table()[128..160]).unwrap();

        let mut block = [0u8; 16];
        block.copy_from_slice(&h_table()[0..16]);

        key.encrypt_block(&mut block);

        assert_eq!(
            block,
            hex_literal::hex!("69CCA1C93557C9E3D66BC3E0FA88FA6E")
        );
    }

    #[test]
    fn block_decrypt_vector() {
        // appendix A: Y = H[64..80], theta = H[160..192]
        let key = BeltKey::new(&h_table()[160..192]).unwrap();

        let mut block = [0u8; 16];
        block.copy_from_slice(&h_table()[64..80]);

        key.decrypt_block(&mut block);

        assert_eq!(
            block,
            hex_literal::hex!("0DC5300600CAB840B38448E5E993F421")
        );
    }

    #[test]
    fn round_trip_all_key_sizes() {
        let data = [0xA5u8; 16];

        for len in [16usize, 24, 32] {
            let key = BeltKey::new(&h_table()[..len]).unwrap();

            let mut block = data;
            key.encrypt_block(&mut block);
            assert_ne!(block, data);

            key.decrypt_block(&mut block);
            assert_eq!(block, data);
        }

        assert!(BeltKey::new(&[0u8; 20]).is_err());
    }

    #[test]
    fn short_keys_expand() {
        // a 128-bit key equals the 256-bit key built by doubling it
        let k16 = BeltKey::new(&h_table()[..16]).unwrap();

        let mut doubled = [0u8; 32];
        doubled[..16].copy_from_slice(&h_table()[..16]);
        doubled[16..].copy_from_slice(&h_table()[..16]);

        let k32 = BeltKey::new(&doubled).unwrap();

        let mut b1 = [0x5Au8; 16];
        let mut b2 = [0x5Au8; 16];

        k16.encrypt_block(&mut b1);
        k32.encrypt_block(&mut b2);

        assert_eq!(b1, b2);
    }
}
