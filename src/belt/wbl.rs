//! belt-WBL wide-block cipher and the KWP key wrap built on it
//!
//! WBL treats a whole buffer of at least 32 octets as one block. Each of the
//! `2n` rounds (`n` = block count) folds the leading blocks into a sum `s`,
//! feeds `belt-block(s) ⊕ ⟨round⟩` into the trailing 16-octet window,
//! replaces the leading block by `s` and rotates the buffer one block left.
//! Buffers that are not a multiple of 16 use the genuinely trailing window,
//! which may overlap the last whole block; the decryption order (un-rotate,
//! recover `s`, undo the window, then rebuild the leading block) keeps the
//! transform a permutation for every length.
//!
//! KWP appends a 16-octet authenticity header to the key material and runs
//! WBL over the union; unwrapping verifies the header in constant time.

use crate::util::{mem_eq_ct, store_u32_le, xor_assign};
use crate::{Error, Result};

use super::BeltKey;

/// The wide-block cipher.
pub struct Wbl {
    key: BeltKey,
}

impl Wbl {
    pub fn new(key: BeltKey) -> Self {
        Wbl { key }
    }

    /// Sum of the leading blocks: all whole blocks strictly before the
    /// trailing window.
    fn leading_sum(buf: &[u8]) -> [u8; 16] {
        let mut s = [0u8; 16];

        let mut off = 0;
        while off + 16 < buf.len() {
            xor_assign(&mut s, &buf[off..off + 16]);
            off += 16;
        }

        s
    }

    /// Encrypt in place; `buf.len() >= 32`.
    pub fn encrypt(&self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();

        if len < 32 {
            return Err(Error::BadLength);
        }

        let n = (len + 15) / 16;

        for round in 1..=(2 * n as u32) {
            let s = Self::leading_sum(buf);

            let mut t = s;
            self.key.encrypt_block(&mut t);

            let mut rnd = [0u8; 4];
            store_u32_le(round, &mut rnd);
            xor_assign(&mut t[..4], &rnd);

            xor_assign(&mut buf[len - 16..], &t);

            buf[..16].copy_from_slice(&s);
            buf.rotate_left(16);
        }

        Ok(())
    }

    /// Decrypt in place; `buf.len() >= 32`.
    pub fn decrypt(&self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();

        if len < 32 {
            return Err(Error::BadLength);
        }

        let n = (len + 15) / 16;

        for round in (1..=(2 * n as u32)).rev() {
            buf.rotate_right(16);

            let mut s = [0u8; 16];
            s.copy_from_slice(&buf[..16]);

            let mut t = s;
            self.key.encrypt_block(&mut t);

            let mut rnd = [0u8; 4];
            store_u32_le(round, &mut rnd);
            xor_assign(&mut t[..4], &rnd);

            // undo the window before the leading sum is rebuilt: for ragged
            // lengths the window overlaps the last whole block
            xor_assign(&mut buf[len - 16..], &t);

            // leading block = s ⊕ (sum of the other leading blocks)
            let mut b0 = s;
            let mut off = 16;
            while off + 16 < len {
                let mut blk = [0u8; 16];
                blk.copy_from_slice(&buf[off..off + 16]);
                xor_assign(&mut b0, &blk);
                off += 16;
            }

            buf[..16].copy_from_slice(&b0);
        }

        Ok(())
    }
}

/// Wrap key material (`>= 16` octets) under an optional 16-octet header.
///
/// The output is `data.len() + 16` octets. A missing header authenticates
/// as all zeroes.
pub fn kwp_wrap(key: BeltKey, data: &[u8], header: Option<&[u8; 16]>) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Err(Error::BadLength);
    }

    let mut buf = data.to_vec();

    match header {
        Some(h) => buf.extend_from_slice(h),
        None => buf.extend_from_slice(&[0u8; 16]),
    }

    Wbl::new(key).encrypt(&mut buf)?;

    Ok(buf)
}

/// Unwrap a key token, verifying the header.
pub fn kwp_unwrap(key: BeltKey, token: &[u8], header: Option<&[u8; 16]>) -> Result<Vec<u8>> {
    if token.len() < 32 {
        return Err(Error::BadLength);
    }

    let mut buf = token.to_vec();

    Wbl::new(key).decrypt(&mut buf)?;

    let expect = match header {
        Some(h) => *h,
        None => [0u8; 16],
    };

    if !mem_eq_ct(&buf[buf.len() - 16..], &expect) {
        return Err(Error::BadKeyToken);
    }

    buf.truncate(buf.len() - 16);

    Ok(buf)
}
