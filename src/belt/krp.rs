//! belt-KRP: key re-derivation
//!
//! One `sigma2` invocation turns a base key into a fresh working key bound
//! to a 12-octet level `D` and a 16-octet header `I`. The compression input
//! is `⟨8·n⟩₃₂ ‖ D ‖ I` against the (zero-padded) base key as the chaining
//! half; the derived key is the leading `n` octets of the output.
//!
//! The derived key never exceeds the base key in length.

use super::hash::sigma2;
use crate::util::store_u32_le;
use crate::{Error, Result};

/// Derive a fresh key of `out_len` octets (16, 24 or 32).
pub fn key_rep(key: &[u8], level: &[u8; 12], header: &[u8; 16], out_len: usize) -> Result<Vec<u8>> {
    match key.len() {
        16 | 24 | 32 => (),
        _ => return Err(Error::BadLength),
    }

    match out_len {
        16 | 24 | 32 => (),
        _ => return Err(Error::BadLength),
    }

    if out_len > key.len() {
        return Err(Error::BadInput);
    }

    let mut x = [0u8; 32];
    store_u32_le(out_len as u32 * 8, &mut x[..4]);
    x[4..16].copy_from_slice(level);
    x[16..].copy_from_slice(header);

    let mut h = [0u8; 32];
    h[..key.len()].copy_from_slice(key);

    let y = sigma2(&x, &h);

    Ok(y[..out_len].to_vec())
}

/// The all-ones level used by the key establishment protocols.
pub fn ones_level() -> [u8; 12] {
    [0xFF; 12]
}

/// Header encoding a small ordinal: the first octets carry the number
/// little-endian, the rest are zero.
pub fn num_header(num: u64) -> [u8; 16] {
    let mut header = [0u8; 16];
    crate::util::store_u64_le(num, &mut header[..8]);
    header
}
