//! Octet-level helpers shared across the suite
//!
//! Everything here operates on little-endian octet strings: octet 0 is the
//! least significant. Comparisons that may see secret data go through
//! [`subtle`] so they cannot leak the position of a mismatch.

use subtle::ConstantTimeEq;

/// Timing-safe equality of two octet strings.
///
/// Strings of different lengths compare unequal; the length itself is not
/// secret.
pub fn mem_eq_ct(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Whether every octet of `a` is zero, without an early exit.
pub fn mem_is_zero_ct(a: &[u8]) -> bool {
    let mut acc = 0u8;

    for &v in a {
        acc |= v;
    }

    acc.ct_eq(&0).into()
}

/// XOR `src` into `dest` octet by octet.
///
/// `dest` must be at least as long as `src`.
pub fn xor_assign(dest: &mut [u8], src: &[u8]) {
    for (d, s) in dest.iter_mut().zip(src.iter()) {
        *d ^= *s;
    }
}

/// Read a `u32` from four little-endian octets.
pub fn load_u32_le(octets: &[u8]) -> u32 {
    let mut raw = [0u8; 4];

    raw.copy_from_slice(&octets[..4]);

    u32::from_le_bytes(raw)
}

/// Write a `u32` as four little-endian octets.
pub fn store_u32_le(val: u32, octets: &mut [u8]) {
    octets[..4].copy_from_slice(&val.to_le_bytes());
}

/// Read a `u64` from eight little-endian octets.
pub fn load_u64_le(octets: &[u8]) -> u64 {
    let mut raw = [0u8; 8];

    raw.copy_from_slice(&octets[..8]);

    u64::from_le_bytes(raw)
}

/// Write a `u64` as eight little-endian octets.
pub fn store_u64_le(val: u64, octets: &mut [u8]) {
    octets[..8].copy_from_slice(&val.to_le_bytes());
}

/// Lower-case base-16 rendering of an octet string, for diagnostics.
pub fn to_hex(octets: &[u8]) -> String {
    let mut out = String::with_capacity(octets.len() * 2);

    for v in octets {
        out.push_str(&format!("{:02x}", v));
    }

    out
}

/// Parse a base-16 string (either case) into octets.
///
/// Returns `None` on odd length or a non-hex character.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }

    let raw = text.as_bytes();

    let mut out = Vec::with_capacity(text.len() / 2);

    for pair in raw.chunks(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;

        out.push(((hi << 4) | lo) as u8);
    }

    Some(out)
}
