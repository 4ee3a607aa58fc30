//! Signing and verification
//!
//! A signature over a hash `H` (`l/4` octets) is `s0 ‖ s1` where
//!
//! * `s0` is the low `l` bits of `belt-hash(OID(h) ‖ R.x ‖ H)` for the
//!   one-time point `R = k·G`, and
//! * `s1 = (k - (s0 + 2^l)·d - H) mod q`.
//!
//! Verification recomputes `R = ((s1 + H) mod q)·G + (s0 + 2^l)·Q` and
//! compares hashes. The deterministic variant derives `k` from the key and
//! hash through the belt wide-block recurrence of the standard, so it needs
//! no randomness at signing time.

use crate::belt::hash::Hash;
use crate::belt::BeltKey;
use crate::ec::{mul, EcGroup};
use crate::util::xor_assign;
use crate::ww::{self, zz};
use crate::{Entropy, Error, Result};

use super::{PrivateKey, PublicKey};

/// `s0 + 2^l` as a mod-q residue (always below `q`).
fn s0_plus_2l(ec: &EcGroup, s0: &[u8]) -> Vec<u32> {
    let mut c = ww::from_le_bytes(s0, ec.q.len());
    ww::set_bit(&mut c, ec.l);
    c
}

fn sign_with_k(
    ec: &EcGroup,
    oid_der: &[u8],
    hash: &[u8],
    private: &PrivateKey,
    k: &[u32],
) -> Result<Vec<u8>> {
    let point = mul::mul_ct(ec, k, &ec.g);
    let r = ec.to_affine(&point).ok_or(Error::BadRng)?;

    let rx = ec.f.to_octets(&r.x);

    let s0_wide = Hash::hash_parts(&[oid_der, &rx, hash]);
    let s0 = &s0_wide[..ec.l / 8];

    // s1 = (k - (s0 + 2^l)·d - H) mod q
    let c = s0_plus_2l(ec, s0);

    let prod = {
        let cm = ec.qm.to_mont(&c);
        let dm = ec.qm.to_mont(&private.d);

        ec.qm.from_mont(&ec.qm.mul(&cm, &dm))
    };

    let e = ec.scalar_from_octets_mod(hash);

    let s1 = zz::sub_mod(&zz::sub_mod(k, &prod, &ec.q), &e, &ec.q);

    let mut sig = s0.to_vec();
    sig.extend_from_slice(&ec.scalar_to_octets(&s1));

    Ok(sig)
}

/// Randomized signing. `hash` must be `l/4` octets.
pub fn sign(
    ec: &EcGroup,
    oid_der: &[u8],
    hash: &[u8],
    private: &PrivateKey,
    rng: &mut dyn Entropy,
) -> Result<Vec<u8>> {
    if hash.len() != ec.f.no {
        return Err(Error::BadHash);
    }

    let k = zz::rand_nz_mod(&ec.q, rng)?;

    sign_with_k(ec, oid_der, hash, private, &k)
}

/// Derive the deterministic one-time scalar from `(oid, d, hash, t)`.
///
/// The belt-keyed recurrence of the standard: the hash splits into 128-bit
/// blocks which are stirred, two block-encryptions per block count, until
/// the assembled candidate lands in `[1, q-1]`.
pub(crate) fn derive_k(
    ec: &EcGroup,
    oid_der: &[u8],
    hash: &[u8],
    private: &PrivateKey,
    t: &[u8],
) -> Result<Vec<u32>> {
    let d_octets = ec.scalar_to_octets(&private.d);

    let theta = Hash::hash_parts(&[oid_der, &d_octets, t]);
    let key = BeltKey::new(&theta)?;

    // the toy level's 24-octet hash widens to two blocks
    let width = ec.f.no.max(32);
    let n = width / 16;

    let mut r = [[0u8; 16]; 4];
    for (i, chunk) in hash.chunks(16).enumerate().take(n) {
        r[i][..chunk.len()].copy_from_slice(chunk);
    }

    let mut i: u32 = 1;

    loop {
        let s = match n {
            2 => r[0],
            3 => {
                let mut s = r[0];
                xor_assign(&mut s, &r[1]);
                r[0] = r[1];
                s
            }
            4 => {
                let mut s = r[0];
                xor_assign(&mut s, &r[1]);
                xor_assign(&mut s, &r[2]);
                r[0] = r[1];
                r[1] = r[2];
                s
            }
            _ => return Err(Error::BadParams),
        };

        let mut mixed = s;
        key.encrypt_block(&mut mixed);
        xor_assign(&mut mixed, &r[n - 1]);
        xor_assign(&mut mixed[..4], &i.to_le_bytes());

        r[n - 2] = mixed;
        r[n - 1] = s;

        if i % (2 * n as u32) == 0 {
            let mut candidate = vec![0u8; width];
            for (j, block) in r.iter().enumerate().take(n) {
                candidate[16 * j..16 * (j + 1)].copy_from_slice(block);
            }

            let k = ww::from_le_bytes(&candidate[..ec.f.no], ec.q.len());

            if !ww::is_zero(&k) && ww::cmp(&k, &ec.q) == core::cmp::Ordering::Less {
                return Ok(k);
            }
        }

        i = i.wrapping_add(1);
    }
}

/// Deterministic signing: the one-time scalar comes from `(oid, d, H, t)`.
pub fn sign_det(
    ec: &EcGroup,
    oid_der: &[u8],
    hash: &[u8],
    private: &PrivateKey,
    t: &[u8],
) -> Result<Vec<u8>> {
    if hash.len() != ec.f.no {
        return Err(Error::BadHash);
    }

    let k = derive_k(ec, oid_der, hash, private, t)?;

    sign_with_k(ec, oid_der, hash, private, &k)
}

/// Verify `sig = s0 ‖ s1` over `hash` under `public`.
pub fn verify(
    ec: &EcGroup,
    oid_der: &[u8],
    hash: &[u8],
    sig: &[u8],
    public: &PublicKey,
) -> Result<()> {
    if hash.len() != ec.f.no {
        return Err(Error::BadHash);
    }

    if sig.len() != 3 * ec.l / 8 {
        return Err(Error::BadSig);
    }

    let (s0, s1_octets) = sig.split_at(ec.l / 8);

    let s1 = ww::from_le_bytes(s1_octets, ec.q.len());

    if ww::cmp(&s1, &ec.q) != core::cmp::Ordering::Less {
        return Err(Error::BadSig);
    }

    let e = ec.scalar_from_octets_mod(hash);

    let u1 = zz::add_mod(&s1, &e, &ec.q);
    let u2 = s0_plus_2l(ec, s0);

    let point = mul::mul_add_vartime(ec, &u1, &ec.g, &u2, &public.q);

    let r = ec.to_affine(&point).ok_or(Error::BadSig)?;

    let rx = ec.f.to_octets(&r.x);

    let expect = Hash::hash_parts(&[oid_der, &rx, hash]);

    if expect[..ec.l / 8] == *s0 {
        Ok(())
    } else {
        Err(Error::BadSig)
    }
}
