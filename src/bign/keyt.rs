//! Key transport: wrap a session key to a public key
//!
//! The sender draws a one-time scalar `u`, derives the wrapping key from
//! the abscissa of `u·Q`, and ships `R' = u·G` alongside the KWP token of
//! `key ‖ header`. The receiver recovers `u·Q = d·R'` (the ordinate of
//! `R'` is reconstructed from the curve equation, so only the abscissa
//! travels) and unwraps.

use crate::belt::wbl::{kwp_unwrap, kwp_wrap};
use crate::belt::BeltKey;
use crate::ec::{mul, Affine, EcGroup};
use crate::ww::zz;
use crate::{Entropy, Error, Result};

use super::{PrivateKey, PublicKey};

/// Wrapping key from a shared abscissa: at most 32 octets of it.
fn theta_from_x(ec: &EcGroup, x: &crate::gfp::Fe) -> Result<BeltKey> {
    let octets = ec.f.to_octets(x);

    let take = octets.len().min(32);

    BeltKey::new(&octets[..take])
}

/// Wrap `key` (16 octets or more) to the recipient `public`.
///
/// Output: `R'.x (l/4) ‖ token (key.len() + 16)`.
pub fn key_wrap(
    ec: &EcGroup,
    public: &PublicKey,
    key: &[u8],
    header: Option<&[u8; 16]>,
    rng: &mut dyn Entropy,
) -> Result<Vec<u8>> {
    if key.len() < 16 {
        return Err(Error::BadLength);
    }

    public.validate(ec)?;

    let u = zz::rand_nz_mod(&ec.q, rng)?;

    let shared = ec
        .to_affine(&mul::mul_ct(ec, &u, &public.q))
        .ok_or(Error::BadSharedKey)?;

    let theta = theta_from_x(ec, &shared.x)?;

    let ephemeral = ec
        .to_affine(&mul::mul_ct(ec, &u, &ec.g))
        .ok_or(Error::BadRng)?;

    let mut out = ec.f.to_octets(&ephemeral.x);
    out.extend_from_slice(&kwp_wrap(theta, key, header)?);

    Ok(out)
}

/// Unwrap a key token with the private key.
pub fn key_unwrap(
    ec: &EcGroup,
    private: &PrivateKey,
    token: &[u8],
    header: Option<&[u8; 16]>,
) -> Result<Vec<u8>> {
    let no = ec.f.no;

    if token.len() < no + 32 {
        return Err(Error::BadKeyToken);
    }

    let (rx_octets, wrapped) = token.split_at(no);

    // rebuild the ephemeral point from its abscissa
    let x = ec
        .f
        .from_octets(rx_octets)
        .map_err(|_| Error::BadPoint)?;

    let y = ec.f.sqrt(&ec.rhs(&x)).ok_or(Error::BadPoint)?;

    let ephemeral = Affine { x, y };

    // either root gives the same shared abscissa
    let shared = ec
        .to_affine(&mul::mul_ct(ec, &private.d, &ephemeral))
        .ok_or(Error::BadPoint)?;

    let theta = theta_from_x(ec, &shared.x)?;

    kwp_unwrap(theta, wrapped, header)
}
