//! bign: signatures, key transport and identity-based signatures over the
//! named curves (STB 34.101.45)
//!
//! Key material is bound to a curve group ([`crate::ec::EcGroup`]) built
//! from validated [`params::BignParams`]. A private key is a scalar in
//! `[1, q-1]`, serialized as `l/4` little-endian octets; the matching public
//! key is the affine point `d·G`, serialized as `x ‖ y`.

use zeroize::Zeroize;

use crate::ec::{mul, Affine, EcGroup};
use crate::ww;
use crate::{Entropy, Error, Result};

pub mod params;
pub mod sign;
pub mod keyt;
pub mod ibs;

pub use crate::der::oid_to_der;

/// The hash identifier signed into every bign signature.
pub const OID_BELT_HASH: &str = "1.2.112.0.2.0.34.101.31.81";

/// A private scalar `d ∈ [1, q-1]`. Zeroized on drop.
pub struct PrivateKey {
    pub(crate) d: Vec<u32>,
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.d.zeroize();
    }
}

impl PrivateKey {
    /// Parse `l/4` little-endian octets, requiring `0 < d < q`.
    pub fn from_octets(ec: &EcGroup, octets: &[u8]) -> Result<Self> {
        let d = ec
            .scalar_from_octets(octets)
            .map_err(|_| Error::BadPrivKey)?;

        Ok(PrivateKey { d })
    }

    /// Serialize to `l/4` little-endian octets.
    pub fn to_octets(&self, ec: &EcGroup) -> Vec<u8> {
        ec.scalar_to_octets(&self.d)
    }

    /// The public key `d·G`.
    pub fn public_key(&self, ec: &EcGroup) -> Result<PublicKey> {
        let point = mul::mul_ct(ec, &self.d, &ec.g);

        let q = ec.to_affine(&point).ok_or(Error::BadPrivKey)?;

        Ok(PublicKey { q })
    }
}

/// A public key: an affine point of order `q`.
#[derive(Clone, Debug)]
pub struct PublicKey {
    pub(crate) q: Affine,
}

impl PublicKey {
    /// Decode `x ‖ y` octets, verifying curve membership.
    pub fn from_octets(ec: &EcGroup, octets: &[u8]) -> Result<Self> {
        let q = ec.decode_point(octets).map_err(|_| Error::BadPubKey)?;

        Ok(PublicKey { q })
    }

    /// Serialize as `x ‖ y`.
    pub fn to_octets(&self, ec: &EcGroup) -> Vec<u8> {
        ec.encode_point(&self.q)
    }

    /// Deep validation: membership plus the order check.
    pub fn validate(&self, ec: &EcGroup) -> Result<()> {
        if !ec.is_on_curve(&self.q) || !ec.has_order(&self.q) {
            return Err(Error::BadPubKey);
        }

        Ok(())
    }

    /// The affine point.
    pub fn point(&self) -> &Affine {
        &self.q
    }
}

/// Generate a keypair: `d ←R [1, q-1]`, `Q = d·G`.
pub fn keypair_gen(ec: &EcGroup, rng: &mut dyn Entropy) -> Result<(PrivateKey, PublicKey)> {
    let d = ww::zz::rand_nz_mod(&ec.q, rng)?;

    let private = PrivateKey { d };
    let public = private.public_key(ec)?;

    Ok((private, public))
}

/// Static Diffie-Hellman: `key_len` octets of `(d·Q').x ‖ (d·Q').y`.
///
/// `key_len` may reach `l/2`; beyond `l/4` octets the ordinate is drawn in.
pub fn dh(
    ec: &EcGroup,
    private: &PrivateKey,
    peer: &PublicKey,
    key_len: usize,
) -> Result<Vec<u8>> {
    if key_len > ec.point_len() {
        return Err(Error::BadLength);
    }

    peer.validate(ec)?;

    let shared = mul::mul_ct(ec, &private.d, &peer.q);

    let affine = ec.to_affine(&shared).ok_or(Error::BadSharedKey)?;

    let mut octets = ec.encode_point(&affine);
    octets.truncate(key_len);

    Ok(octets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::params::{BignParams, ParamsId};

    pub(crate) fn group() -> EcGroup {
        BignParams::standard(ParamsId::B128)
            .unwrap()
            .into_group()
            .unwrap()
    }

    pub(crate) fn fixed_rng(tag: u8) -> impl crate::Entropy {
        struct Fixed(u8);

        impl crate::Entropy for Fixed {
            fn fill(&mut self, buf: &mut [u8]) -> crate::Result<()> {
                for v in buf.iter_mut() {
                    self.0 = self.0.wrapping_mul(167).wrapping_add(13);
                    *v = self.0;
                }
                Ok(())
            }
        }

        Fixed(tag)
    }

    #[test]
    fn keypair_invariants() {
        let ec = group();
        let mut rng = fixed_rng(0x21);

        let (private, public) = keypair_gen(&ec, &mut rng).unwrap();

        // d in range, Q on curve and of order q
        assert!(!ww::is_zero(&private.d));
        assert_eq!(
            ww::cmp(&private.d, &ec.q),
            core::cmp::Ordering::Less
        );
        public.validate(&ec).unwrap();

        // serialization round trips
        let d_octets = private.to_octets(&ec);
        assert_eq!(d_octets.len(), 32);
        let back = PrivateKey::from_octets(&ec, &d_octets).unwrap();
        assert_eq!(back.d, private.d);

        let q_octets = public.to_octets(&ec);
        assert_eq!(q_octets.len(), 64);
        let back = PublicKey::from_octets(&ec, &q_octets).unwrap();
        assert_eq!(back.to_octets(&ec), q_octets);

        // Q really is d·G
        assert_eq!(
            private.public_key(&ec).unwrap().to_octets(&ec),
            q_octets
        );
    }

    #[test]
    fn private_key_range_checks() {
        let ec = group();

        assert!(PrivateKey::from_octets(&ec, &[0u8; 32]).is_err());
        assert!(PrivateKey::from_octets(&ec, &[0u8; 31]).is_err());

        // q itself is out of range
        let params = BignParams::standard(ParamsId::B128).unwrap();
        assert!(PrivateKey::from_octets(&ec, &params.q).is_err());
    }

    #[test]
    fn dh_agrees() {
        let ec = group();

        // side A holds the standard's example private key
        let da = PrivateKey::from_octets(
            &ec,
            &hex_literal::hex!(
                "1F66B5B84B7339674533F0329C74F218"
                "34281FED0732429E0C79235FC273E269"
            ),
        )
        .unwrap();
        let qa = da.public_key(&ec).unwrap();

        let (db, qb) = keypair_gen(&ec, &mut fixed_rng(2)).unwrap();

        let kab = dh(&ec, &da, &qb, 32).unwrap();
        let kba = dh(&ec, &db, &qa, 32).unwrap();

        assert_eq!(kab, kba);

        // the shared octets, recomputed independently through the scalar
        // ring: (da·db mod q)·G
        let prod = {
            let am = ec.qm.to_mont(&da.d);
            let bm = ec.qm.to_mont(&db.d);

            ec.qm.from_mont(&ec.qm.mul(&am, &bm))
        };

        let shared = ec
            .to_affine(&mul::mul_vartime(&ec, &prod, &ec.g))
            .unwrap();

        assert_eq!(kab, ec.f.to_octets(&shared.x));

        // longer keys pull in the ordinate and still agree
        let kab64 = dh(&ec, &da, &qb, 64).unwrap();
        let kba64 = dh(&ec, &db, &qa, 64).unwrap();

        assert_eq!(kab64, kba64);
        assert_eq!(kab64[..32], kab[..]);
        assert_eq!(kab64, ec.encode_point(&shared));

        assert!(dh(&ec, &da, &qb, 65).is_err());
    }
}
