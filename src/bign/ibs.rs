//! Identity-based signatures
//!
//! The authority signs the hash of an identity with the ordinary signing
//! operation; that signature `(u0, u1)` doubles as the identity keypair.
//! Extraction verifies the authority signature and keeps `u1` as the
//! identity private scalar; the identity public key is the pair of the
//! one-time point `R` and the tag `u0`, from which any verifier can
//! reconstruct
//!
//! `Q_id = R − (u0 + 2^l)·Q_ca − H_id·G`,
//!
//! the point `u1·G`, without further help from the authority. Identity
//! signing then follows the ordinary equation over the combined hash
//! transcript `OID(h) ‖ V.x ‖ H_id ‖ H_msg`.

use zeroize::Zeroize;

use crate::belt::hash::Hash;
use crate::ec::{mul, Affine, EcGroup};
use crate::ww::{self, zz};
use crate::{Entropy, Error, Result};

use super::{PrivateKey, PublicKey};

/// An identity private key: the authority's `u1`. Zeroized on drop.
pub struct IdPrivateKey {
    u1: Vec<u32>,
}

impl Drop for IdPrivateKey {
    fn drop(&mut self) {
        self.u1.zeroize();
    }
}

/// An identity public key: the authority's one-time point plus `u0`.
#[derive(Clone)]
pub struct IdPublicKey {
    r: Affine,
    u0: Vec<u8>,
}

impl IdPrivateKey {
    /// Serialize to `l/4` octets.
    pub fn to_octets(&self, ec: &EcGroup) -> Vec<u8> {
        ec.scalar_to_octets(&self.u1)
    }

    /// Parse `l/4` octets.
    pub fn from_octets(ec: &EcGroup, octets: &[u8]) -> Result<Self> {
        let u1 = ec
            .scalar_from_octets(octets)
            .map_err(|_| Error::BadPrivKey)?;

        Ok(IdPrivateKey { u1 })
    }
}

impl IdPublicKey {
    /// Serialize as `R.x ‖ R.y ‖ u0` (`5l/8` octets).
    pub fn to_octets(&self, ec: &EcGroup) -> Vec<u8> {
        let mut out = ec.encode_point(&self.r);
        out.extend_from_slice(&self.u0);
        out
    }

    /// Parse `5l/8` octets.
    pub fn from_octets(ec: &EcGroup, octets: &[u8]) -> Result<Self> {
        if octets.len() != ec.point_len() + ec.l / 8 {
            return Err(Error::BadPubKey);
        }

        let (point, u0) = octets.split_at(ec.point_len());

        let r = ec.decode_point(point).map_err(|_| Error::BadPubKey)?;

        Ok(IdPublicKey {
            r,
            u0: u0.to_vec(),
        })
    }
}

/// Issue an identity: the authority signs `id_hash` deterministically.
///
/// The resulting octets feed [`id_extract`] on the holder's side.
pub fn id_issue(
    ec: &EcGroup,
    oid_der: &[u8],
    id_hash: &[u8],
    authority: &PrivateKey,
    rng: &mut dyn Entropy,
) -> Result<Vec<u8>> {
    super::sign::sign(ec, oid_der, id_hash, authority, rng)
}

/// Recover the identity keypair from the authority's signature over
/// `id_hash`, verifying it against the authority public key.
pub fn id_extract(
    ec: &EcGroup,
    oid_der: &[u8],
    id_hash: &[u8],
    id_sig: &[u8],
    authority: &PublicKey,
) -> Result<(IdPrivateKey, IdPublicKey)> {
    super::sign::verify(ec, oid_der, id_hash, id_sig, authority)?;

    let (s0, s1_octets) = id_sig.split_at(ec.l / 8);

    let s1 = ww::from_le_bytes(s1_octets, ec.q.len());

    // rebuild R = ((s1 + H) mod q)·G + (s0 + 2^l)·Q_ca, known non-infinite
    // because verification passed
    let e = ec.scalar_from_octets_mod(id_hash);
    let u1s = zz::add_mod(&s1, &e, &ec.q);

    let mut u2 = ww::from_le_bytes(s0, ec.q.len());
    ww::set_bit(&mut u2, ec.l);

    let r = ec
        .to_affine(&mul::mul_add_vartime(ec, &u1s, &ec.g, &u2, &authority.q))
        .ok_or(Error::BadSig)?;

    Ok((
        IdPrivateKey { u1: s1 },
        IdPublicKey {
            r,
            u0: s0.to_vec(),
        },
    ))
}

/// Reconstruct `Q_id = R − (u0 + 2^l)·Q_ca − H_id·G`.
fn id_public_point(
    ec: &EcGroup,
    id_public: &IdPublicKey,
    id_hash: &[u8],
    authority: &PublicKey,
) -> Result<Affine> {
    let mut u2 = ww::from_le_bytes(&id_public.u0, ec.q.len());
    ww::set_bit(&mut u2, ec.l);

    let e = ec.scalar_from_octets_mod(id_hash);

    let neg_qca = Affine {
        x: authority.q.x.clone(),
        y: ec.f.neg(&authority.q.y),
    };

    let neg_g = Affine {
        x: ec.g.x.clone(),
        y: ec.f.neg(&ec.g.y),
    };

    let sum = mul::mul_add_vartime(ec, &u2, &neg_qca, &e, &neg_g);

    let q_id = ec.add(&sum, &ec.lift(&id_public.r));

    ec.to_affine(&q_id).ok_or(Error::BadPubKey)
}

/// Sign `msg_hash` with an identity key.
///
/// The signature is the ordinary `s0 ‖ s1` shape (`3l/8` octets) over the
/// transcript of the identity and message hashes. `u1` is not bound to the
/// identity hash by this function; verification binds them.
pub fn id_sign(
    ec: &EcGroup,
    oid_der: &[u8],
    id_hash: &[u8],
    msg_hash: &[u8],
    id_private: &IdPrivateKey,
    rng: &mut dyn Entropy,
) -> Result<Vec<u8>> {
    if id_hash.len() != ec.f.no || msg_hash.len() != ec.f.no {
        return Err(Error::BadHash);
    }

    let k = zz::rand_nz_mod(&ec.q, rng)?;

    let v = ec
        .to_affine(&mul::mul_ct(ec, &k, &ec.g))
        .ok_or(Error::BadRng)?;

    let vx = ec.f.to_octets(&v.x);

    let s0_wide = Hash::hash_parts(&[oid_der, &vx, id_hash, msg_hash]);
    let s0 = &s0_wide[..ec.l / 8];

    let mut c = ww::from_le_bytes(s0, ec.q.len());
    ww::set_bit(&mut c, ec.l);

    let prod = {
        let cm = ec.qm.to_mont(&c);
        let dm = ec.qm.to_mont(&id_private.u1);

        ec.qm.from_mont(&ec.qm.mul(&cm, &dm))
    };

    let e = ec.scalar_from_octets_mod(msg_hash);

    let s1 = zz::sub_mod(&zz::sub_mod(&k, &prod, &ec.q), &e, &ec.q);

    let mut sig = s0.to_vec();
    sig.extend_from_slice(&ec.scalar_to_octets(&s1));

    Ok(sig)
}

/// Verify an identity signature against the authority public key and the
/// identity public key.
pub fn id_verify(
    ec: &EcGroup,
    oid_der: &[u8],
    id_hash: &[u8],
    msg_hash: &[u8],
    sig: &[u8],
    id_public: &IdPublicKey,
    authority: &PublicKey,
) -> Result<()> {
    if id_hash.len() != ec.f.no || msg_hash.len() != ec.f.no {
        return Err(Error::BadHash);
    }

    if sig.len() != 3 * ec.l / 8 {
        return Err(Error::BadSig);
    }

    let q_id = id_public_point(ec, id_public, id_hash, authority)?;

    let (s0, s1_octets) = sig.split_at(ec.l / 8);

    let s1 = ww::from_le_bytes(s1_octets, ec.q.len());

    if ww::cmp(&s1, &ec.q) != core::cmp::Ordering::Less {
        return Err(Error::BadSig);
    }

    let e = ec.scalar_from_octets_mod(msg_hash);

    let u1 = zz::add_mod(&s1, &e, &ec.q);

    let mut u2 = ww::from_le_bytes(s0, ec.q.len());
    ww::set_bit(&mut u2, ec.l);

    let v = ec
        .to_affine(&mul::mul_add_vartime(ec, &u1, &ec.g, &u2, &q_id))
        .ok_or(Error::BadSig)?;

    let vx = ec.f.to_octets(&v.x);

    let expect = Hash::hash_parts(&[oid_der, &vx, id_hash, msg_hash]);

    if expect[..ec.l / 8] == *s0 {
        Ok(())
    } else {
        Err(Error::BadSig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bign::tests::{fixed_rng, group};
    use crate::bign::{keypair_gen, oid_to_der, OID_BELT_HASH};

    fn oid() -> Vec<u8> {
        oid_to_der(OID_BELT_HASH).unwrap()
    }

    #[test]
    fn issue_extract_sign_verify() {
        let ec = group();

        let (ca_private, ca_public) = keypair_gen(&ec, &mut fixed_rng(0x61)).unwrap();

        let id_hash = Hash::hash(b"holder identity string").to_vec();
        let msg_hash = Hash::hash(b"the signed document").to_vec();

        let issue = id_issue(&ec, &oid(), &id_hash, &ca_private, &mut fixed_rng(0x62)).unwrap();

        let (id_priv, id_pub) = id_extract(&ec, &oid(), &id_hash, &issue, &ca_public).unwrap();

        let sig = id_sign(
            &ec,
            &oid(),
            &id_hash,
            &msg_hash,
            &id_priv,
            &mut fixed_rng(0x63),
        )
        .unwrap();

        id_verify(&ec, &oid(), &id_hash, &msg_hash, &sig, &id_pub, &ca_public).unwrap();
    }

    #[test]
    fn extraction_checks_the_authority() {
        let ec = group();

        let (ca_private, _) = keypair_gen(&ec, &mut fixed_rng(0x64)).unwrap();
        let (_, other_public) = keypair_gen(&ec, &mut fixed_rng(0x65)).unwrap();

        let id_hash = Hash::hash(b"identity").to_vec();

        let issue = id_issue(&ec, &oid(), &id_hash, &ca_private, &mut fixed_rng(0x66)).unwrap();

        assert!(id_extract(&ec, &oid(), &id_hash, &issue, &other_public).is_err());
    }

    #[test]
    fn verification_binds_everything() {
        let ec = group();

        let (ca_private, ca_public) = keypair_gen(&ec, &mut fixed_rng(0x67)).unwrap();

        let id_hash = Hash::hash(b"alice").to_vec();
        let msg_hash = Hash::hash(b"pay bob 5").to_vec();

        let issue = id_issue(&ec, &oid(), &id_hash, &ca_private, &mut fixed_rng(0x68)).unwrap();
        let (id_priv, id_pub) = id_extract(&ec, &oid(), &id_hash, &issue, &ca_public).unwrap();

        let sig = id_sign(
            &ec,
            &oid(),
            &id_hash,
            &msg_hash,
            &id_priv,
            &mut fixed_rng(0x69),
        )
        .unwrap();

        // flipped signature octets
        for idx in [0usize, 15, 16, 47] {
            let mut bad = sig.clone();
            bad[idx] ^= 1;
            assert!(id_verify(
                &ec,
                &oid(),
                &id_hash,
                &msg_hash,
                &bad,
                &id_pub,
                &ca_public
            )
            .is_err());
        }

        // a different message
        let other_msg = Hash::hash(b"pay bob 500").to_vec();
        assert!(
            id_verify(&ec, &oid(), &id_hash, &other_msg, &sig, &id_pub, &ca_public).is_err()
        );

        // a different identity
        let other_id = Hash::hash(b"mallory").to_vec();
        assert!(
            id_verify(&ec, &oid(), &other_id, &msg_hash, &sig, &id_pub, &ca_public).is_err()
        );

        // a different authority
        let (_, other_ca) = keypair_gen(&ec, &mut fixed_rng(0x6A)).unwrap();
        assert!(
            id_verify(&ec, &oid(), &id_hash, &msg_hash, &sig, &id_pub, &other_ca).is_err()
        );
    }

    #[test]
    fn id_key_serialization() {
        let ec = group();

        let (ca_private, ca_public) = keypair_gen(&ec, &mut fixed_rng(0x6B)).unwrap();

        let id_hash = Hash::hash(b"serialize me").to_vec();

        let issue = id_issue(&ec, &oid(), &id_hash, &ca_private, &mut fixed_rng(0x6C)).unwrap();
        let (id_priv, id_pub) = id_extract(&ec, &oid(), &id_hash, &issue, &ca_public).unwrap();

        let priv_octets = id_priv.to_octets(&ec);
        let pub_octets = id_pub.to_octets(&ec);

        assert_eq!(priv_octets.len(), 32);
        assert_eq!(pub_octets.len(), 64 + 16);

        let p2 = IdPrivateKey::from_octets(&ec, &priv_octets).unwrap();
        let q2 = IdPublicKey::from_octets(&ec, &pub_octets).unwrap();

        assert_eq!(p2.to_octets(&ec), priv_octets);
        assert_eq!(q2.to_octets(&ec), pub_octets);
    }
}
