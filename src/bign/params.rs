//! Domain parameters: named curves, deep validation, DER codec
//!
//! A parameter set carries the security level `l`, the five `2l`-bit values
//! `p, a, b, q, yG` (little-endian octets) and the 8-octet seed that ties
//! `b` to `p`, `a` through the hash. Sets come from the named table or from
//! DER; [`BignParams::validate`] performs the full acceptance procedure
//! before a set is trusted for key material.
//!
//! Of the named identifiers the 128-bit level is tabulated; the remaining
//! arcs resolve but answer `NotImplemented` from the loader.

use serde::{Deserialize, Serialize};

use crate::der;
use crate::ec::{Affine, EcGroup};
use crate::ww::{self, zz};
use crate::{Error, Result};

/// OID arc of the field type used by the parameter DER codec.
const OID_PRIMEFIELD: &str = "1.2.112.0.2.0.34.101.45.4.1";

/// Identifiers of the named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsId {
    /// Toy 96-bit level.
    B96,
    /// 128-bit level (`bign-curve256v1`).
    B128,
    /// 192-bit level.
    B192,
    /// 256-bit level.
    B256,
}

impl ParamsId {
    /// The dotted identifier of this set.
    pub fn oid(self) -> &'static str {
        match self {
            ParamsId::B96 => "1.2.112.0.2.0.34.101.45.3.0",
            ParamsId::B128 => "1.2.112.0.2.0.34.101.45.3.1",
            ParamsId::B192 => "1.2.112.0.2.0.34.101.45.3.2",
            ParamsId::B256 => "1.2.112.0.2.0.34.101.45.3.3",
        }
    }

    /// Resolve a dotted identifier.
    pub fn from_oid(oid: &str) -> Result<Self> {
        match oid {
            "1.2.112.0.2.0.34.101.45.3.0" => Ok(ParamsId::B96),
            "1.2.112.0.2.0.34.101.45.3.1" => Ok(ParamsId::B128),
            "1.2.112.0.2.0.34.101.45.3.2" => Ok(ParamsId::B192),
            "1.2.112.0.2.0.34.101.45.3.3" => Ok(ParamsId::B256),
            _ => Err(Error::KeyNotFound),
        }
    }

    /// The security level of this set.
    pub fn level(self) -> usize {
        match self {
            ParamsId::B96 => 96,
            ParamsId::B128 => 128,
            ParamsId::B192 => 192,
            ParamsId::B256 => 256,
        }
    }
}

/// A domain parameter set. All multi-octet values little-endian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BignParams {
    /// Security level: 96, 128, 192 or 256.
    pub l: usize,
    /// Field modulus.
    pub p: Vec<u8>,
    /// Curve coefficient `a`.
    pub a: Vec<u8>,
    /// Curve coefficient `b`.
    pub b: Vec<u8>,
    /// Group order.
    pub q: Vec<u8>,
    /// Ordinate of the base point (its abscissa is zero).
    pub yg: Vec<u8>,
    /// Seed deriving `b` from `p`, `a`.
    pub seed: [u8; 8],
}

/// `bign-curve256v1` (level 128), little-endian.
mod curve256v1 {
    pub const P: [u8; 32] = [
        0x43, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF,
    ];

    pub const A: [u8; 32] = [
        0x40, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF,
    ];

    pub const B: [u8; 32] = [
        0xF1, 0x03, 0x9C, 0xD6, 0x6B, 0x7D, 0x2E, 0xB2, 0x53, 0x92, 0x8B, 0x97, 0x69, 0x50, 0xF5,
        0x4C, 0xBE, 0xFB, 0xD8, 0xE4, 0xAB, 0x3A, 0xC1, 0xD2, 0xED, 0xA8, 0xF3, 0x15, 0x15, 0x6C,
        0xCE, 0x77,
    ];

    pub const Q: [u8; 32] = [
        0x07, 0x66, 0x3D, 0x26, 0x99, 0xBF, 0x5A, 0x7E, 0xFC, 0x4D, 0xFB, 0x0D, 0xD6, 0x8E, 0x5C,
        0xD9, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF,
    ];

    pub const YG: [u8; 32] = [
        0x93, 0x6A, 0x51, 0x04, 0x18, 0xCF, 0x29, 0x1E, 0x52, 0xF6, 0x08, 0xC4, 0x66, 0x39, 0x91,
        0x78, 0x5D, 0x83, 0xD6, 0x51, 0xA3, 0xC9, 0xE4, 0x5C, 0x9F, 0xD6, 0x16, 0xFB, 0x3C, 0xFC,
        0xF7, 0x6B,
    ];

    pub const SEED: [u8; 8] = [0x5E, 0x38, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
}

impl BignParams {
    /// Load a named parameter set.
    pub fn standard(id: ParamsId) -> Result<Self> {
        match id {
            ParamsId::B128 => Ok(BignParams {
                l: 128,
                p: curve256v1::P.to_vec(),
                a: curve256v1::A.to_vec(),
                b: curve256v1::B.to_vec(),
                q: curve256v1::Q.to_vec(),
                yg: curve256v1::YG.to_vec(),
                seed: curve256v1::SEED,
            }),
            _ => Err(Error::NotImplemented),
        }
    }

    /// Load a named parameter set by its dotted identifier.
    pub fn load(oid: &str) -> Result<Self> {
        Self::standard(ParamsId::from_oid(oid)?)
    }

    /// Assemble the curve group descriptor (structural checks only).
    pub fn into_group(&self) -> Result<EcGroup> {
        EcGroup::new(self.l, &self.p, &self.a, &self.b, &self.yg, &self.q, 1)
    }

    /// Full acceptance procedure for an untrusted parameter set.
    pub fn validate(&self) -> Result<()> {
        let no = self.l / 4;

        match self.l {
            96 | 128 | 192 | 256 => (),
            _ => return Err(Error::BadParams),
        }

        if self.p.len() != no
            || self.a.len() != no
            || self.b.len() != no
            || self.q.len() != no
            || self.yg.len() != no
        {
            return Err(Error::BadParams);
        }

        // structural assembly covers p ≡ 3 (mod 4), bit lengths, ranges and
        // base point membership
        let ec = self.into_group().map_err(|_| Error::BadParams)?;

        if ww::is_zero(&ec.f.from_int(&ww::from_le_bytes(&self.a, no / 4)).0)
            || ww::is_zero(&ec.f.from_int(&ww::from_le_bytes(&self.b, no / 4)).0)
        {
            return Err(Error::BadParams);
        }

        // b must re-derive from (p, a, seed) through the hash
        if !self.b_matches_seed(&ec) {
            return Err(Error::BadParams);
        }

        let p_limbs = ww::from_le_bytes(&self.p, no / 4);
        let q_limbs = ww::from_le_bytes(&self.q, no / 4);

        if !zz::is_prime(&p_limbs, 48) || !zz::is_prime(&q_limbs, 48) {
            return Err(Error::NotPrime);
        }

        // non-singularity: 4a³ + 27b² ≠ 0
        let f = &ec.f;
        let a = f.from_octets(&self.a).map_err(|_| Error::BadParams)?;
        let b = f.from_octets(&self.b).map_err(|_| Error::BadParams)?;

        let a3 = f.mul(&f.sqr(&a), &a);
        let disc = f.add(
            &f.mul(&f.from_word(4), &a3),
            &f.mul(&f.from_word(27), &f.sqr(&b)),
        );

        if bool::from(f.is_zero(&disc)) {
            return Err(Error::BadParams);
        }

        // (b / p) = 1: the base ordinate is a root of b
        if zz::jacobi(&ww::from_le_bytes(&self.b, no / 4), &p_limbs) != 1 {
            return Err(Error::BadParams);
        }

        let yg = f.from_octets(&self.yg).map_err(|_| Error::BadParams)?;

        if !bool::from(f.eq(&f.sqr(&yg), &b)) {
            return Err(Error::BadParams);
        }

        if !ec.is_safe_group() {
            return Err(Error::BadParams);
        }

        if !ec.has_order(&ec.g) {
            return Err(Error::BadParams);
        }

        Ok(())
    }

    fn b_matches_seed(&self, ec: &EcGroup) -> bool {
        use crate::belt::hash::Hash;

        let mut seed1 = self.seed;

        // seed + 1, little-endian
        let mut carry = 1u16;
        for v in seed1.iter_mut() {
            let s = *v as u16 + carry;
            *v = s as u8;
            carry = s >> 8;
        }

        let h0 = Hash::hash_parts(&[&self.p, &self.a, &self.seed]);
        let h1 = Hash::hash_parts(&[&self.p, &self.a, &seed1]);

        let mut wide = Vec::with_capacity(64);
        wide.extend_from_slice(&h0);
        wide.extend_from_slice(&h1);

        let wide_limbs = ww::from_le_bytes(&wide, 16);
        let derived = ec.f.from_int(&wide_limbs);

        let b = match ec.f.from_octets(&self.b) {
            Ok(v) => v,
            Err(_) => return false,
        };

        bool::from(ec.f.eq(&derived, &b))
    }

    /// Compute the base point, `(0, yG)`.
    pub fn base_point(&self, ec: &EcGroup) -> Result<Affine> {
        let y = ec.f.from_octets(&self.yg).map_err(|_| Error::BadParams)?;

        Ok(Affine { x: ec.f.zero(), y })
    }

    /// DER-encode the parameter set.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let oid = der::oid_to_der(OID_PRIMEFIELD)?;

        let mut field_seq = Vec::new();
        field_seq.extend_from_slice(&oid);
        der::write_tlv(
            &mut field_seq,
            0x02,
            &der::uint_content_from_le(&self.p),
        );

        let mut curve_seq = Vec::new();
        der::write_tlv(&mut curve_seq, 0x04, &self.a);
        der::write_tlv(&mut curve_seq, 0x04, &self.b);

        let mut seed_bits = vec![0u8];
        seed_bits.extend_from_slice(&self.seed);
        der::write_tlv(&mut curve_seq, 0x03, &seed_bits);

        let mut body = Vec::new();
        der::write_tlv(&mut body, 0x02, &[1]);
        der::write_tlv(&mut body, 0x30, &field_seq);
        der::write_tlv(&mut body, 0x30, &curve_seq);
        der::write_tlv(&mut body, 0x04, &self.yg);
        der::write_tlv(&mut body, 0x02, &der::uint_content_from_le(&self.q));

        let mut out = Vec::new();
        der::write_tlv(&mut out, 0x30, &body);

        Ok(out)
    }

    /// Decode a DER parameter set. The cofactor, if present, must be one.
    pub fn from_der(octets: &[u8]) -> Result<Self> {
        let mut rd = der::Reader::new(octets);

        let body = rd.expect(0x30)?;
        rd.finish()?;

        let mut rd = der::Reader::new(body);

        let version = rd.expect(0x02)?;
        if version != [1] {
            return Err(Error::BadFormat);
        }

        let field_seq = rd.expect(0x30)?;
        let mut fr = der::Reader::new(field_seq);

        let oid_content = fr.expect(0x06)?;
        if der::oid_from_content(oid_content)? != OID_PRIMEFIELD {
            return Err(Error::BadFormat);
        }

        let p_content = fr.expect(0x02)?;
        fr.finish()?;

        if p_content.is_empty() {
            return Err(Error::BadFormat);
        }

        // the level follows from the modulus width
        let p_be_len = if p_content[0] == 0 {
            p_content.len() - 1
        } else {
            p_content.len()
        };

        let l = match p_be_len {
            24 => 96,
            32 => 128,
            48 => 192,
            64 => 256,
            _ => return Err(Error::BadFormat),
        };

        let no = l / 4;
        let p = der::uint_content_to_le(p_content, no)?;

        let curve_seq = rd.expect(0x30)?;
        let mut cr = der::Reader::new(curve_seq);

        let a = cr.expect(0x04)?;
        let b = cr.expect(0x04)?;
        let seed_bits = cr.expect(0x03)?;
        cr.finish()?;

        if a.len() != no || b.len() != no {
            return Err(Error::BadFormat);
        }

        if seed_bits.len() != 9 || seed_bits[0] != 0 {
            return Err(Error::BadFormat);
        }

        let yg = rd.expect(0x04)?;
        if yg.len() != no {
            return Err(Error::BadFormat);
        }

        let q = der::uint_content_to_le(rd.expect(0x02)?, no)?;

        if let Some(cofactor) = rd.optional(0x02)? {
            if cofactor != [1] {
                return Err(Error::BadFormat);
            }
        }

        rd.finish()?;

        let mut seed = [0u8; 8];
        seed.copy_from_slice(&seed_bits[1..]);

        Ok(BignParams {
            l,
            p,
            a: a.to_vec(),
            b: b.to_vec(),
            q,
            yg: yg.to_vec(),
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_table() {
        let params = BignParams::standard(ParamsId::B128).unwrap();

        assert_eq!(params.l, 128);
        assert_eq!(params.p.len(), 32);

        assert_eq!(
            ParamsId::from_oid("1.2.112.0.2.0.34.101.45.3.1").unwrap(),
            ParamsId::B128
        );
        assert_eq!(ParamsId::B128.oid(), "1.2.112.0.2.0.34.101.45.3.1");
        assert!(ParamsId::from_oid("1.2.112.0.2.0.34.101.45.3.9").is_err());

        assert_eq!(BignParams::standard(ParamsId::B192), Err(Error::NotImplemented));
    }

    #[test]
    fn group_assembles() {
        let params = BignParams::standard(ParamsId::B128).unwrap();
        let ec = params.into_group().unwrap();

        assert!(ec.is_on_curve(&ec.g));
        assert_eq!(ec.l, 128);
        assert_eq!(ec.point_len(), 64);
    }

    #[test]
    fn standard_params_validate() {
        let params = BignParams::standard(ParamsId::B128).unwrap();

        params.validate().unwrap();
    }

    #[test]
    fn tampered_params_fail() {
        let good = BignParams::standard(ParamsId::B128).unwrap();

        // broken seed breaks the b derivation
        let mut bad = good.clone();
        bad.seed[0] ^= 1;
        assert!(bad.validate().is_err());

        // broken order
        let mut bad = good.clone();
        bad.q[0] ^= 2;
        assert!(bad.validate().is_err());

        // broken ordinate
        let mut bad = good;
        bad.yg[0] ^= 1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn der_round_trip() {
        let params = BignParams::standard(ParamsId::B128).unwrap();

        let der = params.to_der().unwrap();
        let back = BignParams::from_der(&der).unwrap();

        assert_eq!(params, back);

        // cofactor, when present, must be one
        let mut with_cofactor = der.clone();
        // rebuild with an explicit cofactor by decoding and re-encoding the
        // body manually
        let mut rd = crate::der::Reader::new(&der);
        let body = rd.expect(0x30).unwrap();

        let mut body2 = body.to_vec();
        crate::der::write_tlv(&mut body2, 0x02, &[1]);

        with_cofactor.clear();
        crate::der::write_tlv(&mut with_cofactor, 0x30, &body2);

        assert_eq!(BignParams::from_der(&with_cofactor).unwrap(), params);

        // trailing garbage is refused
        let mut trailing = der;
        trailing.push(0);
        assert!(BignParams::from_der(&trailing).is_err());
    }
}
