//! CV certificates: codec, issuance, chain validation
//!
//! The card-verifiable certificate is a nested application-class DER
//! structure: an outer envelope (`7F21`) holding the body (`7F4E`) and the
//! signature (`5F37`). The body carries the authority and holder names
//! (printable, 8–12 characters), the bign public key, BCD validity dates
//! and up to two holder authorization templates (eID and eSign).
//!
//! Signatures are deterministic bign signatures over the encoded body TLV;
//! the signature length follows the security level derived from the public
//! key length (the toy 96-bit level has its fixed 34-octet form).

use crate::belt::hash::Hash;
use crate::bign::params::{BignParams, ParamsId};
use crate::bign::{oid_to_der, sign, PrivateKey, PublicKey, OID_BELT_HASH};
use crate::der;
use crate::ec::EcGroup;
use crate::{Error, Result};

const TAG_CVC: u32 = 0x7F21;
const TAG_BODY: u32 = 0x7F4E;
const TAG_SIG: u32 = 0x5F37;
const TAG_VERSION: u32 = 0x5F29;
const TAG_AUTHORITY: u32 = 0x42;
const TAG_PUBKEY: u32 = 0x7F49;
const TAG_HOLDER: u32 = 0x5F20;
const TAG_HAT: u32 = 0x7F4C;
const TAG_FROM: u32 = 0x5F25;
const TAG_UNTIL: u32 = 0x5F24;
const TAG_EXT: u32 = 0x65;
const TAG_DDT: u32 = 0x73;
const TAG_DISCRETIONARY: u32 = 0x53;

const OID_BIGN_PUBKEY: &str = "1.2.112.0.2.0.34.101.45.2.1";
const OID_EID_ACCESS: &str = "1.2.112.0.2.0.34.101.79.6.1";
const OID_ESIGN_ACCESS: &str = "1.2.112.0.2.0.34.101.79.6.2";
const OID_ESIGN_AUTH_EXT: &str = "1.2.112.0.2.0.34.101.79.6.3";

/// Certificate requisites.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CvcReq {
    /// Issuing authority name, printable, 8–12 characters.
    pub authority: String,
    /// Holder name, printable, 8–12 characters.
    pub holder: String,
    /// Validity start, six BCD digits `YYMMDD`.
    pub from: [u8; 6],
    /// Validity end, six BCD digits `YYMMDD`.
    pub until: [u8; 6],
    /// eID holder authorization template.
    pub hat_eid: Option<[u8; 5]>,
    /// eSign holder authorization template.
    pub hat_esign: Option<[u8; 2]>,
    /// Public key octets (`x ‖ y`), 48/64/96/128 octets. May be left empty
    /// for issuance, in which case it is computed from the private key.
    pub pubkey: Vec<u8>,
}

/// A parsed certificate: requisites, encoded body, signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cvc {
    pub req: CvcReq,
    body: Vec<u8>,
    sig: Vec<u8>,
}

fn name_ok(name: &str) -> bool {
    (8..=12).contains(&name.len())
        && name
            .bytes()
            .all(|v| (0x20..=0x7E).contains(&v))
}

fn bcd_digits_ok(date: &[u8; 6]) -> bool {
    date.iter().all(|&d| d <= 9)
}

fn date_ok(date: &[u8; 6]) -> bool {
    if !bcd_digits_ok(date) {
        return false;
    }

    let year = 2000 + date[0] as u32 * 10 + date[1] as u32;
    let month = date[2] * 10 + date[3];
    let day = date[4] * 10 + date[5];

    if !(1..=12).contains(&month) || day == 0 {
        return false;
    }

    let leap = year % 4 == 0 && (year % 100 != 0 || year % 400 == 0);

    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        _ => 28,
    };

    day <= days
}

/// Security level from the public key length.
fn level_of(pubkey_len: usize) -> Result<usize> {
    match pubkey_len {
        48 => Ok(96),
        64 => Ok(128),
        96 => Ok(192),
        128 => Ok(256),
        _ => Err(Error::BadFormat),
    }
}

/// Signature length of a level; the toy level has its fixed short form.
fn sig_len_of(l: usize) -> usize {
    match l {
        96 => 34,
        _ => 3 * l / 8,
    }
}

fn validate_req(req: &CvcReq) -> Result<()> {
    if !name_ok(&req.authority) || !name_ok(&req.holder) {
        return Err(Error::BadName);
    }

    if !date_ok(&req.from) || !date_ok(&req.until) {
        return Err(Error::BadTime);
    }

    if req.from > req.until {
        return Err(Error::BadTime);
    }

    level_of(req.pubkey.len())?;

    Ok(())
}

fn encode_hat(out: &mut Vec<u8>, oid: &str, mask: &[u8]) -> Result<()> {
    let mut hat = oid_to_der(oid)?;
    der::write_tlv(&mut hat, TAG_DISCRETIONARY, mask);

    der::write_tlv(out, TAG_HAT, &hat);

    Ok(())
}

fn encode_body(req: &CvcReq) -> Result<Vec<u8>> {
    let mut content = Vec::new();

    der::write_tlv(&mut content, TAG_VERSION, &[0]);
    der::write_tlv(&mut content, TAG_AUTHORITY, req.authority.as_bytes());

    let mut pubkey_seq = oid_to_der(OID_BIGN_PUBKEY)?;
    let mut bits = vec![0u8];
    bits.extend_from_slice(&req.pubkey);
    der::write_tlv(&mut pubkey_seq, 0x03, &bits);

    der::write_tlv(&mut content, TAG_PUBKEY, &pubkey_seq);

    der::write_tlv(&mut content, TAG_HOLDER, req.holder.as_bytes());

    if let Some(mask) = &req.hat_eid {
        encode_hat(&mut content, OID_EID_ACCESS, mask)?;
    }

    der::write_tlv(&mut content, TAG_FROM, &req.from);
    der::write_tlv(&mut content, TAG_UNTIL, &req.until);

    if let Some(mask) = &req.hat_esign {
        let mut ddt = oid_to_der(OID_ESIGN_AUTH_EXT)?;
        encode_hat(&mut ddt, OID_ESIGN_ACCESS, mask)?;

        let mut ext = Vec::new();
        der::write_tlv(&mut ext, TAG_DDT, &ddt);

        der::write_tlv(&mut content, TAG_EXT, &ext);
    }

    let mut body = Vec::new();
    der::write_tlv(&mut body, TAG_BODY, &content);

    Ok(body)
}

fn parse_hat<'a>(content: &'a [u8], oid: &str) -> Result<&'a [u8]> {
    let mut rd = der::Reader::new(content);

    let got = rd.expect(0x06)?;
    if der::oid_from_content(got)? != oid {
        return Err(Error::BadFormat);
    }

    let mask = rd.expect(TAG_DISCRETIONARY)?;
    rd.finish()?;

    Ok(mask)
}

fn parse_body(body_content: &[u8]) -> Result<CvcReq> {
    let mut rd = der::Reader::new(body_content);

    if rd.expect(TAG_VERSION)? != [0] {
        return Err(Error::BadFormat);
    }

    let authority = String::from_utf8(rd.expect(TAG_AUTHORITY)?.to_vec())
        .map_err(|_| Error::BadFormat)?;

    let pubkey_seq = rd.expect(TAG_PUBKEY)?;
    let pubkey = {
        let mut pr = der::Reader::new(pubkey_seq);

        let oid = pr.expect(0x06)?;
        if der::oid_from_content(oid)? != OID_BIGN_PUBKEY {
            return Err(Error::BadFormat);
        }

        let bits = pr.expect(0x03)?;
        pr.finish()?;

        if bits.is_empty() || bits[0] != 0 {
            return Err(Error::BadFormat);
        }

        bits[1..].to_vec()
    };

    let holder =
        String::from_utf8(rd.expect(TAG_HOLDER)?.to_vec()).map_err(|_| Error::BadFormat)?;

    let hat_eid = match rd.optional(TAG_HAT)? {
        Some(content) => {
            let mask = parse_hat(content, OID_EID_ACCESS)?;

            if mask.len() != 5 {
                return Err(Error::BadFormat);
            }

            let mut hat = [0u8; 5];
            hat.copy_from_slice(mask);
            Some(hat)
        }
        None => None,
    };

    let from_octets = rd.expect(TAG_FROM)?;
    let until_octets = rd.expect(TAG_UNTIL)?;

    if from_octets.len() != 6 || until_octets.len() != 6 {
        return Err(Error::BadTime);
    }

    let mut from = [0u8; 6];
    from.copy_from_slice(from_octets);

    let mut until = [0u8; 6];
    until.copy_from_slice(until_octets);

    let hat_esign = match rd.optional(TAG_EXT)? {
        Some(ext) => {
            let mut er = der::Reader::new(ext);
            let ddt = er.expect(TAG_DDT)?;
            er.finish()?;

            let mut dr = der::Reader::new(ddt);

            let oid = dr.expect(0x06)?;
            if der::oid_from_content(oid)? != OID_ESIGN_AUTH_EXT {
                return Err(Error::BadFormat);
            }

            let hat_content = dr.expect(TAG_HAT)?;
            dr.finish()?;

            let mask = parse_hat(hat_content, OID_ESIGN_ACCESS)?;

            if mask.len() != 2 {
                return Err(Error::BadFormat);
            }

            let mut hat = [0u8; 2];
            hat.copy_from_slice(mask);
            Some(hat)
        }
        None => None,
    };

    rd.finish()?;

    Ok(CvcReq {
        authority,
        holder,
        from,
        until,
        hat_eid,
        hat_esign,
        pubkey,
    })
}

/// The curve group of a certificate level.
///
/// Only the 128-bit level carries a named parameter table (see the crate
/// non-goals): certificates of the 96/192/256 levels parse structurally,
/// but issuance, signature verification and key extraction refuse them
/// with `NotImplemented` here rather than deeper in the stack.
fn group_for_level(l: usize) -> Result<EcGroup> {
    match l {
        128 => BignParams::standard(ParamsId::B128)?.into_group(),
        96 | 192 | 256 => Err(Error::NotImplemented),
        _ => Err(Error::BadParams),
    }
}

impl Cvc {
    /// Issue a certificate: encode the body and sign it with the issuer
    /// key. An empty `req.pubkey` is filled with the key of `holder_key`
    /// first.
    ///
    /// `issuer_key` signs; for a self-signed root it is the holder key.
    /// Levels without a named parameter table are refused with
    /// `NotImplemented`.
    pub fn wrap(mut req: CvcReq, holder_key: &PrivateKey, issuer_key: &PrivateKey) -> Result<Cvc> {
        if req.pubkey.is_empty() {
            // the holder key determines the level; only tabulated levels
            // can issue
            let ec = group_for_level(128)?;
            req.pubkey = holder_key.public_key(&ec)?.to_octets(&ec);
        }

        validate_req(&req)?;

        let l = level_of(req.pubkey.len())?;
        let ec = group_for_level(l)?;

        let body = encode_body(&req)?;

        let oid = oid_to_der(OID_BELT_HASH)?;
        let digest = Hash::hash(&body);

        let sig = sign::sign_det(&ec, &oid, &digest, issuer_key, &[])?;

        debug_assert_eq!(sig.len(), sig_len_of(l));

        Ok(Cvc { req, body, sig })
    }

    /// The full certificate octets.
    pub fn to_octets(&self) -> Vec<u8> {
        let mut content = self.body.clone();
        der::write_tlv(&mut content, TAG_SIG, &self.sig);

        let mut out = Vec::new();
        der::write_tlv(&mut out, TAG_CVC, &content);

        out
    }

    /// Parse and structurally validate certificate octets.
    pub fn unwrap(octets: &[u8]) -> Result<Cvc> {
        let mut rd = der::Reader::new(octets);

        let content = rd.expect(TAG_CVC)?;
        rd.finish()?;

        let mut cr = der::Reader::new(content);

        // keep the body TLV verbatim: it is the signed transcript
        let body_value = cr.expect(TAG_BODY)?;

        let body_total = der::encoded_len(TAG_BODY, body_value.len());
        let body = content[..body_total].to_vec();

        let sig = cr.expect(TAG_SIG)?.to_vec();
        cr.finish()?;

        let req = parse_body(body_value)?;

        validate_req(&req)?;

        let l = level_of(req.pubkey.len())?;

        if sig.len() != sig_len_of(l) {
            return Err(Error::BadFormat);
        }

        // vet the key against its curve when the level is tabulated
        match group_for_level(l) {
            Ok(ec) => {
                PublicKey::from_octets(&ec, &req.pubkey)?;
            }
            Err(Error::NotImplemented) => (),
            Err(e) => return Err(e),
        }

        Ok(Cvc {
            req,
            body,
            sig,
        })
    }

    /// Verify this certificate's signature against an issuer public key.
    ///
    /// Refuses untabulated levels with `NotImplemented`.
    pub fn verify(&self, issuer: &PublicKey) -> Result<()> {
        let l = level_of(self.req.pubkey.len())?;
        let ec = group_for_level(l)?;

        let oid = oid_to_der(OID_BELT_HASH)?;
        let digest = Hash::hash(&self.body);

        sign::verify(&ec, &oid, &digest, &self.sig, issuer)
    }

    /// The holder public key on its curve.
    ///
    /// Refuses untabulated levels with `NotImplemented`.
    pub fn public_key(&self) -> Result<PublicKey> {
        let l = level_of(self.req.pubkey.len())?;
        let ec = group_for_level(l)?;

        PublicKey::from_octets(&ec, &self.req.pubkey)
    }

    /// Pairwise chain condition: the child's authority is the parent's
    /// holder, and the child validity starts inside the parent's window.
    pub fn check2(child: &Cvc, parent: &Cvc) -> Result<()> {
        if child.req.authority != parent.req.holder {
            return Err(Error::BadName);
        }

        if child.req.from < parent.req.from || child.req.from > parent.req.until {
            return Err(Error::BadTime);
        }

        Ok(())
    }

    /// Validate child octets against a trusted parent: parse, pairwise
    /// conditions, signature. Returns the parsed child.
    pub fn val2(parent: &Cvc, child_octets: &[u8]) -> Result<Cvc> {
        let child = Cvc::unwrap(child_octets)?;

        Cvc::check2(&child, parent)?;

        child.verify(&parent.public_key()?)?;

        Ok(child)
    }

    /// Validate child octets against a trusted parent.
    pub fn val(parent: &Cvc, child_octets: &[u8]) -> Result<()> {
        Cvc::val2(parent, child_octets).map(|_| ())
    }

    /// Verify that a private key matches the certificate's public key.
    pub fn match_key(&self, private: &PrivateKey) -> Result<()> {
        let l = level_of(self.req.pubkey.len())?;
        let ec = group_for_level(l)?;

        let expect = private.public_key(&ec)?.to_octets(&ec);

        if expect == self.req.pubkey {
            Ok(())
        } else {
            Err(Error::BadPrivKey)
        }
    }
}
