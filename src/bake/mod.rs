//! bake: authenticated key establishment (STB 34.101.66)
//!
//! Three protocols share one session pattern: a `start` constructor, numbered
//! `step` calls in a fixed order, and a final `step_g` that surrenders the
//! 256-bit session key. Out-of-order calls answer [`Error::BadLogic`]; any
//! failing step leaves the session terminal. Dropping a session zeroizes
//! every secret it held.
//!
//! This module carries the shared machinery: the key derivation, the
//! map-to-curve helper, certificates with caller-supplied validators, the
//! octet-channel contract, and the settings block.

use crate::belt::hash::Hash;
use crate::belt::krp::{key_rep, num_header, ones_level};
use crate::belt::mac::Mac;
use crate::belt::wbl::Wbl;
use crate::belt::BeltKey;
use crate::ec::{swu, Affine, EcGroup};
use crate::ww;
use crate::{Error, Result};

pub mod bmqv;
pub mod bsts;
pub mod bpace;

/// Session role. `A` initiates on a channel; `B` answers, and speaks first,
/// since every protocol opens with `B`'s ephemeral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    A,
    B,
}

/// Immutable per-session settings.
///
/// The key-confirmation flags change message lengths and the presence of the
/// closing confirmations; the hello strings bind application context into
/// the derived keys.
#[derive(Clone, Copy, Default)]
pub struct Settings<'a> {
    /// Key confirmation by side A.
    pub kca: bool,
    /// Key confirmation by side B.
    pub kcb: bool,
    /// Application hello of side A.
    pub helloa: &'a [u8],
    /// Application hello of side B.
    pub hellob: &'a [u8],
}

/// Certificate validator: extracts the public key from opaque certificate
/// octets and vouches for their authenticity.
pub type CertVal = fn(&EcGroup, &[u8]) -> Result<crate::bign::PublicKey>;

/// An opaque certificate envelope paired with its validator.
#[derive(Clone)]
pub struct Cert {
    /// The certificate octets, hashed into the session transcript.
    pub data: Vec<u8>,
    /// The validator vouching for the octets.
    pub val: CertVal,
}

impl Cert {
    /// Run the validator.
    pub fn public_key(&self, ec: &EcGroup) -> Result<crate::bign::PublicKey> {
        (self.val)(ec, &self.data).map_err(|_| Error::BadCert)
    }
}

/// Bidirectional octet channel with reliable-stream semantics.
///
/// Short reads and writes are retried by the framing helpers; a `Timeout`
/// from the transport propagates unchanged.
pub trait Channel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
}

/// Read exactly `buf.len()` octets.
pub(crate) fn read_exact(ch: &mut dyn Channel, buf: &mut [u8]) -> Result<()> {
    let mut pos = 0;

    while pos < buf.len() {
        let got = ch.read(&mut buf[pos..])?;

        if got == 0 {
            return Err(Error::Timeout);
        }

        pos += got;
    }

    Ok(())
}

/// Write all of `buf`.
pub(crate) fn write_all(ch: &mut dyn Channel, buf: &[u8]) -> Result<()> {
    let mut pos = 0;

    while pos < buf.len() {
        let sent = ch.write(&buf[pos..])?;

        if sent == 0 {
            return Err(Error::Timeout);
        }

        pos += sent;
    }

    Ok(())
}

/// Protocol key derivation: `key_num = KRP(belt-hash(secret ‖ iv), 1^96, ⟨num⟩)`.
pub fn kdf(secret: &[u8], iv_parts: &[&[u8]], num: u64) -> Result<[u8; 32]> {
    let mut st = Hash::new();
    st.step_h(secret);
    for part in iv_parts {
        st.step_h(part);
    }

    let base = st.step_g();

    let derived = key_rep(&base, &ones_level(), &num_header(num), 32)?;

    let mut out = [0u8; 32];
    out.copy_from_slice(&derived);
    Ok(out)
}

/// Derive additional keys from an already-hashed transcript.
pub(crate) fn krp_num(base: &[u8; 32], num: u64) -> Result<[u8; 32]> {
    let derived = key_rep(base, &ones_level(), &num_header(num), 32)?;

    let mut out = [0u8; 32];
    out.copy_from_slice(&derived);
    Ok(out)
}

/// The map-to-curve helper: `W = swu(wbl(X ‖ 0^128, 0-key) mod p)`.
pub fn swu_point(ec: &EcGroup, x: &[u8]) -> Result<Affine> {
    let mut buf = x.to_vec();
    buf.extend_from_slice(&[0u8; 16]);

    let zero_key = BeltKey::new(&[0u8; 32])?;
    Wbl::new(zero_key).encrypt(&mut buf)?;

    let limbs = ww::from_le_bytes(&buf, (buf.len() + 3) / 4);
    let s = ec.f.from_int(&limbs);

    swu::map_to_curve(ec, &s)
}

/// Confirmation tag: belt-MAC of a fixed 16-octet pattern under a derived
/// key.
pub(crate) fn confirm_tag(key: &[u8; 32], pattern: u8) -> Result<[u8; 8]> {
    let mac_key = BeltKey::new(key)?;

    Ok(Mac::mac(mac_key, &[pattern; 16]))
}

/// Timing-safe confirmation check.
pub(crate) fn confirm_check(key: &[u8; 32], pattern: u8, tag: &[u8]) -> Result<()> {
    let mac_key = BeltKey::new(key)?;

    let mut mac = Mac::new(mac_key);
    mac.step_a(&[pattern; 16]);

    mac.step_v(tag).map_err(|_| Error::Auth)
}

/// `t + 2^l` from the ephemeral abscissas, as a mod-q residue.
pub(crate) fn t_plus_2l(ec: &EcGroup, vax: &[u8], vbx: &[u8]) -> Vec<u32> {
    let t_wide = Hash::hash_parts(&[vax, vbx]);

    let mut c = ww::from_le_bytes(&t_wide[..ec.l / 8], ec.q.len());
    ww::set_bit(&mut c, ec.l);

    c
}

/// `(u - c·d) mod q`: the signature-like response scalar of BMQV/BSTS.
pub(crate) fn response_scalar(ec: &EcGroup, u: &[u32], c: &[u32], d: &[u32]) -> Vec<u32> {
    let prod = {
        let cm = ec.qm.to_mont(c);
        let dm = ec.qm.to_mont(d);

        ec.qm.from_mont(&ec.qm.mul(&cm, &dm))
    };

    ww::zz::sub_mod(u, &prod, &ec.q)
}

/// `V - c·Q` evaluated variable-time (all inputs public). `None` is the
/// point at infinity.
pub(crate) fn twist_point(ec: &EcGroup, v: &Affine, c: &[u32], q: &Affine) -> Option<Affine> {
    let neg_q = Affine {
        x: q.x.clone(),
        y: ec.f.neg(&q.y),
    };

    let sum = ec.add(
        &ec.lift(v),
        &crate::ec::mul::mul_vartime(ec, c, &neg_q),
    );

    ec.to_affine(&sum)
}

/// The shared session point `s·(V - c·Q)`; degenerate combinations
/// substitute the base point.
pub(crate) fn session_point(
    ec: &EcGroup,
    s: &[u32],
    v: &Affine,
    c: &[u32],
    q: &Affine,
) -> Affine {
    let w = match twist_point(ec, v, c, q) {
        Some(w) => w,
        None => return ec.g.clone(),
    };

    match ec.to_affine(&crate::ec::mul::mul_ct(ec, s, &w)) {
        Some(p) => p,
        None => ec.g.clone(),
    }
}
