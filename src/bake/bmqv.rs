//! BMQV: certificate-based key agreement with implicit authentication
//!
//! Message schedule (`[]` marks parts controlled by the confirmation
//! flags):
//!
//! ```text
//! B -> A:  M1 = Vb
//! A -> B:  M2 = Va [‖ Ta]      (Ta present when kca)
//! B -> A:  M3 = [Tb]           (sent only when kcb)
//! ```
//!
//! Both parties fold their long-term keys into the shared point through the
//! signature-like response scalar `u - (2^l + t)·d`, so a session key proves
//! possession of the certified private keys without explicit signatures.

use zeroize::Zeroize;

use crate::ec::{mul, Affine, EcGroup};
use crate::ww::zz;
use crate::{Entropy, Error, Result};

use super::{
    confirm_check, confirm_tag, krp_num, read_exact, response_scalar, session_point, t_plus_2l,
    write_all, Cert, Channel, Role, Settings,
};
use crate::belt::hash::Hash;
use crate::bign::PrivateKey;

/// A BMQV session.
pub struct Bmqv<'a> {
    ec: &'a EcGroup,
    role: Role,
    settings: Settings<'a>,
    d: Vec<u32>,
    cert_a: Vec<u8>,
    cert_b: Vec<u8>,
    peer_q: Affine,
    u: Vec<u32>,
    own_v: Option<Affine>,
    k0: [u8; 32],
    k1: [u8; 32],
    stage: u8,
    ready: bool,
}

impl<'a> Drop for Bmqv<'a> {
    fn drop(&mut self) {
        self.d.zeroize();
        self.u.zeroize();
        self.k0.zeroize();
        self.k1.zeroize();
    }
}

impl<'a> Bmqv<'a> {
    /// Open a session. `cert_a`/`cert_b` are the certificates of sides A
    /// and B; the peer's validator runs here.
    pub fn start(
        ec: &'a EcGroup,
        role: Role,
        private: &PrivateKey,
        cert_a: &Cert,
        cert_b: &Cert,
        settings: Settings<'a>,
    ) -> Result<Self> {
        let peer_cert = match role {
            Role::A => cert_b,
            Role::B => cert_a,
        };

        let peer_q = peer_cert.public_key(ec)?.point().clone();

        Ok(Bmqv {
            ec,
            role,
            settings,
            d: private.d.clone(),
            cert_a: cert_a.data.clone(),
            cert_b: cert_b.data.clone(),
            peer_q,
            u: Vec::new(),
            own_v: None,
            k0: [0; 32],
            k1: [0; 32],
            stage: 0,
            ready: false,
        })
    }

    /// B: produce `M1 = Vb`.
    pub fn step2(&mut self, rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::B || self.stage != 0 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bmqv) step 2: issuing ephemeral");

        self.u = zz::rand_nz_mod(&self.ec.q, rng)?;

        let vb = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &self.ec.g))
            .ok_or(Error::BadRng)?;

        let m1 = self.ec.encode_point(&vb);

        self.own_v = Some(vb);
        self.stage = 1;

        Ok(m1)
    }

    fn derive(&mut self, kx: &[u8]) -> Result<()> {
        let base = Hash::hash_parts(&[
            kx,
            &self.cert_a,
            &self.cert_b,
            self.settings.helloa,
            self.settings.hellob,
        ]);

        self.k0 = krp_num(&base, 0)?;

        if self.settings.kca || self.settings.kcb {
            self.k1 = krp_num(&base, 1)?;
        }

        Ok(())
    }

    /// A: process `M1`, produce `M2 = Va [‖ Ta]`.
    pub fn step3(&mut self, m1: &[u8], rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::A || self.stage != 0 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bmqv) step 3: processing peer ephemeral");

        let vb = self.ec.decode_point(m1)?;

        self.u = zz::rand_nz_mod(&self.ec.q, rng)?;

        let va = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &self.ec.g))
            .ok_or(Error::BadRng)?;

        let vax = self.ec.f.to_octets(&va.x);
        let vbx = self.ec.f.to_octets(&vb.x);

        let c = t_plus_2l(self.ec, &vax, &vbx);

        let mut sa = response_scalar(self.ec, &self.u, &c, &self.d);

        let shared = session_point(self.ec, &sa, &vb, &c, &self.peer_q);

        sa.zeroize();

        let kx = self.ec.f.to_octets(&shared.x);
        self.derive(&kx)?;

        let mut m2 = self.ec.encode_point(&va);

        if self.settings.kca {
            m2.extend_from_slice(&confirm_tag(&self.k1, 0x00)?);
        }

        self.stage = 1;
        self.ready = !self.settings.kcb;

        Ok(m2)
    }

    /// B: process `M2`, produce `M3 = [Tb]` (empty without kcb).
    pub fn step4(&mut self, m2: &[u8]) -> Result<Vec<u8>> {
        if self.role != Role::B || self.stage != 1 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bmqv) step 4: processing peer response");

        let pl = self.ec.point_len();
        let expect_len = pl + if self.settings.kca { 8 } else { 0 };

        if m2.len() != expect_len {
            return Err(Error::BadLength);
        }

        let va = self.ec.decode_point(&m2[..pl])?;

        let vb = self.own_v.as_ref().expect("set by step2");

        let vax = self.ec.f.to_octets(&va.x);
        let vbx = self.ec.f.to_octets(&vb.x);

        let c = t_plus_2l(self.ec, &vax, &vbx);

        let mut sb = response_scalar(self.ec, &self.u, &c, &self.d);

        let shared = session_point(self.ec, &sb, &va, &c, &self.peer_q);

        sb.zeroize();

        let kx = self.ec.f.to_octets(&shared.x);
        self.derive(&kx)?;

        if self.settings.kca {
            confirm_check(&self.k1, 0x00, &m2[pl..])?;
        }

        self.stage = 2;
        self.ready = true;

        if self.settings.kcb {
            Ok(confirm_tag(&self.k1, 0xFF)?.to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    /// A: verify `M3 = Tb` (only with kcb).
    pub fn step5(&mut self, m3: &[u8]) -> Result<()> {
        if self.role != Role::A || self.stage != 1 || !self.settings.kcb {
            return Err(Error::BadLogic);
        }

        log::trace!("(bmqv) step 5: verifying confirmation");

        confirm_check(&self.k1, 0xFF, m3)?;

        self.ready = true;

        Ok(())
    }

    /// Surrender the 256-bit session key.
    pub fn step_g(mut self) -> Result<[u8; 32]> {
        if !self.ready {
            return Err(Error::BadLogic);
        }

        let key = self.k0;
        self.k0.zeroize();

        Ok(key)
    }
}

/// Drive a whole A-side session over a channel.
pub fn run_a(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    private: &PrivateKey,
    cert_a: &Cert,
    cert_b: &Cert,
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    let mut session = Bmqv::start(ec, Role::A, private, cert_a, cert_b, settings)?;

    let mut m1 = vec![0u8; ec.point_len()];
    read_exact(ch, &mut m1)?;

    let m2 = session.step3(&m1, rng)?;
    write_all(ch, &m2)?;

    if settings.kcb {
        let mut m3 = [0u8; 8];
        read_exact(ch, &mut m3)?;
        session.step5(&m3)?;
    }

    session.step_g()
}

/// Drive a whole B-side session over a channel.
pub fn run_b(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    private: &PrivateKey,
    cert_a: &Cert,
    cert_b: &Cert,
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    let mut session = Bmqv::start(ec, Role::B, private, cert_a, cert_b, settings)?;

    let m1 = session.step2(rng)?;
    write_all(ch, &m1)?;

    let mut m2 = vec![0u8; ec.point_len() + if settings.kca { 8 } else { 0 }];
    read_exact(ch, &mut m2)?;

    let m3 = session.step4(&m2)?;

    if settings.kcb {
        write_all(ch, &m3)?;
    }

    session.step_g()
}
