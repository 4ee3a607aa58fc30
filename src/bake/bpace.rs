//! BPACE: password-authenticated key establishment
//!
//! No certificates: both sides prove knowledge of a shared password by
//! exchanging nonces under the password key and meeting on a password-bound
//! generator `W` produced by the map-to-curve helper.
//!
//! ```text
//! B -> A:  M1 = Enc(K2, Rb)
//! A -> B:  M2 = Enc(K2, Ra) ‖ Va
//! B -> A:  M3 = Vb [‖ Tb]
//! A -> B:  M4 = [Ta]
//! ```
//!
//! `K2 = belt-hash(password)` encrypts only the nonces (belt-ECB); the
//! session key comes from the ephemeral agreement over `W = swu(Ra ‖ Rb)`.

use zeroize::Zeroize;

use crate::belt::hash::Hash;
use crate::belt::modes::Ecb;
use crate::belt::BeltKey;
use crate::ec::{mul, Affine, EcGroup};
use crate::ww::zz;
use crate::{Entropy, Error, Result};

use super::{
    confirm_check, confirm_tag, krp_num, read_exact, swu_point, write_all, Channel, Role, Settings,
};

/// Hash a password into the nonce-protection key.
pub fn password_key(pwd: &[u8]) -> [u8; 32] {
    Hash::hash(pwd)
}

/// Nonce length for a level: at least one cipher block.
fn nonce_len(ec: &EcGroup) -> usize {
    (ec.l / 8).max(16)
}

/// A BPACE session.
pub struct Bpace<'a> {
    ec: &'a EcGroup,
    role: Role,
    settings: Settings<'a>,
    k2: [u8; 32],
    ra: Vec<u8>,
    rb: Vec<u8>,
    u: Vec<u32>,
    own_v: Option<Affine>,
    k0: [u8; 32],
    k1: [u8; 32],
    stage: u8,
    ready: bool,
}

impl<'a> Drop for Bpace<'a> {
    fn drop(&mut self) {
        self.k2.zeroize();
        self.ra.zeroize();
        self.rb.zeroize();
        self.u.zeroize();
        self.k0.zeroize();
        self.k1.zeroize();
    }
}

impl<'a> Bpace<'a> {
    /// Open a session from a hashed password (see [`password_key`]).
    pub fn start(
        ec: &'a EcGroup,
        role: Role,
        pwd_key: &[u8; 32],
        settings: Settings<'a>,
    ) -> Result<Self> {
        Ok(Bpace {
            ec,
            role,
            settings,
            k2: *pwd_key,
            ra: Vec::new(),
            rb: Vec::new(),
            u: Vec::new(),
            own_v: None,
            k0: [0; 32],
            k1: [0; 32],
            stage: 0,
            ready: false,
        })
    }

    fn ecb(&self) -> Result<Ecb> {
        Ok(Ecb::new(BeltKey::new(&self.k2)?))
    }

    /// B: produce `M1 = Enc(K2, Rb)`.
    pub fn step2(&mut self, rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::B || self.stage != 0 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bpace) step 2: issuing nonce");

        self.rb = vec![0u8; nonce_len(self.ec)];
        rng.fill(&mut self.rb)?;

        let mut m1 = self.rb.clone();
        self.ecb()?.encrypt(&mut m1)?;

        self.stage = 1;

        Ok(m1)
    }

    /// A: process `M1`, produce `M2 = Enc(K2, Ra) ‖ Va`.
    pub fn step3(&mut self, m1: &[u8], rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::A || self.stage != 0 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bpace) step 3: deriving the password generator");

        if m1.len() != nonce_len(self.ec) {
            return Err(Error::BadLength);
        }

        self.rb = m1.to_vec();
        self.ecb()?.decrypt(&mut self.rb)?;

        self.ra = vec![0u8; nonce_len(self.ec)];
        rng.fill(&mut self.ra)?;

        let w = {
            let mut x = self.ra.clone();
            x.extend_from_slice(&self.rb);
            swu_point(self.ec, &x)?
        };

        self.u = zz::rand_nz_mod(&self.ec.q, rng)?;

        let va = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &w))
            .ok_or(Error::BadRng)?;

        let mut m2 = self.ra.clone();
        self.ecb()?.encrypt(&mut m2)?;

        m2.extend_from_slice(&self.ec.encode_point(&va));

        self.own_v = Some(va);
        self.stage = 1;

        Ok(m2)
    }

    fn derive(&mut self, shared: &Affine, vax: &[u8], vbx: &[u8]) -> Result<()> {
        let kx = self.ec.f.to_octets(&shared.x);

        let base = Hash::hash_parts(&[
            &kx,
            vax,
            vbx,
            self.settings.helloa,
            self.settings.hellob,
        ]);

        self.k0 = krp_num(&base, 0)?;

        if self.settings.kca || self.settings.kcb {
            self.k1 = krp_num(&base, 1)?;
        }

        Ok(())
    }

    /// B: process `M2`, produce `M3 = Vb [‖ Tb]`.
    pub fn step4(&mut self, m2: &[u8], rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::B || self.stage != 1 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bpace) step 4: answering ephemeral");

        let nl = nonce_len(self.ec);
        let pl = self.ec.point_len();

        if m2.len() != nl + pl {
            return Err(Error::BadLength);
        }

        self.ra = m2[..nl].to_vec();
        self.ecb()?.decrypt(&mut self.ra)?;

        let va = self.ec.decode_point(&m2[nl..])?;

        let w = {
            let mut x = self.ra.clone();
            x.extend_from_slice(&self.rb);
            swu_point(self.ec, &x)?
        };

        self.u = zz::rand_nz_mod(&self.ec.q, rng)?;

        let vb = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &w))
            .ok_or(Error::BadRng)?;

        let shared = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &va))
            .ok_or(Error::BadPoint)?;

        let vax = self.ec.f.to_octets(&va.x);
        let vbx = self.ec.f.to_octets(&vb.x);

        self.derive(&shared, &vax, &vbx)?;

        let mut m3 = self.ec.encode_point(&vb);

        if self.settings.kcb {
            m3.extend_from_slice(&confirm_tag(&self.k1, 0xFF)?);
        }

        self.stage = 2;
        self.ready = !self.settings.kca;

        Ok(m3)
    }

    /// A: process `M3`, produce `M4 = [Ta]` (empty without kca).
    pub fn step5(&mut self, m3: &[u8]) -> Result<Vec<u8>> {
        if self.role != Role::A || self.stage != 1 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bpace) step 5: confirming");

        let pl = self.ec.point_len();
        let expect = pl + if self.settings.kcb { 8 } else { 0 };

        if m3.len() != expect {
            return Err(Error::BadLength);
        }

        let vb = self.ec.decode_point(&m3[..pl])?;

        let shared = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &vb))
            .ok_or(Error::BadPoint)?;

        let va = self.own_v.clone().expect("set by step3");

        let vax = self.ec.f.to_octets(&va.x);
        let vbx = self.ec.f.to_octets(&vb.x);

        self.derive(&shared, &vax, &vbx)?;

        if self.settings.kcb {
            confirm_check(&self.k1, 0xFF, &m3[pl..])?;
        }

        self.stage = 2;
        self.ready = true;

        if self.settings.kca {
            Ok(confirm_tag(&self.k1, 0x00)?.to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    /// B: verify `M4 = Ta` (only with kca).
    pub fn step6(&mut self, m4: &[u8]) -> Result<()> {
        if self.role != Role::B || self.stage != 2 || !self.settings.kca {
            return Err(Error::BadLogic);
        }

        log::trace!("(bpace) step 6: verifying confirmation");

        confirm_check(&self.k1, 0x00, m4)?;

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
    pwd_key: &[u8; 32],
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    let mut session = Bpace::start(ec, Role::A, pwd_key, settings)?;

    let mut m1 = vec![0u8; nonce_len(ec)];
    read_exact(ch, &mut m1)?;

    let m2 = session.step3(&m1, rng)?;
    write_all(ch, &m2)?;

    let mut m3 = vec![0u8; ec.point_len() + if settings.kcb { 8 } else { 0 }];
    read_exact(ch, &mut m3)?;

    let m4 = session.step5(&m3)?;

    if settings.kca {
        write_all(ch, &m4)?;
    }

    session.step_g()
}

/// Drive a whole B-side session over a channel.
pub fn run_b(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    pwd_key: &[u8; 32],
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    let mut session = Bpace::start(ec, Role::B, pwd_key, settings)?;

    let m1 = session.step2(rng)?;
    write_all(ch, &m1)?;

    let mut m2 = vec![0u8; nonce_len(ec) + ec.point_len()];
    read_exact(ch, &mut m2)?;

    let m3 = session.step4(&m2, rng)?;
    write_all(ch, &m3)?;

    if settings.kca {
        let mut m4 = [0u8; 8];
        read_exact(ch, &mut m4)?;
        session.step6(&m4)?;
    }

    session.step_g()
}
