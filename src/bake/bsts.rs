//! BSTS: station-to-station agreement with in-band certificates
//!
//! Unlike BMQV, the certificates travel inside the protocol, encrypted
//! together with the signature-like response scalars; both confirmation
//! flags are mandatory here.
//!
//! ```text
//! B -> A:  M1 = Vb
//! A -> B:  M2 = Va ‖ Enc(K2, sa ‖ certa) ‖ MAC(K1, Ya ‖ 0^128)
//! B -> A:  M3 = Enc(K2, sb ‖ certb) ‖ MAC(K1, Yb ‖ 1^128)
//! ```
//!
//! The traffic key `K2` runs belt-CFB; side A encrypts under the zero
//! synchro value, side B under the all-ones one, so the two directions
//! never share keystream.

use zeroize::Zeroize;

use crate::belt::hash::Hash;
use crate::belt::mac::Mac;
use crate::belt::modes::Cfb;
use crate::belt::BeltKey;
use crate::ec::{mul, Affine, EcGroup};
use crate::ww::zz;
use crate::{Entropy, Error, Result};

use super::{
    krp_num, read_exact, response_scalar, t_plus_2l, write_all, Cert, CertVal, Channel, Role,
    Settings,
};
use crate::bign::PrivateKey;

/// A BSTS session.
pub struct Bsts<'a> {
    ec: &'a EcGroup,
    role: Role,
    settings: Settings<'a>,
    d: Vec<u32>,
    own_cert: Vec<u8>,
    peer_val: CertVal,
    u: Vec<u32>,
    own_v: Option<Affine>,
    peer_v: Option<Affine>,
    c: Vec<u32>,
    k0: [u8; 32],
    k1: [u8; 32],
    k2: [u8; 32],
    stage: u8,
    ready: bool,
}

impl<'a> Drop for Bsts<'a> {
    fn drop(&mut self) {
        self.d.zeroize();
        self.u.zeroize();
        self.k0.zeroize();
        self.k1.zeroize();
        self.k2.zeroize();
    }
}

impl<'a> Bsts<'a> {
    /// Open a session. Both confirmation flags must be set.
    pub fn start(
        ec: &'a EcGroup,
        role: Role,
        private: &PrivateKey,
        own_cert: &Cert,
        peer_val: CertVal,
        settings: Settings<'a>,
    ) -> Result<Self> {
        if !settings.kca || !settings.kcb {
            return Err(Error::BadInput);
        }

        Ok(Bsts {
            ec,
            role,
            settings,
            d: private.d.clone(),
            own_cert: own_cert.data.clone(),
            peer_val,
            u: Vec::new(),
            own_v: None,
            peer_v: None,
            c: Vec::new(),
            k0: [0; 32],
            k1: [0; 32],
            k2: [0; 32],
            stage: 0,
            ready: false,
        })
    }

    /// B: produce `M1 = Vb`.
    pub fn step2(&mut self, rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::B || self.stage != 0 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bsts) step 2: issuing ephemeral");

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

    fn derive(&mut self, shared_x: &[u8]) -> Result<()> {
        let base = Hash::hash_parts(&[shared_x, self.settings.helloa, self.settings.hellob]);

        self.k0 = krp_num(&base, 0)?;
        self.k1 = krp_num(&base, 1)?;
        self.k2 = krp_num(&base, 2)?;

        Ok(())
    }

    fn cfb(&self, iv_octet: u8) -> Result<Cfb> {
        Ok(Cfb::new(BeltKey::new(&self.k2)?, [iv_octet; 16]))
    }

    fn tag_over(&self, y: &[u8], pattern: u8) -> Result<[u8; 8]> {
        let mut mac = Mac::new(BeltKey::new(&self.k1)?);
        mac.step_a(y);
        mac.step_a(&[pattern; 16]);

        Ok(mac.step_g())
    }

    fn check_tag(&self, y: &[u8], pattern: u8, tag: &[u8]) -> Result<()> {
        let mut mac = Mac::new(BeltKey::new(&self.k1)?);
        mac.step_a(y);
        mac.step_a(&[pattern; 16]);

        mac.step_v(tag).map_err(|_| Error::Auth)
    }

    /// Check a response scalar against an ephemeral: `s·G + c·Q = V`.
    fn response_matches(&self, s: &[u32], public: &Affine, v: &Affine) -> bool {
        let lhs = mul::mul_add_vartime(self.ec, s, &self.ec.g, &self.c, public);

        match self.ec.to_affine(&lhs) {
            Some(p) => self.ec.encode_point(&p) == self.ec.encode_point(v),
            None => false,
        }
    }

    /// A: process `M1`, produce `M2`.
    pub fn step3(&mut self, m1: &[u8], rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        if self.role != Role::A || self.stage != 0 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bsts) step 3: processing peer ephemeral");

        let vb = self.ec.decode_point(m1)?;

        self.u = zz::rand_nz_mod(&self.ec.q, rng)?;

        let va = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &self.ec.g))
            .ok_or(Error::BadRng)?;

        // plain ephemeral agreement keys the session
        let shared = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &vb))
            .ok_or(Error::BadPoint)?;

        let shared_x = self.ec.f.to_octets(&shared.x);
        self.derive(&shared_x)?;

        let vax = self.ec.f.to_octets(&va.x);
        let vbx = self.ec.f.to_octets(&vb.x);

        self.c = t_plus_2l(self.ec, &vax, &vbx);

        let mut sa = response_scalar(self.ec, &self.u, &self.c, &self.d);

        let mut ya = self.ec.scalar_to_octets(&sa);
        ya.extend_from_slice(&self.own_cert);

        sa.zeroize();

        let tag = self.tag_over(&ya, 0x00)?;

        let mut enc = ya;
        self.cfb(0x00)?.encrypt(&mut enc);

        let mut m2 = self.ec.encode_point(&va);
        m2.extend_from_slice(&enc);
        m2.extend_from_slice(&tag);

        self.peer_v = Some(vb);
        self.stage = 1;

        Ok(m2)
    }

    /// B: process `M2`, produce `M3`.
    pub fn step4(&mut self, m2: &[u8]) -> Result<Vec<u8>> {
        if self.role != Role::B || self.stage != 1 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bsts) step 4: authenticating peer");

        let pl = self.ec.point_len();
        let no = self.ec.f.no;

        if m2.len() < pl + no + 8 {
            return Err(Error::BadLength);
        }

        let va = self.ec.decode_point(&m2[..pl])?;

        let vb = self.own_v.clone().expect("set by step2");

        let shared = self
            .ec
            .to_affine(&mul::mul_ct(self.ec, &self.u, &va))
            .ok_or(Error::BadPoint)?;

        let shared_x = self.ec.f.to_octets(&shared.x);
        self.derive(&shared_x)?;

        let (enc, tag) = m2[pl..].split_at(m2.len() - pl - 8);

        let mut ya = enc.to_vec();
        self.cfb(0x00)?.decrypt(&mut ya);

        self.check_tag(&ya, 0x00, tag)?;

        let (sa_octets, certa) = ya.split_at(no);

        let qa = (self.peer_val)(self.ec, certa).map_err(|_| Error::BadCert)?;

        let vax = self.ec.f.to_octets(&va.x);
        let vbx = self.ec.f.to_octets(&vb.x);

        self.c = t_plus_2l(self.ec, &vax, &vbx);

        let sa = self
            .ec
            .scalar_from_octets(sa_octets)
            .map_err(|_| Error::BadSig)?;

        if !self.response_matches(&sa, qa.point(), &va) {
            return Err(Error::BadSig);
        }

        // own response
        let mut sb = response_scalar(self.ec, &self.u, &self.c, &self.d);

        let mut yb = self.ec.scalar_to_octets(&sb);
        yb.extend_from_slice(&self.own_cert);

        sb.zeroize();

        let tag = self.tag_over(&yb, 0xFF)?;

        let mut enc = yb;
        self.cfb(0xFF)?.encrypt(&mut enc);

        let mut m3 = enc;
        m3.extend_from_slice(&tag);

        self.stage = 2;
        self.ready = true;

        Ok(m3)
    }

    /// A: process `M3`.
    pub fn step5(&mut self, m3: &[u8]) -> Result<()> {
        if self.role != Role::A || self.stage != 1 {
            return Err(Error::BadLogic);
        }

        log::trace!("(bsts) step 5: authenticating peer");

        let no = self.ec.f.no;

        if m3.len() < no + 8 {
            return Err(Error::BadLength);
        }

        let (enc, tag) = m3.split_at(m3.len() - 8);

        let mut yb = enc.to_vec();
        self.cfb(0xFF)?.decrypt(&mut yb);

        self.check_tag(&yb, 0xFF, tag)?;

        let (sb_octets, certb) = yb.split_at(no);

        let qb = (self.peer_val)(self.ec, certb).map_err(|_| Error::BadCert)?;

        let sb = self
            .ec
            .scalar_from_octets(sb_octets)
            .map_err(|_| Error::BadSig)?;

        let vb = self.peer_v.clone().expect("set by step3");

        if !self.response_matches(&sb, qb.point(), &vb) {
            return Err(Error::BadSig);
        }

        self.stage = 2;
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

/// Drive a whole A-side session over a channel. `peer_cert_len` sizes the
/// incoming certificate.
pub fn run_a(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    private: &PrivateKey,
    own_cert: &Cert,
    peer_val: CertVal,
    peer_cert_len: usize,
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    let mut session = Bsts::start(ec, Role::A, private, own_cert, peer_val, settings)?;

    let mut m1 = vec![0u8; ec.point_len()];
    read_exact(ch, &mut m1)?;

    let m2 = session.step3(&m1, rng)?;
    write_all(ch, &m2)?;

    let mut m3 = vec![0u8; ec.f.no + peer_cert_len + 8];
    read_exact(ch, &mut m3)?;
    session.step5(&m3)?;

    session.step_g()
}

/// Drive a whole B-side session over a channel.
pub fn run_b(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    private: &PrivateKey,
    own_cert: &Cert,
    peer_val: CertVal,
    peer_cert_len: usize,
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    let mut session = Bsts::start(ec, Role::B, private, own_cert, peer_val, settings)?;

    let m1 = session.step2(rng)?;
    write_all(ch, &m1)?;

    let mut m2 = vec![0u8; ec.point_len() + ec.f.no + peer_cert_len + 8];
    read_exact(ch, &mut m2)?;

    let m3 = session.step4(&m2)?;
    write_all(ch, &m3)?;

    session.step_g()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::tests::{group, EchoRng};
    use crate::belt::h_table;
    use crate::bign::{keypair_gen, PublicKey};

    fn raw_val(ec: &EcGroup, data: &[u8]) -> Result<PublicKey> {
        PublicKey::from_octets(ec, data)
    }

    fn settings() -> Settings<'static> {
        Settings {
            kca: true,
            kcb: true,
            helloa: b"terminal",
            hellob: b"token",
        }
    }

    fn fixtures(ec: &EcGroup) -> (PrivateKey, Cert, PrivateKey, Cert) {
        let (da, qa) = keypair_gen(ec, &mut EchoRng::new(&h_table()[..32])).unwrap();
        let (db, qb) = keypair_gen(ec, &mut EchoRng::new(&h_table()[32..64])).unwrap();

        let cert_a = Cert {
            data: qa.to_octets(ec),
            val: raw_val,
        };
        let cert_b = Cert {
            data: qb.to_octets(ec),
            val: raw_val,
        };

        (da, cert_a, db, cert_b)
    }

    #[test]
    fn honest_parties_agree() {
        let ec = group();
        let (da, cert_a, db, cert_b) = fixtures(&ec);

        let mut rng_a = EchoRng::new(&h_table()[..128]);
        let mut rng_b = EchoRng::new(&h_table()[128..]);

        let mut a = Bsts::start(&ec, Role::A, &da, &cert_a, raw_val, settings()).unwrap();
        let mut b = Bsts::start(&ec, Role::B, &db, &cert_b, raw_val, settings()).unwrap();

        let m1 = b.step2(&mut rng_b).unwrap();
        let m2 = a.step3(&m1, &mut rng_a).unwrap();
        let m3 = b.step4(&m2).unwrap();
        a.step5(&m3).unwrap();

        let ka = a.step_g().unwrap();
        let kb = b.step_g().unwrap();

        assert_eq!(ka, kb);
    }

    #[test]
    fn confirmation_flags_are_mandatory() {
        let ec = group();
        let (da, cert_a, _, _) = fixtures(&ec);

        let partial = Settings {
            kca: true,
            kcb: false,
            ..Default::default()
        };

        assert!(Bsts::start(&ec, Role::A, &da, &cert_a, raw_val, partial).is_err());
    }

    #[test]
    fn tampering_every_m2_octet_fails() {
        let ec = group();
        let (da, cert_a, db, cert_b) = fixtures(&ec);

        let mut rng_a = EchoRng::new(&h_table()[..128]);
        let mut rng_b = EchoRng::new(&h_table()[128..]);

        let mut a = Bsts::start(&ec, Role::A, &da, &cert_a, raw_val, settings()).unwrap();
        let mut b = Bsts::start(&ec, Role::B, &db, &cert_b, raw_val, settings()).unwrap();

        let m1 = b.step2(&mut rng_b).unwrap();
        let m2 = a.step3(&m1, &mut rng_a).unwrap();

        // sample octets from the point, ciphertext and tag regions
        for idx in [0usize, 63, 64, 96, m2.len() - 9, m2.len() - 1] {
            let mut bad = m2.clone();
            bad[idx] ^= 0x08;

            let mut b2 = Bsts::start(&ec, Role::B, &db, &cert_b, raw_val, settings()).unwrap();
            let mut rng_b2 = EchoRng::new(&h_table()[128..]);

            let _ = b2.step2(&mut rng_b2).unwrap();

            assert!(
                matches!(
                    b2.step4(&bad),
                    Err(Error::Auth)
                        | Err(Error::BadPoint)
                        | Err(Error::BadSig)
                        | Err(Error::BadCert)
                ),
                "octet {}",
                idx
            );
        }
    }

    #[test]
    fn tampered_m3_fails_at_a() {
        let ec = group();
        let (da, cert_a, db, cert_b) = fixtures(&ec);

        let mut rng_a = EchoRng::new(&h_table()[..128]);
        let mut rng_b = EchoRng::new(&h_table()[128..]);

        let mut a = Bsts::start(&ec, Role::A, &da, &cert_a, raw_val, settings()).unwrap();
        let mut b = Bsts::start(&ec, Role::B, &db, &cert_b, raw_val, settings()).unwrap();

        let m1 = b.step2(&mut rng_b).unwrap();
        let m2 = a.step3(&m1, &mut rng_a).unwrap();
        let m3 = b.step4(&m2).unwrap();

        for idx in [0usize, 31, 32, m3.len() - 1] {
            let mut bad = m3.clone();
            bad[idx] ^= 0x80;

            let mut a2 = Bsts::start(&ec, Role::A, &da, &cert_a, raw_val, settings()).unwrap();
            let mut rng_a2 = EchoRng::new(&h_table()[..128]);

            let m2_again = a2.step3(&m1, &mut rng_a2).unwrap();
            assert_eq!(m2, m2_again);

            assert!(matches!(
                a2.step5(&bad),
                Err(Error::Auth) | Err(Error::BadSig) | Err(Error::BadCert)
            ));
        }
    }

    #[test]
    fn wrong_password_for_certificates_fails() {
        // a validator that rejects everything surfaces BadCert
        fn reject(_: &EcGroup, _: &[u8]) -> Result<PublicKey> {
            Err(Error::BadCert)
        }

        let ec = group();
        let (da, cert_a, db, cert_b) = fixtures(&ec);

        let mut rng_a = EchoRng::new(&h_table()[..128]);
        let mut rng_b = EchoRng::new(&h_table()[128..]);

        let mut a = Bsts::start(&ec, Role::A, &da, &cert_a, raw_val, settings()).unwrap();
        let mut b = Bsts::start(&ec, Role::B, &db, &cert_b, reject, settings()).unwrap();

        let m1 = b.step2(&mut rng_b).unwrap();
        let m2 = a.step3(&m1, &mut rng_a).unwrap();

        assert_eq!(b.step4(&m2), Err(Error::BadCert));
    }

    #[test]
    fn run_wrappers_interoperate() {
        use std::collections::VecDeque;
        use std::sync::{Arc, Condvar, Mutex};

        // a blocking full-duplex in-memory pipe
        #[derive(Clone)]
        struct Queue(Arc<(Mutex<VecDeque<u8>>, Condvar)>);

        impl Queue {
            fn new() -> Self {
                Queue(Arc::new((Mutex::new(VecDeque::new()), Condvar::new())))
            }
        }

        struct Pipe {
            rx: Queue,
            tx: Queue,
        }

        impl Channel for Pipe {
            fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
                let (lock, cv) = &*self.rx.0;

                let mut q = lock.lock().unwrap();

                while q.is_empty() {
                    q = cv.wait(q).unwrap();
                }

                let mut n = 0;
                while n < buf.len() {
                    match q.pop_front() {
                        Some(v) => {
                            buf[n] = v;
                            n += 1;
                        }
                        None => break,
                    }
                }

                Ok(n)
            }

            fn write(&mut self, buf: &[u8]) -> Result<usize> {
                let (lock, cv) = &*self.tx.0;

                lock.lock().unwrap().extend(buf.iter().copied());
                cv.notify_all();

                Ok(buf.len())
            }
        }

        let ab = Queue::new();
        let ba = Queue::new();

        let ec = group();
        let (da, cert_a, db, cert_b) = fixtures(&ec);
        let cert_len = cert_a.data.len();

        let mut ch_a = Pipe {
            rx: ba.clone(),
            tx: ab.clone(),
        };
        let mut ch_b = Pipe { rx: ab, tx: ba };

        let (ka, kb) = std::thread::scope(|scope| {
            let ec_ref = &ec;
            let cert_b_ref = &cert_b;
            let db_ref = &db;

            let b_side = scope.spawn(move || {
                let mut rng_b = EchoRng::new(&h_table()[128..]);

                run_b(
                    ec_ref,
                    &mut ch_b,
                    db_ref,
                    cert_b_ref,
                    raw_val,
                    cert_len,
                    settings(),
                    &mut rng_b,
                )
                .unwrap()
            });

            let mut rng_a = EchoRng::new(&h_table()[..128]);

            let ka = run_a(
                &ec,
                &mut ch_a,
                &da,
                &cert_a,
                raw_val,
                cert_len,
                settings(),
                &mut rng_a,
            )
            .unwrap();

            (ka, b_side.join().unwrap())
        });

        assert_eq!(ka, kb);
    }
}
