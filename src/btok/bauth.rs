//! BAUTH: token–terminal authentication
//!
//! The protocol is the BMQV engine under the role names of the token world:
//! the terminal (CT) drives the channel the way side A does, the token (T)
//! answers as side B. The step contracts, message shapes and error
//! behavior are exactly those of [`crate::bake::bmqv`].

use crate::bake::bmqv::Bmqv;
use crate::bake::{Cert, Channel, Role, Settings};
use crate::bign::PrivateKey;
use crate::ec::EcGroup;
use crate::{Entropy, Result};

/// A terminal-side (CT) authentication session.
pub struct BauthCt<'a>(Bmqv<'a>);

/// A token-side (T) authentication session.
pub struct BauthT<'a>(Bmqv<'a>);

impl<'a> BauthCt<'a> {
    /// Open a terminal session. `cert_ct`/`cert_t` are the terminal and
    /// token certificates.
    pub fn start(
        ec: &'a EcGroup,
        private: &PrivateKey,
        cert_ct: &Cert,
        cert_t: &Cert,
        settings: Settings<'a>,
    ) -> Result<Self> {
        Ok(BauthCt(Bmqv::start(
            ec,
            Role::A,
            private,
            cert_ct,
            cert_t,
            settings,
        )?))
    }

    /// Process the token's `M1`, produce `M2`.
    pub fn step3(&mut self, m1: &[u8], rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        self.0.step3(m1, rng)
    }

    /// Verify the token's confirmation `M3`.
    pub fn step5(&mut self, m3: &[u8]) -> Result<()> {
        self.0.step5(m3)
    }

    /// Surrender the session key.
    pub fn step_g(self) -> Result<[u8; 32]> {
        self.0.step_g()
    }
}

impl<'a> BauthT<'a> {
    /// Open a token session.
    pub fn start(
        ec: &'a EcGroup,
        private: &PrivateKey,
        cert_ct: &Cert,
        cert_t: &Cert,
        settings: Settings<'a>,
    ) -> Result<Self> {
        Ok(BauthT(Bmqv::start(
            ec,
            Role::B,
            private,
            cert_ct,
            cert_t,
            settings,
        )?))
    }

    /// Produce the opening `M1`.
    pub fn step2(&mut self, rng: &mut dyn Entropy) -> Result<Vec<u8>> {
        self.0.step2(rng)
    }

    /// Process the terminal's `M2`, produce `M3`.
    pub fn step4(&mut self, m2: &[u8]) -> Result<Vec<u8>> {
        self.0.step4(m2)
    }

    /// Surrender the session key.
    pub fn step_g(self) -> Result<[u8; 32]> {
        self.0.step_g()
    }
}

/// Drive a terminal-side session over a channel.
pub fn run_ct(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    private: &PrivateKey,
    cert_ct: &Cert,
    cert_t: &Cert,
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    crate::bake::bmqv::run_a(ec, ch, private, cert_ct, cert_t, settings, rng)
}

/// Drive a token-side session over a channel.
pub fn run_t(
    ec: &EcGroup,
    ch: &mut dyn Channel,
    private: &PrivateKey,
    cert_ct: &Cert,
    cert_t: &Cert,
    settings: Settings<'_>,
    rng: &mut dyn Entropy,
) -> Result<[u8; 32]> {
    crate::bake::bmqv::run_b(ec, ch, private, cert_ct, cert_t, settings, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belt::h_table;
    use crate::bign::{keypair_gen, PublicKey};

    struct Echo(Vec<u8>, usize);

    impl crate::Entropy for Echo {
        fn fill(&mut self, buf: &mut [u8]) -> crate::Result<()> {
            for v in buf.iter_mut() {
                *v = self.0[self.1 % self.0.len()];
                self.1 += 1;
            }
            Ok(())
        }
    }

    fn raw_val(ec: &EcGroup, data: &[u8]) -> Result<PublicKey> {
        PublicKey::from_octets(ec, data)
    }

    #[test]
    fn token_and_terminal_agree() {
        let ec = crate::bign::params::BignParams::standard(crate::bign::params::ParamsId::B128)
            .unwrap()
            .into_group()
            .unwrap();

        let mut rng_ct = Echo(h_table()[..128].to_vec(), 0);
        let mut rng_t = Echo(h_table()[128..].to_vec(), 0);

        let (d_ct, q_ct) = keypair_gen(&ec, &mut Echo(h_table()[..32].to_vec(), 0)).unwrap();
        let (d_t, q_t) = keypair_gen(&ec, &mut Echo(h_table()[32..64].to_vec(), 0)).unwrap();

        let cert_ct = Cert {
            data: q_ct.to_octets(&ec),
            val: raw_val,
        };
        let cert_t = Cert {
            data: q_t.to_octets(&ec),
            val: raw_val,
        };

        let settings = Settings {
            kca: true,
            kcb: true,
            helloa: b"terminal hello",
            hellob: b"token hello",
        };

        let mut ct = BauthCt::start(&ec, &d_ct, &cert_ct, &cert_t, settings).unwrap();
        let mut t = BauthT::start(&ec, &d_t, &cert_ct, &cert_t, settings).unwrap();

        let m1 = t.step2(&mut rng_t).unwrap();
        let m2 = ct.step3(&m1, &mut rng_ct).unwrap();
        let m3 = t.step4(&m2).unwrap();
        ct.step5(&m3).unwrap();

        assert_eq!(ct.step_g().unwrap(), t.step_g().unwrap());
    }
}
