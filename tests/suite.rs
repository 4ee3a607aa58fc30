//! End-to-end scenarios across the suite layers: parameters through
//! signatures, key establishment through secure messaging, certificates
//! through token authentication.

use bel_tie::bake::{self, bmqv, bpace, Cert, Role, Settings};
use bel_tie::belt::dwp;
use bel_tie::belt::BeltKey;
use bel_tie::bign::params::{BignParams, ParamsId};
use bel_tie::bign::{self, keypair_gen, oid_to_der, PublicKey, OID_BELT_HASH};
use bel_tie::btok::cvc::{Cvc, CvcReq};
use bel_tie::btok::sm::{CmdApdu, RespApdu, SmState};
use bel_tie::ec::EcGroup;
use bel_tie::{Entropy, Error};

struct Echo {
    pattern: Vec<u8>,
    pos: usize,
}

impl Echo {
    fn new(pattern: &[u8]) -> Self {
        Echo {
            pattern: pattern.to_vec(),
            pos: 0,
        }
    }
}

impl Entropy for Echo {
    fn fill(&mut self, buf: &mut [u8]) -> bel_tie::Result<()> {
        for v in buf.iter_mut() {
            *v = self.pattern[self.pos % self.pattern.len()];
            self.pos += 1;
        }
        Ok(())
    }
}

fn table() -> &'static [u8; 256] {
    bel_tie::belt::h_table()
}

fn group() -> EcGroup {
    BignParams::standard(ParamsId::B128)
        .unwrap()
        .into_group()
        .unwrap()
}

fn raw_val(ec: &EcGroup, data: &[u8]) -> bel_tie::Result<PublicKey> {
    PublicKey::from_octets(ec, data)
}

#[test]
fn parameters_travel_through_der() {
    let params = BignParams::standard(ParamsId::B128).unwrap();

    // encode, decode, deep-validate, then use for a signature
    let der = params.to_der().unwrap();
    let decoded = BignParams::from_der(&der).unwrap();

    decoded.validate().unwrap();

    let ec = decoded.into_group().unwrap();

    let mut rng = Echo::new(&table()[..64]);
    let (private, public) = keypair_gen(&ec, &mut rng).unwrap();

    let oid = oid_to_der(OID_BELT_HASH).unwrap();
    let hash = table()[128..160].to_vec();

    let sig = bign::sign::sign(&ec, &oid, &hash, &private, &mut rng).unwrap();

    bign::sign::verify(&ec, &oid, &hash, &sig, &public).unwrap();
}

#[test]
fn transported_key_feeds_the_aead() {
    let ec = group();

    let mut rng = Echo::new(&table()[64..160]);

    let (private, public) = keypair_gen(&ec, &mut rng).unwrap();

    // sender wraps a fresh content key to the receiver
    let mut content_key = [0u8; 32];
    rng.fill(&mut content_key).unwrap();

    let token = bign::keyt::key_wrap(&ec, &public, &content_key, None, &mut rng).unwrap();

    // receiver unwraps and both protect a message with DWP
    let received = bign::keyt::key_unwrap(&ec, &private, &token, None).unwrap();
    assert_eq!(received, content_key);

    let iv = {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&table()[192..208]);
        iv
    };

    let aad = b"unit header";
    let plain = b"the payload protected under the transported key";

    let sealed = dwp::dwp_wrap(BeltKey::new(&content_key).unwrap(), &iv, aad, plain);

    let opened = dwp::dwp_unwrap(BeltKey::new(&received).unwrap(), &iv, aad, &sealed).unwrap();

    assert_eq!(opened, plain);
}

#[test]
fn bmqv_session_key_drives_secure_messaging() {
    let ec = group();

    let (da, qa) = keypair_gen(&ec, &mut Echo::new(&table()[..32])).unwrap();
    let (db, qb) = keypair_gen(&ec, &mut Echo::new(&table()[32..64])).unwrap();

    let cert_a = Cert {
        data: qa.to_octets(&ec),
        val: raw_val,
    };
    let cert_b = Cert {
        data: qb.to_octets(&ec),
        val: raw_val,
    };

    let settings = Settings {
        kca: true,
        kcb: true,
        helloa: b"terminal",
        hellob: b"token",
    };

    let mut rng_a = Echo::new(&table()[..128]);
    let mut rng_b = Echo::new(&table()[128..]);

    let mut a = bmqv::Bmqv::start(&ec, Role::A, &da, &cert_a, &cert_b, settings).unwrap();
    let mut b = bmqv::Bmqv::start(&ec, Role::B, &db, &cert_a, &cert_b, settings).unwrap();

    let m1 = b.step2(&mut rng_b).unwrap();
    let m2 = a.step3(&m1, &mut rng_a).unwrap();
    let m3 = b.step4(&m2).unwrap();
    a.step5(&m3).unwrap();

    let ka = a.step_g().unwrap();
    let kb = b.step_g().unwrap();

    assert_eq!(ka, kb);

    // the agreed key opens a secure-messaging tunnel
    let mut terminal = SmState::new(&ka).unwrap();
    let mut token = SmState::new(&kb).unwrap();

    let cmd = CmdApdu {
        cla: 0x00,
        ins: 0xB0,
        p1: 0x00,
        p2: 0x10,
        cdf: b"read this record".to_vec(),
        le: Some(64),
    };

    terminal.ctr_inc();
    token.ctr_inc();

    let unit = terminal.cmd_wrap(&cmd).unwrap();
    let received = token.cmd_unwrap(&unit).unwrap();
    assert_eq!(received, cmd);

    let resp = RespApdu {
        rdf: b"record content".to_vec(),
        sw1: 0x90,
        sw2: 0x00,
    };

    let answer = token.resp_wrap(&resp).unwrap();
    assert_eq!(terminal.resp_unwrap(&answer).unwrap(), resp);
}

#[test]
fn bpace_with_certificate_chain_context() {
    // a full token scenario: the terminal proves the password over BPACE
    // while the token's certificate chain is validated out of band
    let ec = group();

    let (root_key, _) = keypair_gen(&ec, &mut Echo::new(&table()[..32])).unwrap();
    let (leaf_key, _) = keypair_gen(&ec, &mut Echo::new(&table()[32..64])).unwrap();

    let root = Cvc::wrap(
        CvcReq {
            authority: "BYCA0000".into(),
            holder: "BYCA0000".into(),
            from: [2, 0, 0, 1, 0, 1],
            until: [3, 0, 1, 2, 3, 1],
            hat_eid: None,
            hat_esign: None,
            pubkey: Vec::new(),
        },
        &root_key,
        &root_key,
    )
    .unwrap();

    let leaf = Cvc::wrap(
        CvcReq {
            authority: "BYCA0000".into(),
            holder: "590082394654".into(),
            from: [2, 2, 0, 6, 0, 1],
            until: [2, 9, 0, 1, 0, 1],
            hat_eid: Some([0x01, 0x02, 0x03, 0x04, 0x05]),
            hat_esign: None,
            pubkey: Vec::new(),
        },
        &leaf_key,
        &root_key,
    )
    .unwrap();

    Cvc::val(&root, &leaf.to_octets()).unwrap();
    leaf.match_key(&leaf_key).unwrap();

    // password establishment between reader and card
    let pwd = bpace::password_key(b"287454");

    let settings = Settings {
        kca: true,
        kcb: true,
        ..Default::default()
    };

    let mut rng_a = Echo::new(&table()[..128]);
    let mut rng_b = Echo::new(&table()[128..]);

    let mut reader = bpace::Bpace::start(&ec, Role::A, &pwd, settings).unwrap();
    let mut card = bpace::Bpace::start(&ec, Role::B, &pwd, settings).unwrap();

    let m1 = card.step2(&mut rng_b).unwrap();
    let m2 = reader.step3(&m1, &mut rng_a).unwrap();
    let m3 = card.step4(&m2, &mut rng_b).unwrap();
    let m4 = reader.step5(&m3).unwrap();
    card.step6(&m4).unwrap();

    assert_eq!(reader.step_g().unwrap(), card.step_g().unwrap());
}

#[test]
fn sessions_refuse_replayed_steps() {
    let ec = group();

    let (da, qa) = keypair_gen(&ec, &mut Echo::new(&table()[..32])).unwrap();
    let (db, qb) = keypair_gen(&ec, &mut Echo::new(&table()[32..64])).unwrap();

    let cert_a = Cert {
        data: qa.to_octets(&ec),
        val: raw_val,
    };
    let cert_b = Cert {
        data: qb.to_octets(&ec),
        val: raw_val,
    };

    let settings = Settings::default();

    let mut rng_a = Echo::new(&table()[..128]);
    let mut rng_b = Echo::new(&table()[128..]);

    let mut a = bmqv::Bmqv::start(&ec, Role::A, &da, &cert_a, &cert_b, settings).unwrap();
    let mut b = bmqv::Bmqv::start(&ec, Role::B, &db, &cert_a, &cert_b, settings).unwrap();

    let m1 = b.step2(&mut rng_b).unwrap();

    // B cannot issue M1 twice
    assert_eq!(b.step2(&mut rng_b).unwrap_err(), Error::BadLogic);

    let m2 = a.step3(&m1, &mut rng_a).unwrap();

    // A cannot process M1 twice
    assert_eq!(a.step3(&m1, &mut rng_a).unwrap_err(), Error::BadLogic);

    let _ = b.step4(&m2).unwrap();

    // nor can B replay M2
    assert_eq!(b.step4(&m2).unwrap_err(), Error::BadLogic);
}

#[test]
fn channel_timeouts_propagate() {
    // a channel that goes silent mid-message
    struct Dead;

    impl bake::Channel for Dead {
        fn read(&mut self, _buf: &mut [u8]) -> bel_tie::Result<usize> {
            Err(Error::Timeout)
        }

        fn write(&mut self, buf: &[u8]) -> bel_tie::Result<usize> {
            Ok(buf.len())
        }
    }

    let ec = group();
    let pwd = bpace::password_key(b"000000");

    let mut rng = Echo::new(&table()[..64]);

    let result = bpace::run_a(&ec, &mut Dead, &pwd, Settings::default(), &mut rng);

    assert_eq!(result.unwrap_err(), Error::Timeout);
}
