//! APDU secure messaging
//!
//! A secure-messaging state owns two working keys split off the 256-bit
//! session key (encryption and authentication), plus a 128-bit unit counter.
//! The counter steps before every protected command; the response to a
//! command shares its counter value. The per-unit synchro value for the
//! cipher is the encryption of the counter under the traffic key.
//!
//! Protected command bodies are TLV sequences: `87` carries the
//! padding-indicator octet `02` plus the belt-CFB cryptogram of the
//! (`80`-padded) command data, `97` the expected response length, `99` the
//! status word of responses, and `8E` the 8-octet belt-MAC over the counter
//! block, the masked header and the preceding TLVs. The MAC is verified
//! before anything is deciphered.
//!
//! A state built with [`SmState::passthrough`] encodes and parses the same
//! units without protection, which is the zero-settings shortcut of the
//! standard.

use crate::belt::krp::{key_rep, num_header, ones_level};
use crate::belt::mac::Mac;
use crate::belt::modes::Cfb;
use crate::belt::BeltKey;
use crate::{Error, Result};

const TAG_CRYPTOGRAM: u8 = 0x87;
const TAG_LE: u8 = 0x97;
const TAG_STATUS: u8 = 0x99;
const TAG_MAC: u8 = 0x8E;

/// Padding-content indicator inside the `87` TLV.
const PAD_INDICATOR: u8 = 0x02;

/// SM bits set in the class octet of protected commands.
const CLA_SM: u8 = 0x0C;

/// A command unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdApdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    /// Command data field.
    pub cdf: Vec<u8>,
    /// Expected response length, when present.
    pub le: Option<usize>,
}

/// A response unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespApdu {
    /// Response data field.
    pub rdf: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

enum Keys {
    Plain,
    Protected {
        kenc: [u8; 32],
        kmac: [u8; 32],
    },
}

/// Secure-messaging state.
pub struct SmState {
    keys: Keys,
    ctr: [u8; 16],
}

impl SmState {
    /// Split a 256-bit session key into the traffic keys.
    pub fn new(key: &[u8; 32]) -> Result<Self> {
        let kenc = {
            let mut k = [0u8; 32];
            k.copy_from_slice(&key_rep(key, &ones_level(), &num_header(1), 32)?);
            k
        };

        let kmac = {
            let mut k = [0u8; 32];
            k.copy_from_slice(&key_rep(key, &ones_level(), &num_header(2), 32)?);
            k
        };

        Ok(SmState {
            keys: Keys::Protected { kenc, kmac },
            ctr: [0; 16],
        })
    }

    /// A state that passes units through unprotected.
    pub fn passthrough() -> Self {
        SmState {
            keys: Keys::Plain,
            ctr: [0; 16],
        }
    }

    /// Step the unit counter.
    pub fn ctr_inc(&mut self) {
        let mut carry = 1u16;

        for v in self.ctr.iter_mut() {
            let s = *v as u16 + carry;
            *v = s as u8;
            carry = s >> 8;
        }
    }

    fn traffic(&self) -> Result<(&[u8; 32], &[u8; 32])> {
        match &self.keys {
            Keys::Protected { kenc, kmac } => Ok((kenc, kmac)),
            Keys::Plain => Err(Error::BadLogic),
        }
    }

    fn cipher(&self) -> Result<Cfb> {
        let (kenc, _) = self.traffic()?;

        let key = BeltKey::new(kenc)?;
        let iv = key.encrypt_copy(&self.ctr);

        Ok(Cfb::new(key, iv))
    }

    fn mac_over(&self, header: &[u8; 4], body: &[u8]) -> Result<[u8; 8]> {
        let (_, kmac) = self.traffic()?;

        let mut padded_header = [0u8; 16];
        padded_header[..4].copy_from_slice(header);
        padded_header[4] = 0x80;

        let mut mac = Mac::new(BeltKey::new(kmac)?);
        mac.step_a(&self.ctr);
        mac.step_a(&padded_header);
        mac.step_a(body);

        Ok(mac.step_g())
    }

    fn mac_check(&self, header: &[u8; 4], body: &[u8], tag: &[u8]) -> Result<()> {
        let (_, kmac) = self.traffic()?;

        let mut padded_header = [0u8; 16];
        padded_header[..4].copy_from_slice(header);
        padded_header[4] = 0x80;

        let mut mac = Mac::new(BeltKey::new(kmac)?);
        mac.step_a(&self.ctr);
        mac.step_a(&padded_header);
        mac.step_a(body);

        mac.step_v(tag)
    }

    /// Encode a protected (or passthrough) command unit.
    ///
    /// Call [`SmState::ctr_inc`] first for every protected command.
    pub fn cmd_wrap(&self, cmd: &CmdApdu) -> Result<Vec<u8>> {
        if let Keys::Plain = self.keys {
            return Ok(encode_cmd_plain(cmd));
        }

        let mut body = Vec::new();

        if !cmd.cdf.is_empty() {
            // 80-pad to whole blocks, encrypt, prepend the indicator
            let mut data = cmd.cdf.clone();
            data.push(0x80);
            while data.len() % 16 != 0 {
                data.push(0);
            }

            self.cipher()?.encrypt(&mut data);

            let mut content = vec![PAD_INDICATOR];
            content.extend_from_slice(&data);

            push_tlv(&mut body, TAG_CRYPTOGRAM, &content);
        }

        if let Some(le) = cmd.le {
            if le > 0xFFFF {
                return Err(Error::BadLength);
            }

            if le <= 0xFF {
                push_tlv(&mut body, TAG_LE, &[le as u8]);
            } else {
                push_tlv(&mut body, TAG_LE, &[(le >> 8) as u8, le as u8]);
            }
        }

        let header = [cmd.cla | CLA_SM, cmd.ins, cmd.p1, cmd.p2];

        let tag = self.mac_over(&header, &body)?;
        push_tlv(&mut body, TAG_MAC, &tag);

        let mut out = header.to_vec();
        push_len(&mut out, body.len());
        out.extend_from_slice(&body);

        Ok(out)
    }

    /// Parse and verify a protected (or passthrough) command unit.
    pub fn cmd_unwrap(&self, unit: &[u8]) -> Result<CmdApdu> {
        if let Keys::Plain = self.keys {
            return decode_cmd_plain(unit);
        }

        if unit.len() < 5 {
            return Err(Error::BadFormat);
        }

        let header = [unit[0], unit[1], unit[2], unit[3]];

        if header[0] & CLA_SM != CLA_SM {
            return Err(Error::BadFormat);
        }

        let (body_len, off) = read_len(&unit[4..])?;

        let body = &unit[4 + off..];

        if body.len() != body_len {
            return Err(Error::BadFormat);
        }

        // the MAC TLV closes the body
        if body.len() < 10 || body[body.len() - 10] != TAG_MAC || body[body.len() - 9] != 8 {
            return Err(Error::BadFormat);
        }

        let (covered, mac_tlv) = body.split_at(body.len() - 10);

        self.mac_check(&header, covered, &mac_tlv[2..])?;

        let mut cdf = Vec::new();
        let mut le = None;

        let mut rest = covered;

        while !rest.is_empty() {
            let (tag, content, next) = pop_tlv(rest)?;
            rest = next;

            match tag {
                TAG_CRYPTOGRAM => {
                    if content.first() != Some(&PAD_INDICATOR) || (content.len() - 1) % 16 != 0 {
                        return Err(Error::BadFormat);
                    }

                    let mut data = content[1..].to_vec();
                    self.cipher()?.decrypt(&mut data);

                    cdf = strip_pad(data)?;
                }
                TAG_LE => {
                    le = Some(match content.len() {
                        1 => content[0] as usize,
                        2 => ((content[0] as usize) << 8) | content[1] as usize,
                        _ => return Err(Error::BadFormat),
                    });
                }
                _ => return Err(Error::BadFormat),
            }
        }

        Ok(CmdApdu {
            cla: header[0] & !CLA_SM,
            ins: header[1],
            p1: header[2],
            p2: header[3],
            cdf,
            le,
        })
    }

    /// Encode a protected (or passthrough) response unit under the current
    /// counter.
    pub fn resp_wrap(&self, resp: &RespApdu) -> Result<Vec<u8>> {
        if let Keys::Plain = self.keys {
            let mut out = resp.rdf.clone();
            out.push(resp.sw1);
            out.push(resp.sw2);
            return Ok(out);
        }

        let mut body = Vec::new();

        if !resp.rdf.is_empty() {
            let mut data = resp.rdf.clone();
            data.push(0x80);
            while data.len() % 16 != 0 {
                data.push(0);
            }

            self.cipher()?.encrypt(&mut data);

            let mut content = vec![PAD_INDICATOR];
            content.extend_from_slice(&data);

            push_tlv(&mut body, TAG_CRYPTOGRAM, &content);
        }

        push_tlv(&mut body, TAG_STATUS, &[resp.sw1, resp.sw2]);

        // responses authenticate under the zero header slot
        let tag = self.mac_over(&[0; 4], &body)?;
        push_tlv(&mut body, TAG_MAC, &tag);

        body.push(resp.sw1);
        body.push(resp.sw2);

        Ok(body)
    }

    /// Parse and verify a protected (or passthrough) response unit.
    pub fn resp_unwrap(&self, unit: &[u8]) -> Result<RespApdu> {
        if let Keys::Plain = self.keys {
            if unit.len() < 2 {
                return Err(Error::BadFormat);
            }

            let (rdf, sw) = unit.split_at(unit.len() - 2);

            return Ok(RespApdu {
                rdf: rdf.to_vec(),
                sw1: sw[0],
                sw2: sw[1],
            });
        }

        if unit.len() < 2 + 10 + 4 {
            return Err(Error::BadFormat);
        }

        let (body, trailer_sw) = unit.split_at(unit.len() - 2);

        if body.len() < 10 || body[body.len() - 10] != TAG_MAC || body[body.len() - 9] != 8 {
            return Err(Error::BadFormat);
        }

        let (covered, mac_tlv) = body.split_at(body.len() - 10);

        self.mac_check(&[0; 4], covered, &mac_tlv[2..])?;

        let mut rdf = Vec::new();
        let mut status = None;

        let mut rest = covered;

        while !rest.is_empty() {
            let (tag, content, next) = pop_tlv(rest)?;
            rest = next;

            match tag {
                TAG_CRYPTOGRAM => {
                    if content.first() != Some(&PAD_INDICATOR) || (content.len() - 1) % 16 != 0 {
                        return Err(Error::BadFormat);
                    }

                    let mut data = content[1..].to_vec();
                    self.cipher()?.decrypt(&mut data);

                    rdf = strip_pad(data)?;
                }
                TAG_STATUS => {
                    if content.len() != 2 {
                        return Err(Error::BadFormat);
                    }

                    status = Some((content[0], content[1]));
                }
                _ => return Err(Error::BadFormat),
            }
        }

        let (sw1, sw2) = status.ok_or(Error::BadFormat)?;

        // the authenticated status must match the plain trailer
        if trailer_sw != [sw1, sw2] {
            return Err(Error::BadMac);
        }

        Ok(RespApdu {
            rdf,
            sw1,
            sw2,
        })
    }
}

fn push_len(out: &mut Vec<u8>, len: usize) {
    if len <= 0xFF {
        out.push(len as u8);
    } else {
        out.push(0);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
}

fn read_len(data: &[u8]) -> Result<(usize, usize)> {
    match data.first() {
        Some(&v) if v != 0 => Ok((v as usize, 1)),
        Some(0) if data.len() >= 3 => {
            Ok((((data[1] as usize) << 8) | data[2] as usize, 3))
        }
        _ => Err(Error::BadFormat),
    }
}

fn push_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);

    if content.len() <= 0x7F {
        out.push(content.len() as u8);
    } else if content.len() <= 0xFF {
        out.push(0x81);
        out.push(content.len() as u8);
    } else {
        out.push(0x82);
        out.push((content.len() >> 8) as u8);
        out.push(content.len() as u8);
    }

    out.extend_from_slice(content);
}

fn pop_tlv(data: &[u8]) -> Result<(u8, &[u8], &[u8])> {
    if data.len() < 2 {
        return Err(Error::BadFormat);
    }

    let tag = data[0];

    let (len, off) = match data[1] {
        v if v <= 0x7F => (v as usize, 2),
        0x81 if data.len() >= 3 => (data[2] as usize, 3),
        0x82 if data.len() >= 4 => (((data[2] as usize) << 8) | data[3] as usize, 4),
        _ => return Err(Error::BadFormat),
    };

    if data.len() - off < len {
        return Err(Error::BadFormat);
    }

    Ok((tag, &data[off..off + len], &data[off + len..]))
}

fn strip_pad(mut data: Vec<u8>) -> Result<Vec<u8>> {
    while let Some(&0) = data.last() {
        data.pop();
    }

    if data.pop() != Some(0x80) {
        return Err(Error::BadFormat);
    }

    Ok(data)
}

fn encode_cmd_plain(cmd: &CmdApdu) -> Vec<u8> {
    let mut out = vec![cmd.cla, cmd.ins, cmd.p1, cmd.p2];

    if !cmd.cdf.is_empty() {
        push_len(&mut out, cmd.cdf.len());
        out.extend_from_slice(&cmd.cdf);
    }

    if let Some(le) = cmd.le {
        out.push(le as u8);
    }

    out
}

fn decode_cmd_plain(unit: &[u8]) -> Result<CmdApdu> {
    if unit.len() < 4 {
        return Err(Error::BadFormat);
    }

    let mut cmd = CmdApdu {
        cla: unit[0],
        ins: unit[1],
        p1: unit[2],
        p2: unit[3],
        cdf: Vec::new(),
        le: None,
    };

    let mut rest = &unit[4..];

    if rest.len() > 1 {
        let (lc, off) = read_len(rest)?;

        if rest.len() - off < lc {
            return Err(Error::BadFormat);
        }

        cmd.cdf = rest[off..off + lc].to_vec();
        rest = &rest[off + lc..];
    }

    match rest.len() {
        0 => (),
        1 => cmd.le = Some(rest[0] as usize),
        _ => return Err(Error::BadFormat),
    }

    Ok(cmd)
}
