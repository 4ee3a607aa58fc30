//! Pseudorandom generators seeded from external entropy
//!
//! Two compliant generators over the belt primitives:
//!
//! * [`CtrBrng`] is a counter construction: a 256-bit key, a 128-bit counter
//!   and the previous 256-bit block; every output block rehashes
//!   `key ‖ counter ‖ previous`. [`CtrBrng::step_g`] exposes the counter so
//!   a caller can persist it as the next synchro value.
//! * [`HmacBrng`] is a keyed hash chain producing arbitrary-length output.
//!
//! Both implement [`Entropy`], so they plug into every randomized operation
//! of the suite. [`global`] holds the optional process-wide generator; all
//! sessions sharing it serialize on its lock.

use crate::belt::hash::Hash;
use crate::belt::hmac::Hmac;
use crate::{Entropy, Result};

/// Counter-mode generator.
pub struct CtrBrng {
    key: [u8; 32],
    s: [u8; 16],
    r: [u8; 32],
    pos: usize,
}

impl CtrBrng {
    /// Key the generator with 256 bits of entropy and a 128-bit synchro
    /// value.
    pub fn new(key: &[u8; 32], iv: &[u8; 16]) -> Self {
        let r = Hash::hash_parts(&[key, iv]);

        CtrBrng {
            key: *key,
            s: *iv,
            r,
            pos: 32,
        }
    }

    fn next_block(&mut self) {
        // 128-bit increment of the counter
        let mut carry = 1u16;
        for v in self.s.iter_mut() {
            let sum = *v as u16 + carry;
            *v = sum as u8;
            carry = sum >> 8;
        }

        self.r = Hash::hash_parts(&[&self.key, &self.s, &self.r]);
        self.pos = 0;
    }

    /// Produce the next `buf.len()` octets.
    pub fn step_r(&mut self, buf: &mut [u8]) {
        for v in buf.iter_mut() {
            if self.pos == 32 {
                self.next_block();
            }

            *v = self.r[self.pos];
            self.pos += 1;
        }
    }

    /// The counter to persist as the next synchro value.
    pub fn step_g(&self) -> [u8; 16] {
        self.s
    }
}

impl Entropy for CtrBrng {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.step_r(buf);
        Ok(())
    }
}

/// Keyed hash-chain generator.
pub struct HmacBrng {
    key: Vec<u8>,
    r: [u8; 32],
    pos: usize,
}

impl HmacBrng {
    pub fn new(key: &[u8], iv: &[u8]) -> Self {
        HmacBrng {
            key: key.to_vec(),
            r: Hmac::hmac(key, iv),
            pos: 32,
        }
    }

    /// Rekey the chain.
    pub fn reseed(&mut self, key: &[u8], iv: &[u8]) {
        self.key = key.to_vec();
        self.r = Hmac::hmac(key, iv);
        self.pos = 32;
    }

    /// Produce the next `buf.len()` octets.
    pub fn step_r(&mut self, buf: &mut [u8]) {
        for v in buf.iter_mut() {
            if self.pos == 32 {
                self.r = Hmac::hmac(&self.key, &self.r);
                self.pos = 0;
            }

            *v = self.r[self.pos];
            self.pos += 1;
        }
    }
}

impl Entropy for HmacBrng {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.step_r(buf);
        Ok(())
    }
}

/// The process-wide convenience generator.
///
/// Initialization happens once; later calls see the same locked instance.
/// Every consumer of [`global::Global`] contends on one mutex, and a caller
/// blocked inside its entropy source blocks the others.
pub mod global {
    use std::sync::{Mutex, OnceLock};

    use super::CtrBrng;
    use crate::{Entropy, Error, Result};

    static CELL: OnceLock<Mutex<CtrBrng>> = OnceLock::new();

    /// Install the process-wide generator. Fails with `Busy` if one is
    /// already installed.
    pub fn init(key: &[u8; 32], iv: &[u8; 16]) -> Result<()> {
        let mut fresh = Some(CtrBrng::new(key, iv));

        CELL.get_or_init(|| Mutex::new(fresh.take().expect("first init")));

        if fresh.is_none() {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    /// Fill from the process-wide generator; `NotReady` before `init`.
    pub fn fill(buf: &mut [u8]) -> Result<()> {
        let cell = CELL.get().ok_or(Error::NotReady)?;

        let mut rng = cell.lock().map_err(|_| Error::Sys)?;

        rng.step_r(buf);

        Ok(())
    }

    /// Handle implementing [`Entropy`] over the process-wide generator.
    pub struct Global;

    impl Entropy for Global {
        fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
            fill(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belt::h_table;

    fn seed() -> ([u8; 32], [u8; 16]) {
        let mut key = [0u8; 32];
        key.copy_from_slice(&h_table()[128..160]);

        let mut iv = [0u8; 16];
        iv.copy_from_slice(&h_table()[192..208]);

        (key, iv)
    }

    #[test]
    fn ctr_stream_is_deterministic() {
        let (key, iv) = seed();

        let mut a = CtrBrng::new(&key, &iv);
        let mut b = CtrBrng::new(&key, &iv);

        let mut out_a = [0u8; 96];
        let mut out_b = [0u8; 96];

        a.step_r(&mut out_a);

        // ragged chunking must not change the stream
        b.step_r(&mut out_b[..17]);
        b.step_r(&mut out_b[17..64]);
        b.step_r(&mut out_b[64..]);

        assert_eq!(out_a, out_b);

        // distinct synchro, distinct stream
        let mut iv2 = iv;
        iv2[0] ^= 1;
        let mut c = CtrBrng::new(&key, &iv2);
        let mut out_c = [0u8; 96];
        c.step_r(&mut out_c);

        assert_ne!(out_a, out_c);
    }

    #[test]
    fn ctr_reference_sequence() {
        let (key, iv) = seed();

        let mut rng = CtrBrng::new(&key, &iv);

        let mut stream = [0u8; 96];
        rng.step_r(&mut stream);

        // the expected sequence, spelled out block by block: each output
        // block rehashes key ‖ counter ‖ previous over the stepped counter
        let mut expect = Vec::with_capacity(96);

        let mut ctr = iv;
        let mut prev = Hash::hash_parts(&[&key, &iv]);

        for _ in 0..3 {
            let mut carry = 1u16;
            for v in ctr.iter_mut() {
                let s = *v as u16 + carry;
                *v = s as u8;
                carry = s >> 8;
            }

            prev = Hash::hash_parts(&[&key, &ctr, &prev]);
            expect.extend_from_slice(&prev);
        }

        assert_eq!(stream.to_vec(), expect);
    }

    #[test]
    fn ctr_counter_is_observable() {
        let (key, iv) = seed();

        let mut rng = CtrBrng::new(&key, &iv);

        assert_eq!(rng.step_g(), iv);

        let mut buf = [0u8; 33];
        rng.step_r(&mut buf);

        // two blocks consumed, counter moved twice
        let mut expect = iv;
        expect[0] = expect[0].wrapping_add(2);
        assert_eq!(rng.step_g(), expect);
    }

    #[test]
    fn hmac_chain() {
        let mut a = HmacBrng::new(b"key", b"iv");
        let mut b = HmacBrng::new(b"key", b"iv");

        let mut out_a = [0u8; 80];
        let mut out_b = [0u8; 80];

        a.step_r(&mut out_a);
        b.step_r(&mut out_b[..1]);
        b.step_r(&mut out_b[1..]);

        assert_eq!(out_a, out_b);

        b.reseed(b"key2", b"iv");
        let mut out_c = [0u8; 80];
        b.step_r(&mut out_c);

        assert_ne!(out_a, out_c);
    }

    #[test]
    fn entropy_contract() {
        let (key, iv) = seed();

        let mut rng: Box<dyn crate::Entropy> = Box::new(CtrBrng::new(&key, &iv));

        let mut buf = [0u8; 7];
        rng.fill(&mut buf).unwrap();

        assert_ne!(buf, [0u8; 7]);
    }
}
