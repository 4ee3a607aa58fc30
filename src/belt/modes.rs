//! Confidentiality modes: ECB, CBC, CFB, CTR
//!
//! ECB and CBC work on whole messages of at least one block and finish a
//! ragged tail with ciphertext stealing, so the output length always equals
//! the input length. CFB and CTR are streaming states that may be fed any
//! number of octets at a time; chunking never changes the keystream.

use super::BeltKey;
use crate::util::xor_assign;
use crate::{Error, Result};

/// Electronic codebook with ciphertext stealing.
pub struct Ecb {
    key: BeltKey,
}

impl Ecb {
    pub fn new(key: BeltKey) -> Self {
        Ecb { key }
    }

    /// Encrypt in place; `buf.len() >= 16`.
    pub fn encrypt(&self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();

        if len < 16 {
            return Err(Error::BadLength);
        }

        let r = len % 16;

        if r == 0 {
            for chunk in buf.chunks_exact_mut(16) {
                self.key.encrypt_block(chunk);
            }

            return Ok(());
        }

        // steal from the next-to-last block for the ragged tail
        let m = len - r - 16;

        for chunk in buf[..m].chunks_exact_mut(16) {
            self.key.encrypt_block(chunk);
        }

        let mut a = [0u8; 16];
        a.copy_from_slice(&buf[m..m + 16]);
        self.key.encrypt_block(&mut a);

        let mut b = [0u8; 16];
        b[..r].copy_from_slice(&buf[m + 16..]);
        b[r..].copy_from_slice(&a[r..]);
        self.key.encrypt_block(&mut b);

        buf[m..m + 16].copy_from_slice(&b);
        buf[m + 16..].copy_from_slice(&a[..r]);

        Ok(())
    }

    /// Decrypt in place; `buf.len() >= 16`.
    pub fn decrypt(&self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();

        if len < 16 {
            return Err(Error::BadLength);
        }

        let r = len % 16;

        if r == 0 {
            for chunk in buf.chunks_exact_mut(16) {
                self.key.decrypt_block(chunk);
            }

            return Ok(());
        }

        let m = len - r - 16;

        for chunk in buf[..m].chunks_exact_mut(16) {
            self.key.decrypt_block(chunk);
        }

        let mut b = [0u8; 16];
        b.copy_from_slice(&buf[m..m + 16]);
        self.key.decrypt_block(&mut b);

        let mut a = [0u8; 16];
        a[..r].copy_from_slice(&buf[m + 16..]);
        a[r..].copy_from_slice(&b[r..]);
        self.key.decrypt_block(&mut a);

        buf[m..m + 16].copy_from_slice(&a);
        buf[m + 16..].copy_from_slice(&b[..r]);

        Ok(())
    }
}

/// Cipher block chaining with ciphertext stealing.
pub struct Cbc {
    key: BeltKey,
    iv: [u8; 16],
}

impl Cbc {
    pub fn new(key: BeltKey, iv: [u8; 16]) -> Self {
        Cbc { key, iv }
    }

    /// Encrypt in place; `buf.len() >= 16`.
    pub fn encrypt(&self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();

        if len < 16 {
            return Err(Error::BadLength);
        }

        let r = len % 16;
        let m = if r == 0 { len } else { len - r - 16 };

        let mut prev = self.iv;

        for chunk in buf[..m].chunks_exact_mut(16) {
            xor_assign(chunk, &prev);
            self.key.encrypt_block(chunk);
            prev.copy_from_slice(chunk);
        }

        if r == 0 {
            return Ok(());
        }

        let mut e = [0u8; 16];
        e.copy_from_slice(&buf[m..m + 16]);
        xor_assign(&mut e, &prev);
        self.key.encrypt_block(&mut e);

        let mut last = [0u8; 16];
        last[..r].copy_from_slice(&buf[m + 16..]);
        xor_assign(&mut last, &e);
        self.key.encrypt_block(&mut last);

        buf[m..m + 16].copy_from_slice(&last);
        buf[m + 16..].copy_from_slice(&e[..r]);

        Ok(())
    }

    /// Decrypt in place; `buf.len() >= 16`.
    pub fn decrypt(&self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();

        if len < 16 {
            return Err(Error::BadLength);
        }

        let r = len % 16;
        let m = if r == 0 { len } else { len - r - 16 };

        let mut prev = self.iv;

        for chunk in buf[..m].chunks_exact_mut(16) {
            let cipher: [u8; 16] = {
                let mut t = [0u8; 16];
                t.copy_from_slice(chunk);
                t
            };

            self.key.decrypt_block(chunk);
            xor_assign(chunk, &prev);
            prev = cipher;
        }

        if r == 0 {
            return Ok(());
        }

        let mut z = [0u8; 16];
        z.copy_from_slice(&buf[m..m + 16]);
        self.key.decrypt_block(&mut z);

        let mut e = [0u8; 16];
        e[..r].copy_from_slice(&buf[m + 16..]);
        e[r..].copy_from_slice(&z[r..]);

        let mut tail = [0u8; 16];
        tail[..r].copy_from_slice(&z[..r]);
        xor_assign(&mut tail[..r], &buf[m + 16..]);

        let mut head = e;
        self.key.decrypt_block(&mut head);
        xor_assign(&mut head, &prev);

        buf[m..m + 16].copy_from_slice(&head);
        buf[m + 16..].copy_from_slice(&tail[..r]);

        Ok(())
    }
}

/// Cipher feedback, streaming.
pub struct Cfb {
    key: BeltKey,
    fb: [u8; 16],
    gamma: [u8; 16],
    pos: usize,
}

impl Cfb {
    pub fn new(key: BeltKey, iv: [u8; 16]) -> Self {
        Cfb {
            key,
            fb: iv,
            gamma: [0; 16],
            pos: 0,
        }
    }

    /// Encrypt a chunk in place; any length.
    pub fn encrypt(&mut self, buf: &mut [u8]) {
        for v in buf.iter_mut() {
            if self.pos == 0 {
                self.gamma = self.key.encrypt_copy(&self.fb);
            }

            *v ^= self.gamma[self.pos];
            self.fb[self.pos] = *v;

            self.pos = (self.pos + 1) % 16;
        }
    }

    /// Decrypt a chunk in place; any length.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        for v in buf.iter_mut() {
            if self.pos == 0 {
                self.gamma = self.key.encrypt_copy(&self.fb);
            }

            let cipher = *v;

            *v ^= self.gamma[self.pos];
            self.fb[self.pos] = cipher;

            self.pos = (self.pos + 1) % 16;
        }
    }
}

/// Counter mode, streaming. Encryption and decryption coincide.
pub struct Ctr {
    key: BeltKey,
    ctr: [u8; 16],
    gamma: [u8; 16],
    pos: usize,
}

impl Ctr {
    /// Start the keystream: the counter is the encrypted synchro value.
    pub fn new(key: BeltKey, iv: &[u8; 16]) -> Self {
        let ctr = key.encrypt_copy(iv);

        Ctr {
            key,
            ctr,
            gamma: [0; 16],
            pos: 16,
        }
    }

    /// Resume from a raw counter state (used by the AEAD mode which shares
    /// the counter with its authenticator).
    pub(crate) fn from_state(key: BeltKey, ctr: [u8; 16]) -> Self {
        Ctr {
            key,
            ctr,
            gamma: [0; 16],
            pos: 16,
        }
    }

    pub(crate) fn state(&self) -> [u8; 16] {
        self.ctr
    }

    fn next_gamma(&mut self) {
        // 128-bit increment, little-endian octet order
        let mut carry = 1u16;

        for v in self.ctr.iter_mut() {
            let s = *v as u16 + carry;
            *v = s as u8;
            carry = s >> 8;
        }

        self.gamma = self.key.encrypt_copy(&self.ctr);
        self.pos = 0;
    }

    /// XOR the keystream into `buf`; any length.
    pub fn apply(&mut self, buf: &mut [u8]) {
        for v in buf.iter_mut() {
            if self.pos == 16 {
                self.next_gamma();
            }

            *v ^= self.gamma[self.pos];
            self.pos += 1;
        }
    }

    /// Alias of [`Ctr::apply`].
    pub fn encrypt(&mut self, buf: &mut [u8]) {
        self.apply(buf)
    }

    /// Alias of [`Ctr::apply`].
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        self.apply(buf)
    }
}
