//! Montgomery multiplication and exponentiation
//!
//! Residues modulo an odd modulus are held in Montgomery form (`x·R mod m`
//! with `R = 2^(32·n)`), so reductions are carried by word-level interleaved
//! multiplication instead of division. Exponentiation walks a fixed 4-bit
//! window with a constant-time table scan, which keeps secret exponents free
//! of data-dependent branches and lookups.

use subtle::{ConditionallySelectable, ConstantTimeEq};

use super::{ct_lt, ct_sub_assign, Word};

/// Reduction context for one odd modulus.
#[derive(Clone, Debug)]
pub struct Monty {
    /// The modulus, little-word order, fixed width.
    pub m: Vec<Word>,
    /// `-m^(-1) mod 2^32`
    n0: Word,
    /// `R^2 mod m`, for conversion into Montgomery form.
    rr: Vec<Word>,
}

impl Monty {
    /// Build a context for the odd modulus `m`.
    pub fn new(m: &[Word]) -> Self {
        debug_assert!(m[0] & 1 == 1, "modulus must be odd");
        debug_assert!(!super::is_zero(m));

        let n = m.len();

        // word inverse by Newton iteration: five steps double the precision
        // past 32 bits
        let mut inv = m[0];
        for _ in 0..5 {
            inv = inv.wrapping_mul(2u32.wrapping_sub(m[0].wrapping_mul(inv)));
        }
        let n0 = inv.wrapping_neg();

        // R^2 mod m by 2·32·n modular doublings of 1
        let mut rr = vec![0u32; n];
        rr[0] = 1;
        let rr_full = super::zz::mod_reduce(&rr, m);
        rr = rr_full;

        for _ in 0..(2 * 32 * n) {
            let carry = {
                let mut c = 0u32;
                for limb in rr.iter_mut() {
                    let v = *limb;
                    *limb = (v << 1) | c;
                    c = v >> 31;
                }
                c
            };

            let ge = subtle::Choice::from((carry & 1) as u8) | !ct_lt(&rr, m);
            ct_sub_assign(&mut rr, m, ge);
        }

        Monty {
            m: m.to_vec(),
            n0,
            rr,
        }
    }

    /// Montgomery product of two residues in Montgomery form.
    pub fn mul(&self, a: &[Word], b: &[Word]) -> Vec<Word> {
        let n = self.m.len();

        debug_assert_eq!(a.len(), n);
        debug_assert_eq!(b.len(), n);

        // CIOS: interleave the product with per-word reduction
        let mut t = vec![0u32; n + 2];

        for i in 0..n {
            let mut carry = 0u64;

            for j in 0..n {
                let s = t[j] as u64 + a[i] as u64 * b[j] as u64 + carry;

                t[j] = s as u32;
                carry = s >> 32;
            }

            let s = t[n] as u64 + carry;
            t[n] = s as u32;
            t[n + 1] = (s >> 32) as u32;

            let mu = t[0].wrapping_mul(self.n0);

            let s = t[0] as u64 + mu as u64 * self.m[0] as u64;
            let mut carry = s >> 32;

            for j in 1..n {
                let s = t[j] as u64 + mu as u64 * self.m[j] as u64 + carry;

                t[j - 1] = s as u32;
                carry = s >> 32;
            }

            let s = t[n] as u64 + carry;
            t[n - 1] = s as u32;
            t[n] = t[n + 1] + (s >> 32) as u32;
            t[n + 1] = 0;
        }

        let mut r: Vec<u32> = t[..n].to_vec();

        let ge = subtle::Choice::from((t[n] & 1) as u8) | !ct_lt(&r, &self.m);
        ct_sub_assign(&mut r, &self.m, ge);

        r
    }

    /// Convert a plain residue into Montgomery form.
    pub fn to_mont(&self, a: &[Word]) -> Vec<Word> {
        let mut padded = a.to_vec();
        padded.resize(self.m.len(), 0);

        self.mul(&padded, &self.rr)
    }

    /// Convert out of Montgomery form.
    pub fn from_mont(&self, a: &[Word]) -> Vec<Word> {
        let mut one = vec![0u32; self.m.len()];
        one[0] = 1;

        self.mul(a, &one)
    }

    /// The Montgomery representation of one.
    pub fn one(&self) -> Vec<Word> {
        let mut one = vec![0u32; self.m.len()];
        one[0] = 1;

        self.to_mont(&one)
    }

    /// `base^exp mod m` with `base` in Montgomery form; the result stays in
    /// Montgomery form.
    ///
    /// Fixed 4-bit windows over the full width of `exp`, table entries
    /// selected by masked scan: safe for secret exponents.
    pub fn pow(&self, base: &[Word], exp: &[Word]) -> Vec<Word> {
        let n = self.m.len();

        debug_assert_eq!(base.len(), n);

        // table[i] = base^i
        let mut table = Vec::with_capacity(16);
        table.push(self.one());
        for i in 1..16 {
            let next = self.mul(&table[i - 1], base);
            table.push(next);
        }

        let mut acc = self.one();
        let nibbles = exp.len() * 8;

        for idx in (0..nibbles).rev() {
            if idx != nibbles - 1 {
                for _ in 0..4 {
                    acc = self.mul(&acc, &acc);
                }
            }

            let limb = exp[idx / 8];
            let nib = ((limb >> (4 * (idx % 8))) & 0xF) as u8;

            // constant-time select of table[nib]
            let mut factor = vec![0u32; n];
            for (i, entry) in table.iter().enumerate() {
                let hit = (i as u8).ct_eq(&nib);
                for (f, e) in factor.iter_mut().zip(entry.iter()) {
                    *f = u32::conditional_select(f, e, hit);
                }
            }

            acc = self.mul(&acc, &factor);
        }

        acc
    }
}
