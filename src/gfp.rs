//! The prime field GF(p) underneath the curve engine
//!
//! A field descriptor wraps a Montgomery context for the odd prime `p` plus
//! the exponents used for inversion (`p - 2`) and square roots
//! (`(p + 1) / 4`; the standard curves satisfy `p ≡ 3 (mod 4)`). Elements
//! are kept in Montgomery form throughout; conversion happens only at the
//! octet boundary.
//!
//! Inversion and square root go through the exponentiation ladder so they
//! are as timing-safe as [`crate::ww::monty::Monty::pow`].

use core::cmp::Ordering;

use subtle::Choice;

use crate::ww::{self, monty::Monty, zz};
use crate::{Error, Result};

/// A field element in Montgomery form.
///
/// Elements are only meaningful together with the [`PrimeField`] that made
/// them; mixing fields is a logic error guarded by width assertions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fe(pub(crate) Vec<u32>);

/// Descriptor of GF(p).
#[derive(Clone, Debug)]
pub struct PrimeField {
    monty: Monty,
    /// Octet length of a serialized element.
    pub no: usize,
    /// `p - 2`, the inversion exponent.
    inv_exp: Vec<u32>,
    /// `(p + 1) / 4`, the square root exponent.
    sqrt_exp: Vec<u32>,
    /// `(p - 1) / 2`, the Euler criterion exponent.
    euler_exp: Vec<u32>,
}

impl PrimeField {
    /// Build a field descriptor from the little-endian octets of `p`.
    ///
    /// Requires `p` odd with `p ≡ 3 (mod 4)` and a set top octet; primality
    /// is the caller's concern (domain validation checks it).
    pub fn new(p_octets: &[u8]) -> Result<Self> {
        if p_octets.is_empty() || p_octets.len() % 4 != 0 {
            return Err(Error::BadInput);
        }

        let n = p_octets.len() / 4;
        let p = ww::from_le_bytes(p_octets, n);

        if p[0] & 3 != 3 || ww::bit_len(&p) != p_octets.len() * 8 {
            return Err(Error::BadParams);
        }

        let mut inv_exp = p.clone();
        ww::sub_assign(&mut inv_exp, &[2]);

        let mut sqrt_exp = p.clone();
        ww::add_word_assign(&mut sqrt_exp, 1);
        ww::shr_assign(&mut sqrt_exp, 2);

        let mut euler_exp = p.clone();
        ww::sub_assign(&mut euler_exp, &[1]);
        ww::shr_assign(&mut euler_exp, 1);

        Ok(PrimeField {
            monty: Monty::new(&p),
            no: p_octets.len(),
            inv_exp,
            sqrt_exp,
            euler_exp,
        })
    }

    /// Limb count of an element.
    pub fn n(&self) -> usize {
        self.monty.m.len()
    }

    /// The modulus limbs.
    pub fn p(&self) -> &[u32] {
        &self.monty.m
    }

    /// The modulus as little-endian octets.
    pub fn p_octets(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.no];
        ww::to_le_bytes(&self.monty.m, &mut out);
        out
    }

    /// Decode an element from `no` little-endian octets, rejecting values
    /// at or above `p`.
    pub fn from_octets(&self, octets: &[u8]) -> Result<Fe> {
        if octets.len() != self.no {
            return Err(Error::BadLength);
        }

        let v = ww::from_le_bytes(octets, self.n());

        if ww::cmp(&v, &self.monty.m) != Ordering::Less {
            return Err(Error::BadInput);
        }

        Ok(Fe(self.monty.to_mont(&v)))
    }

    /// Encode an element to `no` little-endian octets.
    pub fn to_octets(&self, a: &Fe) -> Vec<u8> {
        let plain = self.monty.from_mont(&a.0);

        let mut out = vec![0u8; self.no];
        ww::to_le_bytes(&plain, &mut out);
        out
    }

    /// Reduce an arbitrary-width integer into the field.
    pub fn from_int(&self, limbs: &[u32]) -> Fe {
        let r = zz::mod_reduce(limbs, &self.monty.m);

        Fe(self.monty.to_mont(&r))
    }

    /// Element from a small constant.
    pub fn from_word(&self, w: u32) -> Fe {
        self.from_int(&[w])
    }

    /// The additive identity.
    pub fn zero(&self) -> Fe {
        Fe(vec![0u32; self.n()])
    }

    /// The multiplicative identity.
    pub fn one(&self) -> Fe {
        Fe(self.monty.one())
    }

    /// Whether `a` is zero, timing-safe.
    pub fn is_zero(&self, a: &Fe) -> Choice {
        ww::ct_is_zero(&a.0)
    }

    /// Timing-safe equality.
    pub fn eq(&self, a: &Fe, b: &Fe) -> Choice {
        ww::ct_eq(&a.0, &b.0)
    }

    /// `a + b`
    pub fn add(&self, a: &Fe, b: &Fe) -> Fe {
        Fe(zz::add_mod(&a.0, &b.0, &self.monty.m))
    }

    /// `a - b`
    pub fn sub(&self, a: &Fe, b: &Fe) -> Fe {
        Fe(zz::sub_mod(&a.0, &b.0, &self.monty.m))
    }

    /// `-a`
    pub fn neg(&self, a: &Fe) -> Fe {
        Fe(zz::neg_mod(&a.0, &self.monty.m))
    }

    /// `a · b`
    pub fn mul(&self, a: &Fe, b: &Fe) -> Fe {
        Fe(self.monty.mul(&a.0, &b.0))
    }

    /// `a²`
    pub fn sqr(&self, a: &Fe) -> Fe {
        Fe(self.monty.mul(&a.0, &a.0))
    }

    /// `a + a`
    pub fn dbl(&self, a: &Fe) -> Fe {
        self.add(a, a)
    }

    /// `a^exp` for a public or secret exponent given as limbs.
    pub fn pow(&self, a: &Fe, exp: &[u32]) -> Fe {
        Fe(self.monty.pow(&a.0, exp))
    }

    /// `a^(-1)`, via Fermat (`a^(p-2)`). Zero maps to zero.
    pub fn inv(&self, a: &Fe) -> Fe {
        self.pow(a, &self.inv_exp)
    }

    /// Square root via `a^((p+1)/4)`, valid because `p ≡ 3 (mod 4)`.
    ///
    /// Returns `None` when `a` is a non-residue.
    pub fn sqrt(&self, a: &Fe) -> Option<Fe> {
        let r = self.pow(a, &self.sqrt_exp);

        if bool::from(self.eq(&self.sqr(&r), a)) {
            Some(r)
        } else {
            None
        }
    }

    /// Euler criterion: whether `a` is a quadratic residue (zero counts as
    /// a residue).
    pub fn is_square(&self, a: &Fe) -> bool {
        if bool::from(self.is_zero(a)) {
            return true;
        }

        let r = self.pow(a, &self.euler_exp);

        bool::from(self.eq(&r, &self.one()))
    }

    /// Parity of the plain (non-Montgomery) representative.
    pub fn is_odd(&self, a: &Fe) -> bool {
        let plain = self.monty.from_mont(&a.0);

        plain[0] & 1 == 1
    }

    /// Constant-time selection: `b` when `flag` is set, else `a`.
    pub fn select(&self, a: &Fe, b: &Fe, flag: Choice) -> Fe {
        use subtle::ConditionallySelectable;

        let mut out = vec![0u32; self.n()];

        for i in 0..self.n() {
            out[i] = u32::conditional_select(&a.0[i], &b.0[i], flag);
        }

        Fe(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // p = 2^32 - 5, prime and congruent to 3 mod 4
    const P32: [u8; 4] = [0xFB, 0xFF, 0xFF, 0xFF];

    fn field() -> PrimeField {
        PrimeField::new(&P32).unwrap()
    }

    #[test]
    fn octet_boundary() {
        let f = field();

        let a = f.from_octets(&[1, 0, 0, 0]).unwrap();
        assert_eq!(f.to_octets(&a), vec![1, 0, 0, 0]);

        // p itself is rejected
        assert!(f.from_octets(&P32).is_err());
        assert!(f.from_octets(&[0; 8]).is_err());
    }

    #[test]
    fn ring_identities() {
        let f = field();

        let a = f.from_word(12345);
        let b = f.from_word(67890);

        let ab = f.mul(&a, &b);
        let ba = f.mul(&b, &a);
        assert_eq!(f.to_octets(&ab), f.to_octets(&ba));

        let s = f.add(&a, &b);
        let d = f.sub(&s, &b);
        assert_eq!(f.to_octets(&d), f.to_octets(&a));

        let n = f.neg(&a);
        assert!(bool::from(f.is_zero(&f.add(&a, &n))));

        assert_eq!(f.to_octets(&f.sqr(&a)), f.to_octets(&f.mul(&a, &a)));
    }

    #[test]
    fn inversion() {
        let f = field();

        let a = f.from_word(0xBEEF);
        let inv = f.inv(&a);

        assert!(bool::from(f.eq(&f.mul(&a, &inv), &f.one())));
    }

    #[test]
    fn square_roots() {
        let f = field();

        let a = f.from_word(0x1234_5678);
        let sq = f.sqr(&a);

        assert!(f.is_square(&sq));

        let r = f.sqrt(&sq).unwrap();
        // the root is ±a
        let matches = bool::from(f.eq(&r, &a)) || bool::from(f.eq(&r, &f.neg(&a)));
        assert!(matches);

        // find a non-residue: -1 is one when p ≡ 3 (mod 4)
        let m1 = f.neg(&f.one());
        assert!(!f.is_square(&m1));
        assert!(f.sqrt(&m1).is_none());
    }

    #[test]
    fn parity() {
        let f = field();

        assert!(f.is_odd(&f.from_word(7)));
        assert!(!f.is_odd(&f.from_word(8)));
    }
}
