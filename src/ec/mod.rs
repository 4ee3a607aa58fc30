//! Short-Weierstrass elliptic curve engine over GF(p)
//!
//! Points are carried internally in Jacobian coordinates `(X, Y, Z)` with
//! the point at infinity encoded by `Z = 0`; the octet boundary and the base
//! point use the affine form. The group descriptor owns the field, the curve
//! coefficients, the base point and the order `q` together with a Montgomery
//! context for arithmetic modulo `q`.
//!
//! Scalar multiplication lives in [`mul`]: a fixed-length ladder for secret
//! scalars and double-and-add / Shamir variants for public ones.

use core::cmp::Ordering;

use subtle::Choice;

use crate::gfp::{Fe, PrimeField};
use crate::ww::{self, monty::Monty, zz};
use crate::{Error, Result};

pub mod mul;
pub mod swu;

/// An affine point. Coordinates are field elements of the owning group.
#[derive(Clone, Debug)]
pub struct Affine {
    pub x: Fe,
    pub y: Fe,
}

/// A Jacobian point; `z = 0` is the point at infinity.
#[derive(Clone, Debug)]
pub struct Point {
    pub(crate) x: Fe,
    pub(crate) y: Fe,
    pub(crate) z: Fe,
}

/// Descriptor of the curve group `y² = x³ + ax + b` over GF(p).
#[derive(Clone, Debug)]
pub struct EcGroup {
    /// The base field.
    pub f: PrimeField,
    pub(crate) a: Fe,
    pub(crate) b: Fe,
    /// Base point, conventionally `x = 0` for the named curves.
    pub g: Affine,
    /// Group order (same limb width as the field).
    pub q: Vec<u32>,
    /// Montgomery context modulo `q` for scalar arithmetic.
    pub qm: Monty,
    /// Cofactor; one for all named curves.
    pub cofactor: u32,
    /// Security level: 96, 128, 192 or 256.
    pub l: usize,
}

impl EcGroup {
    /// Assemble a group descriptor from little-endian octet strings.
    ///
    /// Performs the structural checks only (sizes, ranges, base point on the
    /// curve); the deep domain validation of the standard lives with the
    /// parameter loader.
    pub fn new(
        l: usize,
        p: &[u8],
        a: &[u8],
        b: &[u8],
        yg: &[u8],
        q: &[u8],
        cofactor: u32,
    ) -> Result<Self> {
        match l {
            96 | 128 | 192 | 256 => (),
            _ => return Err(Error::BadParams),
        }

        let no = l / 4;

        if p.len() != no || a.len() != no || b.len() != no || yg.len() != no || q.len() != no {
            return Err(Error::BadLength);
        }

        let f = PrimeField::new(p)?;

        let a = f.from_octets(a).map_err(|_| Error::BadParams)?;
        let b = f.from_octets(b).map_err(|_| Error::BadParams)?;

        let q_limbs = ww::from_le_bytes(q, no / 4);

        if q_limbs[0] & 1 == 0 || ww::bit_len(&q_limbs) != l * 2 {
            return Err(Error::BadParams);
        }

        let gy = f.from_octets(yg).map_err(|_| Error::BadParams)?;
        let g = Affine {
            x: f.zero(),
            y: gy,
        };

        let group = EcGroup {
            qm: Monty::new(&q_limbs),
            q: q_limbs,
            f,
            a,
            b,
            g,
            cofactor,
            l,
        };

        if !group.is_on_curve(&group.g) {
            return Err(Error::BadParams);
        }

        Ok(group)
    }

    /// Octet length of one coordinate.
    pub fn coord_len(&self) -> usize {
        self.f.no
    }

    /// Octet length of a serialized point (`x ‖ y`).
    pub fn point_len(&self) -> usize {
        self.f.no * 2
    }

    /// Right-hand side `x³ + ax + b`.
    pub(crate) fn rhs(&self, x: &Fe) -> Fe {
        let f = &self.f;

        let x3 = f.mul(&f.sqr(x), x);

        f.add(&f.add(&x3, &f.mul(&self.a, x)), &self.b)
    }

    /// Whether an affine point satisfies the curve equation.
    pub fn is_on_curve(&self, p: &Affine) -> bool {
        let lhs = self.f.sqr(&p.y);

        bool::from(self.f.eq(&lhs, &self.rhs(&p.x)))
    }

    /// Decode `x ‖ y` octets into a validated affine point.
    pub fn decode_point(&self, octets: &[u8]) -> Result<Affine> {
        if octets.len() != self.point_len() {
            return Err(Error::BadLength);
        }

        let (xo, yo) = octets.split_at(self.f.no);

        let x = self.f.from_octets(xo).map_err(|_| Error::BadPoint)?;
        let y = self.f.from_octets(yo).map_err(|_| Error::BadPoint)?;

        let p = Affine { x, y };

        if !self.is_on_curve(&p) {
            return Err(Error::BadPoint);
        }

        Ok(p)
    }

    /// Serialize an affine point as `x ‖ y`.
    pub fn encode_point(&self, p: &Affine) -> Vec<u8> {
        let mut out = self.f.to_octets(&p.x);
        out.extend_from_slice(&self.f.to_octets(&p.y));
        out
    }

    /// The point at infinity.
    pub fn infinity(&self) -> Point {
        Point {
            x: self.f.one(),
            y: self.f.one(),
            z: self.f.zero(),
        }
    }

    /// Lift an affine point into Jacobian coordinates.
    pub fn lift(&self, p: &Affine) -> Point {
        Point {
            x: p.x.clone(),
            y: p.y.clone(),
            z: self.f.one(),
        }
    }

    /// Whether a Jacobian point is the point at infinity.
    pub fn is_infinity(&self, p: &Point) -> bool {
        bool::from(self.f.is_zero(&p.z))
    }

    /// Drop a Jacobian point to affine form; `None` for infinity.
    pub fn to_affine(&self, p: &Point) -> Option<Affine> {
        if self.is_infinity(p) {
            return None;
        }

        let f = &self.f;

        let zi = f.inv(&p.z);
        let zi2 = f.sqr(&zi);
        let zi3 = f.mul(&zi2, &zi);

        Some(Affine {
            x: f.mul(&p.x, &zi2),
            y: f.mul(&p.y, &zi3),
        })
    }

    /// Jacobian doubling.
    pub fn dbl(&self, p: &Point) -> Point {
        let f = &self.f;

        if self.is_infinity(p) || bool::from(f.is_zero(&p.y)) {
            return self.infinity();
        }

        let xx = f.sqr(&p.x);
        let yy = f.sqr(&p.y);
        let yyyy = f.sqr(&yy);
        let zz = f.sqr(&p.z);

        // s = 4·x·y²
        let t = f.sub(&f.sub(&f.sqr(&f.add(&p.x, &yy)), &xx), &yyyy);
        let s = f.dbl(&t);

        // m = 3·x² + a·z⁴
        let m = f.add(&f.add(&f.dbl(&xx), &xx), &f.mul(&self.a, &f.sqr(&zz)));

        let x3 = f.sub(&f.sqr(&m), &f.dbl(&s));

        let eight_yyyy = f.dbl(&f.dbl(&f.dbl(&yyyy)));
        let y3 = f.sub(&f.mul(&m, &f.sub(&s, &x3)), &eight_yyyy);

        let z3 = f.sub(&f.sub(&f.sqr(&f.add(&p.y, &p.z)), &yy), &zz);

        Point {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// General Jacobian addition.
    pub fn add(&self, p: &Point, q: &Point) -> Point {
        if self.is_infinity(p) {
            return q.clone();
        }
        if self.is_infinity(q) {
            return p.clone();
        }

        let f = &self.f;

        let z1z1 = f.sqr(&p.z);
        let z2z2 = f.sqr(&q.z);

        let u1 = f.mul(&p.x, &z2z2);
        let u2 = f.mul(&q.x, &z1z1);

        let s1 = f.mul(&f.mul(&p.y, &q.z), &z2z2);
        let s2 = f.mul(&f.mul(&q.y, &p.z), &z1z1);

        let h = f.sub(&u2, &u1);
        let r = f.sub(&s2, &s1);

        if bool::from(f.is_zero(&h)) {
            return if bool::from(f.is_zero(&r)) {
                self.dbl(p)
            } else {
                self.infinity()
            };
        }

        let hh = f.sqr(&h);
        let hhh = f.mul(&h, &hh);
        let v = f.mul(&u1, &hh);

        let x3 = f.sub(&f.sub(&f.sqr(&r), &hhh), &f.dbl(&v));
        let y3 = f.sub(&f.mul(&r, &f.sub(&v, &x3)), &f.mul(&s1, &hhh));
        let z3 = f.mul(&f.mul(&p.z, &q.z), &h);

        Point {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// Mixed addition of a Jacobian and an affine point.
    pub fn add_affine(&self, p: &Point, q: &Affine) -> Point {
        if self.is_infinity(p) {
            return self.lift(q);
        }

        let f = &self.f;

        let z1z1 = f.sqr(&p.z);

        let u2 = f.mul(&q.x, &z1z1);
        let s2 = f.mul(&f.mul(&q.y, &p.z), &z1z1);

        let h = f.sub(&u2, &p.x);
        let r = f.sub(&s2, &p.y);

        if bool::from(f.is_zero(&h)) {
            return if bool::from(f.is_zero(&r)) {
                self.dbl(p)
            } else {
                self.infinity()
            };
        }

        let hh = f.sqr(&h);
        let hhh = f.mul(&h, &hh);
        let v = f.mul(&p.x, &hh);

        let x3 = f.sub(&f.sub(&f.sqr(&r), &hhh), &f.dbl(&v));
        let y3 = f.sub(&f.mul(&r, &f.sub(&v, &x3)), &f.mul(&p.y, &hhh));
        let z3 = f.mul(&p.z, &h);

        Point {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// Additive inverse of a point.
    pub fn neg(&self, p: &Point) -> Point {
        Point {
            x: p.x.clone(),
            y: self.f.neg(&p.y),
            z: p.z.clone(),
        }
    }

    /// Whether `q · P = O`, i.e. the point has the group order.
    pub fn has_order(&self, p: &Affine) -> bool {
        let r = mul::mul_vartime(self, &self.q, p);

        self.is_infinity(&r)
    }

    /// Safe-group check: `p^k ≢ 1 (mod q)` for `k = 1..=50` and `q ≠ p`.
    pub fn is_safe_group(&self) -> bool {
        if ww::cmp(self.f.p(), &self.q) == Ordering::Equal {
            return false;
        }

        let p_mod_q = zz::mod_reduce(self.f.p(), &self.q);

        let mut one = vec![0u32; self.q.len()];
        one[0] = 1;

        let mut acc = self.qm.to_mont(&p_mod_q);
        let p_mont = acc.clone();

        for _ in 0..50 {
            if self.qm.from_mont(&acc) == one {
                return false;
            }

            acc = self.qm.mul(&acc, &p_mont);
        }

        true
    }

    /// Reduce an arbitrary little-endian octet string modulo `q`.
    pub fn scalar_from_octets_mod(&self, octets: &[u8]) -> Vec<u32> {
        let limbs = ww::from_le_bytes(octets, (octets.len() + 3) / 4);

        zz::mod_reduce(&limbs, &self.q)
    }

    /// Parse a scalar of exactly `l/4` octets, requiring `0 < s < q`.
    pub fn scalar_from_octets(&self, octets: &[u8]) -> Result<Vec<u32>> {
        if octets.len() != self.f.no {
            return Err(Error::BadLength);
        }

        let s = ww::from_le_bytes(octets, self.q.len());

        if ww::is_zero(&s) || ww::cmp(&s, &self.q) != Ordering::Less {
            return Err(Error::BadInput);
        }

        Ok(s)
    }

    /// Serialize a scalar to `l/4` octets.
    pub fn scalar_to_octets(&self, s: &[u32]) -> Vec<u8> {
        let mut out = vec![0u8; self.f.no];
        ww::to_le_bytes(s, &mut out);
        out
    }

    /// Constant-time swap of two Jacobian points.
    pub(crate) fn ct_swap(&self, p: &mut Point, q: &mut Point, flag: Choice) {
        use subtle::ConditionallySelectable;

        for (a, b) in p
            .x
            .0
            .iter_mut()
            .zip(q.x.0.iter_mut())
            .chain(p.y.0.iter_mut().zip(q.y.0.iter_mut()))
            .chain(p.z.0.iter_mut().zip(q.z.0.iter_mut()))
        {
            u32::conditional_swap(a, b, flag);
        }
    }
}
