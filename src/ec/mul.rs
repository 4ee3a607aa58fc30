//! Scalar multiplication
//!
//! Three shapes, matched to the sensitivity of the scalar:
//!
//! * [`mul_ct`]: Montgomery ladder over a fixed number of bits for secret
//!   scalars (private keys, one-time session scalars). The scalar is
//!   re-centered to `k + q` or `k + 2q` so every run walks exactly
//!   `bitlen(q) + 1` bits, and the ladder branches are replaced by
//!   constant-time swaps.
//! * [`mul_vartime`]: plain double-and-add for public scalars.
//! * [`mul_add_vartime`]: Shamir's trick for `u·P + v·Q`, used by
//!   signature verification where everything is public.

use subtle::Choice;

use super::{Affine, EcGroup, Point};
use crate::ww;

/// `k · P` for a secret scalar `k < q` given as limbs.
pub fn mul_ct(ec: &EcGroup, k: &[u32], p: &Affine) -> Point {
    let qbits = ww::bit_len(&ec.q);

    // widen by one limb so k + 2q cannot overflow
    let width = ec.q.len() + 1;

    let mut k1 = vec![0u32; width];
    k1[..k.len().min(width)].copy_from_slice(&k[..k.len().min(width)]);

    let mut q_ext = vec![0u32; width];
    q_ext[..ec.q.len()].copy_from_slice(&ec.q);

    ww::add_assign(&mut k1, &q_ext);

    // if bit qbits is clear, k + q still fits qbits bits; add q once more so
    // the walked length is always qbits + 1
    let short = !Choice::from(ww::test_bit(&k1, qbits) as u8);

    let mut k2 = k1.clone();
    ww::add_assign(&mut k2, &q_ext);

    use subtle::ConditionallySelectable;
    for (a, b) in k1.iter_mut().zip(k2.iter()) {
        *a = u32::conditional_select(a, b, short);
    }

    // ladder with invariant r1 = r0 + P; the top bit is known set
    let mut r0 = ec.lift(p);
    let mut r1 = ec.dbl(&r0);

    for i in (0..qbits).rev() {
        let bit = Choice::from(ww::test_bit(&k1, i) as u8);

        ec.ct_swap(&mut r0, &mut r1, bit);

        r1 = ec.add(&r0, &r1);
        r0 = ec.dbl(&r0);

        ec.ct_swap(&mut r0, &mut r1, bit);
    }

    r0
}

/// `k · P` for a public scalar.
pub fn mul_vartime(ec: &EcGroup, k: &[u32], p: &Affine) -> Point {
    let bits = ww::bit_len(k);

    let mut acc = ec.infinity();

    for i in (0..bits).rev() {
        acc = ec.dbl(&acc);

        if ww::test_bit(k, i) {
            acc = ec.add_affine(&acc, p);
        }
    }

    acc
}

/// `u · P + v · Q` for public scalars (Shamir's trick).
pub fn mul_add_vartime(ec: &EcGroup, u: &[u32], p: &Affine, v: &[u32], q: &Affine) -> Point {
    let pq = {
        let sum = ec.add(&ec.lift(p), &ec.lift(q));

        ec.to_affine(&sum)
    };

    let bits = ww::bit_len(u).max(ww::bit_len(v));

    let mut acc = ec.infinity();

    for i in (0..bits).rev() {
        acc = ec.dbl(&acc);

        match (ww::test_bit(u, i), ww::test_bit(v, i)) {
            (false, false) => (),
            (true, false) => acc = ec.add_affine(&acc, p),
            (false, true) => acc = ec.add_affine(&acc, q),
            (true, true) => match &pq {
                // P + Q folded to one addition; infinity means Q = -P and
                // the joint bit contributes nothing
                Some(sum) => acc = ec.add_affine(&acc, sum),
                None => (),
            },
        }
    }

    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bign::params::{BignParams, ParamsId};

    fn group() -> EcGroup {
        BignParams::standard(ParamsId::B128).unwrap().into_group().unwrap()
    }

    #[test]
    fn generator_sanity() {
        let ec = group();

        assert!(ec.is_on_curve(&ec.g));
        assert!(ec.has_order(&ec.g));
    }

    #[test]
    fn ladder_matches_vartime() {
        let ec = group();

        for seed in 1u32..5 {
            let mut k = vec![0u32; ec.q.len()];
            let mut acc = seed.wrapping_mul(0x9E37_79B9);
            for limb in k.iter_mut() {
                acc ^= acc << 13;
                acc ^= acc >> 7;
                acc ^= acc << 5;
                *limb = acc;
            }
            let k = crate::ww::zz::mod_reduce(&k, &ec.q);

            let a = ec.to_affine(&mul_ct(&ec, &k, &ec.g)).unwrap();
            let b = ec.to_affine(&mul_vartime(&ec, &k, &ec.g)).unwrap();

            assert_eq!(ec.encode_point(&a), ec.encode_point(&b));
        }
    }

    #[test]
    fn scalar_multiplication_commutes() {
        let ec = group();

        let k1 = vec![0x1234_5679u32; ec.q.len() / 2];
        let k2 = vec![0x0BAD_F00Du32; ec.q.len() / 2];

        let p1 = ec.to_affine(&mul_vartime(&ec, &k1, &ec.g)).unwrap();
        let p12 = ec.to_affine(&mul_vartime(&ec, &k2, &p1)).unwrap();

        let p2 = ec.to_affine(&mul_vartime(&ec, &k2, &ec.g)).unwrap();
        let p21 = ec.to_affine(&mul_vartime(&ec, &k1, &p2)).unwrap();

        assert_eq!(ec.encode_point(&p12), ec.encode_point(&p21));
    }

    #[test]
    fn shamir_matches_separate() {
        let ec = group();

        let u = vec![0xDEAD_4321u32, 0x17];
        let v = vec![0x600D_CAFEu32, 0x2B];

        let two_g = ec.to_affine(&ec.dbl(&ec.lift(&ec.g))).unwrap();

        let joint = ec
            .to_affine(&mul_add_vartime(&ec, &u, &ec.g, &v, &two_g))
            .unwrap();

        let lhs = mul_vartime(&ec, &u, &ec.g);
        let rhs = mul_vartime(&ec, &v, &two_g);
        let separate = ec.to_affine(&ec.add(&lhs, &rhs)).unwrap();

        assert_eq!(ec.encode_point(&joint), ec.encode_point(&separate));
    }

    #[test]
    fn point_codec() {
        let ec = group();

        let p = ec.to_affine(&mul_vartime(&ec, &[5], &ec.g)).unwrap();

        let octets = ec.encode_point(&p);
        let back = ec.decode_point(&octets).unwrap();

        assert_eq!(ec.encode_point(&back), octets);

        // corrupting y leaves the curve equation unsatisfied
        let mut bad = octets.clone();
        bad[ec.coord_len()] ^= 1;

        assert!(ec.decode_point(&bad).is_err());
    }
}
