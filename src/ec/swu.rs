//! Deterministic map from a field element to a curve point (SWU)
//!
//! The simplified Shallue–van de Woestijne–Ulas map with the non-residue
//! `Z = -1` (a non-square exactly because `p ≡ 3 (mod 4)`). Of the two
//! candidate abscissas, the first with a square right-hand side wins; the
//! ordinate's parity is aligned with the parity of the input so both
//! protocol sides land on the same point.

use super::{Affine, EcGroup};
use crate::gfp::Fe;
use crate::{Error, Result};

/// Map a field element onto the curve.
///
/// Requires `a ≠ 0` and `b ≠ 0`, which domain validation guarantees for the
/// named curves.
pub fn map_to_curve(ec: &EcGroup, s: &Fe) -> Result<Affine> {
    let f = &ec.f;

    if bool::from(f.is_zero(&ec.a)) || bool::from(f.is_zero(&ec.b)) {
        return Err(Error::BadParams);
    }

    let t = f.sqr(s); // s²
    let u = f.neg(&t); // Z·s²

    // x1 = (-b/a)·(1 + 1/(t² - t)); the degenerate denominator falls back
    // to x1 = b/(Z·a)
    let denom = f.sub(&f.sqr(&t), &t);

    let b_over_a = f.mul(&ec.b, &f.inv(&ec.a));

    let x1 = if bool::from(f.is_zero(&denom)) {
        f.neg(&b_over_a)
    } else {
        f.mul(
            &f.neg(&b_over_a),
            &f.add(&f.one(), &f.inv(&denom)),
        )
    };

    let g1 = ec.rhs(&x1);

    let (x, g) = if f.is_square(&g1) {
        (x1, g1)
    } else {
        let x2 = f.mul(&u, &x1);
        let g2 = ec.rhs(&x2);

        (x2, g2)
    };

    let y = f.sqrt(&g).ok_or(Error::BadPoint)?;

    // align ordinate parity with the input
    let y = if f.is_odd(&y) == f.is_odd(s) {
        y
    } else {
        f.neg(&y)
    };

    let w = Affine { x, y };

    debug_assert!(ec.is_on_curve(&w));

    Ok(w)
}
