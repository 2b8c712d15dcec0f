//! Error-free transformations: the atoms all extended-precision ops build on.
//!
//! Each returns (result, error) such that result + error equals the exact
//! value of the operation, with no rounding loss.

/// Knuth two-sum: works for any ordering of |a|, |b|.
#[inline]
pub(crate) fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

/// Dekker fast two-sum. Requires |a| >= |b| (or a == 0).
#[inline]
pub(crate) fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let err = b - (s - a);
    (s, err)
}

/// Veltkamp split constant: 2^27 + 1.
const SPLIT: f64 = 134_217_729.0;

/// Split a double into high and low halves of at most 26/27 significant bits.
#[inline]
pub(crate) fn split(a: f64) -> (f64, f64) {
    let t = SPLIT * a;
    let hi = t - (t - a);
    let lo = a - hi;
    (hi, lo)
}

/// Dekker two-product via Veltkamp splitting. No FMA requirement.
#[inline]
pub(crate) fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let (a_hi, a_lo) = split(a);
    let (b_hi, b_lo) = split(b);
    let err = ((a_hi * b_hi - p) + a_hi * b_lo + a_lo * b_hi) + a_lo * b_lo;
    (p, err)
}
