//! Quad-double arithmetic: an unevaluated sum of four doubles giving
//! ~212 bits of mantissa, enough to resolve pixel spacing at zoom 10^60.
//!
//! Every operation expands its inputs into an exact list of error-free
//! partial terms (two_sum / two_prod), distills that list with sum-preserving
//! sweeps, and renormalizes the four leading components into canonical
//! non-overlapping form.

use crate::eft::{quick_two_sum, two_prod, two_sum};
use crate::error::QdParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Quad-double value `c0 + c1 + c2 + c3` with `|c(i+1)| <= 0.5 * ulp(c(i))`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Qd(pub [f64; 4]);

/// Canonicalize four roughly-ordered components (ported qd renorm).
fn renorm4(c0: f64, c1: f64, c2: f64, c3: f64) -> [f64; 4] {
    let (s, c3) = quick_two_sum(c2, c3);
    let (s, c2) = quick_two_sum(c1, s);
    let (c0, c1) = quick_two_sum(c0, s);

    let mut s0 = c0;
    let mut s1 = c1;
    let mut s2 = 0.0;
    let mut s3 = 0.0;
    if s1 != 0.0 {
        let (t1, t2) = quick_two_sum(s1, c2);
        s1 = t1;
        s2 = t2;
        if s2 != 0.0 {
            let (t2b, t3) = quick_two_sum(s2, c3);
            s2 = t2b;
            s3 = t3;
        } else {
            let (t1b, t2b) = quick_two_sum(s1, c3);
            s1 = t1b;
            s2 = t2b;
        }
    } else {
        let (t0, t1) = quick_two_sum(s0, c2);
        s0 = t0;
        s1 = t1;
        if s1 != 0.0 {
            let (t1b, t2) = quick_two_sum(s1, c3);
            s1 = t1b;
            s2 = t2;
        } else {
            let (t0b, t1b) = quick_two_sum(s0, c3);
            s0 = t0b;
            s1 = t1b;
        }
    }
    [s0, s1, s2, s3]
}

/// Distill an exact term list into a canonical quad-double.
///
/// Backward two_sum sweeps preserve the exact total while concentrating it
/// into the leading slots; each pass secures one more leading component, so
/// eight passes leave the discarded tail far below the 212-bit horizon.
fn condense(x: &mut [f64]) -> Qd {
    let n = x.len();
    debug_assert!(n >= 4);
    let passes = n.min(8);
    for _ in 0..passes {
        for i in (0..n - 1).rev() {
            let (s, e) = two_sum(x[i], x[i + 1]);
            x[i] = s;
            x[i + 1] = e;
        }
    }
    Qd(renorm4(x[0], x[1], x[2], x[3]))
}

impl Qd {
    pub const ZERO: Self = Self([0.0; 4]);
    pub const ONE: Self = Self([1.0, 0.0, 0.0, 0.0]);

    /// Build from four components of roughly decreasing magnitude,
    /// renormalizing into canonical form.
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        let mut t = [c0, c1, c2, c3];
        condense(&mut t)
    }

    #[inline]
    pub fn from_f64(v: f64) -> Self {
        Self([v, 0.0, 0.0, 0.0])
    }

    #[inline]
    pub fn from_dd(v: crate::Dd) -> Self {
        Self([v.hi, v.lo, 0.0, 0.0])
    }

    /// Truncate to double-double (the leading two components).
    #[inline]
    pub fn to_dd(self) -> crate::Dd {
        crate::Dd {
            hi: self.0[0],
            lo: self.0[1],
        }
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0[0]
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0[0] == 0.0
    }

    #[inline]
    pub fn neg(self) -> Self {
        Self([-self.0[0], -self.0[1], -self.0[2], -self.0[3]])
    }

    #[inline]
    pub fn abs(self) -> Self {
        if self.0[0] < 0.0 {
            self.neg()
        } else {
            self
        }
    }

    pub fn add(self, o: Self) -> Self {
        let a = self.0;
        let b = o.0;
        // Interleaved so the term list is roughly magnitude-ordered.
        let mut t = [a[0], b[0], a[1], b[1], a[2], b[2], a[3], b[3]];
        condense(&mut t)
    }

    #[inline]
    pub fn sub(self, o: Self) -> Self {
        self.add(o.neg())
    }

    pub fn mul(self, o: Self) -> Self {
        let a = self.0;
        let b = o.0;
        let mut t = [0.0f64; 23];
        let mut k = 0;
        for i in 0..4 {
            for j in 0..4 - i {
                let (p, e) = two_prod(a[i], b[j]);
                t[k] = p;
                t[k + 1] = e;
                k += 2;
            }
        }
        // Terms of combined order four sit ~2^-212 below the head; their own
        // rounding error is far past the representable tail.
        t[k] = a[1] * b[3];
        t[k + 1] = a[2] * b[2];
        t[k + 2] = a[3] * b[1];
        condense(&mut t)
    }

    #[inline]
    pub fn square(self) -> Self {
        self.mul(self)
    }

    pub fn mul_f64(self, b: f64) -> Self {
        let a = self.0;
        let mut t = [0.0f64; 7];
        for i in 0..3 {
            let (p, e) = two_prod(a[i], b);
            t[2 * i] = p;
            t[2 * i + 1] = e;
        }
        t[6] = a[3] * b;
        condense(&mut t)
    }

    /// Long division: four quotient digits plus one guard digit.
    pub fn div(self, o: Self) -> Self {
        let q0 = self.0[0] / o.0[0];
        let mut r = self.sub(o.mul_f64(q0));
        let q1 = r.0[0] / o.0[0];
        r = r.sub(o.mul_f64(q1));
        let q2 = r.0[0] / o.0[0];
        r = r.sub(o.mul_f64(q2));
        let q3 = r.0[0] / o.0[0];
        r = r.sub(o.mul_f64(q3));
        let q4 = r.0[0] / o.0[0];
        let mut t = [q0, q1, q2, q3, q4, 0.0];
        condense(&mut t)
    }

    #[inline]
    pub fn div_f64(self, b: f64) -> Self {
        self.div(Self::from_f64(b))
    }

    /// Exact scaling by 2^k.
    #[inline]
    pub fn mul_pow2(self, k: i32) -> Self {
        Self([
            libm::ldexp(self.0[0], k),
            libm::ldexp(self.0[1], k),
            libm::ldexp(self.0[2], k),
            libm::ldexp(self.0[3], k),
        ])
    }

    pub fn floor(self) -> Self {
        let x0 = self.0[0].floor();
        let mut x1 = 0.0;
        let mut x2 = 0.0;
        let mut x3 = 0.0;
        if x0 == self.0[0] {
            x1 = self.0[1].floor();
            if x1 == self.0[1] {
                x2 = self.0[2].floor();
                if x2 == self.0[2] {
                    x3 = self.0[3].floor();
                }
            }
        }
        Qd(renorm4(x0, x1, x2, x3))
    }

    /// Total order on canonical representations.
    pub fn compare(&self, o: &Self) -> Ordering {
        for i in 0..4 {
            if self.0[i] < o.0[i] {
                return Ordering::Less;
            }
            if self.0[i] > o.0[i] {
                return Ordering::Greater;
            }
        }
        Ordering::Equal
    }

    /// Parse a decimal string: optional sign, digits, optional fraction,
    /// optional exponent (`e`/`E`, optional sign, digits).
    pub fn parse(input: &str) -> Result<Self, QdParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(QdParseError::Empty);
        }
        let b = s.as_bytes();
        let mut i = 0;
        let mut neg = false;
        if b[i] == b'+' || b[i] == b'-' {
            neg = b[i] == b'-';
            i += 1;
        }

        let mut mant: Vec<u8> = Vec::new();
        let mut dec_exp: i64 = 0;
        let mut seen_digit = false;
        while i < b.len() && b[i].is_ascii_digit() {
            mant.push(b[i] - b'0');
            seen_digit = true;
            i += 1;
        }
        if i < b.len() && b[i] == b'.' {
            i += 1;
            while i < b.len() && b[i].is_ascii_digit() {
                mant.push(b[i] - b'0');
                dec_exp -= 1;
                seen_digit = true;
                i += 1;
            }
        }
        if !seen_digit {
            return Err(invalid_at(s, i));
        }
        if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
            i += 1;
            let mut exp_neg = false;
            if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
                exp_neg = b[i] == b'-';
                i += 1;
            }
            let mut exp: i64 = 0;
            let mut any = false;
            while i < b.len() && b[i].is_ascii_digit() {
                exp = exp * 10 + (b[i] - b'0') as i64;
                if exp > 100_000 {
                    return Err(QdParseError::ExponentOutOfRange);
                }
                any = true;
                i += 1;
            }
            if !any {
                return Err(invalid_at(s, i));
            }
            dec_exp += if exp_neg { -exp } else { exp };
        }
        if i < b.len() {
            return Err(invalid_at(s, i));
        }

        // Canonical digit string: no leading or trailing zeros. Stripping
        // trailing zeros keeps re-parsing a formatted value on the exact
        // computation path the original parse took.
        while mant.first() == Some(&0) {
            mant.remove(0);
        }
        while mant.last() == Some(&0) {
            mant.pop();
            dec_exp += 1;
        }
        if mant.is_empty() {
            return Ok(Qd::ZERO);
        }
        // Digits past the 212-bit horizon cannot affect the value.
        if mant.len() > 100 {
            dec_exp += (mant.len() - 100) as i64;
            mant.truncate(100);
        }
        let magnitude = dec_exp + mant.len() as i64;
        if !(-308..=308).contains(&magnitude) {
            return Err(QdParseError::ExponentOutOfRange);
        }

        let mut r = Qd::ZERO;
        for &d in &mant {
            r = r.mul_f64(10.0).add(Qd::from_f64(d as f64));
        }
        let mut k = dec_exp;
        while k < -300 {
            r = r.div(pow10(300));
            k += 300;
        }
        let v = match k.cmp(&0) {
            Ordering::Greater => r.mul(pow10(k as u32)),
            Ordering::Less => r.div(pow10((-k) as u32)),
            Ordering::Equal => r,
        };
        Ok(if neg { v.neg() } else { v })
    }

    /// Scientific-notation rendering with the requested significant digits.
    pub fn format(&self, digits: usize) -> String {
        let digits = digits.max(1);
        if self.is_zero() {
            return "0".to_string();
        }
        let neg = self.0[0] < 0.0;
        let mut x = self.abs();

        let mut m = libm::log10(x.0[0]).floor() as i32;
        match m.cmp(&0) {
            Ordering::Greater => x = x.div(pow10(m as u32)),
            Ordering::Less => x = x.mul(pow10((-m) as u32)),
            Ordering::Equal => {}
        }
        let ten = Qd::from_f64(10.0);
        while x.compare(&ten) != Ordering::Less {
            x = x.div_f64(10.0);
            m += 1;
        }
        while x.compare(&Qd::ONE) == Ordering::Less {
            x = x.mul_f64(10.0);
            m -= 1;
        }

        let mut ds: Vec<u8> = Vec::with_capacity(digits + 1);
        for _ in 0..=digits {
            let d = x.floor().to_f64().clamp(0.0, 9.0) as u8;
            ds.push(d);
            x = x.sub(Qd::from_f64(d as f64)).mul_f64(10.0);
        }
        if ds[digits] >= 5 {
            let mut i = digits;
            loop {
                if i == 0 {
                    // 9.99... rounded all the way up.
                    ds.insert(0, 1);
                    m += 1;
                    break;
                }
                i -= 1;
                if ds[i] == 9 {
                    ds[i] = 0;
                } else {
                    ds[i] += 1;
                    break;
                }
            }
        }
        ds.truncate(digits);

        let mut out = String::new();
        if neg {
            out.push('-');
        }
        out.push((b'0' + ds[0]) as char);
        if digits > 1 {
            out.push('.');
            for &d in &ds[1..] {
                out.push((b'0' + d) as char);
            }
        }
        out.push('e');
        out.push_str(&m.to_string());
        out
    }

    /// Format with enough digits that parsing the result reproduces this
    /// value, sized from the exponent span of the components.
    pub fn format_roundtrip(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let head_exp = libm::frexp(self.0[0]).1;
        let tail = self.0.iter().rev().find(|&&c| c != 0.0).copied().unwrap();
        let tail_exp = libm::frexp(tail).1;
        let span_bits = (head_exp - tail_exp) as f64 + 53.0;
        let digits = (span_bits * std::f64::consts::LOG10_2).ceil() as usize + 2;
        self.format(digits.clamp(40, 60))
    }
}

fn invalid_at(s: &str, pos: usize) -> QdParseError {
    // pos is a byte offset; report the character containing it.
    let ch = s
        .char_indices()
        .take_while(|(start, _)| *start <= pos)
        .last()
        .map(|(_, c)| c)
        .unwrap_or('?');
    QdParseError::InvalidChar { ch, pos }
}

/// 10^k by binary exponentiation in quad-double.
pub(crate) fn pow10(k: u32) -> Qd {
    let mut r = Qd::ONE;
    let mut base = Qd::from_f64(10.0);
    let mut e = k;
    if e == 0 {
        return r;
    }
    loop {
        if e & 1 == 1 {
            r = r.mul(base);
        }
        e >>= 1;
        if e == 0 {
            break;
        }
        base = base.square();
    }
    r
}

impl PartialOrd for Qd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl FromStr for Qd {
    type Err = QdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Qd::parse(s)
    }
}

impl fmt::Display for Qd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(40))
    }
}

/// In-place variants operating on 4-wide windows of a flat scratch buffer.
/// Results are bit-identical to the pure ops above; the reference-orbit
/// extension loop steps through such a buffer to stay allocation-free.
pub mod buf {
    use super::Qd;

    #[inline]
    pub fn load(buf: &[f64], at: usize) -> Qd {
        Qd([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[inline]
    pub fn store(buf: &mut [f64], at: usize, v: Qd) {
        buf[at..at + 4].copy_from_slice(&v.0);
    }

    #[inline]
    pub fn add(buf: &mut [f64], dst: usize, a: usize, b: usize) {
        let r = load(buf, a).add(load(buf, b));
        store(buf, dst, r);
    }

    #[inline]
    pub fn sub(buf: &mut [f64], dst: usize, a: usize, b: usize) {
        let r = load(buf, a).sub(load(buf, b));
        store(buf, dst, r);
    }

    #[inline]
    pub fn mul(buf: &mut [f64], dst: usize, a: usize, b: usize) {
        let r = load(buf, a).mul(load(buf, b));
        store(buf, dst, r);
    }

    #[inline]
    pub fn square(buf: &mut [f64], dst: usize, a: usize) {
        let r = load(buf, a).square();
        store(buf, dst, r);
    }

    #[inline]
    pub fn mul_pow2(buf: &mut [f64], dst: usize, a: usize, k: i32) {
        let r = load(buf, a).mul_pow2(k);
        store(buf, dst, r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qd(s: &str) -> Qd {
        Qd::parse(s).unwrap()
    }

    #[test]
    fn add_then_sub_recovers_wide_value() {
        // Spread of ~199 bits still fits comfortably inside quad-double.
        let a = Qd::new(1.0, 1e-20, 1e-40, 1e-60);
        let b = Qd::from_f64(3.0);
        assert_eq!(a.add(b).sub(b), a);
    }

    #[test]
    fn mul_exact_wide_integer() {
        // (2^30 + 1)^2 = 1152921506754330625, wider than one double.
        let a = Qd::from_f64((1u64 << 30) as f64 + 1.0);
        assert_eq!(a.square(), qd("1152921506754330625"));
    }

    #[test]
    fn mul_matches_u128_integers() {
        let a = 123_456_789_u64;
        let b = 987_654_321_987_u64;
        let p = Qd::from_f64(a as f64).mul(Qd::from_f64(b as f64));
        assert_eq!(p, qd(&(a as u128 * b as u128).to_string()));
    }

    #[test]
    fn div_recovers_exact_quotient() {
        assert_eq!(qd("25").div(qd("10")), qd("2.5"));
        assert_eq!(qd("1").div(qd("4")), Qd::from_f64(0.25));
    }

    #[test]
    fn mul_pow2_round_trips_exactly() {
        let a = qd("0.7243124442322315641234");
        assert_eq!(a.mul_pow2(41).mul_pow2(-41), a);
    }

    #[test]
    fn floor_basics() {
        assert_eq!(qd("2.5").floor(), Qd::from_f64(2.0));
        assert_eq!(qd("-2.5").floor(), Qd::from_f64(-3.0));
        assert_eq!(qd("7").floor(), Qd::from_f64(7.0));
    }

    #[test]
    fn floor_sees_below_the_head() {
        // 3 - 1e-30 has head exactly 3.0; floor must still report 2.
        let x = Qd::from_f64(3.0).sub(qd("1e-30"));
        assert_eq!(x.floor(), Qd::from_f64(2.0));
    }

    #[test]
    fn compare_orders_values_with_equal_heads() {
        let a = Qd::from_f64(1.0).add(qd("1e-40"));
        let b = Qd::from_f64(1.0);
        assert_eq!(a.compare(&b), Ordering::Greater);
        assert_eq!(b.compare(&a), Ordering::Less);
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert!(qd("-2") < qd("1e-60"));
    }

    #[test]
    fn canonical_form_nonoverlapping() {
        let vals = [
            qd("0.1"),
            qd("123456789.25"),
            qd("-1.72413124442322315641234"),
            qd("3e-29").add(qd("1e-45")),
            Qd::from_f64(0.5).div(qd("3")),
        ];
        for v in vals {
            for i in 0..3 {
                if v.0[i] != 0.0 && v.0[i + 1] != 0.0 {
                    let ulp = (v.0[i].abs() * 2f64.powi(-52)).max(f64::MIN_POSITIVE);
                    assert!(
                        v.0[i + 1].abs() <= 0.5 * ulp,
                        "component {} overlaps: {:?}",
                        i + 1,
                        v.0
                    );
                }
            }
        }
    }

    #[test]
    fn parse_grammar() {
        assert_eq!(qd("42").to_f64(), 42.0);
        assert_eq!(qd("+42.").to_f64(), 42.0);
        assert_eq!(qd("-0.5").to_f64(), -0.5);
        assert_eq!(qd(".25").to_f64(), 0.25);
        assert_eq!(qd("3e2").to_f64(), 300.0);
        assert_eq!(qd("3E+2").to_f64(), 300.0);
        assert_eq!(qd("25e-1").to_f64(), 2.5);
        assert_eq!(qd("0").to_f64(), 0.0);
        assert_eq!(qd("0.000e5").to_f64(), 0.0);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(Qd::parse(""), Err(QdParseError::Empty)));
        assert!(Qd::parse("abc").is_err());
        assert!(Qd::parse("1.2.3").is_err());
        assert!(Qd::parse("1e").is_err());
        assert!(Qd::parse("--1").is_err());
        assert!(Qd::parse("1e99999999").is_err());
        assert!(matches!(
            Qd::parse("1e500"),
            Err(QdParseError::ExponentOutOfRange)
        ));
    }

    #[test]
    fn parse_captures_digits_beyond_f64() {
        let v = qd("-1.72413124442322315641234");
        let f = Qd::from_f64(-1.724131244423223);
        // The nearest f64 is ~1e-16 away; the parsed value keeps going.
        assert!(v != f);
        assert!(v.sub(f).abs().compare(&qd("1e-15")) == Ordering::Less);
        assert!(v.sub(f).abs().compare(&qd("1e-30")) == Ordering::Greater);
    }

    #[test]
    fn format_fixed_digits() {
        assert_eq!(qd("2.5").format(3), "2.50e0");
        assert_eq!(qd("2.5").format(1), "3e0");
        assert_eq!(qd("-0.0035").format(2), "-3.5e-3");
        assert_eq!(qd("995").format(2), "1.0e3");
        assert_eq!(Qd::ZERO.format(10), "0");
    }

    #[test]
    fn parse_format_round_trip_is_exact() {
        let cases = [
            "3",
            "-0.5",
            "123456789.25",
            "2.5e-30",
            "-1.72413124442322315641234",
            "0.11301",
            "3e-20",
            "1e-60",
            "-0.022281263851276266211766927462",
            "0.69849953917448513434535336656692561",
        ];
        for s in cases {
            let v = qd(s);
            let back = Qd::parse(&v.format_roundtrip()).unwrap();
            assert_eq!(back, v, "round trip failed for {s}: {}", v.format_roundtrip());
            let back40 = Qd::parse(&v.format(40)).unwrap();
            assert_eq!(back40, v, "40-digit round trip failed for {s}");
        }
    }

    #[test]
    fn round_trip_of_dense_tails_stays_within_the_horizon() {
        // A value with a full 212-bit tail (1/3 is non-terminating in both
        // bases): the formatted string cannot encode bits past the decimal
        // horizon, but the re-parse lands within a last-bit neighborhood.
        let v = Qd::ONE.div(qd("3"));
        let back = Qd::parse(&v.format_roundtrip()).unwrap();
        let err = back.sub(v).abs();
        assert!(err.compare(&qd("1e-58")) == Ordering::Less);
    }

    #[test]
    fn buf_ops_bit_identical_to_pure() {
        let a = qd("0.1972");
        let b = qd("-0.5798e-3");
        let mut scratch = [0.0f64; 16];
        buf::store(&mut scratch, 0, a);
        buf::store(&mut scratch, 4, b);

        buf::add(&mut scratch, 8, 0, 4);
        assert_eq!(buf::load(&scratch, 8), a.add(b));
        buf::sub(&mut scratch, 8, 0, 4);
        assert_eq!(buf::load(&scratch, 8), a.sub(b));
        buf::mul(&mut scratch, 8, 0, 4);
        assert_eq!(buf::load(&scratch, 8), a.mul(b));
        buf::square(&mut scratch, 12, 0);
        assert_eq!(buf::load(&scratch, 12), a.square());
        buf::mul_pow2(&mut scratch, 12, 4, 7);
        assert_eq!(buf::load(&scratch, 12), b.mul_pow2(7));
    }

    #[test]
    fn serde_round_trip() {
        let v = qd("-1.72413124442322315641234e-5");
        let json = serde_json::to_string(&v).unwrap();
        let back: Qd = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    mod oracle {
        use super::*;
        use dashu_base::Approximation;
        use dashu_float::{DBig, FBig};

        fn to_fbig(v: Qd) -> FBig {
            let mut acc = FBig::ZERO.with_precision(320).unwrap();
            for c in v.0 {
                if c != 0.0 {
                    acc = acc + FBig::try_from(c).unwrap();
                }
            }
            acc
        }

        fn oracle(s: &str) -> FBig {
            let dbig: DBig = s.parse().unwrap();
            let halfway = match dbig.with_base_and_precision::<2>(320) {
                Approximation::Exact(v) => v,
                Approximation::Inexact(v, _) => v,
            };
            halfway.with_rounding::<dashu_float::round::mode::Zero>()
        }

        fn assert_close(qd_val: Qd, exact: FBig) {
            // All oracle values are of order one, so an absolute bound far
            // below the ~2^-212 representation horizon suffices.
            let diff = to_fbig(qd_val) - exact;
            let bound: FBig = FBig::try_from(2f64.powi(-200)).unwrap();
            assert!(diff.clone() < bound && -diff < bound);
        }

        #[test]
        fn parse_matches_dashu() {
            for s in ["0.1", "-1.72413124442322315641234", "3.25e-29"] {
                assert_close(super::qd(s), oracle(s));
            }
        }

        #[test]
        fn arithmetic_matches_dashu() {
            let a = super::qd("0.1972");
            let b = super::qd("0.5798");
            assert_close(a.add(b), oracle("0.777"));
            assert_close(a.mul(b), oracle("0.11433656"));
            assert_close(a.sub(b), oracle("-0.3826"));
        }
    }
}
