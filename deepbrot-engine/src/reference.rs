//! Reference orbit computation and bookkeeping for perturbation boards.
//!
//! The center-pixel orbit is iterated in quad-double and extended lazily so
//! it stays ahead of the highest reference index any active pixel needs.
//! The escape threshold is generous (default radius 10^5) because the
//! reference must remain valid past any pixel's escape. Snapshots at
//! power-of-two indices feed the near-periodicity query.

use crate::error::EngineError;
use deepbrot_core::{qd, DdComplex, QdComplex, ViewportSpec};
use std::collections::BTreeMap;

/// Default escape radius for the reference orbit (R, not R^2).
pub const DEFAULT_REFERENCE_ESCAPE_RADIUS: f64 = 1e5;

/// Chebyshev threshold for the near-periodicity query on the center orbit.
pub const NEAR_PERIODIC_EPS: f64 = 1e-15;

// Scratch-buffer slots (each quad-double is a 4-wide window).
const Z_RE: usize = 0;
const Z_IM: usize = 4;
const C_RE: usize = 8;
const C_IM: usize = 12;
const A_RE: usize = 16;
const A_IM: usize = 20;
const N_RE: usize = 24;
const N_IM: usize = 28;
const T0: usize = 32;
const T1: usize = 36;
const SCRATCH_LEN: usize = 40;

pub struct ReferenceOrbit {
    c: QdComplex,
    exponent: u32,
    escape_radius_sq: f64,
    points: Vec<QdComplex>,
    escaped_at: Option<u32>,
    checkpoints: BTreeMap<u32, QdComplex>,
    scratch: Vec<f64>,
}

impl ReferenceOrbit {
    pub fn new(c: QdComplex, exponent: u32, escape_radius: f64) -> Self {
        let mut scratch = vec![0.0; SCRATCH_LEN];
        qd::buf::store(&mut scratch, C_RE, c.re);
        qd::buf::store(&mut scratch, C_IM, c.im);
        Self {
            c,
            exponent,
            escape_radius_sq: escape_radius * escape_radius,
            points: vec![QdComplex::ZERO],
            escaped_at: None,
            checkpoints: BTreeMap::new(),
            scratch,
        }
    }

    pub fn for_viewport(spec: &ViewportSpec, escape_radius: f64) -> Self {
        Self::new(spec.center(), spec.exponent, escape_radius)
    }

    pub fn c_ref(&self) -> QdComplex {
        self.c
    }

    pub fn len(&self) -> u32 {
        self.points.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn escaped(&self) -> bool {
        self.escaped_at.is_some()
    }

    pub fn escaped_at(&self) -> Option<u32> {
        self.escaped_at
    }

    /// Ensure the orbit holds at least k+1 points, or stop early once the
    /// reference escapes.
    pub fn extend_until(&mut self, k: u32) {
        while self.escaped_at.is_none() && self.len() <= k {
            self.step();
        }
    }

    /// Z_k in quad-double.
    pub fn orbit_at(&self, k: u32) -> Result<QdComplex, EngineError> {
        self.points
            .get(k as usize)
            .copied()
            .ok_or(EngineError::ReferenceOrbitExhausted(k))
    }

    /// Z_k truncated to double-double for the fast kernels.
    pub fn orbit_dd(&self, k: u32) -> Result<DdComplex, EngineError> {
        self.orbit_at(k).map(|z| z.to_dd())
    }

    /// Every checkpoint index k' < current whose snapshot lies within the
    /// near-periodicity epsilon (max-component norm) of Z_current. A
    /// non-empty result means the center orbit is revisiting a region it
    /// has already traversed.
    pub fn find_near_periodic(&self, current: u32) -> Vec<u32> {
        let Ok(z) = self.orbit_at(current) else {
            return Vec::new();
        };
        self.checkpoints
            .range(..current)
            .filter(|(_, snap)| z.sub(**snap).chebyshev() < NEAR_PERIODIC_EPS)
            .map(|(&k, _)| k)
            .collect()
    }

    /// One extension step: Z_{k+1} = Z_k^n + c, computed in place on the
    /// scratch buffer (bit-identical to the pure quad-double path).
    fn step(&mut self) {
        let buf = &mut self.scratch;
        // acc <- z
        buf.copy_within(Z_RE..Z_RE + 8, A_RE);
        for _ in 1..self.exponent {
            qd::buf::mul(buf, T0, A_RE, Z_RE);
            qd::buf::mul(buf, T1, A_IM, Z_IM);
            qd::buf::sub(buf, N_RE, T0, T1);
            qd::buf::mul(buf, T0, A_RE, Z_IM);
            qd::buf::mul(buf, T1, A_IM, Z_RE);
            qd::buf::add(buf, N_IM, T0, T1);
            buf.copy_within(N_RE..N_RE + 8, A_RE);
        }
        qd::buf::add(buf, Z_RE, A_RE, C_RE);
        qd::buf::add(buf, Z_IM, A_IM, C_IM);

        let z = QdComplex::new(qd::buf::load(buf, Z_RE), qd::buf::load(buf, Z_IM));
        self.points.push(z);
        let k = (self.points.len() - 1) as u32;
        self.save_checkpoint_if(k);

        if z.norm_sq_f64() > self.escape_radius_sq {
            self.escaped_at = Some(k);
            log::debug!("reference orbit escaped at iteration {k}");
        }
    }

    /// Retain Z_k for later comparison when k is a power of two.
    fn save_checkpoint_if(&mut self, k: u32) {
        if k.is_power_of_two() {
            self.checkpoints.insert(k, self.points[k as usize]);
        }
    }

    #[cfg(test)]
    fn checkpoint_indices(&self) -> Vec<u32> {
        self.checkpoints.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepbrot_core::Qd;

    fn orbit_for(re: f64, im: f64, exponent: u32) -> ReferenceOrbit {
        ReferenceOrbit::new(
            QdComplex::from_f64(re, im),
            exponent,
            DEFAULT_REFERENCE_ESCAPE_RADIUS,
        )
    }

    #[test]
    fn starts_at_origin() {
        let orbit = orbit_for(-0.5, 0.1, 2);
        assert_eq!(orbit.orbit_at(0).unwrap(), QdComplex::ZERO);
    }

    #[test]
    fn in_set_orbit_never_escapes() {
        let mut orbit = orbit_for(-0.5, 0.0, 2);
        orbit.extend_until(1000);
        assert!(!orbit.escaped());
        assert_eq!(orbit.len(), 1001);
    }

    #[test]
    fn satisfies_recurrence_bit_for_bit() {
        // The in-place stepping must match the pure quad-double path exactly.
        let c = QdComplex::new(Qd::parse("-0.12").unwrap(), Qd::parse("0.77").unwrap());
        let mut orbit = ReferenceOrbit::new(c, 3, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        orbit.extend_until(50);
        let mut z = QdComplex::ZERO;
        for k in 0..=50u32 {
            assert_eq!(orbit.orbit_at(k).unwrap(), z, "mismatch at {k}");
            z = z.powi(3).add(c);
        }
    }

    #[test]
    fn escapes_past_the_generous_radius() {
        let mut orbit = orbit_for(2.0, 0.0, 2);
        orbit.extend_until(1000);
        // 0, 2, 6, 38, 1446, 2090918: |Z_5|^2 first exceeds 10^10.
        assert_eq!(orbit.escaped_at(), Some(5));
        assert_eq!(orbit.len(), 6);
        assert!(orbit.orbit_at(6).is_err());
        assert!(matches!(
            orbit.orbit_at(100),
            Err(EngineError::ReferenceOrbitExhausted(100))
        ));
    }

    #[test]
    fn checkpoints_at_power_of_two_indices() {
        let mut orbit = orbit_for(-0.5, 0.0, 2);
        orbit.extend_until(70);
        assert_eq!(orbit.checkpoint_indices(), vec![1, 2, 4, 8, 16, 32, 64]);
    }

    #[test]
    fn near_periodic_detects_the_period_two_cycle() {
        // c = -1 cycles 0, -1, 0, -1, ...: every even checkpoint equals Z_32.
        let mut orbit = orbit_for(-1.0, 0.0, 2);
        orbit.extend_until(40);
        let hits = orbit.find_near_periodic(32);
        assert_eq!(hits, vec![2, 4, 8, 16]);
        // An aperiodic-looking point reports nothing.
        let mut misses = orbit_for(-0.5, 0.1, 2);
        misses.extend_until(40);
        assert!(misses.find_near_periodic(33).is_empty());
    }

    #[test]
    fn dd_reads_truncate_the_qd_points() {
        let mut orbit = orbit_for(-0.7454, 0.1130, 2);
        orbit.extend_until(20);
        let q = orbit.orbit_at(17).unwrap();
        let d = orbit.orbit_dd(17).unwrap();
        assert_eq!(d.re.hi, q.re.0[0]);
        assert_eq!(d.re.lo, q.re.0[1]);
    }
}
