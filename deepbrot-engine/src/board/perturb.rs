//! Perturbation boards: each pixel tracks a small delta against the shared
//! reference orbit instead of its own full-precision z.
//!
//! The kernel follows the Zhuoran rebasing formulation: when the total z
//! shrinks toward the delta's own magnitude (the reference passed near
//! zero), the pixel restarts at reference index 0 carrying its total z as
//! the new delta, which keeps the linearization valid indefinitely.

use super::{is_chaotic_spike, Board, ESCAPE_RADIUS_SQ, MAX_CHAOTIC_ITERATIONS};
use crate::error::EngineError;
use crate::reference::ReferenceOrbit;
use deepbrot_core::{snapshot_due, ChangeRecord, ConvergedPixel, DdComplex, QdComplex, ViewportSpec};

/// Delta formats a perturbation board can carry.
pub trait DeltaValue: Copy {
    fn zero() -> Self;
    fn from_qdc(v: &QdComplex) -> Self;
    fn to_qdc(&self) -> QdComplex;
    fn add(&self, o: &Self) -> Self;
    fn mul(&self, o: &Self) -> Self;
    fn powi(&self, n: u32) -> Self;
    fn scale_f64(&self, k: f64) -> Self;
    fn norm_sq_f64(&self) -> f64;
    fn chebyshev(&self) -> f64;
    fn delta_metric(&self, o: &Self) -> f64;
    fn to_f64_pair(&self) -> (f64, f64);
}

impl DeltaValue for DdComplex {
    fn zero() -> Self {
        Self::ZERO
    }

    fn from_qdc(v: &QdComplex) -> Self {
        v.to_dd()
    }

    fn to_qdc(&self) -> QdComplex {
        DdComplex::to_qd(*self)
    }

    #[inline]
    fn add(&self, o: &Self) -> Self {
        DdComplex::add(*self, *o)
    }

    #[inline]
    fn mul(&self, o: &Self) -> Self {
        DdComplex::mul(*self, *o)
    }

    #[inline]
    fn powi(&self, n: u32) -> Self {
        DdComplex::powi(*self, n)
    }

    #[inline]
    fn scale_f64(&self, k: f64) -> Self {
        DdComplex::scale(*self, k)
    }

    #[inline]
    fn norm_sq_f64(&self) -> f64 {
        DdComplex::norm_sq_f64(*self)
    }

    #[inline]
    fn chebyshev(&self) -> f64 {
        DdComplex::chebyshev(*self)
    }

    #[inline]
    fn delta_metric(&self, o: &Self) -> f64 {
        self.re.sub(o.re).abs().to_f64() + self.im.sub(o.im).abs().to_f64()
    }

    fn to_f64_pair(&self) -> (f64, f64) {
        DdComplex::to_f64_pair(*self)
    }
}

impl DeltaValue for QdComplex {
    fn zero() -> Self {
        Self::ZERO
    }

    fn from_qdc(v: &QdComplex) -> Self {
        *v
    }

    fn to_qdc(&self) -> QdComplex {
        *self
    }

    #[inline]
    fn add(&self, o: &Self) -> Self {
        QdComplex::add(*self, *o)
    }

    #[inline]
    fn mul(&self, o: &Self) -> Self {
        QdComplex::mul(*self, *o)
    }

    #[inline]
    fn powi(&self, n: u32) -> Self {
        QdComplex::powi(*self, n)
    }

    #[inline]
    fn scale_f64(&self, k: f64) -> Self {
        QdComplex::scale(*self, k)
    }

    #[inline]
    fn norm_sq_f64(&self) -> f64 {
        QdComplex::norm_sq_f64(*self)
    }

    #[inline]
    fn chebyshev(&self) -> f64 {
        QdComplex::chebyshev(*self)
    }

    #[inline]
    fn delta_metric(&self, o: &Self) -> f64 {
        self.re.sub(o.re).abs().to_f64() + self.im.sub(o.im).abs().to_f64()
    }

    fn to_f64_pair(&self) -> (f64, f64) {
        QdComplex::to_f64_pair(*self)
    }
}

/// delta' = sum_{k=1..n} C(n,k) Z^(n-k) delta^k + dc, the full binomial
/// expansion of (Z + delta)^n - Z^n + dc.
fn delta_step<D: DeltaValue>(z: &D, delta: &D, dc: &D, exponent: u32, binom: &[f64]) -> D {
    let mut acc = D::zero();
    let mut dpow = *delta;
    for k in 1..=exponent {
        let term = if k < exponent {
            z.powi(exponent - k)
                .mul(&dpow)
                .scale_f64(binom[k as usize])
        } else {
            dpow
        };
        acc = acc.add(&term);
        if k < exponent {
            dpow = dpow.mul(delta);
        }
    }
    acc.add(dc)
}

fn binomials(n: u32) -> Vec<f64> {
    let mut row = vec![1.0f64];
    for k in 1..=n as usize {
        let prev = row[k - 1];
        row.push(prev * (n as usize - k + 1) as f64 / k as f64);
    }
    row
}

pub struct PerturbBoard<D> {
    orbit: ReferenceOrbit,
    exponent: u32,
    max_iter: u32,
    eps1: f64,
    eps2: f64,
    binom: Vec<f64>,
    it: u32,
    dc: Vec<D>,
    delta: Vec<D>,
    ref_iter: Vec<u32>,
    checkpoint: Vec<D>,
    has_checkpoint: Vec<bool>,
    checkpoint_iter: Vec<u32>,
    period: Vec<u32>,
    result: Vec<i32>,
    chaotic: Vec<bool>,
    active: Vec<u32>,
    chaotic_active: u32,
}

pub type PerturbDdBoard = PerturbBoard<DdComplex>;
pub type PerturbQdBoard = PerturbBoard<QdComplex>;

impl<D: DeltaValue> PerturbBoard<D> {
    pub fn new(spec: &ViewportSpec, reference_escape_radius: f64) -> Self {
        let n = spec.pixel_count();
        let orbit = ReferenceOrbit::for_viewport(spec, reference_escape_radius);
        let mut dc = Vec::with_capacity(n as usize);
        let mut chaotic = Vec::with_capacity(n as usize);
        let mut chaotic_active = 0;
        for i in 0..n {
            let cq = spec.pixel_c(i);
            let flag = is_chaotic_spike(&cq, spec.exponent);
            if flag {
                chaotic_active += 1;
            }
            chaotic.push(flag);
            dc.push(D::from_qdc(&spec.pixel_dc(i)));
        }
        Self {
            orbit,
            exponent: spec.exponent,
            max_iter: spec.max_iter,
            eps1: spec.periodicity_eps_1,
            eps2: spec.periodicity_eps_2,
            binom: binomials(spec.exponent),
            it: 0,
            dc,
            delta: vec![D::zero(); n as usize],
            ref_iter: vec![0; n as usize],
            checkpoint: vec![D::zero(); n as usize],
            has_checkpoint: vec![false; n as usize],
            checkpoint_iter: vec![0; n as usize],
            period: vec![0; n as usize],
            result: vec![0; n as usize],
            chaotic,
            active: (0..n).collect(),
            chaotic_active,
        }
    }

    pub fn result(&self, index: u32) -> i32 {
        self.result[index as usize]
    }

    pub fn reference(&self) -> &ReferenceOrbit {
        &self.orbit
    }

    /// Reference index the pixel currently follows.
    pub fn ref_iteration(&self, index: u32) -> u32 {
        self.ref_iter[index as usize]
    }

    fn pixel_cap(&self, idx: usize) -> u32 {
        if self.chaotic[idx] {
            self.max_iter.min(MAX_CHAOTIC_ITERATIONS)
        } else {
            self.max_iter
        }
    }
}

impl<D: DeltaValue> Board for PerturbBoard<D> {
    fn iterate_batch(&mut self, iterations: u32) -> Result<ChangeRecord, EngineError> {
        let mut rec = ChangeRecord::new(self.it);
        // Stay ahead of the deepest reference index any pixel can reach
        // this batch (ref_iter never exceeds the pixel iteration count).
        self.orbit.extend_until(self.it + iterations + 1);

        for _ in 0..iterations {
            if self.active.is_empty() {
                break;
            }
            self.it += 1;
            let it = self.it;
            let snapshot = snapshot_due(it);
            let mut i = 0;
            while i < self.active.len() {
                let idx = self.active[i] as usize;
                let mut m = self.ref_iter[idx];

                // Reference ended (escaped) before this pixel's index: fold
                // the total z into the delta and restart at Z_0 = 0.
                if m + 1 >= self.orbit.len() {
                    if m < self.orbit.len() {
                        let z_m = D::from_qdc(&self.orbit.orbit_at(m)?);
                        self.delta[idx] = z_m.add(&self.delta[idx]);
                        self.ref_iter[idx] = 0;
                        m = 0;
                    } else {
                        // Both the read and the rebase are impossible; give
                        // the pixel up as escaped rather than wedging.
                        log::warn!(
                            "pixel {idx} exhausted reference orbit at index {m}; marking escaped"
                        );
                        self.result[idx] = it as i32;
                        rec.escaped.push(idx as u32);
                        if self.chaotic[idx] {
                            self.chaotic_active -= 1;
                        }
                        self.active.swap_remove(i);
                        continue;
                    }
                }

                let z_m = D::from_qdc(&self.orbit.orbit_at(m)?);
                let d_new = delta_step(&z_m, &self.delta[idx], &self.dc[idx], self.exponent, &self.binom);
                let z_next = D::from_qdc(&self.orbit.orbit_at(m + 1)?).add(&d_new);

                let mut finished = false;
                if z_next.norm_sq_f64() > ESCAPE_RADIUS_SQ {
                    self.result[idx] = it as i32;
                    rec.escaped.push(idx as u32);
                    finished = true;
                } else {
                    // Rebase when the total z is no longer large compared
                    // to the delta (max-component norm).
                    if z_next.chebyshev() < 2.0 * d_new.chebyshev() {
                        self.delta[idx] = z_next;
                        self.ref_iter[idx] = 0;
                    } else {
                        self.delta[idx] = d_new;
                        self.ref_iter[idx] = m + 1;
                    }

                    // Convergence compares the total z, which is continuous
                    // across rebases, so the checkpoint survives them.
                    let mut converged = false;
                    if self.has_checkpoint[idx] {
                        let d = z_next.delta_metric(&self.checkpoint[idx]);
                        converged = d <= self.eps1;
                        if !converged && d <= self.eps2 && self.period[idx] == 0 {
                            self.period[idx] = it - self.checkpoint_iter[idx];
                        }
                        if converged && self.period[idx] == 0 {
                            self.period[idx] = it - self.checkpoint_iter[idx];
                        }
                    }
                    if !converged && it >= self.pixel_cap(idx) {
                        converged = true;
                    }
                    if converged {
                        self.result[idx] = -(it as i32);
                        let zq = z_next.to_qdc();
                        rec.converged.push(ConvergedPixel {
                            index: idx as u32,
                            z_re: zq.re,
                            z_im: zq.im,
                            period: self.period[idx],
                        });
                        finished = true;
                    } else if snapshot {
                        self.checkpoint[idx] = z_next;
                        self.has_checkpoint[idx] = true;
                        self.checkpoint_iter[idx] = it;
                        self.period[idx] = 0;
                    }
                }

                if finished {
                    if self.chaotic[idx] {
                        self.chaotic_active -= 1;
                    }
                    self.active.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }
        rec.iter = self.it;
        Ok(rec)
    }

    fn remaining_active(&self) -> u32 {
        self.active.len() as u32
    }

    fn chaotic_spike_count(&self) -> u32 {
        self.chaotic_active
    }

    fn iteration(&self) -> u32 {
        self.it
    }

    fn current_z(&self, index: u32) -> (f64, f64) {
        let idx = index as usize;
        match self.orbit.orbit_at(self.ref_iter[idx]) {
            Ok(z) => D::from_qdc(&z).add(&self.delta[idx]).to_f64_pair(),
            Err(_) => self.delta[idx].to_f64_pair(),
        }
    }

    fn current_c(&self, index: u32) -> (f64, f64) {
        self.orbit
            .c_ref()
            .add(self.dc[index as usize].to_qdc())
            .to_f64_pair()
    }

    fn current_period(&self, index: u32) -> u32 {
        self.period[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::direct::DirectF64Board;
    use crate::reference::DEFAULT_REFERENCE_ESCAPE_RADIUS;
    use deepbrot_core::ViewportSpec;

    fn run(board: &mut dyn Board, max_batches: u32) {
        for _ in 0..max_batches {
            board.iterate_batch(100).unwrap();
            if board.remaining_active() == 0 {
                break;
            }
        }
    }

    #[test]
    fn binomial_rows() {
        assert_eq!(binomials(2), vec![1.0, 2.0, 1.0]);
        assert_eq!(binomials(3), vec![1.0, 3.0, 3.0, 1.0]);
        assert_eq!(binomials(5), vec![1.0, 5.0, 10.0, 10.0, 5.0, 1.0]);
    }

    #[test]
    fn matches_direct_board_at_shallow_zoom() {
        let spec = ViewportSpec::from_f64(16, 16, -0.6, 0.2, 2.5, 2, 400);
        let mut direct = DirectF64Board::new(&spec);
        let mut pert = PerturbDdBoard::new(&spec, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        run(&mut direct, 1000);
        run(&mut pert, 1000);
        let n = spec.pixel_count();
        let mut agree = 0;
        for i in 0..n {
            let (a, b) = (direct.result(i), pert.result(i));
            if (a - b).abs() <= 1 {
                agree += 1;
            }
        }
        assert!(
            agree as f64 >= 0.99 * n as f64,
            "only {agree} of {n} pixels agree"
        );
    }

    #[test]
    fn escaped_reference_still_resolves_pixels() {
        // Center far outside the set: the reference escapes almost at once,
        // and every pixel must rebase its way to a correct escape count.
        let spec = ViewportSpec::from_f64(8, 8, 2.0, 0.0, 0.5, 2, 200);
        let mut pert = PerturbDdBoard::new(&spec, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        run(&mut pert, 100);
        assert_eq!(pert.remaining_active(), 0);
        let mut direct = DirectF64Board::new(&spec);
        run(&mut direct, 100);
        for i in 0..spec.pixel_count() {
            assert!(
                (pert.result(i) - direct.result(i)).abs() <= 1,
                "pixel {i}: pert={} direct={}",
                pert.result(i),
                direct.result(i)
            );
        }
    }

    #[test]
    fn center_pixel_follows_the_reference_exactly() {
        // Odd dimensions put a pixel exactly on the center: its delta stays
        // zero until rebase or escape.
        let spec = ViewportSpec::from_f64(3, 3, -1.0, 0.0, 1e-4, 2, 2000);
        let mut pert = PerturbDdBoard::new(&spec, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        run(&mut pert, 100);
        // c = -1 is the period-2 bulb center; the middle pixel converges
        // with period 2.
        let mid = 4;
        assert!(pert.result(mid) < 0);
        assert_eq!(pert.current_period(mid), 2);
    }

    #[test]
    fn deep_zoom_perturbation_agrees_with_dd_direct() {
        // At zoom ~1e13 a plain f64 board has no pixel resolution left;
        // double-double direct iteration still resolves the grid and serves
        // as the oracle for the perturbation kernel.
        let spec = ViewportSpec::from_strings(
            8,
            8,
            "-0.743643887037158704752191506114774",
            "0.131825904205311970493132056385139",
            "3e-13",
            2,
            2000,
        )
        .unwrap();
        let mut dd_direct = crate::board::direct::DirectDdBoard::new(&spec);
        let mut pert = PerturbDdBoard::new(&spec, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        run(&mut dd_direct, 1000);
        run(&mut pert, 1000);
        let n = spec.pixel_count();
        let mut agree = 0;
        for i in 0..n {
            if (dd_direct.result(i) - pert.result(i)).abs() <= 1 {
                agree += 1;
            }
        }
        assert!(
            agree as f64 >= 0.95 * n as f64,
            "only {agree} of {n} deep pixels agree"
        );
    }

    #[test]
    fn qd_delta_board_matches_dd_delta_board() {
        let spec = ViewportSpec::from_f64(8, 8, -0.6, 0.2, 2.0, 2, 300);
        let mut dd = PerturbDdBoard::new(&spec, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        let mut qd = PerturbQdBoard::new(&spec, DEFAULT_REFERENCE_ESCAPE_RADIUS);
        run(&mut dd, 100);
        run(&mut qd, 100);
        for i in 0..spec.pixel_count() {
            assert!((dd.result(i) - qd.result(i)).abs() <= 1);
        }
    }
}
