//! Direct boards: iterate z <- z^n + c per pixel in the scalar's own
//! precision. Valid while the pixel spacing is representable; deeper views
//! hand over to the perturbation boards.

use super::{is_chaotic_spike, Board, ESCAPE_RADIUS_SQ, MAX_CHAOTIC_ITERATIONS};
use crate::error::EngineError;
use deepbrot_core::{snapshot_due, ChangeRecord, ConvergedPixel, DdComplex, QdComplex, ViewportSpec};

/// Scalar kinds a direct board can iterate in.
pub trait DirectValue: Copy {
    fn from_qdc(c: &QdComplex) -> Self;
    fn zero() -> Self;
    /// z^n + c by repeated complex multiplication.
    fn step(self, c: Self, exponent: u32) -> Self;
    fn norm_sq_f64(self) -> f64;
    /// |re(a) - re(b)| + |im(a) - im(b)| collapsed to f64.
    fn delta_metric(self, o: Self) -> f64;
    fn to_f64_pair(self) -> (f64, f64);
    fn to_qdc(self) -> QdComplex;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct F32Complex {
    pub re: f32,
    pub im: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct F64Complex {
    pub re: f64,
    pub im: f64,
}

impl F64Complex {
    #[inline]
    fn mul(self, o: Self) -> Self {
        Self {
            re: self.re * o.re - self.im * o.im,
            im: self.re * o.im + self.im * o.re,
        }
    }
}

impl DirectValue for F64Complex {
    fn from_qdc(c: &QdComplex) -> Self {
        let (re, im) = c.to_f64_pair();
        Self { re, im }
    }

    fn zero() -> Self {
        Self::default()
    }

    #[inline]
    fn step(self, c: Self, exponent: u32) -> Self {
        let mut acc = self;
        for _ in 1..exponent {
            acc = acc.mul(self);
        }
        Self {
            re: acc.re + c.re,
            im: acc.im + c.im,
        }
    }

    #[inline]
    fn norm_sq_f64(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn delta_metric(self, o: Self) -> f64 {
        (self.re - o.re).abs() + (self.im - o.im).abs()
    }

    fn to_f64_pair(self) -> (f64, f64) {
        (self.re, self.im)
    }

    fn to_qdc(self) -> QdComplex {
        QdComplex::from_f64(self.re, self.im)
    }
}

impl F32Complex {
    #[inline]
    fn mul(self, o: Self) -> Self {
        Self {
            re: self.re * o.re - self.im * o.im,
            im: self.re * o.im + self.im * o.re,
        }
    }
}

impl DirectValue for F32Complex {
    fn from_qdc(c: &QdComplex) -> Self {
        let (re, im) = c.to_f64_pair();
        Self {
            re: re as f32,
            im: im as f32,
        }
    }

    fn zero() -> Self {
        Self::default()
    }

    #[inline]
    fn step(self, c: Self, exponent: u32) -> Self {
        let mut acc = self;
        for _ in 1..exponent {
            acc = acc.mul(self);
        }
        Self {
            re: acc.re + c.re,
            im: acc.im + c.im,
        }
    }

    #[inline]
    fn norm_sq_f64(self) -> f64 {
        (self.re * self.re + self.im * self.im) as f64
    }

    #[inline]
    fn delta_metric(self, o: Self) -> f64 {
        ((self.re - o.re).abs() + (self.im - o.im).abs()) as f64
    }

    fn to_f64_pair(self) -> (f64, f64) {
        (self.re as f64, self.im as f64)
    }

    fn to_qdc(self) -> QdComplex {
        QdComplex::from_f64(self.re as f64, self.im as f64)
    }
}

impl DirectValue for DdComplex {
    fn from_qdc(c: &QdComplex) -> Self {
        c.to_dd()
    }

    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn step(self, c: Self, exponent: u32) -> Self {
        self.powi(exponent).add(c)
    }

    #[inline]
    fn norm_sq_f64(self) -> f64 {
        DdComplex::norm_sq_f64(self)
    }

    #[inline]
    fn delta_metric(self, o: Self) -> f64 {
        self.re.sub(o.re).abs().to_f64() + self.im.sub(o.im).abs().to_f64()
    }

    fn to_f64_pair(self) -> (f64, f64) {
        DdComplex::to_f64_pair(self)
    }

    fn to_qdc(self) -> QdComplex {
        DdComplex::to_qd(self)
    }
}

impl DirectValue for QdComplex {
    fn from_qdc(c: &QdComplex) -> Self {
        *c
    }

    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn step(self, c: Self, exponent: u32) -> Self {
        self.powi(exponent).add(c)
    }

    #[inline]
    fn norm_sq_f64(self) -> f64 {
        QdComplex::norm_sq_f64(self)
    }

    #[inline]
    fn delta_metric(self, o: Self) -> f64 {
        self.re.sub(o.re).abs().to_f64() + self.im.sub(o.im).abs().to_f64()
    }

    fn to_f64_pair(self) -> (f64, f64) {
        QdComplex::to_f64_pair(self)
    }

    fn to_qdc(self) -> QdComplex {
        self
    }
}

/// Direct board over any `DirectValue` scalar. Per-pixel state is laid out
/// as parallel arrays; the active list is compacted as pixels finish.
pub struct DirectBoard<V> {
    exponent: u32,
    max_iter: u32,
    eps1: f64,
    eps2: f64,
    it: u32,
    c: Vec<V>,
    z: Vec<V>,
    checkpoint: Vec<V>,
    checkpoint_iter: Vec<u32>,
    period: Vec<u32>,
    result: Vec<i32>,
    chaotic: Vec<bool>,
    active: Vec<u32>,
    chaotic_active: u32,
}

pub type DirectF32Board = DirectBoard<F32Complex>;
pub type DirectF64Board = DirectBoard<F64Complex>;
pub type DirectDdBoard = DirectBoard<DdComplex>;
pub type DirectQdBoard = DirectBoard<QdComplex>;

impl<V: DirectValue> DirectBoard<V> {
    pub fn new(spec: &ViewportSpec) -> Self {
        let n = spec.pixel_count();
        let mut c = Vec::with_capacity(n as usize);
        let mut chaotic = Vec::with_capacity(n as usize);
        let mut chaotic_active = 0;
        for i in 0..n {
            let cq = spec.pixel_c(i);
            let flag = is_chaotic_spike(&cq, spec.exponent);
            if flag {
                chaotic_active += 1;
            }
            chaotic.push(flag);
            c.push(V::from_qdc(&cq));
        }
        Self {
            exponent: spec.exponent,
            max_iter: spec.max_iter,
            eps1: spec.periodicity_eps_1,
            eps2: spec.periodicity_eps_2,
            it: 0,
            c,
            z: vec![V::zero(); n as usize],
            checkpoint: vec![V::zero(); n as usize],
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

    fn pixel_cap(&self, idx: usize) -> u32 {
        if self.chaotic[idx] {
            self.max_iter.min(MAX_CHAOTIC_ITERATIONS)
        } else {
            self.max_iter
        }
    }
}

impl<V: DirectValue> Board for DirectBoard<V> {
    fn iterate_batch(&mut self, iterations: u32) -> Result<ChangeRecord, EngineError> {
        let mut rec = ChangeRecord::new(self.it);
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
                let z = self.z[idx].step(self.c[idx], self.exponent);
                self.z[idx] = z;

                let mut finished = false;
                if z.norm_sq_f64() > ESCAPE_RADIUS_SQ {
                    self.result[idx] = it as i32;
                    rec.escaped.push(idx as u32);
                    finished = true;
                } else {
                    let d = z.delta_metric(self.checkpoint[idx]);
                    let mut converged = d <= self.eps1;
                    if !converged {
                        if d <= self.eps2 && self.period[idx] == 0 {
                            self.period[idx] = it - self.checkpoint_iter[idx];
                        }
                        converged = it >= self.pixel_cap(idx);
                    }
                    if converged {
                        if self.period[idx] == 0 && d <= self.eps2 {
                            self.period[idx] = it - self.checkpoint_iter[idx];
                        }
                        self.result[idx] = -(it as i32);
                        let zq = z.to_qdc();
                        rec.converged.push(ConvergedPixel {
                            index: idx as u32,
                            z_re: zq.re,
                            z_im: zq.im,
                            period: self.period[idx],
                        });
                        finished = true;
                    } else if snapshot {
                        self.checkpoint[idx] = z;
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
        self.z[index as usize].to_f64_pair()
    }

    fn current_c(&self, index: u32) -> (f64, f64) {
        self.c[index as usize].to_f64_pair()
    }

    fn current_period(&self, index: u32) -> u32 {
        self.period[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_pixel(re: f64, im: f64, max_iter: u32) -> ViewportSpec {
        ViewportSpec::from_f64(1, 1, re, im, 1e-6, 2, max_iter)
    }

    fn run<V: DirectValue>(board: &mut DirectBoard<V>, batches: u32) -> Vec<ChangeRecord> {
        let mut recs = Vec::new();
        for _ in 0..batches {
            let r = board.iterate_batch(100).unwrap();
            if !r.is_empty() {
                recs.push(r);
            }
            if board.remaining_active() == 0 {
                break;
            }
        }
        recs
    }

    #[test]
    fn origin_converges_at_first_checkpoint() {
        let spec = single_pixel(0.0, 0.0, 1000);
        let mut board = DirectF64Board::new(&spec);
        let recs = run(&mut board, 10);
        assert_eq!(board.remaining_active(), 0);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].converged.len(), 1);
        assert!(board.result(0) < 0);
        // The orbit never left the origin.
        assert_eq!(recs[0].converged[0].z_re.to_f64(), 0.0);
    }

    #[test]
    fn c_two_escapes_at_iteration_two() {
        // z1 = 2 (|z|^2 = 4, still inside), z2 = 6 escapes.
        let spec = single_pixel(2.0, 0.0, 1000);
        let mut board = DirectF64Board::new(&spec);
        run(&mut board, 10);
        assert_eq!(board.result(0), 2);
    }

    #[test]
    fn half_plus_half_i_escapes_quickly() {
        let spec = single_pixel(0.5, 0.5, 1000);
        let mut board = DirectF64Board::new(&spec);
        run(&mut board, 10);
        let r = board.result(0);
        assert!(r > 0 && r <= 20, "expected escape within 20, got {r}");
    }

    #[test]
    fn period_two_bulb_detects_period_near_two() {
        let spec = single_pixel(-1.0, 0.0, 10_000);
        let mut board = DirectF64Board::new(&spec);
        let recs = run(&mut board, 200);
        assert_eq!(board.remaining_active(), 0);
        let conv = &recs.last().unwrap().converged[0];
        assert!(board.result(0) < 0);
        assert_eq!(conv.period, 2);
    }

    #[test]
    fn chaotic_spike_finishes_only_by_cap() {
        let spec = single_pixel(-1.6, 0.0, 700).with_epsilons(1e-14, 1e-12);
        let mut board = DirectF64Board::new(&spec);
        assert_eq!(board.chaotic_spike_count(), 1);
        let recs = run(&mut board, 100);
        assert_eq!(board.remaining_active(), 0);
        assert_eq!(board.chaotic_spike_count(), 0);
        assert_eq!(board.result(0), -700);
        assert_eq!(recs.last().unwrap().converged.len(), 1);
    }

    #[test]
    fn ten_by_ten_accounting_stays_total() {
        let spec = ViewportSpec::from_f64(10, 10, -0.5, 0.0, 3.0, 2, 300);
        let n = spec.pixel_count();
        let mut board = DirectF64Board::new(&spec);
        let mut escaped = 0u32;
        let mut converged = 0u32;
        loop {
            let rec = board.iterate_batch(7).unwrap();
            escaped += rec.escaped.len() as u32;
            converged += rec.converged.len() as u32;
            assert_eq!(board.remaining_active() + escaped + converged, n);
            if board.remaining_active() == 0 {
                break;
            }
        }
        // A 3-unit view of the set has both fates represented.
        assert!(escaped > 0 && converged > 0);
    }

    #[test]
    fn dd_and_f64_agree_at_shallow_zoom() {
        let spec = ViewportSpec::from_f64(16, 16, -0.6, 0.2, 2.5, 2, 400);
        let mut a = DirectF64Board::new(&spec);
        let mut b = DirectDdBoard::new(&spec);
        run(&mut a, 1000);
        run(&mut b, 1000);
        let mut agree = 0;
        for i in 0..spec.pixel_count() {
            let (ra, rb) = (a.result(i), b.result(i));
            if (ra - rb).abs() <= 1 {
                agree += 1;
            }
        }
        assert!(
            agree as f64 >= 0.99 * spec.pixel_count() as f64,
            "only {agree} of {} pixels agree",
            spec.pixel_count()
        );
    }

    #[test]
    fn cubic_multibrot_iterates_z_cubed() {
        // c = 1 under z^3 + c: 0, 1, 2, 10 -> |z|^2 = 4 at z=2 is not an
        // escape, z=10 is. Escape at iteration 3.
        let spec = ViewportSpec::from_f64(1, 1, 1.0, 0.0, 1e-6, 3, 100);
        let mut board = DirectF64Board::new(&spec);
        run(&mut board, 10);
        assert_eq!(board.result(0), 3);
    }
}
