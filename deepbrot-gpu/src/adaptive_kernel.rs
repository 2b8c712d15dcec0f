//! Reference implementation of the adaptive per-pixel-scale perturbation
//! kernel. The WGSL shader in `shaders.rs` mirrors this code statement for
//! statement; tests validate the algorithm here so kernel behavior is
//! covered even on machines with no adapter.
//!
//! Each pixel stores its delta as `delta * 2^scale` with the mantissa kept
//! in [0.5, 2), which lets an f32 kernel track deltas down to pixel
//! spacings around 10^-60 where a plain f32 would underflow.

use crate::error::GpuError;
use deepbrot_core::{snapshot_due, ChangeRecord, ConvergedPixel, Qd, ViewportSpec};
use deepbrot_engine::{
    is_chaotic_spike, Board, EngineError, ReferenceOrbit, MAX_CHAOTIC_ITERATIONS,
};

/// Rebase floor: below this total-z magnitude, squaring would drive the
/// pixel into f32 subnormals, so it continues on the reference instead.
/// Tightening it leaves a catastrophic-divergence pattern near late
/// iterations for some deep-zoom centers.
pub const REBASE_MIN_Z: f32 = 1e-13;

/// Checkpoint comparisons only happen while `scale <= initial_scale +
/// CONVERGENCE_SCALE_WINDOW`; beyond that the stored deltas are not
/// comparable across iterations.
pub const CONVERGENCE_SCALE_WINDOW: i32 = 10;

#[derive(Clone, Copy, Debug)]
pub struct KernelParams {
    pub exponent: u32,
    pub initial_scale: i32,
    /// Epsilons in stored units (actual epsilon / 2^initial_scale).
    pub eps1_stored: f32,
    pub eps2_stored: f32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AdaptivePixel {
    /// Stored delta mantissa; actual delta = delta * 2^scale.
    pub delta: [f32; 2],
    pub scale: i32,
    /// Stored dc; actual dc = dc * 2^initial_scale.
    pub dc: [f32; 2],
    pub checkpoint: [f32; 2],
    pub checkpoint_scale: i32,
    pub has_checkpoint: bool,
    pub checkpoint_iter: u32,
    pub period: u32,
    pub ref_iter: u32,
    /// 0 active, +it escaped, -it convergent.
    pub nn: i32,
    /// Total z at the finishing iteration (escape or convergence).
    pub final_z: [f32; 2],
}

#[inline]
fn cadd(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] + b[0], a[1] + b[1]]
}

#[inline]
fn cmul(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] * b[0] - a[1] * b[1], a[0] * b[1] + a[1] * b[0]]
}

#[inline]
fn cscale(a: [f32; 2], k: f32) -> [f32; 2] {
    [a[0] * k, a[1] * k]
}

#[inline]
fn cldexp(a: [f32; 2], e: i32) -> [f32; 2] {
    [libm::ldexpf(a[0], e), libm::ldexpf(a[1], e)]
}

#[inline]
fn cheb(a: [f32; 2]) -> f32 {
    a[0].abs().max(a[1].abs())
}

#[inline]
fn norm_sq(a: [f32; 2]) -> f32 {
    a[0] * a[0] + a[1] * a[1]
}

/// floor(log2 |x|) for normal positive x.
#[inline]
fn exponent_of(x: f32) -> i32 {
    libm::frexpf(x).1 - 1
}

/// Renormalize an actual-valued complex into (stored, scale) form with the
/// mantissa in [0.5, 2). The scale never drops below `floor_scale`.
pub fn to_scaled(z: [f32; 2], floor_scale: i32) -> ([f32; 2], i32) {
    let a = cheb(z);
    if a == 0.0 {
        return ([0.0, 0.0], floor_scale);
    }
    let e = exponent_of(a).max(floor_scale);
    (cldexp(z, -e), e)
}

/// Keep the stored mantissa in [0.5, 2), adjusting the exponent to match.
/// The downscale branch stops at `initial_scale` so the dc term stays
/// representable.
pub fn rescale(delta: &mut [f32; 2], scale: &mut i32, initial_scale: i32) {
    let mut a = cheb(*delta);
    while a >= 2.0 {
        *delta = cscale(*delta, 0.5);
        *scale += 1;
        a = cheb(*delta);
    }
    while a != 0.0 && a < 0.5 && *scale > initial_scale {
        *delta = cscale(*delta, 2.0);
        *scale -= 1;
        a = cheb(*delta);
    }
}

/// One scaled delta iteration: delta' stored at the returned scale equals
/// sum_{k=1..n} C(n,k) Z^(n-k) delta^k + dc in actual units, evaluated in
/// Horner form so term k carries its 2^((k-1)*scale) factor implicitly.
/// The all-delta term may underflow at depth and vanish harmlessly.
fn scaled_delta_step(
    zm: [f32; 2],
    delta: [f32; 2],
    scale: i32,
    dc: [f32; 2],
    p: &KernelParams,
) -> [f32; 2] {
    let n = p.exponent;
    let w = cldexp(delta, scale);
    let mut acc = [1.0f32, 0.0]; // C(n,n)
    let mut coeff = 1.0f32;
    let mut zpow = [1.0f32, 0.0];
    for k in (1..n).rev() {
        zpow = cmul(zpow, zm); // Z^(n-k)
        coeff = coeff * (k + 1) as f32 / (n - k) as f32; // C(n,k)
        acc = cadd(cmul(acc, w), cscale(zpow, coeff));
    }
    let dc_term = cldexp(dc, p.initial_scale - scale);
    cadd(cmul(delta, acc), dc_term)
}

/// Advance one pixel by one iteration against the f32 reference orbit.
/// Sets `nn` (and `final_z`) when the pixel finishes.
pub fn step_pixel(
    px: &mut AdaptivePixel,
    orbit: &[[f32; 2]],
    orbit_escaped: bool,
    it: u32,
    cap: u32,
    p: &KernelParams,
) {
    let mut m = px.ref_iter as usize;

    if m + 1 >= orbit.len() {
        if orbit_escaped && m < orbit.len() {
            // Reference ended: fold the total z into the delta and restart.
            let z = cadd(orbit[m], cldexp(px.delta, px.scale));
            let (d, s) = to_scaled(z, p.initial_scale);
            px.delta = d;
            px.scale = s;
            px.ref_iter = 0;
            m = 0;
        } else {
            log::warn!("pixel exhausted reference orbit at index {m}; marking escaped");
            px.nn = it as i32;
            px.final_z = cldexp(px.delta, px.scale);
            return;
        }
    }

    let zm = orbit[m];
    let mut dn = scaled_delta_step(zm, px.delta, px.scale, px.dc, p);
    let mut s_new = px.scale;
    rescale(&mut dn, &mut s_new, p.initial_scale);

    let d_actual = cldexp(dn, s_new);
    let z_next = cadd(orbit[m + 1], d_actual);

    if norm_sq(z_next) > 4.0 {
        px.nn = it as i32;
        px.final_z = z_next;
        return;
    }

    let zc = cheb(z_next);
    if zc > REBASE_MIN_Z && zc < 2.0 * cheb(d_actual) {
        let (d, s) = to_scaled(z_next, p.initial_scale);
        px.delta = d;
        px.scale = s;
        px.ref_iter = 0;
    } else {
        px.delta = dn;
        px.scale = s_new;
        px.ref_iter = (m + 1) as u32;
    }

    // Periodicity checkpointing on the stored delta, inside the comparable
    // scale window only.
    if px.scale <= p.initial_scale + CONVERGENCE_SCALE_WINDOW {
        if px.has_checkpoint
            && px.checkpoint_scale <= p.initial_scale + CONVERGENCE_SCALE_WINDOW
        {
            let common = px.scale.max(px.checkpoint_scale);
            let a = cldexp(px.delta, px.scale - common);
            let b = cldexp(px.checkpoint, px.checkpoint_scale - common);
            let d = (a[0] - b[0]).abs() + (a[1] - b[1]).abs();
            let eps1 = libm::ldexpf(p.eps1_stored, p.initial_scale - common);
            let eps2 = libm::ldexpf(p.eps2_stored, p.initial_scale - common);
            if d <= eps1 {
                if px.period == 0 {
                    px.period = it - px.checkpoint_iter;
                }
                px.nn = -(it as i32);
                px.final_z = z_next;
                return;
            }
            if d <= eps2 && px.period == 0 {
                px.period = it - px.checkpoint_iter;
            }
        }
        if snapshot_due(it) {
            px.checkpoint = px.delta;
            px.checkpoint_scale = px.scale;
            px.has_checkpoint = true;
            px.checkpoint_iter = it;
            px.period = 0;
        }
    }

    if it >= cap {
        px.nn = -(it as i32);
        px.final_z = z_next;
    }
}

/// CPU board running the adaptive kernel pixel-for-pixel. This is both the
/// shader's reference implementation and the oracle the GPU comparison
/// tests diff against.
pub struct AdaptiveReferenceBoard {
    params: KernelParams,
    max_iter: u32,
    orbit: ReferenceOrbit,
    orbit_f32: Vec<[f32; 2]>,
    pixels: Vec<AdaptivePixel>,
    caps: Vec<u32>,
    chaotic: Vec<bool>,
    active: Vec<u32>,
    chaotic_active: u32,
    it: u32,
    c_center: (f64, f64),
    spacing: f64,
}

impl AdaptiveReferenceBoard {
    pub fn new(spec: &ViewportSpec, reference_escape_radius: f64) -> Result<Self, GpuError> {
        let n = spec.pixel_count();
        let initial_scale = spec.spacing_exponent();
        // Epsilons in stored units: the spacing mantissa is in [1, 2).
        let eps2_stored = spec.pixel_spacing().mul_pow2(-initial_scale).to_f64() as f32;
        let params = KernelParams {
            exponent: spec.exponent,
            initial_scale,
            eps1_stored: eps2_stored * 1e-3,
            eps2_stored,
        };
        let orbit = ReferenceOrbit::for_viewport(spec, reference_escape_radius);

        let mut pixels = Vec::with_capacity(n as usize);
        let mut caps = Vec::with_capacity(n as usize);
        let mut chaotic = Vec::with_capacity(n as usize);
        let mut chaotic_active = 0;
        for i in 0..n {
            let dc = spec.pixel_dc(i);
            let dc_stored = [
                dc.re.mul_pow2(-initial_scale).to_f64() as f32,
                dc.im.mul_pow2(-initial_scale).to_f64() as f32,
            ];
            let c = spec.pixel_c(i);
            let flag = is_chaotic_spike(&c, spec.exponent);
            if flag {
                chaotic_active += 1;
            }
            chaotic.push(flag);
            caps.push(if flag {
                spec.max_iter.min(MAX_CHAOTIC_ITERATIONS)
            } else {
                spec.max_iter
            });
            pixels.push(AdaptivePixel {
                scale: initial_scale,
                dc: dc_stored,
                checkpoint_scale: initial_scale,
                ..AdaptivePixel::default()
            });
        }
        Ok(Self {
            params,
            max_iter: spec.max_iter,
            orbit,
            orbit_f32: Vec::new(),
            pixels,
            caps,
            chaotic,
            active: (0..n).collect(),
            chaotic_active,
            it: 0,
            c_center: spec.center().to_f64_pair(),
            spacing: spec.pixel_spacing().to_f64(),
        })
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn pixel(&self, index: u32) -> &AdaptivePixel {
        &self.pixels[index as usize]
    }

    pub fn result(&self, index: u32) -> i32 {
        self.pixels[index as usize].nn
    }

    fn sync_orbit(&mut self, needed: u32) {
        self.orbit.extend_until(needed);
        while (self.orbit_f32.len() as u32) < self.orbit.len() {
            let k = self.orbit_f32.len() as u32;
            let (re, im) = self.orbit.orbit_at(k).expect("extended above").to_f64_pair();
            self.orbit_f32.push([re as f32, im as f32]);
        }
    }
}

impl Board for AdaptiveReferenceBoard {
    fn iterate_batch(&mut self, iterations: u32) -> Result<ChangeRecord, EngineError> {
        let mut rec = ChangeRecord::new(self.it);
        let needed = (self.it + iterations).min(self.max_iter) + 1;
        self.sync_orbit(needed);
        let escaped = self.orbit.escaped();

        for _ in 0..iterations {
            if self.active.is_empty() {
                break;
            }
            self.it += 1;
            let it = self.it;
            let mut i = 0;
            while i < self.active.len() {
                let idx = self.active[i] as usize;
                let cap = self.caps[idx];
                let px = &mut self.pixels[idx];
                step_pixel(px, &self.orbit_f32, escaped, it, cap, &self.params);
                if px.nn != 0 {
                    if px.nn > 0 {
                        rec.escaped.push(idx as u32);
                    } else {
                        rec.converged.push(ConvergedPixel {
                            index: idx as u32,
                            z_re: Qd::from_f64(px.final_z[0] as f64),
                            z_im: Qd::from_f64(px.final_z[1] as f64),
                            period: px.period,
                        });
                    }
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
        let px = &self.pixels[index as usize];
        if px.nn != 0 {
            return (px.final_z[0] as f64, px.final_z[1] as f64);
        }
        let m = px.ref_iter as usize;
        let d = cldexp(px.delta, px.scale);
        match self.orbit_f32.get(m) {
            Some(z) => ((z[0] + d[0]) as f64, (z[1] + d[1]) as f64),
            None => (d[0] as f64, d[1] as f64),
        }
    }

    fn current_c(&self, index: u32) -> (f64, f64) {
        let px = &self.pixels[index as usize];
        let dc = cldexp(px.dc, self.params.initial_scale);
        (
            self.c_center.0 + dc[0] as f64,
            self.c_center.1 + dc[1] as f64,
        )
    }

    fn current_period(&self, index: u32) -> u32 {
        self.pixels[index as usize].period
    }
}

// Suppress an unused-field warning until annotations need it.
impl AdaptiveReferenceBoard {
    pub fn pixel_spacing(&self) -> f64 {
        self.spacing
    }
}
