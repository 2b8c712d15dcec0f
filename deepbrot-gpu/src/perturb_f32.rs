//! GPU perturbation board with plain f32 deltas: the workhorse for medium
//! zoom (1e7 to ~1e20), where dc values still sit inside f32 range.

use crate::device::GpuContext;
use crate::error::GpuError;
use crate::runner::{ensure_fits, KernelRunner, Params};
use crate::shaders;
use crate::track::PixelTracker;
use bytemuck::{Pod, Zeroable};
use deepbrot_core::{ChangeRecord, ViewportSpec};
use deepbrot_engine::{
    is_chaotic_spike, Board, EngineError, ReferenceOrbit, MAX_CHAOTIC_ITERATIONS,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct PerturbPixel {
    delta: [f32; 2],
    b: [f32; 2],
    dc: [f32; 2],
    nn: i32,
    period: u32,
    cp_iter: u32,
    has_cp: u32,
    ref_iter: u32,
    cap: u32,
}

pub struct GpuPerturbF32Board {
    runner: KernelRunner,
    orbit: ReferenceOrbit,
    orbit_f32: Vec<[f32; 2]>,
    mirror: Vec<PerturbPixel>,
    tracker: PixelTracker,
    it: u32,
    n: u32,
    max_iter: u32,
    exponent: u32,
    eps1: f32,
    eps2: f32,
    c_center: (f64, f64),
}

impl GpuPerturbF32Board {
    pub fn new(
        ctx: GpuContext,
        spec: &ViewportSpec,
        reference_escape_radius: f64,
    ) -> Result<Self, GpuError> {
        let n = spec.pixel_count();
        let orbit_capacity = spec.max_iter + 2;
        ensure_fits(&ctx, n as u64 * std::mem::size_of::<PerturbPixel>() as u64)?;
        ensure_fits(&ctx, orbit_capacity as u64 * 8)?;

        let orbit = ReferenceOrbit::for_viewport(spec, reference_escape_radius);
        let mut pixels = Vec::with_capacity(n as usize);
        let mut chaotic = Vec::with_capacity(n as usize);
        for i in 0..n {
            let c = spec.pixel_c(i);
            let flag = is_chaotic_spike(&c, spec.exponent);
            chaotic.push(flag);
            let (dre, dim) = spec.pixel_dc(i).to_f64_pair();
            pixels.push(PerturbPixel {
                dc: [dre as f32, dim as f32],
                cap: if flag {
                    spec.max_iter.min(MAX_CHAOTIC_ITERATIONS)
                } else {
                    spec.max_iter
                },
                ..PerturbPixel::default()
            });
        }

        let runner = KernelRunner::new(
            ctx,
            "perturb_f32_board",
            &shaders::perturb_source(),
            n,
            bytemuck::cast_slice(&pixels),
            orbit_capacity,
        )?;

        Ok(Self {
            runner,
            orbit,
            orbit_f32: Vec::new(),
            mirror: pixels,
            tracker: PixelTracker::new(chaotic),
            it: 0,
            n,
            max_iter: spec.max_iter,
            exponent: spec.exponent,
            eps1: spec.periodicity_eps_1 as f32,
            eps2: spec.periodicity_eps_2 as f32,
            c_center: spec.center().to_f64_pair(),
        })
    }

    pub fn result(&self, index: u32) -> i32 {
        self.tracker.result(index)
    }

    fn sync_orbit(&mut self, needed: u32) {
        self.orbit.extend_until(needed);
        while (self.orbit_f32.len() as u32) < self.orbit.len() {
            let k = self.orbit_f32.len() as u32;
            let (re, im) = self.orbit.orbit_at(k).expect("extended above").to_f64_pair();
            self.orbit_f32.push([re as f32, im as f32]);
        }
        self.runner.upload_orbit(&self.orbit_f32);
    }
}

impl Board for GpuPerturbF32Board {
    fn iterate_batch(&mut self, iterations: u32) -> Result<ChangeRecord, EngineError> {
        let mut rec = ChangeRecord::new(self.it);
        if iterations == 0 || self.tracker.remaining() == 0 {
            return Ok(rec);
        }
        let needed = (self.it + iterations).min(self.max_iter) + 1;
        self.sync_orbit(needed);

        let params = Params {
            n: self.n,
            exponent: self.exponent,
            chunk_start: self.it,
            chunk_len: iterations,
            orbit_len: self.orbit_f32.len() as u32,
            ref_escaped: self.orbit.escaped() as u32,
            eps1: self.eps1,
            eps2: self.eps2,
            ..Params::default()
        };
        self.mirror = self.runner.run_chunk::<PerturbPixel>(params)?;
        self.it += iterations;

        let mirror = &self.mirror;
        self.tracker
            .absorb(&mut rec, |i| (mirror[i].nn, mirror[i].b, mirror[i].period));
        rec.iter = self.it;
        Ok(rec)
    }

    fn remaining_active(&self) -> u32 {
        self.tracker.remaining()
    }

    fn chaotic_spike_count(&self) -> u32 {
        self.tracker.chaotic_count()
    }

    fn iteration(&self) -> u32 {
        self.it
    }

    fn current_z(&self, index: u32) -> (f64, f64) {
        let p = &self.mirror[index as usize];
        match self.orbit_f32.get(p.ref_iter as usize) {
            Some(z) => (
                (z[0] + p.delta[0]) as f64,
                (z[1] + p.delta[1]) as f64,
            ),
            None => (p.delta[0] as f64, p.delta[1] as f64),
        }
    }

    fn current_c(&self, index: u32) -> (f64, f64) {
        let p = &self.mirror[index as usize];
        (
            self.c_center.0 + p.dc[0] as f64,
            self.c_center.1 + p.dc[1] as f64,
        )
    }

    fn current_period(&self, index: u32) -> u32 {
        self.mirror[index as usize].period
    }
}
