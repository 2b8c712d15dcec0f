//! Shallow GPU board: per-pixel (c, z) in f32, direct iteration on the
//! device. Valid for zoom below ~1e7 where f32 still resolves the grid.

use crate::device::GpuContext;
use crate::error::GpuError;
use crate::runner::{ensure_fits, KernelRunner, Params};
use crate::shaders;
use crate::track::PixelTracker;
use bytemuck::{Pod, Zeroable};
use deepbrot_core::{ChangeRecord, ViewportSpec};
use deepbrot_engine::{is_chaotic_spike, Board, EngineError, MAX_CHAOTIC_ITERATIONS};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct ShallowPixel {
    z: [f32; 2],
    b: [f32; 2],
    c: [f32; 2],
    nn: i32,
    period: u32,
    cp_iter: u32,
    cap: u32,
}

pub struct GpuShallowBoard {
    runner: KernelRunner,
    mirror: Vec<ShallowPixel>,
    tracker: PixelTracker,
    it: u32,
    n: u32,
    exponent: u32,
    eps1: f32,
    eps2: f32,
}

impl GpuShallowBoard {
    pub fn new(ctx: GpuContext, spec: &ViewportSpec) -> Result<Self, GpuError> {
        let n = spec.pixel_count();
        ensure_fits(&ctx, n as u64 * std::mem::size_of::<ShallowPixel>() as u64)?;

        let mut pixels = Vec::with_capacity(n as usize);
        let mut chaotic = Vec::with_capacity(n as usize);
        for i in 0..n {
            let c = spec.pixel_c(i);
            let flag = is_chaotic_spike(&c, spec.exponent);
            chaotic.push(flag);
            let (re, im) = c.to_f64_pair();
            pixels.push(ShallowPixel {
                c: [re as f32, im as f32],
                cap: if flag {
                    spec.max_iter.min(MAX_CHAOTIC_ITERATIONS)
                } else {
                    spec.max_iter
                },
                ..ShallowPixel::default()
            });
        }

        let runner = KernelRunner::new(
            ctx,
            "shallow_board",
            &shaders::shallow_source(),
            n,
            bytemuck::cast_slice(&pixels),
            0,
        )?;

        Ok(Self {
            runner,
            mirror: pixels,
            tracker: PixelTracker::new(chaotic),
            it: 0,
            n,
            exponent: spec.exponent,
            eps1: spec.periodicity_eps_1 as f32,
            eps2: spec.periodicity_eps_2 as f32,
        })
    }

    pub fn result(&self, index: u32) -> i32 {
        self.tracker.result(index)
    }
}

impl Board for GpuShallowBoard {
    fn iterate_batch(&mut self, iterations: u32) -> Result<ChangeRecord, EngineError> {
        let mut rec = ChangeRecord::new(self.it);
        if iterations == 0 || self.tracker.remaining() == 0 {
            return Ok(rec);
        }
        let params = Params {
            n: self.n,
            exponent: self.exponent,
            chunk_start: self.it,
            chunk_len: iterations,
            eps1: self.eps1,
            eps2: self.eps2,
            ..Params::default()
        };
        self.mirror = self.runner.run_chunk::<ShallowPixel>(params)?;
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
        (p.z[0] as f64, p.z[1] as f64)
    }

    fn current_c(&self, index: u32) -> (f64, f64) {
        let p = &self.mirror[index as usize];
        (p.c[0] as f64, p.c[1] as f64)
    }

    fn current_period(&self, index: u32) -> u32 {
        self.mirror[index as usize].period
    }
}
