//! Shared plumbing for the GPU boards: pipeline setup, the uniform layout,
//! state buffers with device-limit checks, dispatch, and readback.

use crate::device::GpuContext;
use crate::error::GpuError;
use bytemuck::{Pod, Zeroable};

/// Uniform block shared by all three kernels (the adaptive kernel reads the
/// scale fields, the others ignore them).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub(crate) struct Params {
    pub n: u32,
    pub exponent: u32,
    pub chunk_start: u32,
    pub chunk_len: u32,
    pub orbit_len: u32,
    pub ref_escaped: u32,
    pub initial_scale: i32,
    pub _pad0: u32,
    pub eps1: f32,
    pub eps2: f32,
    pub _pad1: u32,
    pub _pad2: u32,
}

/// Fail construction early when a per-board buffer would exceed the device
/// limit.
pub(crate) fn ensure_fits(ctx: &GpuContext, bytes: u64) -> Result<(), GpuError> {
    let limit = ctx.max_buffer_bytes();
    if bytes > limit {
        return Err(GpuError::BufferTooLarge {
            requested: bytes,
            limit,
        });
    }
    Ok(())
}

pub(crate) struct KernelRunner {
    ctx: GpuContext,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    params_buf: wgpu::Buffer,
    pixels_buf: wgpu::Buffer,
    orbit_buf: Option<wgpu::Buffer>,
    staging_buf: wgpu::Buffer,
    pixels_bytes: u64,
    n: u32,
    orbit_uploaded: u32,
}

impl KernelRunner {
    /// Create buffers and pipeline for one board. `orbit_capacity` is in
    /// reference points (0 for the shallow kernel, which has no orbit
    /// binding).
    pub fn new(
        ctx: GpuContext,
        label: &str,
        source: &str,
        n: u32,
        initial_pixels: &[u8],
        orbit_capacity: u32,
    ) -> Result<Self, GpuError> {
        let pixels_bytes = initial_pixels.len() as u64;
        ensure_fits(&ctx, pixels_bytes)?;
        let orbit_bytes = orbit_capacity as u64 * 8;
        ensure_fits(&ctx, orbit_bytes)?;

        let device = &ctx.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut layout_entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ];
        if orbit_capacity > 0 {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &layout_entries,
            });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let pixels_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixel_state"),
            size: pixels_bytes,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let orbit_buf = if orbit_capacity > 0 {
            Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("reference_orbit"),
                size: orbit_bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }))
        } else {
            None
        };
        let staging_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixel_readback"),
            size: pixels_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut bind_entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: pixels_buf.as_entire_binding(),
            },
        ];
        if let Some(orbit) = &orbit_buf {
            bind_entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: orbit.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &bind_group_layout,
            entries: &bind_entries,
        });

        ctx.queue.write_buffer(&pixels_buf, 0, initial_pixels);

        Ok(Self {
            n,
            ctx,
            pipeline,
            bind_group,
            params_buf,
            pixels_buf,
            orbit_buf,
            staging_buf,
            pixels_bytes,
            orbit_uploaded: 0,
        })
    }

    /// Upload reference points not yet resident on the device.
    pub fn upload_orbit(&mut self, points: &[[f32; 2]]) {
        let orbit = self.orbit_buf.as_ref().expect("board has no orbit buffer");
        let start = self.orbit_uploaded as usize;
        if start >= points.len() {
            return;
        }
        self.ctx.queue.write_buffer(
            orbit,
            (start * 8) as u64,
            bytemuck::cast_slice(&points[start..]),
        );
        self.orbit_uploaded = points.len() as u32;
    }

    /// Dispatch one chunk and read the whole pixel-state buffer back.
    pub fn run_chunk<T: Pod>(&mut self, params: Params) -> Result<Vec<T>, GpuError> {
        self.ctx
            .queue
            .write_buffer(&self.params_buf, 0, bytemuck::bytes_of(&params));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("board_chunk"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("board_chunk"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(self.n.div_ceil(64), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&self.pixels_buf, 0, &self.staging_buf, 0, self.pixels_bytes);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging_buf.slice(..);
        let (tx, rx) = futures_channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        pollster::block_on(rx)
            .map_err(|_| GpuError::Backend("readback channel closed".into()))?
            .map_err(GpuError::BufferMap)?;

        let data = {
            let view = slice.get_mapped_range();
            bytemuck::cast_slice(&view).to_vec()
        };
        self.staging_buf.unmap();
        Ok(data)
    }
}
