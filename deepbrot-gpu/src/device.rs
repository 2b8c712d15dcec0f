//! GPU device initialization and the capability report the board selector
//! consumes.

use crate::error::GpuError;

/// Default cap on any single per-board buffer.
pub const DEFAULT_BUFFER_LIMIT: u64 = 256 * 1024 * 1024;

/// Holds the wgpu device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Result of GPU initialization attempt.
pub enum GpuAvailability {
    Available(GpuContext),
    Unavailable(String),
}

/// What the selector needs to know about the machine. Built once at startup
/// and passed into selection explicitly.
#[derive(Clone, Copy, Debug)]
pub struct Capabilities {
    pub gpu_available: bool,
    pub max_buffer_bytes: u64,
}

impl Capabilities {
    pub fn without_gpu() -> Self {
        Self {
            gpu_available: false,
            max_buffer_bytes: DEFAULT_BUFFER_LIMIT,
        }
    }
}

impl GpuContext {
    /// Attempt to initialize GPU. Returns Unavailable on any failure.
    pub async fn try_init() -> GpuAvailability {
        match Self::init_internal().await {
            Ok(ctx) => GpuAvailability::Available(ctx),
            Err(e) => {
                log::warn!("GPU initialization failed: {e}");
                GpuAvailability::Unavailable(e.to_string())
            }
        }
    }

    /// Blocking probe for synchronous callers.
    pub fn try_init_blocking() -> GpuAvailability {
        pollster::block_on(Self::try_init())
    }

    async fn init_internal() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        log::info!("GPU adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("deepbrot"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self { device, queue })
    }

    /// The largest storage buffer any board may allocate on this device.
    pub fn max_buffer_bytes(&self) -> u64 {
        (self.device.limits().max_storage_buffer_binding_size as u64).min(DEFAULT_BUFFER_LIMIT)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            gpu_available: true,
            max_buffer_bytes: self.max_buffer_bytes(),
        }
    }
}
