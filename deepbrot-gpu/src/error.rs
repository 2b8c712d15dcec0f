//! GPU error types.

use deepbrot_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    #[error("buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("requested buffer of {requested} bytes exceeds device limit {limit}")]
    BufferTooLarge { requested: u64, limit: u64 },

    #[error("GPU backend fault: {0}")]
    Backend(String),
}

impl From<GpuError> for EngineError {
    fn from(e: GpuError) -> Self {
        EngineError::Backend(e.to_string())
    }
}
